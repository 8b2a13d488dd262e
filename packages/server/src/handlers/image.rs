use std::io::Cursor;

use axum::Json;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::storage::BoxReader;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::models::image::{
    ImageListQuery, ImageListResponse, ImageResponse, MessageResponse, UploadResponse,
};
use crate::models::shared::Pagination;
use crate::state::AppState;
use crate::utils::filename::content_disposition_value;

/// Multipart field carrying the uploaded file.
const UPLOAD_FIELD: &str = "imagem";
const NO_IMAGE_SENT: &str = "Nenhuma imagem foi enviada";
const DEFAULT_PER_PAGE: u64 = 20;

/// Body limit for uploads: the largest accepted file plus room for multipart framing.
pub fn image_upload_body_limit(max_blob_size: u64) -> DefaultBodyLimit {
    let max_blob_size = usize::try_from(max_blob_size).unwrap_or(usize::MAX);
    DefaultBodyLimit::max(max_blob_size.saturating_add(64 * 1024))
}

#[utoipa::path(
    post,
    path = "/imagens",
    tag = "Images",
    operation_id = "uploadImage",
    summary = "Upload an image",
    description = "Stores the file sent in the `imagem` multipart field. Content already \
        stored under any filename is rejected as a duplicate.",
    request_body(content_type = "multipart/form-data", description = "Multipart form with an `imagem` file field"),
    responses(
        (status = 200, description = "Image stored", body = UploadResponse),
        (status = 400, description = "No file, bad filename or oversized (VALIDATION_ERROR), or duplicate content (DUPLICATE_CONTENT)", body = ErrorBody),
        (status = 500, description = "Storage failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue; // Ignore unknown fields.
        }
        let file_name = field.file_name().map(str::to_owned).unwrap_or_default();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?;
        upload = Some((file_name, data));
    }

    let (file_name, data) = upload
        .filter(|(name, _)| !name.trim().is_empty())
        .ok_or_else(|| AppError::Validation(NO_IMAGE_SENT.into()))?;

    let content: BoxReader = Box::new(Cursor::new(data));
    let outcome = state.repository.ingest(&file_name, content).await?;

    Ok(Json(UploadResponse {
        message: "Imagem enviada com sucesso!".into(),
        id: outcome.id,
        hash: outcome.hash.to_hex(),
    }))
}

#[utoipa::path(
    get,
    path = "/imagens",
    tag = "Images",
    operation_id = "listImages",
    summary = "List images with their content",
    description = "Returns every stored image with its bytes base64-encoded. Images whose file \
        is missing are left out. Passing `page` or `per_page` returns a single page instead.",
    params(ImageListQuery),
    responses(
        (status = 200, description = "Image list", body = ImageListResponse),
        (status = 500, description = "Storage failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_images(
    State(state): State<AppState>,
    Query(query): Query<ImageListQuery>,
) -> Result<Json<ImageListResponse>, AppError> {
    if query.page.is_none() && query.per_page.is_none() {
        let images = state.repository.list().await?;
        return Ok(Json(ImageListResponse {
            images: images.into_iter().map(ImageResponse::from).collect(),
            pagination: None,
        }));
    }

    let page = state
        .repository
        .list_page(
            query.page.unwrap_or(1),
            query.per_page.unwrap_or(DEFAULT_PER_PAGE),
            state.config.listing.max_per_page,
        )
        .await?;

    Ok(Json(ImageListResponse {
        pagination: Some(Pagination::new(page.page, page.per_page, page.total)),
        images: page.images.into_iter().map(ImageResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/imagens/{id}/dados",
    tag = "Images",
    operation_id = "downloadImage",
    summary = "Download an image",
    description = "Streams the raw image bytes. Supports ETag-based caching via If-None-Match.",
    params(("id" = i32, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 404, description = "Image or its file not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers))]
pub async fn download_image(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (record, reader) = state.repository.fetch(id).await?;

    let etag_value = format!("\"{}\"", record.hash);
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && (val == etag_value || val == "*")
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let content_type = mime_guess::from_path(&record.name)
        .first_or_octet_stream()
        .to_string();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, record.size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&record.name),
        )
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(Body::from_stream(ReaderStream::new(reader)))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

#[utoipa::path(
    delete,
    path = "/imagens/{id}",
    tag = "Images",
    operation_id = "deleteImage",
    summary = "Delete an image",
    description = "Removes the image file and its catalog entry.",
    params(("id" = i32, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image deleted", body = MessageResponse),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Storage failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    state.repository.remove(id).await?;

    Ok(Json(MessageResponse {
        message: format!("Imagem com o ID {id} excluída com sucesso!"),
    }))
}
