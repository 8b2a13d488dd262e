use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::models::shared::Pagination;
use crate::repository::ImageView;

/// A listed image with its bytes inlined.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ImageResponse {
    #[schema(example = 1)]
    pub id: i32,
    /// Original upload filename.
    #[serde(rename = "nome")]
    #[schema(example = "cat.png")]
    pub name: String,
    /// Base64-encoded file content.
    #[serde(rename = "dados")]
    #[schema(example = "QUJD")]
    pub data: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ImageListResponse {
    #[serde(rename = "imagens")]
    pub images: Vec<ImageResponse>,
    /// Present only when the request asked for a page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct ImageListQuery {
    /// 1-based page number. Omit both parameters to list every image.
    pub page: Option<u64>,
    /// Items per page (1-100 by default).
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadResponse {
    #[schema(example = "Imagem enviada com sucesso!")]
    pub message: String,
    #[schema(example = 1)]
    pub id: i32,
    /// SHA-256 content hash.
    #[schema(example = "b5d4045c3f466fa91fe2cc6abe79232a1a57cdf104f7a26e716e0a1e2789df78")]
    pub hash: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Imagem com o ID 1 excluída com sucesso!")]
    pub message: String,
}

impl From<ImageView> for ImageResponse {
    fn from(view: ImageView) -> Self {
        Self {
            id: view.id,
            name: view.name,
            data: STANDARD.encode(&view.data),
        }
    }
}
