use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn image_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::image::upload_image,
            handlers::image::list_images
        ))
        .routes(routes!(handlers::image::delete_image))
        .routes(routes!(handlers::image::download_image))
}
