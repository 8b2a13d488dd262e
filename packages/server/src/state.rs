use std::sync::Arc;

use crate::config::AppConfig;
use crate::repository::ImageRepository;

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<ImageRepository>,
    pub config: AppConfig,
}
