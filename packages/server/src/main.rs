use std::path::PathBuf;
use std::sync::Arc;

use common::storage::filesystem::FilesystemBlobStore;
use tracing::{Level, info};

use server::catalog::SeaOrmCatalog;
use server::config::AppConfig;
use server::repository::ImageRepository;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;

    let db = server::database::init_db(&config.database).await?;
    let blobs = FilesystemBlobStore::new(
        PathBuf::from(&config.storage.root),
        config.storage.max_blob_size,
    )
    .await?;
    info!("Storing images under {}", blobs.base_path().display());

    let repository = ImageRepository::new(Arc::new(SeaOrmCatalog::new(db)), Arc::new(blobs));

    if config.storage.reconcile_on_startup {
        let report = repository.reconcile().await?;
        info!(
            staged_purged = report.staged_purged,
            orphan_blobs_removed = report.orphan_blobs_removed,
            dangling_rows = report.dangling_rows.len(),
            "Reconciled image storage with the catalog"
        );
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        repository: Arc::new(repository),
        config,
    };
    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running at http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
