use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use ::common::storage::filesystem::FilesystemBlobStore;
use reqwest::Client;
use serde_json::Value;
use tempfile::TempDir;

use server::catalog::MemoryCatalog;
use server::config::{
    AppConfig, CorsConfig, DatabaseConfig, ListingConfig, ServerConfig, StorageConfig,
};
use server::repository::ImageRepository;
use server::state::AppState;

pub mod routes {
    pub const IMAGES: &str = "/imagens";

    pub fn image(id: i64) -> String {
        format!("/imagens/{id}")
    }

    pub fn image_data(id: i64) -> String {
        format!("/imagens/{id}/dados")
    }

    pub fn images_page(page: u64, per_page: u64) -> String {
        format!("/imagens?page={page}&per_page={per_page}")
    }
}

/// A running test server backed by the in-memory catalog and a temp storage root.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub storage_root: PathBuf,
    _storage: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub headers: reqwest::header::HeaderMap,
    /// Raw response body.
    pub bytes: Vec<u8>,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_max_blob_size(1024 * 1024).await
    }

    pub async fn spawn_with_max_blob_size(max_blob_size: u64) -> Self {
        let storage = tempfile::tempdir().expect("Failed to create storage dir");
        let storage_root = storage.path().join("uploads");

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig::default(),
            },
            database: DatabaseConfig {
                url: "postgres://unused".to_string(),
                max_connections: 1,
            },
            storage: StorageConfig {
                root: storage_root.display().to_string(),
                max_blob_size,
                reconcile_on_startup: false,
            },
            listing: ListingConfig::default(),
        };

        let blobs = FilesystemBlobStore::new(storage_root.clone(), max_blob_size)
            .await
            .expect("Failed to create blob store");
        let repository = ImageRepository::new(Arc::new(MemoryCatalog::new()), Arc::new(blobs));

        let state = AppState {
            repository: Arc::new(repository),
            config: app_config,
        };

        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            storage_root,
            _storage: storage,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn upload(&self, file_name: &str, file_bytes: &[u8]) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(file_bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str("image/png")
            .expect("Failed to set MIME type");
        let form = reqwest::multipart::Form::new().part("imagem", part);
        self.post_form(routes::IMAGES, form).await
    }

    pub async fn post_form(&self, path: &str, form: reqwest::multipart::Form) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_header(&self, path: &str, name: &str, value: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header(name, value)
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// Upload and return the new image id.
    pub async fn upload_ok(&self, file_name: &str, file_bytes: &[u8]) -> i64 {
        let res = self.upload(file_name, file_bytes).await;
        assert_eq!(res.status, 200, "upload failed: {}", res.text());
        res.id()
    }

    /// Number of blob files on disk, excluding staged uploads.
    pub fn blob_files(&self) -> usize {
        std::fs::read_dir(&self.storage_root)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|shard| shard.file_name() != ".tmp")
            .map(|shard| std::fs::read_dir(shard.path()).unwrap().count())
            .sum()
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let bytes = res.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            bytes,
            body,
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn id(&self) -> i64 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'")
    }
}
