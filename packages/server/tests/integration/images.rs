use crate::common::{TestApp, routes};

mod image_upload {
    use super::*;

    #[tokio::test]
    async fn upload_returns_id_and_hash() {
        let app = TestApp::spawn().await;

        let res = app.upload("cat.png", b"ABC").await;

        assert_eq!(res.status, 200, "{}", res.text());
        assert_eq!(res.body["message"], "Imagem enviada com sucesso!");
        assert!(res.body["id"].as_i64().is_some());
        assert_eq!(
            res.body["hash"],
            "b5d4045c3f466fa91fe2cc6abe79232a1a57cdf104f7a26e716e0a1e2789df78"
        );
    }

    #[tokio::test]
    async fn duplicate_content_is_rejected_under_another_name() {
        let app = TestApp::spawn().await;
        app.upload_ok("cat.png", b"ABC").await;

        let res = app.upload("cat_copy.png", b"ABC").await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "DUPLICATE_CONTENT");
        assert_eq!(res.body["error"], "Imagem duplicada");

        let list = app.get(routes::IMAGES).await;
        assert_eq!(list.body["imagens"].as_array().unwrap().len(), 1);
        assert_eq!(app.blob_files(), 1);
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let app = TestApp::spawn().await;
        let form = reqwest::multipart::Form::new().text("outro", "valor");

        let res = app.post_form(routes::IMAGES, form).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(res.body["error"], "Nenhuma imagem foi enviada");
    }

    #[tokio::test]
    async fn empty_filename_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.upload("", b"ABC").await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "Nenhuma imagem foi enviada");
    }

    #[tokio::test]
    async fn empty_file_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.upload("empty.png", b"").await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(app.blob_files(), 0);
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let app = TestApp::spawn_with_max_blob_size(16).await;

        let res = app.upload("big.png", &[7u8; 64]).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(app.blob_files(), 0);
    }
}

mod image_list {
    use super::*;

    #[tokio::test]
    async fn empty_catalog_lists_nothing() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::IMAGES).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body, serde_json::json!({ "imagens": [] }));
    }

    #[tokio::test]
    async fn lists_uploaded_images_with_base64_content() {
        let app = TestApp::spawn().await;
        let id = app.upload_ok("cat.png", b"ABC").await;

        let res = app.get(routes::IMAGES).await;

        assert_eq!(res.status, 200);
        assert_eq!(
            res.body,
            serde_json::json!({
                "imagens": [{ "id": id, "nome": "cat.png", "dados": "QUJD" }]
            })
        );
    }

    #[tokio::test]
    async fn image_with_missing_file_is_left_out() {
        let app = TestApp::spawn().await;
        app.upload_ok("a.png", b"aaa").await;
        app.upload_ok("b.png", b"bbb").await;

        let hash = ::common::storage::ContentHash::compute(b"aaa");
        std::fs::remove_file(app.storage_root.join(hash.locator())).unwrap();

        let res = app.get(routes::IMAGES).await;

        assert_eq!(res.status, 200);
        let images = res.body["imagens"].as_array().unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0]["nome"], "b.png");
    }

    #[tokio::test]
    async fn paged_listing_reports_pagination() {
        let app = TestApp::spawn().await;
        for i in 0..3u8 {
            app.upload_ok(&format!("{i}.png"), &[i; 4]).await;
        }

        let res = app.get(&routes::images_page(2, 2)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["imagens"].as_array().unwrap().len(), 1);
        assert_eq!(res.body["imagens"][0]["nome"], "2.png");
        assert_eq!(res.body["pagination"]["page"], 2);
        assert_eq!(res.body["pagination"]["per_page"], 2);
        assert_eq!(res.body["pagination"]["total"], 3);
        assert_eq!(res.body["pagination"]["total_pages"], 2);
    }
}

mod image_download {
    use super::*;

    #[tokio::test]
    async fn streams_raw_bytes_with_etag() {
        let app = TestApp::spawn().await;
        let id = app.upload_ok("cat.png", b"ABC").await;

        let res = app.get(&routes::image_data(id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.bytes, b"ABC");
        assert_eq!(res.headers["content-type"], "image/png");
        assert_eq!(
            res.headers["etag"],
            "\"b5d4045c3f466fa91fe2cc6abe79232a1a57cdf104f7a26e716e0a1e2789df78\""
        );
    }

    #[tokio::test]
    async fn matching_etag_is_not_modified() {
        let app = TestApp::spawn().await;
        let id = app.upload_ok("cat.png", b"ABC").await;
        let etag = app.get(&routes::image_data(id)).await.headers["etag"]
            .to_str()
            .unwrap()
            .to_string();

        let res = app
            .get_with_header(&routes::image_data(id), "If-None-Match", &etag)
            .await;

        assert_eq!(res.status, 304);
        assert!(res.bytes.is_empty());
    }

    #[tokio::test]
    async fn unknown_image_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::image_data(42)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod image_delete {
    use super::*;

    #[tokio::test]
    async fn delete_removes_image_and_file() {
        let app = TestApp::spawn().await;
        let id = app.upload_ok("cat.png", b"ABC").await;

        let res = app.delete(&routes::image(id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(
            res.body["message"],
            format!("Imagem com o ID {id} excluída com sucesso!")
        );
        assert_eq!(app.blob_files(), 0);
        let list = app.get(routes::IMAGES).await;
        assert_eq!(list.body["imagens"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn deleting_twice_is_not_found() {
        let app = TestApp::spawn().await;
        let id = app.upload_ok("cat.png", b"ABC").await;
        assert_eq!(app.delete(&routes::image(id)).await.status, 200);

        let res = app.delete(&routes::image(id)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn content_can_be_uploaded_again_after_delete() {
        let app = TestApp::spawn().await;
        let id = app.upload_ok("cat.png", b"ABC").await;
        app.delete(&routes::image(id)).await;

        let res = app.upload("cat_copy.png", b"ABC").await;

        assert_eq!(res.status, 200);
        assert_ne!(res.id(), id);
    }
}

mod api_docs {
    use super::*;

    #[tokio::test]
    async fn openapi_document_lists_image_routes() {
        let app = TestApp::spawn().await;

        let res = app.get("/api-docs/openapi.json").await;

        assert_eq!(res.status, 200);
        assert!(res.body["paths"]["/imagens"]["post"].is_object());
        assert!(res.body["paths"]["/imagens"]["get"].is_object());
        assert!(res.body["paths"]["/imagens/{id}"]["delete"].is_object());
        assert!(res.body["paths"]["/imagens/{id}/dados"]["get"].is_object());
    }
}
