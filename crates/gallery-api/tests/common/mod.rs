#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use gallery_api::state::{AppState, AppStateInner};
use gallery_api::storage::Storage;
use gallery_db::Database;

pub const SECRET: &str = "test-secret";
pub const INDEX_HTML: &str = "<!doctype html><div id=\"root\"></div>";
const BOUNDARY: &str = "gallery-test-boundary";
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub upload_dir: PathBuf,
    // Keeps the upload and frontend directories alive
    _tmp: TempDir,
}

pub struct Response {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Response {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or(Value::Null)
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();

        let frontend_dir = tmp.path().join("build");
        std::fs::create_dir_all(frontend_dir.join("static/js")).unwrap();
        std::fs::write(frontend_dir.join("index.html"), INDEX_HTML).unwrap();
        std::fs::write(frontend_dir.join("static/js/main.js"), "console.log('hi');").unwrap();

        let upload_dir = tmp.path().join("uploads");
        let storage = Storage::new(upload_dir.clone()).await.unwrap();

        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            storage,
            jwt_secret: SECRET.into(),
            token_ttl_hours: 1,
            frontend_dir,
            max_upload_bytes: 4 * 1024 * 1024,
        });

        Self {
            app: gallery_api::router(state.clone()),
            state,
            upload_dir,
            _tmp: tmp,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        Response {
            status,
            content_type,
            bytes,
        }
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn json(&self, method: &str, uri: &str, token: Option<&str>, body: Value) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Response {
        let mut builder = Request::delete(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn multipart(
        &self,
        uri: &str,
        token: Option<&str>,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
    ) -> Response {
        let mut builder = Request::post(uri).header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = multipart_body(fields, file);
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    /// Sign up and log in; returns (user_id, token).
    pub async fn register(&self, username: &str) -> (i64, String) {
        let email = format!("{}@example.com", username);
        let res = self
            .json(
                "POST",
                "/signup",
                None,
                json!({ "username": username, "email": email, "password": "pw" }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "signup failed: {:?}", res.json());

        let res = self
            .json("POST", "/login", None, json!({ "email": email, "password": "pw" }))
            .await;
        assert_eq!(res.status, StatusCode::OK);
        let body = res.json();
        (
            body["user_id"].as_i64().unwrap(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    /// Upload an image and return its id.
    pub async fn upload(&self, token: &str, title: &str, filename: &str) -> i64 {
        let res = self
            .multipart(
                "/upload",
                Some(token),
                &[("title", title)],
                Some((filename, &PNG_BYTES[..])),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "upload failed: {:?}", res.json());
        res.json()["id"].as_i64().unwrap()
    }

    /// Names of the files currently in the upload directory.
    pub fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.upload_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
