#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use meal_timetable::{AppState, ServerConfig, router};
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};
use tower::ServiceExt;

pub struct TestWorkspace {
    _tempdir: TempDir,
    root: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let tempdir = tempdir().expect("tempdir");
        let root = tempdir.path().to_path_buf();
        Self {
            _tempdir: tempdir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn config(&self, data_file: &str) -> ServerConfig {
        ServerConfig {
            data_file: Some(self.path(data_file)),
            ..ServerConfig::default()
        }
    }
}

/// Drives the HTTP router in-process.
#[derive(Clone)]
pub struct ApiClient {
    router: Router,
}

impl ApiClient {
    pub fn in_memory() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let state = AppState::new(Arc::new(config)).expect("app state");
        Self::from_state(Arc::new(state))
    }

    pub fn from_state(state: Arc<AppState>) -> Self {
        Self {
            router: router(state),
        }
    }

    pub async fn call(&self, operation: &str, arguments: Value) -> Value {
        let (status, body) = self
            .post(json!({"operation": operation, "arguments": arguments}))
            .await;
        assert_eq!(status, StatusCode::OK, "{operation} failed: {body}");
        body
    }

    /// Payload of a successful operation, or `Value::Null`.
    pub async fn data(&self, operation: &str, arguments: Value) -> Value {
        let body = self.call(operation, arguments).await;
        body["data"]
            .as_object()
            .and_then(|data| data.values().next())
            .cloned()
            .expect("data entry")
    }

    pub async fn mutate(&self, operation: &str, input: Value) -> Value {
        self.data(operation, json!({ "input": input })).await
    }

    pub async fn post(&self, body: Value) -> (StatusCode, Value) {
        let request = Request::post("/api")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        self.send(request).await
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let request = Request::get(path).body(Body::empty()).expect("request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("response body")
            .to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

pub fn node_names(connection: &Value) -> Vec<String> {
    connection["edges"]
        .as_array()
        .expect("edges")
        .iter()
        .map(|edge| edge["node"]["name"].as_str().expect("name").to_string())
        .collect()
}

pub fn node_ids(connection: &Value) -> Vec<u64> {
    connection["edges"]
        .as_array()
        .expect("edges")
        .iter()
        .map(|edge| edge["node"]["originalId"].as_u64().expect("originalId"))
        .collect()
}

/// Creates the timetable used across scenarios and returns its global id.
pub async fn seed_timetable(client: &ApiClient) -> String {
    let timetable = client
        .mutate(
            "createTimetable",
            json!({
                "name": "fellows timetable",
                "code": "FT7871",
                "apiKey": "TF78993jTA",
                "cycleLength": 14,
                "currentCycleDay": 2,
                "cycleDayUpdated": "2024-03-04T08:00:00Z",
                "description": "timetable for fellows",
            }),
        )
        .await;
    timetable["id"].as_str().expect("timetable id").to_string()
}
