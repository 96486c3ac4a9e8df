//! A fake Zenodo deposition service for wire-level tests.
//!
//! Serves the three endpoints the client calls, records every request, and follows a
//! [`Script`] to inject failures.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use zenodo_publish::retry::RetryPolicy;

/// Failure injection for the fake service.
#[derive(Debug, Clone)]
pub struct Script {
    /// Status and body returned by create instead of a draft.
    pub create_failure: Option<(u16, Value)>,
    /// Replace the create response body entirely.
    pub create_body: Option<Value>,
    /// Number of leading upload requests answered with 503.
    pub upload_transient_failures: usize,
    /// Status and body returned by every upload.
    pub upload_failure: Option<(u16, Value)>,
    pub publish_status: u16,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            create_failure: None,
            create_body: None,
            upload_transient_failures: 0,
            upload_failure: None,
            publish_status: 202,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateCall {
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct UploadCall {
    pub bucket: String,
    pub file_name: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct PublishCall {
    pub id: String,
    pub access_token: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct Recorded {
    pub creates: Vec<CreateCall>,
    pub uploads: Vec<UploadCall>,
    pub publishes: Vec<PublishCall>,
}

impl Recorded {
    pub fn total(&self) -> usize {
        self.creates.len() + self.uploads.len() + self.publishes.len()
    }
}

struct Inner {
    base_url: String,
    script: Script,
    recorded: Recorded,
    next_id: u64,
}

type Shared = Arc<Mutex<Inner>>;

pub struct FakeZenodo {
    pub base_url: String,
    state: Shared,
}

impl FakeZenodo {
    pub async fn start(script: Script) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake zenodo");
        let base_url = format!("http://{}", listener.local_addr().expect("local addr"));
        let state = Arc::new(Mutex::new(Inner {
            base_url: base_url.clone(),
            script,
            recorded: Recorded::default(),
            next_id: 1000,
        }));

        let app = Router::new()
            .route("/api/deposit/depositions", post(create))
            .route("/api/files/{bucket}/{file}", put(upload))
            .route("/api/deposit/depositions/{id}/actions/publish", post(publish))
            .layer(DefaultBodyLimit::disable())
            .with_state(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve fake zenodo");
        });

        FakeZenodo { base_url, state }
    }

    pub fn recorded(&self) -> Recorded {
        self.state.lock().unwrap().recorded.clone()
    }

    pub fn record_url(&self, id: &str) -> String {
        format!("{}/records/{id}", self.base_url)
    }
}

async fn create(State(state): State<Shared>, headers: HeaderMap, body: Bytes) -> Response {
    let mut inner = state.lock().unwrap();
    inner.recorded.creates.push(CreateCall {
        authorization: header(&headers, "authorization"),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    if let Some((status, payload)) = inner.script.create_failure.clone() {
        return (status_code(status), Json(payload)).into_response();
    }
    if let Some(payload) = inner.script.create_body.clone() {
        return (StatusCode::CREATED, Json(payload)).into_response();
    }

    let id = inner.next_id;
    inner.next_id += 1;
    let bucket = format!("{}/api/files/bucket-{id}", inner.base_url);
    (
        StatusCode::CREATED,
        Json(json!({
            "id": id,
            "state": "unsubmitted",
            "submitted": false,
            "links": { "bucket": bucket }
        })),
    )
        .into_response()
}

async fn upload(
    State(state): State<Shared>,
    Path((bucket, file_name)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut inner = state.lock().unwrap();
    let size = body.len();
    inner.recorded.uploads.push(UploadCall {
        bucket,
        file_name: file_name.clone(),
        authorization: header(&headers, "authorization"),
        content_type: header(&headers, "content-type"),
        content_length: header(&headers, "content-length"),
        body: body.to_vec(),
    });

    if let Some((status, payload)) = inner.script.upload_failure.clone() {
        return (status_code(status), Json(payload)).into_response();
    }
    if inner.recorded.uploads.len() <= inner.script.upload_transient_failures {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": 503, "message": "try again"})),
        )
            .into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({"key": file_name, "size": size, "mimetype": "application/octet-stream"})),
    )
        .into_response()
}

async fn publish(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut inner = state.lock().unwrap();
    inner.recorded.publishes.push(PublishCall {
        id: id.clone(),
        access_token: params.get("access_token").cloned(),
    });
    let status = status_code(inner.script.publish_status);
    if status == StatusCode::ACCEPTED {
        (status, Json(json!({"id": id, "submitted": true, "state": "done"}))).into_response()
    } else {
        (
            status,
            Json(json!({"status": status.as_u16(), "message": "publish rejected"})),
        )
            .into_response()
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn status_code(code: u16) -> StatusCode {
    StatusCode::from_u16(code).expect("valid status code")
}

/// A listener that accepts connections and drops them straight away, counting each.
pub async fn start_hangup_server() -> (String, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind hangup server");
    let base_url = format!("http://{}", listener.local_addr().expect("local addr"));
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });
    (base_url, accepted)
}

/// Retry policy with millisecond delays so retry tests stay fast.
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        ..RetryPolicy::default()
    }
    .with_max_attempts(max_attempts)
}
