#![doc = "Zenodo deposition client: the HTTP side of create, upload and publish."]
//
//! # Zenodo client
//!
//! [`ZenodoClient`] implements [`DepositClient`] against the deposition REST API:
//!
//! - `POST {base}/api/deposit/depositions` with a bearer token creates a draft.
//! - `PUT {bucket}/{file name}` streams the file into the draft's bucket.
//! - `POST {base}/api/deposit/depositions/{id}/actions/publish?access_token=...`
//!   publishes it; only `202 Accepted` counts.
//!
//! Create and upload go through the client's [`RetryPolicy`](crate::retry::RetryPolicy);
//! publish is a one-shot POST.
//! Uploads re-open the file on each attempt, so a retried upload always sends the
//! full content and the handle is released when the attempt ends.

use std::path::Path;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, Response, StatusCode};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::{error, info};

use crate::config::PublishConfig;
use crate::contract::{
    AccessToken, DepositClient, Deposition, DepositionId, DepositionMetadata, DepositionState,
    NewDeposition, PublishedRecord, UploadTarget, UploadedFile,
};
use crate::error::PublishError;
use crate::mime::infer_content_type;

/// Wire content type for bucket uploads, whatever the file holds.
const UPLOAD_CONTENT_TYPE: &str = "application/octet-stream";

pub struct ZenodoClient {
    http: Client,
    config: PublishConfig,
    token: AccessToken,
}

#[derive(Deserialize)]
struct CreatedDeposition {
    id: DepositionId,
    links: DepositionLinks,
}

#[derive(Deserialize)]
struct DepositionLinks {
    bucket: Option<String>,
}

impl ZenodoClient {
    pub fn new(config: PublishConfig, token: AccessToken) -> Result<Self, PublishError> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        info!(base_url = %config.base_url, "Initialized ZenodoClient");
        Ok(Self {
            http,
            config,
            token,
        })
    }

    /// Resolves the upload target for `file` inside `bucket_url`.
    pub async fn upload_target(bucket_url: &str, file: &Path) -> Result<UploadTarget, PublishError> {
        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| PublishError::InvalidFileName(file.to_path_buf()))?
            .to_string();

        let meta = tokio::fs::metadata(file)
            .await
            .map_err(|error| PublishError::File {
                path: file.to_path_buf(),
                error,
            })?;
        if !meta.is_file() {
            return Err(PublishError::File {
                path: file.to_path_buf(),
                error: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }

        Ok(UploadTarget {
            url: format!("{}/{}", bucket_url.trim_end_matches('/'), file_name),
            content_type: infer_content_type(&file_name),
            content_length: meta.len(),
            file_name,
        })
    }

    async fn put_file(&self, target: &UploadTarget, file: &Path) -> Result<Response, PublishError> {
        let handle = tokio::fs::File::open(file)
            .await
            .map_err(|error| PublishError::File {
                path: file.to_path_buf(),
                error,
            })?;
        let body = Body::wrap_stream(ReaderStream::new(handle));

        let response = self
            .http
            .put(&target.url)
            .header(AUTHORIZATION, format!("token {}", self.token.expose()))
            .header(CONTENT_TYPE, UPLOAD_CONTENT_TYPE)
            .header(CONTENT_LENGTH, target.content_length)
            .body(body)
            .send()
            .await?;
        ensure_success(response).await
    }
}

/// Passes 2xx responses through; anything else becomes [`PublishError::Status`].
async fn ensure_success(response: Response) -> Result<Response, PublishError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PublishError::from_status(status, body))
}

#[async_trait]
impl DepositClient for ZenodoClient {
    async fn create_deposition(
        &self,
        metadata: &DepositionMetadata,
    ) -> Result<Deposition, PublishError> {
        let url = self.config.depositions_url();
        let body = NewDeposition::from(metadata);
        info!(title = %metadata.title, %url, "Creating draft deposition");

        let (http, token, url_ref, body_ref) = (&self.http, &self.token, &url, &body);
        let response = self
            .config
            .retry
            .run("create_deposition", false, move |_| async move {
                let response = http
                    .post(url_ref)
                    .bearer_auth(token.expose())
                    .json(body_ref)
                    .send()
                    .await?;
                ensure_success(response).await
            })
            .await
            .map_err(|e| {
                error!(error = %e, "Creating draft deposition failed");
                e
            })?;

        let text = response.text().await?;
        let created: CreatedDeposition = serde_json::from_str(&text).map_err(|e| {
            error!(error = %e, "Deposition response is not the expected JSON");
            PublishError::MalformedResponse(format!("deposition response: {e}"))
        })?;
        let bucket_url = created
            .links
            .bucket
            .filter(|bucket| !bucket.is_empty())
            .ok_or_else(|| {
                error!(deposition_id = %created.id, "Deposition response has no bucket link");
                PublishError::MalformedResponse("deposition response has no links.bucket".into())
            })?;

        info!(deposition_id = %created.id, bucket = %bucket_url, "Draft deposition created");
        Ok(Deposition {
            id: created.id,
            bucket_url,
            state: DepositionState::Draft,
        })
    }

    async fn upload_file(
        &self,
        deposition: &Deposition,
        file: &Path,
    ) -> Result<UploadedFile, PublishError> {
        let result = async {
            let target = Self::upload_target(&deposition.bucket_url, file).await?;
            info!(
                deposition_id = %deposition.id,
                url = %target.url,
                file = %target.file_name,
                content_type = %target.content_type,
                content_length = target.content_length,
                "Uploading file to deposition bucket"
            );

            let (this, target_ref) = (self, &target);
            let response = self
                .config
                .retry
                .run("upload_file", true, move |_| this.put_file(target_ref, file))
                .await?;
            let text = response.text().await?;
            let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
            Ok::<_, PublishError>(UploadedFile {
                target,
                response: body,
            })
        }
        .await;

        match result {
            Ok(uploaded) => {
                info!(
                    deposition_id = %deposition.id,
                    file = %uploaded.target.file_name,
                    "File uploaded"
                );
                Ok(uploaded)
            }
            Err(e) => {
                match e.service_message() {
                    Some(message) => error!("Error with zenodo upload: {message}"),
                    None => error!(error = %e, "Error with zenodo upload"),
                }
                Err(e)
            }
        }
    }

    async fn publish_deposition(&self, id: &DepositionId) -> Result<PublishedRecord, PublishError> {
        let url = self.config.publish_url(id.as_str());
        info!(deposition_id = %id, %url, "Publishing deposition");

        // Sent once, never replayed.
        let response = self
            .http
            .post(&url)
            .query(&[("access_token", self.token.expose())])
            .send()
            .await
            .map_err(|e| {
                let e = PublishError::from(e);
                error!(deposition_id = %id, error = %e, "Publish request failed");
                e
            })?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            let body = response.text().await.unwrap_or_default();
            error!(deposition_id = %id, %status, %body, "Publish was not accepted");
            return Err(if status.is_success() {
                PublishError::UnexpectedStatus {
                    expected: StatusCode::ACCEPTED,
                    status,
                    body,
                }
            } else {
                PublishError::from_status(status, body)
            });
        }

        let record_url = self.config.record_url(id.as_str());
        info!(deposition_id = %id, %record_url, "Deposition published");
        Ok(PublishedRecord {
            id: id.clone(),
            record_url,
            state: DepositionState::Published,
        })
    }
}
