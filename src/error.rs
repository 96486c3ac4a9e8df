//! Error taxonomy for the publish pipeline.
//!
//! [`PublishError`] describes why a single remote operation failed. [`PipelineError`]
//! tags that failure with the stage it happened in, so the caller can tell a failed
//! draft from a failed upload without inspecting payloads.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    /// Stored without the request URL, which may carry the access token.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),

    #[error("request failed with status {status}: {}", .message.as_deref().unwrap_or(.body.as_str()))]
    Status {
        status: StatusCode,
        message: Option<String>,
        body: String,
    },

    #[error("expected status {expected}, got {status}: {body}")]
    UnexpectedStatus {
        expected: StatusCode,
        status: StatusCode,
        body: String,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("cannot read `{}`: {error}", .path.display())]
    File {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("`{}` has no usable file name", .0.display())]
    InvalidFileName(PathBuf),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for PublishError {
    fn from(e: reqwest::Error) -> Self {
        PublishError::Transport(e.without_url())
    }
}

impl PublishError {
    /// Builds a [`PublishError::Status`] from a failed response body, lifting the
    /// service's `message` field when the body is JSON carrying one.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned));
        PublishError::Status {
            status,
            message,
            body,
        }
    }

    /// The service's own error message, if it sent one.
    pub fn service_message(&self) -> Option<&str> {
        match self {
            PublishError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// HTTP status carried by this error, if the service answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PublishError::Status { status, .. } => Some(*status),
            PublishError::UnexpectedStatus { status, .. } => Some(*status),
            PublishError::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// Whether another attempt could succeed.
    ///
    /// Transport failures are transient for every request. Server-side statuses
    /// (5xx, 429) only count when the request is idempotent: replaying a POST that
    /// reached the service could create a second draft.
    pub fn is_transient(&self, idempotent: bool) -> bool {
        match self {
            PublishError::Transport(e) => !e.is_builder() && !e.is_decode(),
            PublishError::Status { status, .. } => {
                idempotent
                    && (status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS)
            }
            _ => false,
        }
    }
}

/// A failed pipeline run, tagged with the stage that stopped it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("creating the draft deposition failed")]
    Create(#[source] PublishError),

    #[error("uploading the file failed")]
    Upload(#[source] PublishError),

    #[error("publishing the deposition failed")]
    Publish(#[source] PublishError),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Create(_) => "create",
            PipelineError::Upload(_) => "upload",
            PipelineError::Publish(_) => "publish",
        }
    }

    pub fn cause(&self) -> &PublishError {
        match self {
            PipelineError::Create(e) | PipelineError::Upload(e) | PipelineError::Publish(e) => e,
        }
    }
}

/// Required command-line flags that were absent or empty.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("missing required arguments: {}", .0.join(", "))]
pub struct MissingArguments(pub Vec<&'static str>);
