//! # contract: the three remote operations behind one seam
//!
//! This module holds the plain data passed between stages and the [`DepositClient`]
//! trait that performs them. The HTTP implementation lives in
//! [`crate::client::ZenodoClient`]; the pipeline only ever sees the trait, so tests
//! can swap in the `mockall`-generated `MockDepositClient`.
//!
//! Nothing here is persisted. Each stage hands the next one only the fields it
//! needs: the deposition id and bucket after creation, the id alone after upload.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::PublishError;

/// Repository access token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        AccessToken(token.into())
    }

    /// Raw value, for building request credentials only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// User-supplied record metadata, passed through as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositionMetadata {
    pub title: String,
    pub description: Option<String>,
    pub creator: Option<String>,
}

/// Request body for creating a draft: `{"metadata": {...}}`.
#[derive(Debug, Serialize)]
pub struct NewDeposition<'a> {
    pub metadata: NewDepositionMetadata<'a>,
}

#[derive(Debug, Serialize)]
pub struct NewDepositionMetadata<'a> {
    pub title: &'a str,
    pub upload_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creators: Option<Vec<Creator<'a>>>,
}

#[derive(Debug, Serialize)]
pub struct Creator<'a> {
    pub name: &'a str,
}

impl<'a> From<&'a DepositionMetadata> for NewDeposition<'a> {
    fn from(meta: &'a DepositionMetadata) -> Self {
        NewDeposition {
            metadata: NewDepositionMetadata {
                title: &meta.title,
                upload_type: "dataset",
                description: meta.description.as_deref(),
                creators: meta
                    .creator
                    .as_deref()
                    .map(|name| vec![Creator { name }]),
            },
        }
    }
}

/// Identifier issued by the repository. Zenodo sends a number; strings are
/// accepted too and kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "RawDepositionId")]
pub struct DepositionId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDepositionId {
    Number(u64),
    Text(String),
}

impl From<RawDepositionId> for DepositionId {
    fn from(raw: RawDepositionId) -> Self {
        match raw {
            RawDepositionId::Number(n) => DepositionId(n.to_string()),
            RawDepositionId::Text(s) => DepositionId(s),
        }
    }
}

impl DepositionId {
    pub fn new(id: impl Into<String>) -> Self {
        DepositionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DepositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositionState {
    Draft,
    Published,
}

/// A draft returned by the creator: all the uploader needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deposition {
    pub id: DepositionId,
    pub bucket_url: String,
    pub state: DepositionState,
}

/// Where and how a file is sent. Derived per invocation, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub url: String,
    pub file_name: String,
    pub content_type: String,
    pub content_length: u64,
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub target: UploadTarget,
    /// Response body from the bucket endpoint.
    pub response: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedRecord {
    pub id: DepositionId,
    pub record_url: String,
    pub state: DepositionState,
}

/// Validated input for one pipeline run.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub metadata: DepositionMetadata,
    pub file: PathBuf,
}

/// The three remote operations of a publish run.
///
/// Implementations own transport, credentials and retries; every failure comes
/// back as a [`PublishError`] and never escapes as a panic.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DepositClient: Send + Sync {
    /// Create a draft deposition. Not idempotent: each call creates a new draft.
    async fn create_deposition(
        &self,
        metadata: &DepositionMetadata,
    ) -> Result<Deposition, PublishError>;

    /// Stream `file` into the draft's bucket as `<bucket>/<file base name>`.
    async fn upload_file(
        &self,
        deposition: &Deposition,
        file: &Path,
    ) -> Result<UploadedFile, PublishError>;

    /// Publish the draft. Only HTTP 202 counts as success.
    async fn publish_deposition(
        &self,
        id: &DepositionId,
    ) -> Result<PublishedRecord, PublishError>;
}
