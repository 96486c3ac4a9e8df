//! High-level pipeline: create draft → upload file → publish record.
//!
//! # Responsibilities
//! - Strict sequencing: each stage consumes the previous stage's output
//! - Fail-fast: a failed stage stops the run, later stages are never invoked
//! - Stage-tagged errors ([`PipelineError`]) instead of sentinel payloads
//!
//! # Callable From
//! - The CLI ([`crate::cli::run`]) with a [`ZenodoClient`](crate::client::ZenodoClient)
//! - Tests with `MockDepositClient` or a fake HTTP service
//!
//! The pipeline is not idempotent: every run creates a new draft.

use tracing::{error, info, info_span, Instrument};

use crate::contract::{DepositClient, PublishRequest, PublishedRecord};
use crate::error::PipelineError;

pub async fn publish_dataset<C>(
    client: &C,
    request: &PublishRequest,
) -> Result<PublishedRecord, PipelineError>
where
    C: DepositClient + ?Sized,
{
    let span = info_span!("publish_dataset", title = %request.metadata.title);
    async {
        info!(file = %request.file.display(), "[PUBLISH] Starting publish pipeline");

        // --- Step 1: Create draft ---
        let deposition = client
            .create_deposition(&request.metadata)
            .await
            .map_err(|e| {
                error!(error = %e, "[PUBLISH][ERROR] Draft creation failed, nothing uploaded");
                PipelineError::Create(e)
            })?;
        info!(deposition_id = %deposition.id, "[PUBLISH] Draft created");

        // --- Step 2: Upload ---
        let uploaded = client
            .upload_file(&deposition, &request.file)
            .await
            .map_err(|e| {
                error!(
                    deposition_id = %deposition.id,
                    error = %e,
                    "[PUBLISH][ERROR] Upload failed, draft left unpublished"
                );
                PipelineError::Upload(e)
            })?;
        info!(
            deposition_id = %deposition.id,
            file = %uploaded.target.file_name,
            bytes = uploaded.target.content_length,
            "[PUBLISH] Upload succeeded"
        );

        // --- Step 3: Publish ---
        let record = client
            .publish_deposition(&deposition.id)
            .await
            .map_err(|e| {
                error!(deposition_id = %deposition.id, error = %e, "[PUBLISH][ERROR] Publish failed");
                PipelineError::Publish(e)
            })?;
        info!(record_url = %record.record_url, "[PUBLISH] Record published");
        Ok(record)
    }
    .instrument(span)
    .await
}
