//! # Command line
//!
//! This module implements the CLI interface for zenodo-publish: flag parsing, argument
//! validation, configuration resolution and the async [`run`] entrypoint.
//!
//! The remote work lives in [`crate::client`] and the sequencing in
//! [`crate::pipeline`]; this module is glue.
//!
//! ## How To Use
//! - From a shell: `zenodo-publish --recordName <name> --fileToUpload <path> --accessToken <token>`.
//! - Programmatically and in integration tests: build a [`Cli`] and call [`run`].
//!
//! Standard output carries only the usage line (on missing flags) or the published
//! record URL. Diagnostics go through `tracing` to standard error.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::client::ZenodoClient;
use crate::config::PublishConfig;
use crate::contract::{AccessToken, DepositionMetadata, PublishRequest, PublishedRecord};
use crate::error::MissingArguments;
use crate::pipeline::publish_dataset;
use crate::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};

pub const USAGE: &str = "Usage: zenodo-publish --recordName <recordName> --fileToUpload <fileToUpload> --accessToken <accessToken> [--recordDescription <recordDescription>] [--recordCreator <recordCreator>]";

/// CLI for zenodo-publish: create a Zenodo draft, upload one file, publish it.
#[derive(Parser, Debug, Default)]
#[clap(
    name = "zenodo-publish",
    version,
    about = "Publish a dataset file to Zenodo as a new record"
)]
pub struct Cli {
    /// Title of the new record
    #[clap(long = "recordName")]
    pub record_name: Option<String>,

    /// Local file to upload into the record
    #[clap(long = "fileToUpload")]
    pub file_to_upload: Option<PathBuf>,

    /// Zenodo personal access token
    #[clap(long = "accessToken", env = "ZENODO_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Record description
    #[clap(long = "recordDescription")]
    pub record_description: Option<String>,

    /// Creator name, e.g. "Doe, Jane"
    #[clap(long = "recordCreator")]
    pub record_creator: Option<String>,

    /// Repository base URL
    #[clap(long = "baseUrl", env = "ZENODO_BASE_URL")]
    pub base_url: Option<String>,

    /// Publish to sandbox.zenodo.org instead of zenodo.org
    #[clap(long)]
    pub sandbox: bool,

    /// Attempts per request before giving up on transient failures
    #[clap(long = "maxAttempts", env = "ZENODO_MAX_ATTEMPTS")]
    pub max_attempts: Option<u32>,
}

/// Flags that passed validation.
#[derive(Debug)]
pub struct ValidatedArgs {
    pub request: PublishRequest,
    pub token: AccessToken,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Cli {
    /// Checks the three required flags. Empty values count as missing.
    pub fn validate(&self) -> Result<ValidatedArgs, MissingArguments> {
        let title = present(self.record_name.clone());
        let file = self
            .file_to_upload
            .clone()
            .filter(|p| !p.as_os_str().is_empty());
        let token = present(self.access_token.clone());

        let mut missing = Vec::new();
        if title.is_none() {
            missing.push("--recordName");
        }
        if file.is_none() {
            missing.push("--fileToUpload");
        }
        if token.is_none() {
            missing.push("--accessToken");
        }

        match (title, file, token) {
            (Some(title), Some(file), Some(token)) => Ok(ValidatedArgs {
                request: PublishRequest {
                    metadata: DepositionMetadata {
                        title,
                        description: self.record_description.clone(),
                        creator: self.record_creator.clone(),
                    },
                    file,
                },
                token: AccessToken::new(token),
            }),
            _ => Err(MissingArguments(missing)),
        }
    }

    pub fn publish_config(&self) -> Result<PublishConfig> {
        let retry = RetryPolicy::default()
            .with_max_attempts(self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS));
        PublishConfig::resolve(self.base_url.as_deref(), self.sandbox, retry)
            .context("Invalid repository configuration")
    }
}

/// Async CLI entrypoint for integration tests and main().
///
/// On missing flags the usage line is printed and nothing touches the network.
/// On success the record URL is printed and returned.
pub async fn run(cli: Cli) -> Result<PublishedRecord> {
    tracing::info!("trace_initialised");

    let args = match cli.validate() {
        Ok(args) => args,
        Err(missing) => {
            println!("{USAGE}");
            tracing::error!(error = %missing, "Required arguments missing, nothing sent");
            return Err(missing.into());
        }
    };
    run_with_config(cli.publish_config()?, args).await
}

/// Runs the pipeline against an explicit configuration.
pub async fn run_with_config(config: PublishConfig, args: ValidatedArgs) -> Result<PublishedRecord> {
    let client = ZenodoClient::new(config, args.token).context("Failed to build HTTP client")?;

    match publish_dataset(&client, &args.request).await {
        Ok(record) => {
            println!("{}", record.record_url);
            tracing::info!(command = "publish", record_url = %record.record_url, "Publish complete");
            Ok(record)
        }
        Err(e) => {
            tracing::error!(command = "publish", stage = e.stage(), error = %e.cause(), "Publish failed");
            Err(e.into())
        }
    }
}
