#![doc = "zenodo-publish: publish a dataset file to Zenodo in three remote steps."]

//! Creates a draft deposition, streams one file into its bucket and publishes the
//! record. The binary is a thin wrapper around [`cli::run`].

pub mod cli;
pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod mime;
pub mod pipeline;
pub mod retry;

pub use cli::{run, Cli};
pub use pipeline::publish_dataset;
