//! Error types for the migration pipeline.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::legacy::DecodeError;
use crate::migrate::PlanError;
use crate::store::StoreError;

/// Errors raised while reading a dump file from disk.
#[derive(Error, Debug)]
pub enum DumpError {
    #[error("Failed to read dump file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fatal errors that abort a migration run.
///
/// Per-row failures never surface here; they are counted in the report.
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error(transparent)]
    Dump(#[from] DumpError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("Store failure while {stage}")]
    Store {
        stage: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Invalid seed row: {0}")]
    Seed(#[from] DecodeError),
}

impl MigrateError {
    pub(crate) fn store(stage: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| MigrateError::Store { stage, source }
    }
}
