// ABOUTME: Application-wide error types for skiff.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::exec::ExecError;
use crate::pipeline::StageError;
use crate::prereq::MissingTool;
use crate::provision::{OutputError, ProvisionError};
use crate::verify::ProbeError;
use crate::workload::RolloutError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("stage '{stage}' failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: StageError,
    },

    #[error(
        "variables file created at {0}; fill in the values, then re-run `skiff deploy`"
    )]
    VariablesCreated(PathBuf),

    #[error("refusing to destroy infrastructure without --yes")]
    DestroyNotConfirmed,

    #[error("verification failed: {failed} of {total} probes did not pass")]
    VerificationFailed { failed: usize, total: usize },

    #[error("smoke test failed: {failed} of {total} checks did not pass")]
    SmokeFailed { failed: usize, total: usize },

    #[error(transparent)]
    MissingTool(#[from] MissingTool),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Rollout(#[from] RolloutError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<ProvisionError> for Error {
    fn from(err: ProvisionError) -> Self {
        match err {
            ProvisionError::Exec(e) => Error::Exec(e),
            ProvisionError::Output(e) => Error::Output(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
