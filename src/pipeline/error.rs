// ABOUTME: Error type shared by all pipeline stages.
// ABOUTME: Wraps the domain errors each stage can surface.

use thiserror::Error;

use crate::exec::ExecError;
use crate::prereq::MissingTool;
use crate::provision::{OutputError, ProvisionError};
use crate::render::RenderError;
use crate::verify::ProbeError;
use crate::workload::RolloutError;

/// Anything a stage can fail with. The pipeline stops at the first
/// one; nothing is swallowed or retried.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    MissingTool(#[from] MissingTool),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Rollout(#[from] RolloutError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProvisionError> for StageError {
    fn from(err: ProvisionError) -> Self {
        match err {
            ProvisionError::Exec(e) => StageError::Exec(e),
            ProvisionError::Output(e) => StageError::Output(e),
        }
    }
}
