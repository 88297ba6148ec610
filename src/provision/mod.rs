// ABOUTME: Wraps the declarative-infrastructure tool's init/plan/apply/destroy lifecycle.
// ABOUTME: Every operation runs in the configured directory and is never auto-retried.

mod outputs;

pub use outputs::{OutputError, Outputs, names};

use std::path::{Path, PathBuf};

use crate::exec::{CommandRunner, ExecError, ExecRequest};

/// Drives `terraform` in a fixed working directory.
///
/// `init` is idempotent and `plan` is side-effect-free; `apply` and
/// `destroy` change real infrastructure. A failed apply is left for
/// the operator: partial infrastructure changes are unsafe to retry
/// blindly, so nothing here retries anything.
pub struct Provisioner<'a, R: CommandRunner> {
    runner: &'a R,
    dir: PathBuf,
}

impl<'a, R: CommandRunner> Provisioner<'a, R> {
    pub fn new(runner: &'a R, dir: &Path) -> Self {
        Self {
            runner,
            dir: dir.to_path_buf(),
        }
    }

    pub async fn init(&self) -> Result<(), ExecError> {
        self.run_streamed(&["init", "-input=false"]).await
    }

    pub async fn plan(&self) -> Result<(), ExecError> {
        self.run_streamed(&["plan", "-input=false"]).await
    }

    pub async fn apply(&self) -> Result<(), ExecError> {
        self.run_streamed(&["apply", "-input=false", "-auto-approve"])
            .await
    }

    pub async fn destroy(&self) -> Result<(), ExecError> {
        self.run_streamed(&["destroy", "-auto-approve"]).await
    }

    /// Single extraction pass over the provisioner's output table.
    pub async fn outputs(&self) -> Result<Outputs, ProvisionError> {
        let request = ExecRequest::new("terraform", &["output", "-json"]).in_dir(&self.dir);
        let output = self
            .runner
            .run(&request)
            .await?
            .require_success(&request)?;
        Outputs::from_json(&output.stdout).map_err(ProvisionError::from)
    }

    async fn run_streamed(&self, args: &[&str]) -> Result<(), ExecError> {
        let request = ExecRequest::new("terraform", args)
            .in_dir(&self.dir)
            .streamed();
        self.runner.run(&request).await?.require_success(&request)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Output(#[from] OutputError),
}
