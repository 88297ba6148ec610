// ABOUTME: Destroy command implementation.
// ABOUTME: Explicit teardown entry point; never invoked by the deploy pipeline.

use crate::config::Config;
use crate::error::Result;
use crate::exec::{CommandRunner, ProcessRunner};
use crate::output::Output;
use crate::pipeline::{Runner, StageError};
use crate::prereq;
use crate::provision::Provisioner;

pub const DESTROY_STAGES: &[&str] = &["prerequisites", "destroy"];

pub async fn destroy(config: Config, output: Output) -> Result<()> {
    let runner = ProcessRunner;
    destroy_with(&config, &runner, output).await
}

pub async fn destroy_with<R: CommandRunner>(
    config: &Config,
    exec: &R,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    output.progress(&format!(
        "Destroying infrastructure for {} ({})",
        config.project, config.environment
    ));

    let mut pipeline = Runner::new(&output, DESTROY_STAGES);
    let result = run_stages(config, exec, &mut pipeline).await;
    pipeline.finish();

    if result.is_ok() {
        output.success("Destroy complete");
    }

    result
}

async fn run_stages<R: CommandRunner>(
    config: &Config,
    exec: &R,
    pipeline: &mut Runner<'_>,
) -> Result<()> {
    pipeline
        .stage("prerequisites", "Checking required tools", async {
            prereq::check(prereq::DESTROY_TOOLS).map_err(StageError::from)
        })
        .await?;

    let provisioner = Provisioner::new(exec, &config.infra.dir);
    pipeline
        .stage("destroy", "Destroying provisioned infrastructure", async {
            provisioner.destroy().await.map_err(StageError::from)
        })
        .await?;

    Ok(())
}
