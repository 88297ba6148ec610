// ABOUTME: Deploy command implementation.
// ABOUTME: Runs the full pipeline from prerequisite checks to advisory verification.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::path::PathBuf;

use crate::config::{self, Config, MaterializeOutcome};
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{Error, Result};
use crate::exec::{CommandRunner, ProcessRunner};
use crate::output::Output;
use crate::pipeline::{Runner, StageError};
use crate::prereq;
use crate::provision::{Provisioner, names};
use crate::publish::{ImagePublisher, ImageSpec};
use crate::render::{
    MANIFEST_TOKENS, ManifestSet, TOKEN_ACCOUNT_ID, TOKEN_CERTIFICATE_ARN, TOKEN_DB_HOST_B64,
    TOKEN_SECURITY_GROUP_ID, TOKEN_SUBNET_IDS, TokenMap,
};
use crate::types::Sensitive;
use crate::verify::{self, Endpoint, HttpProbe, ReqwestProbe};
use crate::workload::{self, ChartRelease, DbSecret, WorkloadDeployer};

/// The deploy pipeline's stages, in execution order.
pub const DEPLOY_STAGES: &[&str] = &[
    "prerequisites",
    "variables",
    "provision",
    "outputs",
    "render",
    "publish",
    "workload",
    "verify",
];

/// Run the full deploy pipeline with the real process and HTTP seams.
pub async fn deploy(config: Config, output: Output) -> Result<()> {
    let runner = ProcessRunner;
    let probe = ReqwestProbe::new(config.verify.probe_timeout)?;
    deploy_with(&config, &runner, &probe, output).await
}

/// Pipeline body, generic over the external seams for testing.
pub async fn deploy_with<R: CommandRunner, P: HttpProbe>(
    config: &Config,
    exec: &R,
    probe: &P,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let mut diag = Diagnostics::default();

    output.progress(&format!(
        "Deploying {} ({}) to {}",
        config.project,
        config.environment,
        config.effective_region()
    ));

    let mut pipeline = Runner::new(&output, DEPLOY_STAGES);
    let result = run_stages(config, exec, probe, &mut pipeline, &mut diag).await;
    pipeline.finish();

    // Emit collected warnings
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    if result.is_ok() {
        output.success("Deployment complete");
    }

    result
}

async fn run_stages<R: CommandRunner, P: HttpProbe>(
    config: &Config,
    exec: &R,
    probe: &P,
    pipeline: &mut Runner<'_>,
    diag: &mut Diagnostics,
) -> Result<()> {
    pipeline
        .stage("prerequisites", "Checking required tools", async {
            prereq::check(prereq::DEPLOY_TOOLS).map_err(StageError::from)
        })
        .await?;

    let variables_file = config.infra.variables_file();
    let variables_template = config.infra.variables_template();
    let outcome = pipeline
        .stage("variables", "Materializing provisioner variables", async {
            config::materialize(&variables_template, &variables_file).map_err(materialize_err)
        })
        .await?;

    if outcome == MaterializeOutcome::Created {
        pipeline.suspend(
            "variables",
            format!("fill in {} and re-run", variables_file.display()),
        );
        return Err(Error::VariablesCreated(variables_file));
    }

    // init is idempotent, plan is read-only, apply changes the world.
    // A failure anywhere here needs operator eyes, never a blind retry.
    let provisioner = Provisioner::new(exec, &config.infra.dir);
    pipeline
        .stage("provision", "Provisioning infrastructure", async {
            provisioner.init().await?;
            provisioner.plan().await?;
            provisioner.apply().await?;
            Ok::<_, StageError>(())
        })
        .await?;

    // Single extraction pass; every later stage reads from this value.
    let outputs = pipeline
        .stage("outputs", "Extracting provisioner outputs", async {
            provisioner.outputs().await.map_err(StageError::from)
        })
        .await?;

    let manifest_set = ManifestSet::new(config.manifests.clone(), config.backup_manifests);
    pipeline
        .stage("render", "Rendering workload manifests", async {
            let mut map = TokenMap::new(MANIFEST_TOKENS)?;
            map.set(TOKEN_ACCOUNT_ID, outputs.get(names::ACCOUNT_ID)?)?;
            map.set(TOKEN_CERTIFICATE_ARN, outputs.get(names::CERTIFICATE_ARN)?)?;
            map.set(
                TOKEN_SECURITY_GROUP_ID,
                outputs.get(names::SECURITY_GROUP_ID)?,
            )?;
            map.set(
                TOKEN_SUBNET_IDS,
                outputs.get_list(names::PRIVATE_SUBNET_IDS)?.join(","),
            )?;
            let endpoint = outputs.get_sensitive(names::RDS_ENDPOINT)?;
            map.set(
                TOKEN_DB_HOST_B64,
                BASE64.encode(database_host(endpoint.expose())),
            )?;
            manifest_set.render_all(&map)?;
            Ok::<_, StageError>(())
        })
        .await?;

    pipeline
        .stage("publish", "Publishing container image", async {
            let spec = ImageSpec {
                name: config.image_name(),
                repository: outputs.get(names::ECR_REPOSITORY_URL)?,
                tag: config.image.tag.clone(),
                context: config.image.context.clone(),
                region: config.effective_region(),
            };
            ImagePublisher::new(exec)
                .publish(&spec)
                .await
                .map_err(StageError::from)
        })
        .await?;

    let deployer = WorkloadDeployer::new(exec, config.workload.namespace.clone());
    let workload_name = config.workload_name();
    pipeline
        .stage("workload", "Deploying workload", async {
            workload::update_kubeconfig(
                exec,
                &config.effective_region(),
                &outputs.get(names::CLUSTER_NAME)?,
            )
            .await?;

            let endpoint = outputs.get_sensitive(names::RDS_ENDPOINT)?;
            let secret = DbSecret {
                name: config.secret_name(),
                host: Sensitive::new(database_host(endpoint.expose()).to_string()),
                database: config.database_name(),
                username: config.database_username(),
                password: config
                    .database_password()
                    .map_err(|e| StageError::Config(e.to_string()))?,
            };
            deployer.apply_secret(&secret).await?;

            match &config.workload.chart {
                Some(chart) => {
                    let release = ChartRelease {
                        chart: chart.name.clone(),
                        release: chart.release.clone().unwrap_or_else(|| workload_name.clone()),
                        values: vec![
                            (
                                "image.repository".to_string(),
                                outputs.get(names::ECR_REPOSITORY_URL)?,
                            ),
                            ("image.tag".to_string(), config.image.tag.clone()),
                            (
                                "certificate.arn".to_string(),
                                outputs.get(names::CERTIFICATE_ARN)?,
                            ),
                        ],
                    };
                    deployer.upgrade_chart(&release).await?;
                }
                None => {
                    let manifests: Vec<PathBuf> = config.manifests.iter().cloned().collect();
                    deployer.apply_manifests(&manifests).await?;
                }
            }

            deployer
                .wait_for_rollout(
                    &workload_name,
                    config.workload.replicas,
                    config.workload.rollout_timeout,
                    config.workload.poll_interval,
                )
                .await
                .map_err(StageError::from)
        })
        .await?;

    let (report, ingress_missing) = pipeline
        .stage("verify", "Probing deployed endpoints", async {
            let mut endpoints = vec![Endpoint::new(
                "edge gateway",
                outputs.get(names::API_BASE_URL)?,
            )];
            let ingress = deployer.ingress_hostname(&workload_name).await?;
            let ingress_missing = ingress.is_none();
            if let Some(host) = ingress {
                endpoints.push(Endpoint::new("load balancer", format!("http://{host}")));
            }
            let report = verify::probe_health(probe, &endpoints, &config.verify.health_path).await;
            Ok::<_, StageError>((report, ingress_missing))
        })
        .await?;

    if ingress_missing {
        diag.warn(Warning::ingress_unresolved(
            "ingress hostname not yet published; direct load-balancer path not probed",
        ));
    }

    if !report.all_passed() {
        for record in report.failed() {
            let reason = match record.status {
                Some(status) => format!("status {status}"),
                None => record
                    .detail
                    .clone()
                    .unwrap_or_else(|| "unreachable".to_string()),
            };
            diag.warn(Warning::probe_failed(format!(
                "{} probe failed ({reason}); infrastructure may still be converging",
                record.endpoint
            )));
        }
        pipeline.mark_warned(
            "verify",
            format!(
                "{} of {} probes failed",
                report.failed_count(),
                report.records.len()
            ),
        );
    }

    Ok(())
}

/// Host portion of a `host:port` database endpoint.
fn database_host(endpoint: &str) -> &str {
    endpoint.split(':').next().unwrap_or(endpoint)
}

fn materialize_err(err: Error) -> StageError {
    match err {
        Error::Io(io) => StageError::Io(io),
        other => StageError::Config(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_host_strips_port() {
        assert_eq!(database_host("db.internal:5432"), "db.internal");
        assert_eq!(database_host("db.internal"), "db.internal");
    }
}
