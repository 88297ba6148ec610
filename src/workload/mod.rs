// ABOUTME: Applies workload objects to the cluster and waits for rollout.
// ABOUTME: Secrets are re-applied declaratively so pipeline re-runs stay idempotent.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::exec::{CommandRunner, ExecError, ExecRequest};
use crate::types::Sensitive;

#[derive(Debug, Error)]
pub enum RolloutError {
    #[error(
        "rollout of '{name}' timed out after {timeout_secs} seconds: {ready} of {desired} replicas ready"
    )]
    Timeout {
        name: String,
        ready: u32,
        desired: u32,
        timeout_secs: u64,
    },

    #[error("unexpected kubectl output for '{name}': {detail}")]
    Malformed { name: String, detail: String },

    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Point the local cluster context at the provisioned control plane.
/// Runs before any object is applied; without it the cluster tooling
/// still targets whatever context was active last.
pub async fn update_kubeconfig<R: CommandRunner>(
    runner: &R,
    region: &str,
    cluster: &str,
) -> Result<(), ExecError> {
    let request = ExecRequest::new(
        "aws",
        &["eks", "update-kubeconfig", "--region", region, "--name", cluster],
    );
    runner.run(&request).await?.require_success(&request)?;
    Ok(())
}

/// Connection material for the workload's database secret.
///
/// Host and password are redacted wherever this struct is formatted.
#[derive(Debug, Clone)]
pub struct DbSecret {
    pub name: String,
    pub host: Sensitive<String>,
    pub database: String,
    pub username: String,
    pub password: Sensitive<String>,
}

/// A chart install with its values overlay, used instead of raw
/// manifests when the config names a chart.
#[derive(Debug, Clone)]
pub struct ChartRelease {
    pub chart: String,
    pub release: String,
    /// `--set key=value` pairs (image repository/tag, role binding,
    /// certificate reference).
    pub values: Vec<(String, String)>,
}

pub struct WorkloadDeployer<'a, R: CommandRunner> {
    runner: &'a R,
    namespace: String,
}

impl<'a, R: CommandRunner> WorkloadDeployer<'a, R> {
    pub fn new(runner: &'a R, namespace: impl Into<String>) -> Self {
        Self {
            runner,
            namespace: namespace.into(),
        }
    }

    /// Create-or-replace the database secret. The object is rendered
    /// client-side and piped through `apply`, so re-running replaces
    /// rather than conflicts.
    pub async fn apply_secret(&self, secret: &DbSecret) -> Result<(), ExecError> {
        let host = format!("--from-literal=DB_HOST={}", secret.host.expose());
        let database = format!("--from-literal=DB_NAME={}", secret.database);
        let username = format!("--from-literal=DB_USERNAME={}", secret.username);
        let password = format!("--from-literal=DB_PASSWORD={}", secret.password.expose());

        let render = ExecRequest::new(
            "kubectl",
            &[
                "create",
                "secret",
                "generic",
                &secret.name,
                "-n",
                &self.namespace,
                &host,
                &database,
                &username,
                &password,
                "--dry-run=client",
                "-o",
                "yaml",
            ],
        )
        .redacted();
        let rendered = self.runner.run(&render).await?.require_success(&render)?;

        let apply = ExecRequest::new("kubectl", &["apply", "-n", &self.namespace, "-f", "-"])
            .with_stdin(rendered.stdout.into_bytes());
        self.runner.run(&apply).await?.require_success(&apply)?;
        Ok(())
    }

    /// Apply rendered manifest files in order.
    pub async fn apply_manifests(&self, paths: &[PathBuf]) -> Result<(), ExecError> {
        for path in paths {
            let path = path.display().to_string();
            let request =
                ExecRequest::new("kubectl", &["apply", "-n", &self.namespace, "-f", &path])
                    .streamed();
            self.runner.run(&request).await?.require_success(&request)?;
        }
        Ok(())
    }

    /// Install or upgrade the chart release with its values overlay.
    pub async fn upgrade_chart(&self, release: &ChartRelease) -> Result<(), ExecError> {
        let mut args: Vec<String> = vec![
            "upgrade".to_string(),
            "--install".to_string(),
            release.release.clone(),
            release.chart.clone(),
            "-n".to_string(),
            self.namespace.clone(),
        ];
        for (key, value) in &release.values {
            args.push("--set".to_string());
            args.push(format!("{key}={value}"));
        }

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let request = ExecRequest::new("helm", &arg_refs).streamed();
        self.runner.run(&request).await?.require_success(&request)?;
        Ok(())
    }

    /// Block until `desired` replicas report ready or the timeout
    /// elapses. The previous release keeps serving on timeout; rolling
    /// back is an explicit operator action, never automatic.
    pub async fn wait_for_rollout(
        &self,
        name: &str,
        desired: u32,
        timeout: Duration,
        interval: Duration,
    ) -> Result<(), RolloutError> {
        let start = Instant::now();

        loop {
            let ready = self.ready_replicas(name).await?;
            if ready >= desired {
                tracing::debug!("{name}: {ready}/{desired} replicas ready");
                return Ok(());
            }

            if start.elapsed() >= timeout {
                return Err(RolloutError::Timeout {
                    name: name.to_string(),
                    ready,
                    desired,
                    timeout_secs: timeout.as_secs(),
                });
            }

            tracing::debug!("{name}: {ready}/{desired} replicas ready, waiting");
            tokio::time::sleep(interval).await;
        }
    }

    async fn ready_replicas(&self, name: &str) -> Result<u32, RolloutError> {
        let request = ExecRequest::new(
            "kubectl",
            &[
                "get",
                "deployment",
                name,
                "-n",
                &self.namespace,
                "-o",
                "json",
            ],
        );
        let output = self.runner.run(&request).await?.require_success(&request)?;

        let doc: DeploymentDoc =
            serde_json::from_str(&output.stdout).map_err(|e| RolloutError::Malformed {
                name: name.to_string(),
                detail: e.to_string(),
            })?;
        Ok(doc.status.ready_replicas)
    }

    /// The hostname the ingress controller published for the workload,
    /// if any. Absent while the load balancer is still provisioning.
    pub async fn ingress_hostname(&self, name: &str) -> Result<Option<String>, RolloutError> {
        let request = ExecRequest::new(
            "kubectl",
            &["get", "ingress", name, "-n", &self.namespace, "-o", "json"],
        );
        let output = self.runner.run(&request).await?.require_success(&request)?;

        let doc: serde_json::Value =
            serde_json::from_str(&output.stdout).map_err(|e| RolloutError::Malformed {
                name: name.to_string(),
                detail: e.to_string(),
            })?;

        Ok(doc
            .pointer("/status/loadBalancer/ingress/0/hostname")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string))
    }
}

#[derive(Debug, Deserialize)]
struct DeploymentDoc {
    #[serde(default)]
    status: DeploymentStatus,
}

#[derive(Debug, Deserialize, Default)]
struct DeploymentStatus {
    #[serde(rename = "readyReplicas", default)]
    ready_replicas: u32,
}
