// ABOUTME: Standalone verify and smoke commands.
// ABOUTME: Derive endpoint URLs from provisioner outputs at run time; read-only.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::exec::{CommandRunner, ProcessRunner};
use crate::output::Output;
use crate::prereq;
use crate::provision::{Outputs, Provisioner, names};
use crate::verify::smoke::{self, SmokeConfig};
use crate::verify::{self, Endpoint, HttpProbe, ReqwestProbe};

pub async fn verify(config: Config, output: Output) -> Result<()> {
    let runner = ProcessRunner;
    let probe = ReqwestProbe::new(config.verify.probe_timeout)?;
    verify_with(&config, &runner, &probe, output).await
}

/// Probe the health endpoint through the edge gateway (plus the custom
/// domain when one is configured) and the direct load-balancer path.
/// Every address comes from provisioner outputs, so this runs against
/// whatever is currently provisioned. Unlike the deploy pipeline's
/// advisory verify stage, this command exits non-zero when any probe
/// fails.
pub async fn verify_with<R: CommandRunner, P: HttpProbe>(
    config: &Config,
    exec: &R,
    probe: &P,
    output: Output,
) -> Result<()> {
    prereq::check(prereq::VERIFY_TOOLS)?;

    let outputs = extract_outputs(config, exec).await?;

    let mut endpoints = vec![Endpoint::new(
        "edge gateway",
        outputs.get(names::API_BASE_URL)?,
    )];
    if config.domain.is_some() {
        endpoints.push(Endpoint::new(
            "custom domain",
            outputs.get(names::API_CUSTOM_DOMAIN_URL)?,
        ));
    }
    endpoints.push(Endpoint::new(
        "load balancer",
        format!("http://{}", outputs.get(names::ALB_DNS_NAME)?),
    ));

    let report = verify::probe_health(probe, &endpoints, &config.verify.health_path).await;

    for record in &report.records {
        let status = record
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unreachable".to_string());
        let symbol = if record.passed { "✓" } else { "✗" };
        output.progress(&format!(
            "  {symbol} {} ({status}) {}",
            record.endpoint, record.url
        ));
    }

    if report.all_passed() {
        output.success("All probes passed");
        Ok(())
    } else {
        Err(Error::VerificationFailed {
            failed: report.failed_count(),
            total: report.records.len(),
        })
    }
}

pub async fn smoke(config: Config, output: Output) -> Result<()> {
    let runner = ProcessRunner;
    let probe = ReqwestProbe::new(config.verify.probe_timeout)?;
    smoke_with(&config, &runner, &probe, output).await
}

/// Exercise every API route and print a per-call summary.
pub async fn smoke_with<R: CommandRunner, P: HttpProbe>(
    config: &Config,
    exec: &R,
    probe: &P,
    output: Output,
) -> Result<()> {
    prereq::check(prereq::SMOKE_TOOLS)?;

    let outputs = extract_outputs(config, exec).await?;
    let smoke_config = SmokeConfig {
        base_url: outputs.get(names::API_BASE_URL)?,
        api_key: outputs.get_sensitive(names::API_KEY)?,
        burst_requests: config.verify.burst_requests,
    };

    output.progress(&format!("Smoke testing {}", smoke_config.base_url));
    let report = smoke::run(probe, &smoke_config).await;

    for check in &report.checks {
        let symbol = if !check.passed {
            "✗"
        } else if check.informational {
            "·"
        } else {
            "✓"
        };
        output.progress(&format!("  {symbol} {}: {}", check.name, check.detail));
    }

    if report.all_passed() {
        output.success("Smoke test passed");
        Ok(())
    } else {
        Err(Error::SmokeFailed {
            failed: report.failed_count(),
            total: report.total_counted(),
        })
    }
}

async fn extract_outputs<R: CommandRunner>(config: &Config, exec: &R) -> Result<Outputs> {
    Provisioner::new(exec, &config.infra.dir)
        .outputs()
        .await
        .map_err(Error::from)
}
