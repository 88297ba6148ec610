// ABOUTME: Verifies required external tools resolve on PATH before any stage runs.
// ABOUTME: Fails fast naming exactly the first missing tool.

use thiserror::Error;

/// Tools the full deploy pipeline shells out to.
pub const DEPLOY_TOOLS: &[&str] = &["terraform", "aws", "docker", "kubectl", "helm"];

/// Tools needed to read provisioner outputs; endpoint URLs for
/// verification come entirely from those outputs.
pub const VERIFY_TOOLS: &[&str] = &["terraform"];

/// Tools needed for teardown.
pub const DESTROY_TOOLS: &[&str] = &["terraform"];

/// Tools needed to run the smoke suite (endpoint URLs come from
/// provisioner outputs).
pub const SMOKE_TOOLS: &[&str] = &["terraform"];

#[derive(Debug, Error)]
#[error("required tool not found on PATH: {0}")]
pub struct MissingTool(pub String);

/// Confirm every listed tool is callable. Returns on the first miss;
/// no partial execution follows a failed check.
pub fn check(tools: &[&str]) -> Result<(), MissingTool> {
    for tool in tools {
        match which::which(tool) {
            Ok(path) => tracing::debug!("found {} at {}", tool, path.display()),
            Err(_) => return Err(MissingTool((*tool).to_string())),
        }
    }
    Ok(())
}
