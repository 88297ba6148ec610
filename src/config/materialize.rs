// ABOUTME: Materializes the provisioner variables file from its template.
// ABOUTME: Copying is byte-exact; an existing target is left untouched.

use std::path::Path;

use crate::error::{Error, Result};

/// What happened when the variables file was materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeOutcome {
    /// The target did not exist; the template was copied in. The
    /// pipeline must suspend so the operator can fill in values.
    Created,
    /// The target was already present. Contents are not re-validated;
    /// a stale file flows through to the provisioner unchecked.
    AlreadyPresent,
}

/// Ensure the variables file exists, copying the template when absent.
pub fn materialize(template: &Path, target: &Path) -> Result<MaterializeOutcome> {
    if target.exists() {
        return Ok(MaterializeOutcome::AlreadyPresent);
    }

    if !template.exists() {
        return Err(Error::ConfigNotFound(template.to_path_buf()));
    }

    std::fs::copy(template, target)?;
    tracing::info!(
        "created {} from {}",
        target.display(),
        template.display()
    );

    Ok(MaterializeOutcome::Created)
}
