// ABOUTME: Diagnostics accumulator for non-fatal warnings during a pipeline run.
// ABOUTME: Collects findings that shouldn't fail the run but must reach the operator.

/// Collects non-fatal warnings during pipeline operations.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during a pipeline run.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// An advisory health probe did not pass.
    pub fn probe_failed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ProbeFailed,
            message: message.into(),
        }
    }

    /// The ingress hostname could not be resolved, so the direct
    /// load-balancer path was not probed.
    pub fn ingress_unresolved(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::IngressUnresolved,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A health probe returned non-2xx or was unreachable (advisory).
    ProbeFailed,
    /// Ingress hostname not yet published; direct probe skipped.
    IngressUnresolved,
}
