// ABOUTME: Ordered stage execution with a structured completion trace.
// ABOUTME: Stops at the first failure and reports per-stage status to the operator.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::error::Error;
use crate::output::Output;

use super::StageError;

/// Where a stage ended up, as shown in the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Completed,
    /// Completed, but with advisory findings attached.
    Warned,
    /// Completed by handing control back to the operator.
    Suspended,
    Failed,
    /// Never started because an earlier stage stopped the run.
    NotReached,
}

impl StageStatus {
    fn symbol(&self) -> &'static str {
        match self {
            StageStatus::Completed => "✓",
            StageStatus::Warned => "!",
            StageStatus::Suspended => "→",
            StageStatus::Failed => "✗",
            StageStatus::NotReached => "·",
        }
    }
}

/// One line of the trace.
#[derive(Debug, Clone)]
pub struct StageRecord {
    pub name: &'static str,
    pub status: StageStatus,
    pub detail: Option<String>,
    pub duration: Duration,
}

/// Runs the pipeline's stages in declared order.
///
/// Construction takes the full planned stage list so the final trace
/// can show stages that were never reached. Each stage is a future
/// returning a typed value; the first error stops the run and is
/// wrapped with the failing stage's name.
pub struct Runner<'a> {
    out: &'a Output,
    planned: &'static [&'static str],
    records: Vec<StageRecord>,
}

impl<'a> Runner<'a> {
    pub fn new(out: &'a Output, planned: &'static [&'static str]) -> Self {
        Self {
            out,
            planned,
            records: Vec::with_capacity(planned.len()),
        }
    }

    /// Run one stage to completion, recording its outcome. `label` is
    /// the operator-facing progress line; `name` keys the trace.
    pub async fn stage<T, Fut>(
        &mut self,
        name: &'static str,
        label: &str,
        fut: Fut,
    ) -> Result<T, Error>
    where
        Fut: Future<Output = Result<T, StageError>>,
    {
        self.out.progress(&format!("→ {label}..."));
        let started = Instant::now();

        match fut.await {
            Ok(value) => {
                let duration = started.elapsed();
                self.records.push(StageRecord {
                    name,
                    status: StageStatus::Completed,
                    detail: None,
                    duration,
                });
                self.out
                    .progress(&format!("  ✓ {label} ({:.1}s)", duration.as_secs_f64()));
                Ok(value)
            }
            Err(source) => {
                self.records.push(StageRecord {
                    name,
                    status: StageStatus::Failed,
                    detail: Some(source.to_string()),
                    duration: started.elapsed(),
                });
                Err(Error::Stage { stage: name, source })
            }
        }
    }

    /// Downgrade a completed stage to Warned (advisory findings).
    pub fn mark_warned(&mut self, name: &'static str, detail: impl Into<String>) {
        if let Some(record) = self.records.iter_mut().find(|r| r.name == name) {
            record.status = StageStatus::Warned;
            record.detail = Some(detail.into());
        }
    }

    /// Reclassify a completed stage as the suspension point: the run
    /// ends here so the operator can act before re-running.
    pub fn suspend(&mut self, name: &'static str, detail: impl Into<String>) {
        if let Some(record) = self.records.iter_mut().find(|r| r.name == name) {
            record.status = StageStatus::Suspended;
            record.detail = Some(detail.into());
        }
    }

    /// Fill in never-reached stages and print the trace.
    pub fn finish(mut self) -> Vec<StageRecord> {
        for name in self.planned.iter().copied() {
            if !self.records.iter().any(|r| r.name == name) {
                self.records.push(StageRecord {
                    name,
                    status: StageStatus::NotReached,
                    detail: None,
                    duration: Duration::ZERO,
                });
            }
        }

        self.out.progress("");
        self.out.progress("Pipeline trace:");
        for record in &self.records {
            match &record.detail {
                Some(detail) => self.out.progress(&format!(
                    "  {} {}: {}",
                    record.status.symbol(),
                    record.name,
                    detail
                )),
                None => self
                    .out
                    .progress(&format!("  {} {}", record.status.symbol(), record.name)),
            }
        }

        self.records
    }
}
