// ABOUTME: Sequential pipeline machinery.
// ABOUTME: Exports the stage runner, trace records, and the shared stage error.

mod error;
mod runner;

pub use error::StageError;
pub use runner::{Runner, StageRecord, StageStatus};
