// ABOUTME: Command module aggregator for the skiff CLI.
// ABOUTME: Re-exports deploy, destroy, verify, and smoke command handlers.

mod deploy;
mod destroy;
mod verify;

pub use deploy::{DEPLOY_STAGES, deploy, deploy_with};
pub use destroy::{DESTROY_STAGES, destroy, destroy_with};
pub use verify::{smoke, smoke_with, verify, verify_with};
