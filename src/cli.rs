// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "skiff")]
#[command(about = "Sequential deployment pipeline for Terraform-provisioned cloud workloads")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output for CI
    #[arg(long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// JSON-lines output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scaffold a skiff.yml configuration file
    Init {
        /// Project name
        #[arg(long)]
        project: Option<String>,

        /// Overwrite an existing skiff.yml
        #[arg(long)]
        force: bool,
    },

    /// Run the full deployment pipeline
    Deploy {
        /// Environment overrides (defined in config)
        #[arg(short, long)]
        environment: Option<String>,
    },

    /// Tear down provisioned infrastructure
    Destroy {
        /// Confirm destruction
        #[arg(long)]
        yes: bool,

        /// Environment overrides (defined in config)
        #[arg(short, long)]
        environment: Option<String>,
    },

    /// Probe the deployed health endpoint through both network paths
    Verify {
        /// Environment overrides (defined in config)
        #[arg(short, long)]
        environment: Option<String>,
    },

    /// Exercise every API route of the deployed service
    Smoke {
        /// Environment overrides (defined in config)
        #[arg(short, long)]
        environment: Option<String>,
    },
}
