// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands, their arguments, and global output flags.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dbcutover")]
#[command(about = "Zero-downtime database instance updates through blue/green deployments")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print warnings, errors and the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Emit JSON lines for scripting
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new dbcutover.yml configuration file
    Init {
        /// Identifier of the database instance
        #[arg(short, long)]
        instance: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the changes and the strategy an update would use
    Plan,

    /// Run the update against a simulated control plane
    Rehearse {
        /// Use the configured wait settings instead of compressed ones
        #[arg(long)]
        realtime: bool,
    },
}
