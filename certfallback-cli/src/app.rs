use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// certfallback - last-resort certificate-validation fallback patching
#[derive(Debug, Parser)]
#[command(name = "certfallback", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the classification rules in evaluation order.
    Rules,

    /// Replay a recorded validation failure and show what would be patched.
    Replay {
        /// Path to the scenario JSON file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Only intercept the generic certificate error (plus the scenario's own class).
        #[arg(long)]
        minimal: bool,
    },
}
