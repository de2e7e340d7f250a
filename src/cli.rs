//! CLI command definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Warden - declarative access-control reconciler
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(version)]
#[command(about = "Reconciles declared access-control entities against a live cluster")]
#[command(
    long_about = "Warden compiles schema namespaces into a typed entity model, \
diffs expected state against current state, and applies the resulting plan in \
dependency order."
)]
pub struct Cli {
    /// Directory containing schema namespace documents (<namespace>.yaml)
    #[arg(short, long, default_value = "schemas")]
    pub schema_dir: PathBuf,

    /// Namespaces to compile, in load order
    #[arg(short, long, default_value = "access")]
    pub namespaces: Vec<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile the entity model and print kinds, fields and apply order
    Check {
        /// Show per-field detail for every kind
        #[arg(short, long, default_value_t = false)]
        detailed: bool,
    },

    /// Run the full controller pipeline against in-memory state
    Run {
        /// JSON file with expected entities, keyed by kind
        #[arg(short, long)]
        expected: PathBuf,

        /// JSON file seeding the in-memory current state; empty if omitted
        #[arg(short, long)]
        current: Option<PathBuf>,

        /// Quiescence window in milliseconds
        #[arg(short, long, default_value_t = 2000)]
        quiescence_ms: u64,

        /// Include secret-bearing fields in content comparison
        #[arg(long, default_value_t = false)]
        compare_secrets: bool,
    },

    /// Diff expected state against current state, offline
    Plan {
        /// JSON file with expected entities, keyed by kind
        #[arg(short, long)]
        expected: PathBuf,

        /// JSON file with current entities, keyed by kind; empty cluster if omitted
        #[arg(short, long)]
        current: Option<PathBuf>,

        /// Include secret-bearing fields in content comparison
        #[arg(long, default_value_t = false)]
        compare_secrets: bool,
    },
}
