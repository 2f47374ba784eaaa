//! CLI command definitions.

use clap::{Subcommand, ValueEnum};
use kiln_core::{EventKind, Platform};

#[derive(Subcommand)]
pub enum Commands {
    /// Run the whole pipeline for one trigger event
    ///
    /// Cargo only builds for the host, so jobs for other platforms fail here;
    /// split runners use `check`, `release` and `publish` instead.
    Run {
        /// Event kind (push, pull_request, tag); read from CI when omitted
        #[arg(long)]
        event: Option<EventKind>,

        /// Git ref of the event, e.g. refs/tags/v1.2.0
        #[arg(long = "ref")]
        git_ref: Option<String>,

        /// Log the uploads instead of performing them
        #[arg(long)]
        dry_run: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Show which stages an event would run
    Gate {
        #[arg(long)]
        event: Option<EventKind>,

        #[arg(long = "ref")]
        git_ref: Option<String>,
    },

    /// Print the release matrix
    Matrix {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Print the job graph in execution order
    Plan,

    /// Run one platform's check job on a runner of that platform
    Check {
        #[arg(long)]
        platform: Platform,
    },

    /// Build, shrink and package one platform's release archive
    Release {
        #[arg(long)]
        platform: Platform,
    },

    /// Attach the archives in the output directory to a tag's release
    Publish {
        /// Release tag, e.g. v1.2.0
        #[arg(long)]
        tag: String,

        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}
