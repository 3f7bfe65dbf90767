use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use easel_core::models::InterventionStatus;

#[derive(Parser)]
#[command(name = "easel")]
#[command(about = "Analyze and resolve collaborative canvas conflicts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local audit database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recommend a resolution strategy for each conflict in a file
    Analyze {
        /// JSON file with one conflict or an array of conflicts (`-` for stdin)
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve each conflict in a file and record the audit trail
    Resolve {
        /// JSON file with one conflict or an array of conflicts (`-` for stdin)
        file: PathBuf,
        /// Workspace recorded with every audit entry
        #[arg(long)]
        workspace: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Read newline-delimited conflicts from stdin and resolve them in the
    /// background until EOF or Ctrl-C
    Run {
        /// Workspace recorded with every audit entry
        #[arg(long)]
        workspace: Option<String>,
    },
    /// Show conflict analytics from the audit log
    Analytics {
        /// Restrict to one workspace
        #[arg(long)]
        workspace: Option<String>,
        /// Start of the window (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,
        /// End of the window (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        until: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List manual intervention requests
    Interventions {
        /// Only show requests with this status
        #[arg(long, value_enum)]
        status: Option<StatusFilter>,
        /// Number of requests to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    Pending,
    Resolved,
    Expired,
}

impl From<StatusFilter> for InterventionStatus {
    fn from(value: StatusFilter) -> Self {
        match value {
            StatusFilter::Pending => Self::Pending,
            StatusFilter::Resolved => Self::Resolved,
            StatusFilter::Expired => Self::Expired,
        }
    }
}
