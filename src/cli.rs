use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "formrelay")]
#[command(author, version, about = "Asynchronous file-conversion service with graph-routed pipelines")]
pub struct Cli {
    /// Path to config file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server with an embedded worker
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not start the embedded worker loop
        #[arg(long)]
        no_worker: bool,
    },

    /// Run a standalone worker against the configured database
    Worker {
        /// Stable identifier for this worker instance
        #[arg(long)]
        worker_id: Option<String>,
    },

    /// Convert a single local file and exit
    Convert {
        /// Input file
        #[arg(required = true)]
        input: PathBuf,

        /// Target format (e.g. stl)
        #[arg(required = true)]
        format: String,

        /// Output directory (defaults to the input's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// List supported formats and conversion pairs
    Formats,

    /// Check that required external tools are available
    CheckTools,

    /// Validate the configuration file
    Validate {
        /// Config file to validate (uses the global --config if not given)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
