use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "slsc",
    version,
    about = "Short-Lag Spatial Coherence (SLSC) imaging command-line tool",
    long_about = "Compute SLSC images from interleaved plane-wave RF acquisitions.\n\
                  A run is described by a JSON configuration (probe, acquisition, field, slsc)\n\
                  and a raw file of little-endian i16 samples ordered rot, steer, ele, t."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compute the SLSC image of one rotation
    Run(RunArgs),
    /// Export transmit and receive delay tables
    Delays(DelaysArgs),
    /// Check a configuration against a raw data file
    Validate(ValidateArgs),
    /// Show version and runtime information
    Info(InfoArgs),
    /// Process every raw file matching a glob pattern
    Batch(BatchArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Run configuration (JSON)
    #[arg(long, env = "SLSC_CONFIG")]
    pub config: String,

    /// Raw acquisition file
    #[arg(long)]
    pub data: String,

    /// Rotation index to process
    #[arg(long, default_value_t = 0)]
    pub rotation: usize,

    /// Interpolation override (linear, cubic)
    #[arg(long)]
    pub interpolation: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct DelaysArgs {
    /// Run configuration (JSON)
    #[arg(long, env = "SLSC_CONFIG")]
    pub config: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Run configuration (JSON)
    #[arg(long, env = "SLSC_CONFIG")]
    pub config: String,

    /// Raw acquisition file
    #[arg(long)]
    pub data: String,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct InfoArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct BatchArgs {
    /// Run configuration shared by every file (JSON)
    #[arg(long, env = "SLSC_CONFIG")]
    pub config: String,

    /// Glob pattern selecting raw files (e.g. "data/*.bin")
    #[arg(long)]
    pub pattern: String,

    /// Rotation index to process
    #[arg(long, default_value_t = 0)]
    pub rotation: usize,

    /// Write one result per input here instead of JSONL on stdout
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Keep going after a failed file
    #[arg(long, default_value_t = false)]
    pub continue_on_error: bool,

    /// List matching files without processing them
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}
