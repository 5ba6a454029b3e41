use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cadence",
    version,
    about = "Motion signal processing and cycle analysis tool",
    long_about = "Clean accelerometer/gyroscope recordings, detect motion events and analyze cycles.\n\
                  A recording is a folder holding Location, Accelerometer and Gyroscope CSV files."
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
    /// Run a full analysis plan over a recording folder
    Analyze(AnalyzeArgs),
    /// Output the processed motion channels of a recording
    Process(ProcessArgs),
    /// List available smoothing filters
    Filters(FiltersArgs),
    /// Validate a recording folder
    Validate(ValidateArgs),
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Recording folder
    #[arg(long)]
    pub dir: String,

    /// Analysis plan (JSON)
    #[arg(long, env = "CADENCE_PLAN")]
    pub plan: Option<String>,

    /// Filter selector, overrides the plan's pipeline filter
    #[arg(long)]
    pub filter: Option<String>,

    /// First filter parameter (used with --filter)
    #[arg(long)]
    pub param1: Option<f64>,

    /// Second filter parameter (used with --filter)
    #[arg(long)]
    pub param2: Option<f64>,

    /// Section as GPS fix indices "start,end", overrides the plan's section
    #[arg(long)]
    pub section: Option<String>,

    /// Also write the CSV report to this path
    #[arg(long)]
    pub report: Option<String>,

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
pub struct ProcessArgs {
    /// Recording folder
    #[arg(long)]
    pub dir: String,

    /// Filter selector (see `cadence filters`)
    #[arg(long, default_value = "butterworth")]
    pub filter: String,

    /// First filter parameter
    #[arg(long, default_value_t = 6.0)]
    pub param1: f64,

    /// Second filter parameter
    #[arg(long, default_value_t = 4.0)]
    pub param2: f64,

    /// Channels to include (default: all)
    #[arg(long, num_args = 1..)]
    pub channels: Option<Vec<String>>,

    /// Output every channel value at one sample index instead of the series
    #[arg(long)]
    pub sample: Option<usize>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,
}

#[derive(Args)]
pub struct FiltersArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Recording folder
    #[arg(long)]
    pub dir: String,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

/// Parse a `--section` value "start,end" into two GPS fix indices.
pub fn parse_gps_range(s: &str) -> Result<(usize, usize), String> {
    let (start, end) = s
        .split_once(',')
        .ok_or_else(|| format!("Invalid section '{}': expected 'start,end' GPS indices", s))?;
    let index = |part: &str| {
        part.trim()
            .parse::<usize>()
            .map_err(|_| format!("Invalid section '{}': '{}' is not a GPS index", s, part.trim()))
    };
    Ok((index(start)?, index(end)?))
}
