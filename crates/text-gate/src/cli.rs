use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "text-gate", version, about = "Layered text-safety decision engine")]
pub struct Cli {
    /// Path to the application configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Path to the engine config file (overrides config file setting)
    #[arg(short, long)]
    pub policy: Option<PathBuf>,

    /// Subject identifier (user id, remote address) attached to recorded events
    #[arg(long)]
    pub subject: Option<String>,

    /// Print a dashboard snapshot after all inputs are processed
    #[arg(long)]
    pub summary: bool,

    /// Inputs to evaluate; newline-delimited stdin is read when none are given
    pub inputs: Vec<String>,
}
