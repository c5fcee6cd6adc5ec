//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

/// Follow AWS Lambda logs from the terminal.
///
/// Streams new events from the function's most recent log stream and switches
/// to newer streams as the function starts new execution environments.
#[derive(Debug, Parser)]
#[command(name = "lambda-tail", version, about, long_about = None)]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .args(["function_name", "log_group"]),
))]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Lambda function name; its log group is `<log_group_prefix><name>`.
    #[arg(short, long)]
    pub function_name: Option<String>,

    /// Full log group name to tail instead of a function.
    #[arg(short = 'g', long)]
    pub log_group: Option<String>,

    /// AWS region (overrides config and `AWS_REGION`).
    #[arg(short, long)]
    pub region: Option<String>,

    /// Named profile from the shared AWS files (overrides `AWS_PROFILE`).
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Custom CloudWatch Logs endpoint URL.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Disable coloured output.
    #[arg(long)]
    pub no_color: bool,
}

/// What to tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A Lambda function, mapped to a log group through the configured prefix.
    Function(String),
    /// An explicit log group.
    LogGroup(String),
}

impl Cli {
    /// The tail target. Clap guarantees exactly one of the two flags is set.
    pub fn target(&self) -> Option<Target> {
        match (&self.function_name, &self.log_group) {
            (Some(function), _) => Some(Target::Function(function.clone())),
            (None, Some(group)) => Some(Target::LogGroup(group.clone())),
            (None, None) => None,
        }
    }
}
