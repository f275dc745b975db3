use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "pfsync")]
#[command(about = "Synchronize and validate pfSense configurations over SSH")]
pub struct Cli {
    /// Settings TOML file (device credentials and remote paths).
    #[arg(long, global = true, default_value = "pfsync.toml")]
    pub settings: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Fetch the live configuration from the device.
    Fetch(FetchArgs),
    /// Push a local configuration file to the device.
    Push(PushArgs),
    /// Validate a local configuration snapshot.
    Validate(ValidateArgs),
    /// Show a summary of a local configuration snapshot.
    Show(ShowArgs),
}

#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Write the fetched XML here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Run semantic validation on the fetched configuration.
    #[arg(long)]
    pub validate: bool,
}

#[derive(Parser, Debug)]
pub struct PushArgs {
    /// Configuration XML file to push.
    pub file: PathBuf,
    /// Push even when validation reports violations.
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Configuration XML file to validate.
    pub file: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Configuration XML file to summarize.
    pub file: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
