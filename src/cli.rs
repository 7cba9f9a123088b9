use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::profile::{Override, parse_override};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Build LTTng virtual environments from YAML profiles",
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a virtual environment
    Create(CreateArgs),
    Profile(ProfileArgs),
    Config(ConfigArgs),
}

/// Options shared by every command that resolves a profile.
#[derive(Debug, Args)]
pub struct ProfileSelection {
    /// Profile name or path (may be repeated to patch)
    #[arg(short = 'p', long = "profile", value_name = "PROFILE")]
    pub profiles: Vec<String>,
    /// Ignore project PROJECT (may be repeated)
    #[arg(short = 'i', long = "ignore-project", value_name = "PROJECT")]
    pub ignored: Vec<String>,
    /// Override property in the effective profile (may be repeated)
    #[arg(
        short = 'o',
        long = "override",
        value_name = "PROP",
        value_parser = parse_override
    )]
    pub overrides: Vec<Override>,
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Virtual environment path
    pub path: PathBuf,
    #[command(flatten)]
    pub selection: ProfileSelection,
    /// Number of make jobs to run simultaneously
    #[arg(short, long)]
    pub jobs: Option<usize>,
    /// Remove the virtual environment path first if it exists
    #[arg(short, long)]
    pub force: bool,
    /// Hide export lines
    #[arg(long)]
    pub hide_export: bool,
    /// Print the commands without running them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// List available profile names
    List,
    /// Print the resolved profile
    Show(ProfileShowArgs),
}

#[derive(Debug, Args)]
pub struct ProfileShowArgs {
    #[command(flatten)]
    pub selection: ProfileSelection,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    Show,
    Paths,
    Reset,
}
