use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::tree;

/// Top-level CLI definition. Running without a subcommand builds with defaults.
#[derive(Parser, Debug)]
#[command(
    name = "nestgen",
    version,
    about = "Generate nested directory fixtures and map directory trees"
)]
pub struct Cli {
    #[arg(short = 'C', long = "chdir", global = true)]
    pub chdir: Option<PathBuf>,
    #[arg(short = 'f', long = "file", global = true)]
    pub file: Option<PathBuf>,
    #[arg(short = 'n', long = "dry-run", global = true)]
    pub dry_run: bool,
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create `depth` nested `level_<n>` directories, each with a marker file.
    Build(BuildArgs),
    /// Print a JSON mapping of a directory tree.
    Map(MapArgs),
    /// Configuration display and editing.
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommand>,
    },
}

#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Directory to build under (defaults to the configured value or `test-data`).
    #[arg()]
    pub base_dir: Option<PathBuf>,
    /// Number of levels to create (defaults to the configured value or 6).
    #[arg(short = 'd', long = "depth")]
    pub depth: Option<u32>,
}

#[derive(Args, Debug)]
pub struct MapArgs {
    /// Directory to map (defaults to the build base directory).
    #[arg()]
    pub path: Option<PathBuf>,
    /// Decimal places for human-readable sizes.
    #[arg(
        short = 'r',
        long = "round",
        value_parser = clap::value_parser!(i32).range(0..=i64::from(tree::MAX_ROUND))
    )]
    pub round: Option<i32>,
    /// Write the JSON here instead of stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    Show,
    Path,
    Generate {
        #[arg()]
        path: Option<PathBuf>,
        #[arg(long = "force", default_value_t = false)]
        force: bool,
    },
    /// Set one of `build.base_dir`, `build.depth`, `map.round`.
    Set { key: String, value: String },
}

/// Helper entry point so `main` can stay minimal.
pub fn parse() -> Cli {
    Cli::parse()
}
