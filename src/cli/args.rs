//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Resolve IaC resources and dependencies into architecture diagrams
#[derive(Parser, Debug)]
#[command(name = "infragraph")]
#[command(about = "Resolve IaC resources and dependencies into architecture diagrams")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze an IaC project and write diagrams
    Analyze {
        /// Project root
        path: PathBuf,

        /// Whitespace-separated files to analyze, relative to the root,
        /// instead of discovering them
        #[arg(long)]
        changed_files: Option<String>,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (markdown, mermaid, json)
        #[arg(long)]
        format: Option<String>,

        /// Diagram direction (LR, RL, TB, BT)
        #[arg(long)]
        direction: Option<String>,

        /// Max number of files to read
        #[arg(long)]
        max_files: Option<usize>,

        /// Max bytes read per file
        #[arg(long)]
        max_bytes: Option<usize>,

        /// Glob patterns to exclude (can be repeated)
        #[arg(long)]
        exclude: Vec<String>,

        /// Skip diagram generation
        #[arg(long)]
        no_diagrams: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show version information
    Version,
}
