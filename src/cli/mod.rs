//! CLI module for infragraph

mod args;

pub use args::{Args, Command};

use crate::analysis::Analyzer;
use crate::config::{CliOverrides, Config, DEFAULT_CONFIG_FILE};
use crate::error::{Error, Result};
use crate::output::{write_fallback, write_outputs};
use crate::source::split_changed_files;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Run the CLI application
pub fn run() -> ExitCode {
    let args = Args::parse_args();

    match execute(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "infragraph=debug,warn" } else { "infragraph=info,warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn execute(args: Args) -> Result<()> {
    match args.command {
        Command::Analyze {
            path,
            changed_files,
            config,
            output,
            format,
            direction,
            max_files,
            max_bytes,
            exclude,
            no_diagrams,
            verbose,
        } => {
            init_tracing(verbose);

            let mut cfg = match &config {
                Some(config_path) => Config::load(config_path)?,
                None => Config::load_or_default(Path::new(DEFAULT_CONFIG_FILE)),
            };

            cfg.merge_cli(CliOverrides {
                output,
                exclude,
                format,
                direction,
                max_files,
                max_bytes,
                no_diagrams,
            })?;

            if verbose {
                println!("Analyzing: {}", path.display());
                println!("Output: {}", cfg.output.directory.display());
                println!("Format: {:?}", cfg.output.format);
                println!("Direction: {}", cfg.diagram.direction.as_str());
                println!("Diagrams: {}", cfg.diagram.enabled);
                println!("Max files: {}", cfg.limits.max_files);
                println!("Exclude: {:?}", cfg.discovery.exclude);
            }

            let changed = changed_files.as_deref().map(split_changed_files);
            let analyzer = Analyzer::new(cfg.clone())?.with_verbose(verbose);

            println!("Analyzing infrastructure...");
            let result = match &changed {
                Some(files) => analyzer.analyze_changed(&path, files),
                None => analyzer.analyze(&path),
            };

            let analysis = match result {
                Ok(analysis) => analysis,
                Err(Error::NoFormatMatched(reason)) => {
                    let listed = changed.unwrap_or_default();
                    let written = write_fallback(&cfg.output.directory, &listed, &reason)?;
                    println!("No diagram generated: {}", reason);
                    println!("Fallback written to: {}", written.display());
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            let stats = analysis.graph.stats();
            println!(
                "Analysis complete: {} {} resources, {} connections{}",
                stats.resources,
                analysis.format,
                stats.edges,
                if analysis.used_fallback { " (heuristic)" } else { "" }
            );

            if !analysis.parse_errors.is_empty() {
                println!("\nParse errors ({}):", analysis.parse_errors.len());
                for (path, err) in analysis.parse_errors.iter().take(5) {
                    println!("  {}: {}", path.display(), err);
                }
                if analysis.parse_errors.len() > 5 {
                    println!("  ... and {} more", analysis.parse_errors.len() - 5);
                }
            }

            for written in write_outputs(&analysis, &cfg)? {
                println!("Written: {}", written.display());
            }

            Ok(())
        }

        Command::Version => {
            println!("infragraph {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
