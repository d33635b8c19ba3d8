// Output generation: Mermaid, Markdown and JSON files

pub mod diagrams;
pub mod markdown;

pub use diagrams::*;
pub use markdown::*;

use crate::analysis::AnalysisResult;
use crate::config::{Config, OutputFormat};
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const JSON_FILE: &str = "architecture.json";
pub const MERMAID_FILE: &str = "architecture-diagram.mmd";
pub const MARKDOWN_FILE: &str = "architecture-diagram.md";
pub const NETWORK_FILE: &str = "architecture-network.mmd";

/// Write the configured outputs for a run, returning the files written
pub fn write_outputs(analysis: &AnalysisResult, config: &Config) -> Result<Vec<PathBuf>> {
    let dir = &config.output.directory;
    std::fs::create_dir_all(dir)?;

    let generator = DiagramGenerator::new().with_direction(config.diagram.direction);
    let (mermaid, network) = if config.diagram.enabled {
        (
            Some(generator.generate_dependency_graph(analysis)),
            generator.generate_network_graph(analysis),
        )
    } else {
        (None, None)
    };

    let mut written = Vec::new();
    match config.output.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(analysis)?;
            written.push(write_file(dir, JSON_FILE, &json)?);
        }
        OutputFormat::Mermaid | OutputFormat::Markdown => {
            if let Some(ref mermaid) = mermaid {
                written.push(write_file(dir, MERMAID_FILE, mermaid)?);
            }
            if let Some(ref network) = network {
                written.push(write_file(dir, NETWORK_FILE, network)?);
            }
            if config.output.format == OutputFormat::Markdown {
                let md = render_markdown(analysis, mermaid.as_deref(), network.as_deref());
                written.push(write_file(dir, MARKDOWN_FILE, &md)?);
            }
        }
    }

    Ok(written)
}

/// Write the fallback document for a run that produced no diagram
pub fn write_fallback(dir: &Path, files: &[String], reason: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    write_file(dir, MARKDOWN_FILE, &fallback_markdown(files, reason))
}

fn write_file(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    debug!("Wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{NetworkGroup, NetworkHierarchy, ResourceGraph};
    use crate::parser::{IacFormat, ParseErrors, Resource};
    use crate::tree::Node;
    use tempfile::TempDir;

    fn analysis() -> AnalysisResult {
        let r = Resource::new("vpc", "aws:ec2:Vpc", "AWS", IacFormat::Pulumi, Node::Map(Default::default()), "Pulumi.yaml");
        AnalysisResult {
            format: IacFormat::Pulumi,
            graph: ResourceGraph::new([(r.id.clone(), r)].into_iter().collect()),
            hierarchy: NetworkHierarchy::new(),
            used_fallback: false,
            parse_errors: ParseErrors::new(),
        }
    }

    fn networked() -> AnalysisResult {
        let mut a = analysis();
        a.hierarchy.insert("vpc".to_string(), NetworkGroup::default());
        a
    }

    fn config(dir: &Path, format: OutputFormat) -> Config {
        let mut config = Config::default();
        config.output.directory = dir.to_path_buf();
        config.output.format = format;
        config
    }

    #[test]
    fn test_write_markdown_outputs() {
        let dir = TempDir::new().unwrap();
        let written = write_outputs(&analysis(), &config(dir.path(), OutputFormat::Markdown)).unwrap();
        assert_eq!(written.len(), 2);
        assert!(dir.path().join(MERMAID_FILE).exists());
        let md = std::fs::read_to_string(dir.path().join(MARKDOWN_FILE)).unwrap();
        assert!(md.contains("pulumi_vpc"));
    }

    #[test]
    fn test_write_network_diagram() {
        let dir = TempDir::new().unwrap();
        let written = write_outputs(&networked(), &config(dir.path(), OutputFormat::Markdown)).unwrap();
        assert_eq!(written.len(), 3);

        let network = std::fs::read_to_string(dir.path().join(NETWORK_FILE)).unwrap();
        assert!(network.contains("subgraph net_vpc[\"vpc\"]"));
        let md = std::fs::read_to_string(dir.path().join(MARKDOWN_FILE)).unwrap();
        assert!(md.contains("subgraph net_vpc"));
    }

    #[test]
    fn test_mermaid_format_writes_network_diagram() {
        let dir = TempDir::new().unwrap();
        let written = write_outputs(&networked(), &config(dir.path(), OutputFormat::Mermaid)).unwrap();
        assert_eq!(written, vec![dir.path().join(MERMAID_FILE), dir.path().join(NETWORK_FILE)]);
    }

    #[test]
    fn test_write_json_output() {
        let dir = TempDir::new().unwrap();
        write_outputs(&analysis(), &config(dir.path(), OutputFormat::Json)).unwrap();
        let text = std::fs::read_to_string(dir.path().join(JSON_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["format"], "pulumi");
        assert!(value["resources"]["vpc"].is_object());
        assert!(value["edges"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_mermaid_skipped_without_diagrams() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config(dir.path(), OutputFormat::Mermaid);
        cfg.diagram.enabled = false;
        let written = write_outputs(&networked(), &cfg).unwrap();
        assert!(written.is_empty());
    }

    #[test]
    fn test_write_fallback() {
        let dir = TempDir::new().unwrap();
        let path = write_fallback(dir.path(), &[], "No IaC files found").unwrap();
        let md = std::fs::read_to_string(path).unwrap();
        assert!(md.contains("Reason: No IaC files found"));
    }
}
