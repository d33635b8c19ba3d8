//! infragraph - Resolve IaC resources and dependencies into architecture diagrams
//!
//! Loads Terraform, CloudFormation, Bicep or Pulumi YAML projects into one
//! resource graph, infers dependency edges and network containment, and
//! renders Mermaid, Markdown or JSON.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod parser;
pub mod source;
pub mod tree;

// Re-export main types
pub use analysis::{AnalysisResult, Analyzer, Edge, NetworkHierarchy, ResourceGraph};
pub use config::Config;
pub use error::{Error, Result};
pub use parser::{IacFormat, Resource};
