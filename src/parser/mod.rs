// Format adapters: one loader and one reference extractor per IaC format

pub mod bicep;
pub mod cloudformation;
pub mod pulumi;
mod resource;
pub mod terraform;

pub use bicep::BicepParser;
pub use cloudformation::CloudFormationParser;
pub use pulumi::PulumiParser;
pub use resource::*;
pub use terraform::TerraformParser;

use crate::analysis::RemapTables;
use crate::error::Result;
use crate::source::{redact_secrets, SourceFile, SourceReader};
use crate::tree::Node;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Files that failed to parse (path -> error message)
pub type ParseErrors = BTreeMap<PathBuf, String>;

/// Reference strings in the order a body first mentions them, no repeats
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct References(Vec<String>);

impl References {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `reference` unless already present
    pub fn insert(&mut self, reference: impl Into<String>) -> bool {
        let reference = reference.into();
        if self.contains(&reference) {
            return false;
        }
        self.0.push(reference);
        true
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.0.iter().any(|r| r == reference)
    }
}

impl Extend<String> for References {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        for reference in iter {
            self.insert(reference);
        }
    }
}

impl IntoIterator for References {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Supported IaC format families, in dispatch order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IacFormat {
    Terraform,
    CloudFormation,
    Bicep,
    Pulumi,
}

impl IacFormat {
    /// Classify a file by extension or name
    pub fn classify(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let lower = name.to_lowercase();

        if lower.ends_with(".tf") || lower.ends_with(".hcl") {
            Some(IacFormat::Terraform)
        } else if lower.ends_with(".cfn.yml")
            || lower.ends_with(".cfn.yaml")
            || lower.ends_with(".cfn.json")
            || lower == "template.yml"
            || lower == "template.yaml"
        {
            Some(IacFormat::CloudFormation)
        } else if lower.ends_with(".bicep") {
            Some(IacFormat::Bicep)
        } else if name == "Pulumi.yaml"
            || name == "Pulumi.yml"
            || lower.ends_with(".pulumi.yaml")
            || lower.ends_with(".pulumi.yml")
        {
            Some(IacFormat::Pulumi)
        } else {
            None
        }
    }

    /// Pull local reference strings out of a resource body, in traversal
    /// order
    pub fn extract_references(&self, attributes: &Node) -> References {
        match self {
            IacFormat::Terraform => terraform::extract_references(attributes),
            IacFormat::CloudFormation => cloudformation::extract_references(attributes),
            IacFormat::Bicep => bicep::extract_references(attributes),
            IacFormat::Pulumi => pulumi::extract_references(attributes),
        }
    }
}

impl fmt::Display for IacFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IacFormat::Terraform => "Terraform",
            IacFormat::CloudFormation => "CloudFormation",
            IacFormat::Bicep => "Bicep",
            IacFormat::Pulumi => "Pulumi YAML",
        };
        f.write_str(label)
    }
}

/// Shared inputs for one load
pub struct LoadContext<'a> {
    /// Project root; local modules must resolve inside it
    pub root: &'a Path,
    /// Reader for files discovered during loading (module directories)
    pub reader: &'a SourceReader,
}

/// Output of a successful load
#[derive(Debug, Default)]
pub struct Load {
    pub resources: ResourceSet,
    pub remaps: RemapTables,
}

/// A format adapter
///
/// `load` returns `Error::NoResources` when nothing usable was found, which
/// tells the caller to try the next format.
pub trait IacParser {
    fn format(&self) -> IacFormat;

    fn load(
        &self,
        files: &[SourceFile],
        ctx: &LoadContext<'_>,
        errors: &mut ParseErrors,
    ) -> Result<Load>;

    /// Files of this adapter's format
    fn select<'f>(&self, files: &'f [SourceFile]) -> Vec<&'f SourceFile> {
        files
            .iter()
            .filter(|f| f.format == Some(self.format()))
            .collect()
    }
}

/// Record a file that could not be loaded.
///
/// Parser messages can quote source lines, so they are redacted first.
pub fn record_parse_error(errors: &mut ParseErrors, path: &Path, message: &str) {
    let message = redact_secrets(message);
    warn!("Failed to parse {}: {}", path.display(), message);
    errors.insert(path.to_path_buf(), message);
}

/// The default adapter chain in dispatch order
pub fn default_parsers() -> Vec<Box<dyn IacParser + Send + Sync>> {
    vec![
        Box::new(TerraformParser::new()),
        Box::new(CloudFormationParser::new()),
        Box::new(BicepParser::new()),
        Box::new(PulumiParser::new()),
    ]
}

/// Human label for a provider prefix (`aws` -> `AWS`)
pub fn provider_label(prefix: &str) -> String {
    match prefix.to_lowercase().as_str() {
        "aws" => "AWS".to_string(),
        "azurerm" | "azure" | "azure-native" | "azuread" => "Azure".to_string(),
        "google" | "gcp" => "GCP".to_string(),
        "oci" => "OCI".to_string(),
        "ibm" => "IBM".to_string(),
        "kubernetes" | "k8s" => "Kubernetes".to_string(),
        "" => "Other".to_string(),
        other => other.to_uppercase(),
    }
}
