// Resource types shared by every format loader
//
// A resource is created once per load by its format's loader; the namer
// fixes its id before the graph is built, after which it is read-only.

use super::IacFormat;
use crate::tree::Node;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Resources of one load, keyed by id
pub type ResourceSet = BTreeMap<String, Resource>;

/// One declared infrastructure object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    /// Globally unique id within the load (`type.name` for Terraform)
    pub id: String,
    /// Type tag as written (`aws_vpc`, `AWS::EC2::VPC`, `aws:ec2:Vpc`, ...)
    pub kind: String,
    /// Provider label derived from the kind
    pub provider: String,
    /// Format the resource was loaded from
    pub format: IacFormat,
    /// Attribute body as parsed
    pub attributes: Node,
    /// Where the resource came from
    pub origin: Origin,
}

/// Provenance of a resource
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Origin {
    /// Source file
    pub file: PathBuf,
    /// Environment the file belongs to, when environment prefixing is active
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Module scope prefix (`module_net__` or `dev__module_net__`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_scope: Option<String>,
    /// Id as written in the source, before any prefixing
    pub logical_id: String,
}

impl Resource {
    /// Create a resource whose id is also its logical id
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        provider: impl Into<String>,
        format: IacFormat,
        attributes: Node,
        file: impl Into<PathBuf>,
    ) -> Self {
        let id = id.into();
        Self {
            origin: Origin {
                file: file.into(),
                environment: None,
                module_scope: None,
                logical_id: id.clone(),
            },
            id,
            kind: kind.into(),
            provider: provider.into(),
            format,
            attributes,
        }
    }

    /// Human label: the logical id before any prefixing
    pub fn label(&self) -> &str {
        &self.origin.logical_id
    }

    /// Module scope, empty for unscoped resources
    pub fn scope(&self) -> &str {
        self.origin.module_scope.as_deref().unwrap_or("")
    }
}
