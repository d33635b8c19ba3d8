// Diagram generation
//
// Renders the resource graph and the network hierarchy as Mermaid flowcharts.

use crate::analysis::{AnalysisResult, ResourceGraph};
use crate::config::Direction;
use crate::parser::{IacFormat, Resource};
use std::collections::{BTreeMap, BTreeSet};

/// Environment key for resources without one when grouping by environment
const SHARED_GROUP: &str = "shared";

/// Diagram generator for creating Mermaid flowcharts
pub struct DiagramGenerator {
    /// Layout direction
    direction: Direction,
}

impl DiagramGenerator {
    pub fn new() -> Self {
        Self {
            direction: Direction::default(),
        }
    }

    /// Set layout direction
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Dependency flowchart grouped by environment (when several) and provider
    pub fn generate_dependency_graph(&self, analysis: &AnalysisResult) -> String {
        let graph = &analysis.graph;
        let ids = node_ids(graph);
        let mut lines = vec![format!("flowchart {}", self.direction.as_str())];

        let use_env_grouping = graph.environments().len() > 1;
        let mut groups: BTreeMap<&str, BTreeMap<&str, Vec<&Resource>>> = BTreeMap::new();
        for resource in graph.resources.values() {
            let env = if use_env_grouping {
                resource.origin.environment.as_deref().unwrap_or(SHARED_GROUP)
            } else {
                ""
            };
            groups
                .entry(env)
                .or_default()
                .entry(resource.provider.as_str())
                .or_default()
                .push(resource);
        }

        for (env, providers) in &groups {
            let indent = if use_env_grouping {
                lines.push(format!(
                    "subgraph {}[{}]",
                    safe_node_id(&format!("env_{}", env)),
                    env_label(env)
                ));
                "  "
            } else {
                ""
            };

            for (provider, resources) in providers {
                lines.push(format!(
                    "{}subgraph {}[{}]",
                    indent,
                    safe_node_id(&format!("{}_{}", env, provider)),
                    provider
                ));
                for resource in resources {
                    lines.push(format!(
                        "{}  {}[\"{}\"]",
                        indent,
                        ids[resource.id.as_str()],
                        escape_label(resource.label())
                    ));
                }
                lines.push(format!("{}end", indent));
            }

            if use_env_grouping {
                lines.push("end".to_string());
            }
        }

        let edges: BTreeSet<(&str, &str)> = graph
            .edges
            .iter()
            .filter_map(|e| {
                let source = ids.get(e.source.as_str())?;
                let target = ids.get(e.target.as_str())?;
                Some((source.as_str(), target.as_str()))
            })
            .collect();
        for (source, target) in edges {
            lines.push(format!("{} --> {}", source, target));
        }

        lines.join("\n") + "\n"
    }

    /// Containment view: one subgraph per network, nested per subnet.
    ///
    /// `None` when the hierarchy is empty.
    pub fn generate_network_graph(&self, analysis: &AnalysisResult) -> Option<String> {
        if analysis.hierarchy.is_empty() {
            return None;
        }

        let graph = &analysis.graph;
        let ids = node_ids(graph);
        let mut lines = vec![format!("flowchart {}", self.direction.as_str())];

        let label_of = |id: &str| graph.get(id).map(Resource::label).unwrap_or(id).to_string();
        let id_of = |id: &str| ids.get(id).cloned().unwrap_or_else(|| safe_node_id(id));

        for (network, group) in &analysis.hierarchy {
            lines.push(format!(
                "subgraph {}[\"{}\"]",
                safe_node_id(&format!("net_{}", network)),
                escape_label(&label_of(network))
            ));
            for (subnet, members) in &group.subnets {
                lines.push(format!(
                    "  subgraph {}[\"{}\"]",
                    safe_node_id(&format!("sub_{}", subnet)),
                    escape_label(&label_of(subnet))
                ));
                for member in members {
                    lines.push(format!(
                        "    {}[\"{}\"]",
                        id_of(member),
                        escape_label(&label_of(member))
                    ));
                }
                lines.push("  end".to_string());
            }
            for member in &group.other {
                lines.push(format!(
                    "  {}[\"{}\"]",
                    id_of(member),
                    escape_label(&label_of(member))
                ));
            }
            lines.push("end".to_string());
        }

        Some(lines.join("\n") + "\n")
    }
}

impl Default for DiagramGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn format_prefix(format: IacFormat) -> &'static str {
    match format {
        IacFormat::Terraform => "tf",
        IacFormat::CloudFormation => "cfn",
        IacFormat::Bicep => "bicep",
        IacFormat::Pulumi => "pulumi",
    }
}

/// Mermaid node id of every resource in the graph.
///
/// Ids are assigned in resource id order; when two resources sanitize to the
/// same id, later ones get `_2`, `_3` and so on.
pub fn node_ids(graph: &ResourceGraph) -> BTreeMap<&str, String> {
    let mut used = BTreeSet::new();
    let mut ids = BTreeMap::new();

    for resource in graph.resources.values() {
        let base = safe_node_id(&format!("{}_{}", format_prefix(resource.format), resource.id));
        let mut candidate = base.clone();
        let mut n = 2;
        while used.contains(&candidate) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        used.insert(candidate.clone());
        ids.insert(resource.id.as_str(), candidate);
    }
    ids
}

/// Sanitize a string for use as a Mermaid node id
pub fn safe_node_id(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' };
        if c == '_' && cleaned.ends_with('_') {
            continue;
        }
        cleaned.push(c);
    }

    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "node".to_string()
    } else if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        format!("n_{}", cleaned)
    } else {
        cleaned.to_string()
    }
}

/// `pre-prod` -> `Pre Prod`
fn env_label(env: &str) -> String {
    env.split(['-', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn escape_label(label: &str) -> String {
    label.replace('"', "#quot;")
}
