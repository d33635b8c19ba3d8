// Resource dependency graph

use super::RemapTables;
use crate::parser::{Resource, ResourceSet};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// `source` must exist before `target`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Deduplicated, ordered edge set
pub type EdgeSet = BTreeSet<Edge>;

/// Extract, remap and filter references into edges.
///
/// Only references resolving to a known id other than the resource's own
/// survive; everything else is dropped silently.
pub fn build_edges(resources: &ResourceSet, remaps: &RemapTables) -> EdgeSet {
    let mut edges = EdgeSet::new();

    for (id, resource) in resources {
        for reference in resource.format.extract_references(&resource.attributes) {
            let resolved = remaps.remap(&reference, &resource.origin);
            if resolved == *id || !resources.contains_key(&resolved) {
                trace!("Dropping reference {} from {}", reference, id);
                continue;
            }
            edges.insert(Edge::new(resolved, id.clone()));
        }
    }

    edges
}

/// Resources plus the edges between them
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceGraph {
    pub resources: ResourceSet,
    pub edges: EdgeSet,
}

impl ResourceGraph {
    /// Create a graph with no edges
    pub fn new(resources: ResourceSet) -> Self {
        Self {
            resources,
            edges: EdgeSet::new(),
        }
    }

    /// Create a graph and build its edges
    pub fn build(resources: ResourceSet, remaps: &RemapTables) -> Self {
        let edges = build_edges(&resources, remaps);
        Self { resources, edges }
    }

    /// Add an edge; both endpoints must be known and distinct
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        if edge.source == edge.target
            || !self.resources.contains_key(&edge.source)
            || !self.resources.contains_key(&edge.target)
        {
            return false;
        }
        self.edges.insert(edge)
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// Environments present, empty when prefixing was not active
    pub fn environments(&self) -> BTreeSet<&str> {
        self.resources
            .values()
            .filter_map(|r| r.origin.environment.as_deref())
            .collect()
    }

    /// Resource count per provider
    pub fn providers(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for resource in self.resources.values() {
            *counts.entry(resource.provider.as_str()).or_insert(0) += 1;
        }
        counts
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            resources: self.resources.len(),
            edges: self.edges.len(),
            providers: self.providers().len(),
            environments: self.environments().len(),
        }
    }
}

/// Statistics about the resource graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub resources: usize,
    pub edges: usize,
    pub providers: usize,
    pub environments: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::IacFormat;
    use crate::tree::Node;
    use serde_json::json;

    fn resource(id: &str, format: IacFormat, attributes: serde_json::Value) -> Resource {
        let kind = id.split('.').next().unwrap_or(id);
        Resource::new(id, kind, "AWS", format, Node::from(attributes), "main.tf")
    }

    fn set(resources: Vec<Resource>) -> ResourceSet {
        resources.into_iter().map(|r| (r.id.clone(), r)).collect()
    }

    #[test]
    fn test_terraform_interpolation_edge() {
        let resources = set(vec![
            resource("aws_vpc.main", IacFormat::Terraform, json!({"cidr_block": "10.0.0.0/16"})),
            resource("aws_subnet.a", IacFormat::Terraform, json!({"vpc_id": "${aws_vpc.main.id}"})),
        ]);
        let graph = ResourceGraph::build(resources, &RemapTables::default());
        assert_eq!(
            graph.edges.iter().collect::<Vec<_>>(),
            vec![&Edge::new("aws_vpc.main", "aws_subnet.a")]
        );
    }

    #[test]
    fn test_depends_on_yields_one_edge_each() {
        let resources = set(vec![
            resource("aws_iam_role.a", IacFormat::Terraform, json!({})),
            resource("aws_s3_bucket.b", IacFormat::Terraform, json!({})),
            resource(
                "aws_instance.web",
                IacFormat::Terraform,
                json!({"depends_on": ["${aws_iam_role.a}", "${aws_s3_bucket.b}", "${aws_iam_role.a}"]}),
            ),
        ]);
        let graph = ResourceGraph::build(resources, &RemapTables::default());
        assert!(graph.edges.contains(&Edge::new("aws_iam_role.a", "aws_instance.web")));
        assert!(graph.edges.contains(&Edge::new("aws_s3_bucket.b", "aws_instance.web")));
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn test_cloudformation_edge() {
        let resources = set(vec![
            resource("Role", IacFormat::CloudFormation, json!({"Type": "AWS::IAM::Role"})),
            resource(
                "Func",
                IacFormat::CloudFormation,
                json!({"Type": "AWS::Lambda::Function", "Properties": {"Role": {"Fn::GetAtt": ["Role", "Arn"]}}}),
            ),
        ]);
        let graph = ResourceGraph::build(resources, &RemapTables::default());
        assert!(graph.edges.contains(&Edge::new("Role", "Func")));
    }

    #[test]
    fn test_no_self_edges_or_unknown_targets() {
        let resources = set(vec![resource(
            "aws_security_group.sg",
            IacFormat::Terraform,
            json!({"name": "${aws_security_group.sg.name}", "ami": "${data.aws_ami.x.id}"}),
        )]);
        let graph = ResourceGraph::build(resources, &RemapTables::default());
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_build_is_idempotent() {
        let resources = set(vec![
            resource("aws_vpc.main", IacFormat::Terraform, json!({})),
            resource("aws_subnet.a", IacFormat::Terraform, json!({"vpc_id": "${aws_vpc.main.id}"})),
            resource("aws_subnet.b", IacFormat::Terraform, json!({"vpc_id": "${aws_vpc.main.id}"})),
        ]);
        let remaps = RemapTables::default();
        assert_eq!(build_edges(&resources, &remaps), build_edges(&resources, &remaps));
    }

    #[test]
    fn test_add_edge_rejects_invalid() {
        let mut graph = ResourceGraph::new(set(vec![
            resource("a.x", IacFormat::Terraform, json!({})),
            resource("b.y", IacFormat::Terraform, json!({})),
        ]));
        assert!(!graph.add_edge(Edge::new("a.x", "a.x")));
        assert!(!graph.add_edge(Edge::new("a.x", "c.z")));
        assert!(graph.add_edge(Edge::new("a.x", "b.y")));
        assert!(!graph.add_edge(Edge::new("a.x", "b.y")));
    }

    #[test]
    fn test_graph_stats() {
        let graph = ResourceGraph::new(set(vec![
            resource("aws_vpc.main", IacFormat::Terraform, json!({})),
            resource("aws_subnet.a", IacFormat::Terraform, json!({})),
        ]));
        let stats = graph.stats();
        assert_eq!(stats.resources, 2);
        assert_eq!(stats.edges, 0);
        assert_eq!(stats.providers, 1);
        assert_eq!(stats.environments, 0);
    }
}
