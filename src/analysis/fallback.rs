// Fallback chain for inputs without resolvable references

use super::{Edge, EdgeSet};
use crate::parser::ResourceSet;
use std::collections::BTreeMap;
use tracing::warn;

/// Chain resources within each module scope in sorted id order.
///
/// Heuristic only: the edges assert nothing about real dependencies.
/// Unscoped resources share the `""` scope.
pub fn fallback_chain(resources: &ResourceSet) -> EdgeSet {
    let mut scopes: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for resource in resources.values() {
        scopes.entry(resource.scope()).or_default().push(resource.id.as_str());
    }

    let mut edges = EdgeSet::new();
    for ids in scopes.values_mut() {
        ids.sort_unstable();
        for pair in ids.windows(2) {
            edges.insert(Edge::new(pair[0], pair[1]));
        }
    }

    if !edges.is_empty() {
        warn!(
            "No references resolved; chaining {} resources heuristically",
            resources.len()
        );
    }
    edges
}
