// Network containment hierarchy (network -> subnet -> resources)
//
// Advisory only: derived from kinds, edges and a few well-known attribute
// keys, rebuilt every run.

use super::{RemapTables, ResourceGraph};
use crate::parser::Resource;
use crate::tree::Node;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

const NETWORK_PATTERNS: &[&str] = &["vpc", "vnet", "vcn", "virtual_network", "virtualnetwork"];

/// Attribute keys pointing a subnet at its network
const NETWORK_KEYS: &[&str] = &["vpc_id", "virtual_network_name", "vcn_id", "VpcId", "vpcId"];

/// Attribute keys pointing a resource at its subnet(s)
const SUBNET_KEYS: &[&str] = &[
    "subnet_id",
    "subnet_ids",
    "subnet",
    "subnets",
    "SubnetId",
    "SubnetIds",
    "subnetId",
    "subnetIds",
];

/// Role of a resource in the containment hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkRole {
    Network,
    Subnet,
    Plain,
}

impl NetworkRole {
    pub fn classify(kind: &str) -> Self {
        let kind = kind.to_lowercase();
        if kind.contains("subnet") {
            NetworkRole::Subnet
        } else if NETWORK_PATTERNS.iter().any(|p| kind.contains(p)) && !kind.contains("interface") {
            NetworkRole::Network
        } else {
            NetworkRole::Plain
        }
    }
}

/// Contents of one network
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkGroup {
    /// Subnet id -> resources placed in it
    #[serde(flatten)]
    pub subnets: BTreeMap<String, Vec<String>>,
    /// Resources attached to the network but to none of its subnets
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub other: Vec<String>,
}

/// Network id -> contents
pub type NetworkHierarchy = BTreeMap<String, NetworkGroup>;

/// Values stored under `keys` in the body or its `Properties` map
fn keyed_values<'a>(resource: &'a Resource, keys: &[&str]) -> Vec<&'a Node> {
    let attrs = &resource.attributes;
    let nested = [attrs.get("Properties"), attrs.get("properties")];

    let mut out = Vec::new();
    for key in keys {
        if let Some(value) = attrs.get(key) {
            out.push(value);
        }
        for props in nested.iter().flatten() {
            if let Some(value) = props.get(key) {
                out.push(value);
            }
        }
    }
    out
}

/// References of `value` in traversal order, remapped to resource ids
fn resolved_references(resource: &Resource, value: &Node, remaps: &RemapTables) -> Vec<String> {
    resource
        .format
        .extract_references(value)
        .into_iter()
        .map(|r| remaps.remap(&r, &resource.origin))
        .collect()
}

/// First id of `candidates` referenced under one of `keys`
fn find_by_keys(
    resource: &Resource,
    keys: &[&str],
    candidates: &BTreeSet<&str>,
    remaps: &RemapTables,
) -> Option<String> {
    keyed_values(resource, keys).into_iter().find_map(|value| {
        resolved_references(resource, value, remaps)
            .into_iter()
            .find(|r| candidates.contains(r.as_str()))
    })
}

/// The edge-linked peer the resource body mentions first.
///
/// Peers linked only by edges pointing the other way are not in the body;
/// they come last, in sorted order.
fn first_linked(resource: &Resource, linked: &BTreeSet<&str>, remaps: &RemapTables) -> Option<String> {
    resolved_references(resource, &resource.attributes, remaps)
        .into_iter()
        .find(|r| linked.contains(r.as_str()))
        .or_else(|| linked.iter().next().map(|id| id.to_string()))
}

/// Peers of each id in `members` reached by an edge in either direction
fn linked_peers<'a>(
    graph: &'a ResourceGraph,
    members: impl Fn(&str) -> bool,
    peers: impl Fn(&str) -> bool,
) -> BTreeMap<&'a str, BTreeSet<&'a str>> {
    let mut out: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for edge in &graph.edges {
        let (src, dst) = (edge.source.as_str(), edge.target.as_str());
        if members(dst) && peers(src) {
            out.entry(dst).or_default().insert(src);
        } else if members(src) && peers(dst) {
            out.entry(src).or_default().insert(dst);
        }
    }
    out
}

/// Place subnets in networks and resources in subnets.
///
/// Edge-linked candidates win over attribute keys. Among several, the first
/// one met while walking the resource body wins; keys are tried in the
/// order listed. Resources linked to nothing are left out.
pub fn build_hierarchy(graph: &ResourceGraph, remaps: &RemapTables) -> NetworkHierarchy {
    let mut networks = BTreeSet::new();
    let mut subnets = BTreeSet::new();
    for resource in graph.resources.values() {
        match NetworkRole::classify(&resource.kind) {
            NetworkRole::Network => {
                networks.insert(resource.id.as_str());
            }
            NetworkRole::Subnet => {
                subnets.insert(resource.id.as_str());
            }
            NetworkRole::Plain => {}
        }
    }
    let is_plain = |id: &str| !networks.contains(id) && !subnets.contains(id);

    let subnet_links = linked_peers(graph, |id| subnets.contains(id), |id| networks.contains(id));
    let mut subnet_network: BTreeMap<&str, String> = BTreeMap::new();
    for &subnet in &subnets {
        let resource = &graph.resources[subnet];
        let network = match subnet_links.get(subnet) {
            Some(linked) => first_linked(resource, linked, remaps),
            None => find_by_keys(resource, NETWORK_KEYS, &networks, remaps),
        };
        if let Some(network) = network {
            subnet_network.insert(subnet, network);
        }
    }

    let resource_links = linked_peers(graph, is_plain, |id| subnets.contains(id));
    let mut resource_subnet: BTreeMap<&str, String> = BTreeMap::new();
    for (id, resource) in &graph.resources {
        if !is_plain(id) {
            continue;
        }
        let subnet = match resource_links.get(id.as_str()) {
            Some(linked) => first_linked(resource, linked, remaps),
            None => find_by_keys(resource, SUBNET_KEYS, &subnets, remaps),
        };
        if let Some(subnet) = subnet {
            resource_subnet.insert(id, subnet);
        }
    }

    let mut hierarchy = NetworkHierarchy::new();
    for &network in &networks {
        let mut group = NetworkGroup::default();

        for (subnet, parent) in &subnet_network {
            if parent == network {
                let members: Vec<String> = resource_subnet
                    .iter()
                    .filter(|(_, s)| s.as_str() == *subnet)
                    .map(|(r, _)| r.to_string())
                    .collect();
                group.subnets.insert(subnet.to_string(), members);
            }
        }

        let mut other = BTreeSet::new();
        for edge in &graph.edges {
            let peer = if edge.source == network {
                edge.target.as_str()
            } else if edge.target == network {
                edge.source.as_str()
            } else {
                continue;
            };
            if is_plain(peer) && !resource_subnet.contains_key(peer) {
                other.insert(peer.to_string());
            }
        }
        group.other = other.into_iter().collect();

        hierarchy.insert(network.to_string(), group);
    }

    hierarchy
}
