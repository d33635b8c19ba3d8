// Parsed document tree
//
// Every format loader converts its parser's output into `Node`, so the
// reference extractors only ever match on three shapes.

use serde::Serialize;
use std::collections::BTreeMap;

/// A parsed map/list/scalar tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Map(BTreeMap<String, Node>),
    Seq(Vec<Node>),
    Scalar(Scalar),
}

/// Leaf value of a parsed tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl Node {
    /// A string scalar node
    pub fn string(s: impl Into<String>) -> Self {
        Node::Scalar(Scalar::String(s.into()))
    }

    /// Look up a key if this node is a map
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// A string, or every string element of a list.
    ///
    /// Used for fields like `DependsOn` that accept either shape.
    pub fn string_or_list(&self) -> Vec<&str> {
        match self {
            Node::Scalar(Scalar::String(s)) => vec![s.as_str()],
            Node::Seq(items) => items.iter().filter_map(Node::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Depth-first pre-order traversal of this node and all descendants
    pub fn walk(&self) -> Walk<'_> {
        walk(self)
    }

    /// Every string scalar reachable from this node
    pub fn strings(&self) -> impl Iterator<Item = &str> {
        self.walk().filter_map(Node::as_str)
    }
}

/// Lazy tree traversal, see [`walk`]
pub struct Walk<'a> {
    stack: Vec<&'a Node>,
}

/// Yield `node`, then every descendant (map values, list elements).
///
/// Scalars yield only themselves. Map values come out in key order.
pub fn walk(node: &Node) -> Walk<'_> {
    Walk { stack: vec![node] }
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        match node {
            Node::Map(map) => self.stack.extend(map.values().rev()),
            Node::Seq(items) => self.stack.extend(items.iter().rev()),
            Node::Scalar(_) => {}
        }
        Some(node)
    }
}

impl From<serde_json::Value> for Node {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Node::Scalar(Scalar::Null),
            Value::Bool(b) => Node::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Node::Scalar(Scalar::Number(n)),
            Value::String(s) => Node::Scalar(Scalar::String(s)),
            Value::Array(items) => Node::Seq(items.into_iter().map(Node::from).collect()),
            Value::Object(map) => {
                Node::Map(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
        }
    }
}

impl From<serde_yaml::Value> for Node {
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value;
        match value {
            Value::Null => Node::Scalar(Scalar::Null),
            Value::Bool(b) => Node::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Node::Scalar(yaml_number(&n)),
            Value::String(s) => Node::Scalar(Scalar::String(s)),
            Value::Sequence(items) => Node::Seq(items.into_iter().map(Node::from).collect()),
            Value::Mapping(map) => Node::Map(
                map.into_iter()
                    .map(|(k, v)| (yaml_key(k), Node::from(v)))
                    .collect(),
            ),
            Value::Tagged(tagged) => {
                let tag = tagged.tag.to_string();
                let mut map = BTreeMap::new();
                map.insert(intrinsic_key(&tag), Node::from(tagged.value));
                Node::Map(map)
            }
        }
    }
}

/// Map a YAML short-form tag to its long-form intrinsic key.
///
/// `!Ref` -> `Ref`, `!GetAtt` -> `Fn::GetAtt`, `!Fn::Sub` -> `Fn::Sub`.
fn intrinsic_key(tag: &str) -> String {
    let name = tag.trim_start_matches('!');
    if name == "Ref" || name == "Condition" || name.starts_with("Fn::") {
        name.to_string()
    } else {
        format!("Fn::{}", name)
    }
}

fn yaml_number(n: &serde_yaml::Number) -> Scalar {
    if let Some(i) = n.as_i64() {
        Scalar::Number(i.into())
    } else if let Some(u) = n.as_u64() {
        Scalar::Number(u.into())
    } else {
        n.as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Scalar::Number)
            .unwrap_or_else(|| Scalar::String(n.to_string()))
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    use serde_yaml::Value;
    match key {
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
