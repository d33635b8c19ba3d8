// Bicep loader and symbol extractor
//
// Best-effort line scanner, not a grammar: declarations are found by a
// line pattern and bodies by brace counting. Strings containing braces or
// unusual formatting can confuse it.

use super::{
    record_parse_error, IacFormat, IacParser, Load, LoadContext, ParseErrors, References, Resource, ResourceSet,
};
use crate::error::{Error, Result};
use crate::source::SourceFile;
use crate::tree::Node;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

static RESOURCE_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*resource\s+([A-Za-z_][A-Za-z0-9_]*)\s+'([^']+)'")
        .expect("resource pattern is valid")
});

static SYMBOL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\b").expect("symbol pattern is valid")
});

static PARENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*parent\s*:\s*").expect("parent pattern is valid"));

static DEPENDS_ON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*dependsOn\s*:\s*\[").expect("dependsOn pattern is valid"));

pub const PROVIDER: &str = "Azure";

/// One `resource <symbol> '<type>@<api>' = { ... }` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub symbol: String,
    /// Quoted type reference, api version included
    pub raw_type: String,
    /// Declaration line through the closing brace
    pub body: String,
}

impl Declaration {
    /// Type without the `@api-version` suffix
    pub fn kind(&self) -> &str {
        self.raw_type.split('@').next().unwrap_or(&self.raw_type)
    }

    fn into_resource(self, file: &Path) -> Resource {
        let kind = self.kind().to_string();
        let mut attributes = BTreeMap::new();
        attributes.insert("Type".to_string(), Node::string(kind.clone()));
        attributes.insert("RawType".to_string(), Node::string(self.raw_type));
        attributes.insert("Provider".to_string(), Node::string(PROVIDER));
        attributes.insert("Body".to_string(), Node::string(self.body));

        Resource::new(
            self.symbol,
            kind,
            PROVIDER,
            IacFormat::Bicep,
            Node::Map(attributes),
            file,
        )
    }
}

fn brace_delta(line: &str) -> i32 {
    line.chars().fold(0, |depth, c| match c {
        '{' => depth + 1,
        '}' => depth - 1,
        _ => depth,
    })
}

fn flush(current: &mut Option<(Declaration, Vec<&str>)>, out: &mut Vec<Declaration>) {
    if let Some((mut decl, lines)) = current.take() {
        decl.body = lines.join("\n");
        out.push(decl);
    }
}

/// Scan text for resource declarations.
///
/// Depth resets at each declaration line; a body ends on a line starting
/// with `}` that brings the depth back to zero.
pub fn scan_declarations(text: &str) -> Vec<Declaration> {
    let mut out = Vec::new();
    let mut current: Option<(Declaration, Vec<&str>)> = None;
    let mut depth = 0;

    for line in text.lines() {
        if let Some(caps) = RESOURCE_DECL.captures(line) {
            flush(&mut current, &mut out);
            let decl = Declaration {
                symbol: caps[1].to_string(),
                raw_type: caps[2].to_string(),
                body: String::new(),
            };
            current = Some((decl, vec![line]));
            depth = brace_delta(line);
            if depth <= 0 && line.contains('{') {
                flush(&mut current, &mut out);
            }
            continue;
        }

        if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
            depth += brace_delta(line);
            if depth <= 0 && line.trim_start().starts_with('}') {
                flush(&mut current, &mut out);
            }
        }
    }

    flush(&mut current, &mut out);
    out
}

fn symbols(segment: &str, out: &mut References) {
    for caps in SYMBOL.captures_iter(segment) {
        out.insert(caps[1].to_string());
    }
}

/// Symbols named by `parent:` and `dependsOn: [...]` in the `Body` text.
///
/// Not filtered to declared symbols; the graph builder does that.
pub fn extract_references(attributes: &Node) -> References {
    let mut refs = References::new();
    let Some(body) = attributes.get("Body").and_then(Node::as_str) else {
        return refs;
    };

    let mut collecting = false;
    for line in body.lines() {
        if collecting {
            match line.find(']') {
                Some(end) => {
                    symbols(&line[..end], &mut refs);
                    collecting = false;
                }
                None => symbols(line, &mut refs),
            }
            continue;
        }

        if let Some(m) = PARENT.find(line) {
            if let Some(caps) = SYMBOL.captures(&line[m.end()..]) {
                refs.insert(caps[1].to_string());
            }
        } else if let Some(m) = DEPENDS_ON.find(line) {
            let rest = &line[m.end()..];
            match rest.find(']') {
                Some(end) => symbols(&rest[..end], &mut refs),
                None => {
                    symbols(rest, &mut refs);
                    collecting = true;
                }
            }
        }
    }

    refs
}

/// Bicep adapter
#[derive(Debug, Default)]
pub struct BicepParser;

impl BicepParser {
    pub fn new() -> Self {
        Self
    }
}

impl IacParser for BicepParser {
    fn format(&self) -> IacFormat {
        IacFormat::Bicep
    }

    fn load(
        &self,
        files: &[SourceFile],
        _ctx: &LoadContext<'_>,
        errors: &mut ParseErrors,
    ) -> Result<Load> {
        let mut resources = ResourceSet::new();

        for file in self.select(files) {
            if file.is_error() {
                record_parse_error(errors, &file.path, &file.content);
                continue;
            }
            for decl in scan_declarations(&file.content) {
                let resource = decl.into_resource(&file.path);
                resources.insert(resource.id.clone(), resource);
            }
        }

        if resources.is_empty() {
            return Err(Error::no_resources(IacFormat::Bicep));
        }

        debug!("Loaded {} Bicep resources", resources.len());
        Ok(Load {
            resources,
            remaps: Default::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"param location string = resourceGroup().location

resource vnet 'Microsoft.Network/virtualNetworks@2023-04-01' = {
  name: 'vnet-main'
  location: location
  properties: {
    addressSpace: {
      addressPrefixes: ['10.0.0.0/16']
    }
  }
}

resource subnet 'Microsoft.Network/virtualNetworks/subnets@2023-04-01' = {
  parent: vnet
  name: 'app'
}

resource nic 'Microsoft.Network/networkInterfaces@2023-04-01' = {
  name: 'nic'
  dependsOn: [
    subnet
    vnet
  ]
}

resource logs 'Microsoft.OperationalInsights/workspaces@2022-10-01' existing = { name: 'logs' }
"#;

    fn attrs(body: &str) -> Node {
        let mut map = BTreeMap::new();
        map.insert("Body".to_string(), Node::string(body));
        Node::Map(map)
    }

    #[test]
    fn test_scan_declarations() {
        let decls = scan_declarations(TEMPLATE);
        let symbols: Vec<&str> = decls.iter().map(|d| d.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["vnet", "subnet", "nic", "logs"]);
        assert_eq!(decls[0].kind(), "Microsoft.Network/virtualNetworks");
        assert!(decls[0].body.contains("addressPrefixes"));
        assert!(!decls[0].body.contains("parent"));
        assert!(decls[3].body.contains("existing"));
    }

    #[test]
    fn test_parent_reference() {
        let decls = scan_declarations(TEMPLATE);
        let subnet = decls[1].clone().into_resource(Path::new("main.bicep"));
        let refs: Vec<String> = extract_references(&subnet.attributes).into_iter().collect();
        assert_eq!(refs, vec!["vnet"]);
        assert_eq!(subnet.provider, "Azure");
        assert_eq!(subnet.kind, "Microsoft.Network/virtualNetworks/subnets");
    }

    #[test]
    fn test_multiline_depends_on() {
        let decls = scan_declarations(TEMPLATE);
        let nic = decls[2].clone().into_resource(Path::new("main.bicep"));
        let refs: Vec<String> = extract_references(&nic.attributes).into_iter().collect();
        assert_eq!(refs, vec!["subnet", "vnet"]);
    }

    #[test]
    fn test_single_line_depends_on() {
        let refs: Vec<String> = extract_references(&attrs("  dependsOn: [a, b]\n  name: 'x'"))
            .into_iter()
            .collect();
        assert_eq!(refs, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_body_yields_nothing() {
        assert_eq!(extract_references(&Node::Map(Default::default())), References::new());
    }
}
