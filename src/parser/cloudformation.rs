// CloudFormation loader (YAML or JSON) and intrinsic-function extractor

use super::{
    provider_label, record_parse_error, IacFormat, IacParser, Load, LoadContext, ParseErrors, References,
    Resource, ResourceSet,
};
use crate::error::{Error, Result};
use crate::source::SourceFile;
use crate::tree::Node;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

/// `${Logical}` or `${Logical.Attr}` inside a Sub template or bare string
static SUB_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9]+)(?:\.[^\}]+)?\}").expect("sub pattern is valid")
});

/// Parse a template; `.json` files as JSON, everything else as YAML
pub fn parse_template(path: &Path, text: &str) -> Result<Node> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Ok(Node::from(value))
    } else {
        let value: serde_yaml::Value = serde_yaml::from_str(text)?;
        Ok(Node::from(value))
    }
}

/// Resources of a template: entries of `Resources` that are maps with a `Type`
pub fn resources_from_template(doc: &Node, file: &Path) -> Vec<Resource> {
    let Some(entries) = doc.get("Resources").and_then(Node::as_map) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|(logical_id, body)| {
            let kind = body.get("Type").and_then(Node::as_str)?;
            Some(Resource::new(
                logical_id.clone(),
                kind,
                guess_provider(kind),
                IacFormat::CloudFormation,
                body.clone(),
                file,
            ))
        })
        .collect()
}

/// Provider from the first `::` segment (`AWS::EC2::VPC` -> `AWS`)
pub fn guess_provider(kind: &str) -> String {
    provider_label(kind.split("::").next().unwrap_or(""))
}

fn scan_sub(template: &str, out: &mut References) {
    for caps in SUB_VAR.captures_iter(template) {
        out.insert(caps[1].to_string());
    }
}

/// Logical ids named by `Ref`, `Fn::GetAtt`, `Fn::Sub`, `${...}` strings and
/// `DependsOn` anywhere in the body
pub fn extract_references(attributes: &Node) -> References {
    let mut refs = References::new();

    for node in attributes.walk() {
        match node {
            Node::Map(map) => {
                if let Some(target) = map.get("Ref").and_then(Node::as_str) {
                    refs.insert(target.to_string());
                }

                match map.get("Fn::GetAtt") {
                    Some(Node::Seq(items)) => {
                        if let Some(target) = items.first().and_then(Node::as_str) {
                            refs.insert(target.to_string());
                        }
                    }
                    Some(other) => {
                        if let Some(target) = other.as_str().and_then(|s| s.split('.').next()) {
                            refs.insert(target.to_string());
                        }
                    }
                    None => {}
                }

                match map.get("Fn::Sub") {
                    Some(Node::Seq(items)) => {
                        if let Some(template) = items.first().and_then(Node::as_str) {
                            scan_sub(template, &mut refs);
                        }
                    }
                    Some(other) => {
                        if let Some(template) = other.as_str() {
                            scan_sub(template, &mut refs);
                        }
                    }
                    None => {}
                }

                if let Some(depends) = map.get("DependsOn") {
                    refs.extend(depends.string_or_list().into_iter().map(str::to_string));
                }
            }
            Node::Scalar(_) => {
                if let Some(text) = node.as_str() {
                    scan_sub(text, &mut refs);
                }
            }
            Node::Seq(_) => {}
        }
    }

    refs
}

/// CloudFormation adapter
#[derive(Debug, Default)]
pub struct CloudFormationParser;

impl CloudFormationParser {
    pub fn new() -> Self {
        Self
    }
}

impl IacParser for CloudFormationParser {
    fn format(&self) -> IacFormat {
        IacFormat::CloudFormation
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
            let doc = match parse_template(&file.path, &file.content) {
                Ok(doc) => doc,
                Err(e) => {
                    record_parse_error(errors, &file.path, &e.to_string());
                    continue;
                }
            };
            for resource in resources_from_template(&doc, &file.path) {
                resources.insert(resource.id.clone(), resource);
            }
        }

        if resources.is_empty() {
            return Err(Error::no_resources(IacFormat::CloudFormation));
        }

        debug!("Loaded {} CloudFormation resources", resources.len());
        Ok(Load {
            resources,
            remaps: Default::default(),
        })
    }
}
