// Pulumi YAML loader and `${name.property}` expression extractor

use super::{
    record_parse_error, IacFormat, IacParser, Load, LoadContext, ParseErrors, References, Resource,
    ResourceSet,
};
use crate::error::{Error, Result};
use crate::source::SourceFile;
use crate::tree::Node;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

const PULUMI_PROVIDER: &str = "pulumi";

static EXPRESSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9_-]+)\.[^\}]+\}").expect("expression pattern is valid")
});

pub fn parse_program(text: &str) -> Result<Node> {
    let value: serde_yaml::Value = serde_yaml::from_str(text)?;
    Ok(Node::from(value))
}

/// Entries of the `resources` map that carry a string `type`
pub fn resources_from_program(doc: &Node, file: &Path) -> Vec<Resource> {
    let Some(entries) = doc.get("resources").and_then(Node::as_map) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|(name, body)| {
            let kind = body.get("type").and_then(Node::as_str)?;
            Some(Resource::new(
                name.clone(),
                kind,
                guess_provider(kind),
                IacFormat::Pulumi,
                body.clone(),
                file,
            ))
        })
        .collect()
}

/// Package segment of the type token (`aws:ec2:Vpc` -> `aws`), or `pulumi`
/// for tokens without one
pub fn guess_provider(kind: &str) -> String {
    match kind.split_once(':') {
        Some((package, _)) => package.to_string(),
        None => PULUMI_PROVIDER.to_string(),
    }
}

/// `${vpc}` -> `vpc`; anything else is returned trimmed
fn unwrap_interpolation(entry: &str) -> &str {
    let entry = entry.trim();
    entry
        .strip_prefix("${")
        .and_then(|s| s.strip_suffix('}'))
        .map(str::trim)
        .unwrap_or(entry)
}

/// Resource names used in `${name.property}` expressions and in
/// `options.dependsOn`
pub fn extract_references(attributes: &Node) -> References {
    let mut refs = References::new();

    for text in attributes.strings() {
        for caps in EXPRESSION.captures_iter(text) {
            refs.insert(caps[1].to_string());
        }
    }

    if let Some(depends) = attributes.get("options").and_then(|o| o.get("dependsOn")) {
        for entry in depends.string_or_list() {
            let name = unwrap_interpolation(entry);
            if !name.is_empty() {
                refs.insert(name.to_string());
            }
        }
    }

    refs
}

/// Pulumi YAML adapter
#[derive(Debug, Default)]
pub struct PulumiParser;

impl PulumiParser {
    pub fn new() -> Self {
        Self
    }
}

impl IacParser for PulumiParser {
    fn format(&self) -> IacFormat {
        IacFormat::Pulumi
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
            let doc = match parse_program(&file.content) {
                Ok(doc) => doc,
                Err(e) => {
                    record_parse_error(errors, &file.path, &e.to_string());
                    continue;
                }
            };
            for resource in resources_from_program(&doc, &file.path) {
                resources.insert(resource.id.clone(), resource);
            }
        }

        if resources.is_empty() {
            return Err(Error::no_resources(IacFormat::Pulumi));
        }

        debug!("Loaded {} Pulumi resources", resources.len());
        Ok(Load {
            resources,
            remaps: Default::default(),
        })
    }
}
