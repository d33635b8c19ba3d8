// Terraform HCL loader and interpolation reference extractor

use super::{
    provider_label, record_parse_error, IacFormat, IacParser, Load, LoadContext, ParseErrors, References,
    Resource, ResourceSet,
};
use crate::analysis::namer::{module_scope, resolve_local_module_dir, Namer};
use crate::error::{Error, Result};
use crate::source::SourceFile;
use crate::tree::Node;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

/// `identifier.identifier(.attr)*`, anchored; the caller enforces the
/// "not preceded by a word character or `-`" rule.
static TRAVERSAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_]+)\.([A-Za-z0-9_]+)(?:\.[A-Za-z0-9_]+)*")
        .expect("traversal pattern is valid")
});

/// A `resource "type" "name"` block
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredResource {
    pub resource_type: String,
    pub name: String,
    pub attributes: Node,
}

impl DeclaredResource {
    pub fn id(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }

    fn into_resource(self, file: &Path) -> Resource {
        let provider = guess_provider(&self.resource_type);
        Resource::new(
            self.id(),
            self.resource_type,
            provider,
            IacFormat::Terraform,
            self.attributes,
            file,
        )
    }
}

/// A `module "alias" { source = ... }` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCall {
    pub alias: String,
    pub source: String,
}

/// Parse HCL text into a document tree.
///
/// Non-literal expressions come back as `${...}` strings.
pub fn parse_hcl(text: &str) -> Result<Node> {
    let value: serde_json::Value = hcl::from_str(text)?;
    Ok(Node::from(value))
}

/// Maps held by a node that may be a map or a list of maps
fn maps_of(node: &Node) -> Vec<&BTreeMap<String, Node>> {
    match node {
        Node::Map(map) => vec![map],
        Node::Seq(items) => items.iter().filter_map(Node::as_map).collect(),
        Node::Scalar(_) => Vec::new(),
    }
}

/// Every resource declared in a parsed document; `null_*` types are skipped
pub fn resources_from_document(doc: &Node) -> Vec<DeclaredResource> {
    let mut out = Vec::new();
    let Some(block) = doc.get("resource") else {
        return out;
    };

    for by_type in maps_of(block) {
        for (resource_type, by_name) in by_type {
            if resource_type.starts_with("null_") {
                continue;
            }
            for names in maps_of(by_name) {
                for (name, attributes) in names {
                    out.push(DeclaredResource {
                        resource_type: resource_type.clone(),
                        name: name.clone(),
                        attributes: attributes.clone(),
                    });
                }
            }
        }
    }
    out
}

/// Every `module` block with a string `source`
pub fn modules_from_document(doc: &Node) -> Vec<ModuleCall> {
    let mut out = Vec::new();
    let Some(block) = doc.get("module") else {
        return out;
    };

    for by_alias in maps_of(block) {
        for (alias, body) in by_alias {
            let source = maps_of(body)
                .into_iter()
                .find_map(|b| b.get("source").and_then(Node::as_str));
            if let Some(source) = source {
                out.push(ModuleCall {
                    alias: alias.clone(),
                    source: source.to_string(),
                });
            }
        }
    }
    out
}

/// Provider label from the type prefix (`aws_vpc` -> `AWS`)
pub fn guess_provider(resource_type: &str) -> String {
    let prefix = resource_type.split('_').next().unwrap_or("");
    provider_label(prefix)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Collect `a.b` pairs from one string
fn scan_traversals(text: &str, out: &mut References) {
    let mut i = 0;
    let mut prev: Option<char> = None;

    while let Some(c) = text[i..].chars().next() {
        let blocked = prev.map(|p| is_word_char(p) || p == '-').unwrap_or(false);
        if !blocked && (c.is_ascii_alphanumeric() || c == '_') {
            if let Some(caps) = TRAVERSAL.captures(&text[i..]) {
                out.insert(format!("{}.{}", &caps[1], &caps[2]));
                let end = i + caps[0].len();
                prev = text[..end].chars().next_back();
                i = end;
                continue;
            }
        }
        prev = Some(c);
        i += c.len_utf8();
    }
}

/// Every `type.name` candidate in string scalars of the body, `depends_on`
/// entries included.
pub fn extract_references(attributes: &Node) -> References {
    let mut refs = References::new();
    for text in attributes.strings() {
        scan_traversals(text, &mut refs);
    }
    refs
}

/// `*.tf` then `*.hcl` files directly inside a module directory, sorted
fn module_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list module dir {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut tf = Vec::new();
    let mut hcl = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("tf") => tf.push(path),
            Some("hcl") => hcl.push(path),
            _ => {}
        }
    }
    tf.sort();
    hcl.sort();
    tf.extend(hcl);
    tf
}

fn canonical_parent(path: &Path) -> Option<PathBuf> {
    path.parent()?.canonicalize().ok()
}

/// Local module directories called from top-level files.
///
/// A file is top-level when no input file calls its directory as a module.
/// Files inside the returned directories are loaded through their callers
/// only, under the module scope.
fn called_module_dirs(parsed: &[(&SourceFile, Node)], root: &Path) -> BTreeSet<PathBuf> {
    let calls: Vec<(Option<PathBuf>, PathBuf)> = parsed
        .iter()
        .flat_map(|(file, doc)| {
            let base_dir = file.path.parent().unwrap_or(root);
            let caller = canonical_parent(&file.path);
            modules_from_document(doc).into_iter().filter_map(move |call| {
                resolve_local_module_dir(&call.source, base_dir, root).map(|dir| (caller.clone(), dir))
            })
        })
        .collect();

    let all: BTreeSet<&PathBuf> = calls.iter().map(|(_, dir)| dir).collect();
    calls
        .iter()
        .filter(|(caller, _)| caller.as_ref().map_or(true, |c| !all.contains(c)))
        .map(|(_, dir)| dir.clone())
        .collect()
}

/// Terraform adapter
#[derive(Debug, Default)]
pub struct TerraformParser;

impl TerraformParser {
    pub fn new() -> Self {
        Self
    }
}

/// Mutable state of one Terraform load
struct LoadState<'c, 'a> {
    ctx: &'c LoadContext<'a>,
    namer: Namer,
    resources: ResourceSet,
    errors: &'c mut ParseErrors,
}

impl LoadState<'_, '_> {
    fn add_root(&mut self, declared: DeclaredResource, file: &Path, environment: Option<&str>) {
        let resource = self.namer.name_root(declared.into_resource(file), environment);
        self.resources.insert(resource.id.clone(), resource);
    }

    fn add_module(&mut self, call: &ModuleCall, base_dir: &Path, environment: Option<&str>) {
        let Some(dir) = resolve_local_module_dir(&call.source, base_dir, self.ctx.root) else {
            debug!("Module {} source {} is not local, skipped", call.alias, call.source);
            return;
        };

        let scope = module_scope(&call.alias, environment);
        for path in module_files(&dir) {
            let file = SourceFile::new(&path, self.ctx.reader.read_limited(&path));
            let Some(doc) = parse_file(&file, self.errors) else {
                continue;
            };
            for declared in resources_from_document(&doc) {
                let resource = self
                    .namer
                    .name_module(declared.into_resource(&path), &scope, environment);
                self.resources.insert(resource.id.clone(), resource);
            }
        }
    }
}

/// Parse one file, recording a failure instead of raising it
fn parse_file(file: &SourceFile, errors: &mut ParseErrors) -> Option<Node> {
    if file.is_error() {
        record_parse_error(errors, &file.path, &file.content);
        return None;
    }
    match parse_hcl(&file.content) {
        Ok(doc) => Some(doc),
        Err(e) => {
            record_parse_error(errors, &file.path, &e.to_string());
            None
        }
    }
}

impl IacParser for TerraformParser {
    fn format(&self) -> IacFormat {
        IacFormat::Terraform
    }

    fn load(
        &self,
        files: &[SourceFile],
        ctx: &LoadContext<'_>,
        errors: &mut ParseErrors,
    ) -> Result<Load> {
        let parsed: Vec<(&SourceFile, Node)> = self
            .select(files)
            .into_iter()
            .filter_map(|file| parse_file(file, errors).map(|doc| (file, doc)))
            .collect();

        let skipped = called_module_dirs(&parsed, ctx.root);
        let kept: Vec<&(&SourceFile, Node)> = parsed
            .iter()
            .filter(|(file, _)| {
                let inside = canonical_parent(&file.path).is_some_and(|dir| skipped.contains(&dir));
                if inside {
                    debug!("{} belongs to a called module, not loaded as a root", file.path.display());
                }
                !inside
            })
            .collect();

        let mut state = LoadState {
            ctx,
            namer: Namer::new(ctx.root, kept.iter().map(|(f, _)| f.path.as_path())),
            resources: ResourceSet::new(),
            errors,
        };

        for (file, doc) in kept {
            let environment = state.namer.environment_for(&file.path);
            for declared in resources_from_document(doc) {
                state.add_root(declared, &file.path, environment.as_deref());
            }

            let base_dir = file.path.parent().unwrap_or(ctx.root);
            for call in modules_from_document(doc) {
                state.add_module(&call, base_dir, environment.as_deref());
            }
        }

        if state.resources.is_empty() {
            return Err(Error::no_resources(IacFormat::Terraform));
        }

        debug!("Loaded {} Terraform resources", state.resources.len());
        Ok(Load {
            resources: state.resources,
            remaps: state.namer.into_tables(),
        })
    }
}
