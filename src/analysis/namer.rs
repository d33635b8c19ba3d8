// Module/environment naming
//
// Assigns globally unique ids to Terraform resources loaded from several
// environments and local modules, and records the remap tables that let
// locally written references (`aws_vpc.main`) still resolve afterwards.

use crate::parser::{Origin, Resource};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment names recognized anywhere in a path
pub const KNOWN_ENVIRONMENTS: &[&str] = &[
    "dev",
    "development",
    "preprod",
    "pre-prod",
    "prod",
    "production",
    "stage",
    "staging",
    "qa",
    "test",
    "uat",
    "sandbox",
    "shared",
];

/// Structural directories that are never environments
pub const STRUCTURAL_DIRS: &[&str] = &[
    "modules",
    "module",
    "account_config",
    "accounts",
    "artifacts",
    "templates",
    "template",
    "img",
    "images",
    "cloud_formation",
    "config",
    "configs",
];

/// Environment assigned to unplaced files once prefixing is active
pub const SHARED_ENVIRONMENT: &str = "shared";

pub fn is_known_environment(name: &str) -> bool {
    KNOWN_ENVIRONMENTS.contains(&name.trim().to_lowercase().as_str())
}

/// Guess the environment a file belongs to from its directory layout.
///
/// The directory right after a `terraform` component wins unless it is
/// structural; otherwise the first directory that is a known environment
/// name. Heuristic: unusual layouts can tag a structural directory.
pub fn detect_environment(path: &Path, root: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let dirs: Vec<String> = relative
        .parent()
        .map(|p| {
            p.components()
                .filter_map(|c| c.as_os_str().to_str())
                .map(str::to_lowercase)
                .collect()
        })
        .unwrap_or_default();

    for (idx, part) in dirs.iter().enumerate() {
        if part == "terraform" {
            if let Some(candidate) = dirs.get(idx + 1) {
                if is_known_environment(candidate) || !STRUCTURAL_DIRS.contains(&candidate.as_str()) {
                    return Some(candidate.clone());
                }
            }
        }
    }

    dirs.into_iter().find(|part| is_known_environment(part))
}

/// Insert `prefix` in front of the name part of a `type.name` id
pub fn apply_prefix(res_id: &str, prefix: &str) -> String {
    match res_id.split_once('.') {
        Some((r_type, name)) => format!("{}.{}{}", r_type, prefix, name),
        None => format!("{}{}", prefix, res_id),
    }
}

/// Scope prefix for a module inclusion, composed with the environment
pub fn module_scope(alias: &str, environment: Option<&str>) -> String {
    match environment {
        Some(env) => format!("{}__module_{}__", env, alias),
        None => format!("module_{}__", alias),
    }
}

/// Resolve a module `source` to a local directory inside `root`.
///
/// Registry and remote (`git::`, `https://`) sources are never expanded.
pub fn resolve_local_module_dir(source: &str, base_dir: &Path, root: &Path) -> Option<PathBuf> {
    let source = source.trim();
    if source.is_empty() || source.starts_with("git::") || source.contains("://") {
        return None;
    }

    let candidate = if source.starts_with('/') {
        PathBuf::from(source)
    } else if source.starts_with("./") || source.starts_with("../") {
        base_dir.join(source)
    } else {
        return None;
    };

    let candidate = candidate.canonicalize().ok()?;
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    if candidate.starts_with(&root) && candidate.is_dir() {
        Some(candidate)
    } else {
        None
    }
}

/// Local reference -> fully prefixed resource id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RemapTable(BTreeMap<String, String>);

impl RemapTable {
    pub fn insert(&mut self, local: impl Into<String>, prefixed: impl Into<String>) {
        self.0.insert(local.into(), prefixed.into());
    }

    pub fn get(&self, local: &str) -> Option<&str> {
        self.0.get(local).map(String::as_str)
    }

    /// Rewrite a reference, passing unmapped ones through unchanged
    pub fn resolve(&self, reference: &str) -> String {
        self.get(reference).unwrap_or(reference).to_string()
    }

}

/// Every remap table of one load
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RemapTables {
    /// Keyed by module scope prefix
    pub modules: BTreeMap<String, RemapTable>,
    /// Keyed by environment name
    pub environments: BTreeMap<String, RemapTable>,
}

impl RemapTables {
    /// Rewrite a reference written inside a resource with the given origin:
    /// module table first, then environment table.
    pub fn remap(&self, reference: &str, origin: &Origin) -> String {
        let mut resolved = reference.to_string();
        if let Some(table) = origin.module_scope.as_ref().and_then(|s| self.modules.get(s)) {
            resolved = table.resolve(&resolved);
        }
        if let Some(table) = origin.environment.as_ref().and_then(|e| self.environments.get(e)) {
            resolved = table.resolve(&resolved);
        }
        resolved
    }
}

/// Assigns ids and records remap tables for one load
#[derive(Debug)]
pub struct Namer {
    root: PathBuf,
    env_prefixing: bool,
    tables: RemapTables,
}

impl Namer {
    /// Inspect the file set; prefixing activates when it spans more than
    /// one environment.
    pub fn new<'a>(root: &Path, files: impl IntoIterator<Item = &'a Path>) -> Self {
        let environments: BTreeSet<String> = files
            .into_iter()
            .filter_map(|f| detect_environment(f, root))
            .collect();
        let env_prefixing = environments.len() > 1;
        if env_prefixing {
            debug!("Environment prefixing active for {:?}", environments);
        }

        Self {
            root: root.to_path_buf(),
            env_prefixing,
            tables: RemapTables::default(),
        }
    }

    /// Environment used for naming resources of `path`, if prefixing is active
    pub fn environment_for(&self, path: &Path) -> Option<String> {
        if !self.env_prefixing {
            return None;
        }
        Some(detect_environment(path, &self.root).unwrap_or_else(|| SHARED_ENVIRONMENT.to_string()))
    }

    /// Name a resource declared directly in an input file
    pub fn name_root(&mut self, mut resource: Resource, environment: Option<&str>) -> Resource {
        let logical = resource.id.clone();
        if let Some(env) = environment {
            let prefixed = apply_prefix(&logical, &format!("{}__", env));
            self.tables
                .environments
                .entry(env.to_string())
                .or_default()
                .insert(logical.clone(), prefixed.clone());
            resource.id = prefixed;
            resource.origin.environment = Some(env.to_string());
        }
        resource.origin.logical_id = logical;
        resource
    }

    /// Name a resource loaded from a local module directory
    pub fn name_module(
        &mut self,
        mut resource: Resource,
        scope: &str,
        environment: Option<&str>,
    ) -> Resource {
        let logical = resource.id.clone();
        let prefixed = apply_prefix(&logical, scope);
        self.tables
            .modules
            .entry(scope.to_string())
            .or_default()
            .insert(logical.clone(), prefixed.clone());

        resource.id = prefixed;
        resource.origin.logical_id = logical;
        resource.origin.module_scope = Some(scope.to_string());
        resource.origin.environment = environment.map(str::to_string);
        resource
    }

    pub fn into_tables(self) -> RemapTables {
        self.tables
    }
}
