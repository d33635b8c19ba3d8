// Analysis pipeline: load one format, build edges, derive the hierarchy

pub mod fallback;
pub mod graph;
pub mod hierarchy;
pub mod namer;

pub use fallback::fallback_chain;
pub use graph::*;
pub use hierarchy::*;
pub use namer::{RemapTable, RemapTables};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::parser::{default_parsers, IacFormat, IacParser, Load, LoadContext, ParseErrors};
use crate::source::{safe_path_under, SourceFile, SourceReader};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Reason reported when a run has nothing to read
pub const NO_FILES_REASON: &str = "No IaC files found";

/// Result of analyzing one project
#[derive(Debug, Serialize)]
pub struct AnalysisResult {
    /// Format whose resources were used
    pub format: IacFormat,
    /// Resources and edges
    #[serde(flatten)]
    pub graph: ResourceGraph,
    /// Network -> subnet -> resources
    pub hierarchy: NetworkHierarchy,
    /// Whether `graph.edges` is the heuristic chain
    pub used_fallback: bool,
    /// Files that failed to parse (path -> error message)
    pub parse_errors: ParseErrors,
}

/// Main analyzer that owns all state of a run
pub struct Analyzer {
    config: Config,
    reader: SourceReader,
    parsers: Vec<Box<dyn IacParser + Send + Sync>>,
    verbose: bool,
}

impl Analyzer {
    /// Create a new analyzer with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        let reader = SourceReader::from_config(&config)?;
        Ok(Self {
            config,
            reader,
            parsers: default_parsers(),
            verbose: false,
        })
    }

    /// Create analyzer with verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Discover and analyze every IaC file under `root`
    pub fn analyze(&self, root: &Path) -> Result<AnalysisResult> {
        let root = canonical_root(root)?;
        let paths = self.discover_files(&root)?;
        self.analyze_paths(&root, &paths)
    }

    /// Analyze an explicit changed-files list, relative to `root`.
    ///
    /// Entries escaping the root, missing, or of no known format are dropped.
    pub fn analyze_changed(&self, root: &Path, changed: &[String]) -> Result<AnalysisResult> {
        let root = canonical_root(root)?;
        let mut paths: Vec<PathBuf> = changed
            .iter()
            .filter_map(|rel| safe_path_under(&root, rel))
            .filter(|p| p.is_file() && IacFormat::classify(p).is_some())
            .collect();
        paths.sort();
        paths.dedup();
        debug!("{} of {} changed files are IaC sources", paths.len(), changed.len());

        self.analyze_paths(&root, &paths)
    }

    /// Discover IaC files under `root`
    pub fn discover_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        self.reader.discover(root)
    }

    fn analyze_paths(&self, root: &Path, paths: &[PathBuf]) -> Result<AnalysisResult> {
        if paths.is_empty() {
            return Err(Error::NoFormatMatched(NO_FILES_REASON.to_string()));
        }
        let files = self.reader.read_all(paths, self.verbose);
        self.analyze_files(root, &files)
    }

    /// Run the pipeline over files already read.
    ///
    /// Formats are tried in fixed order; the first to produce resources wins.
    pub fn analyze_files(&self, root: &Path, files: &[SourceFile]) -> Result<AnalysisResult> {
        if files.is_empty() {
            return Err(Error::NoFormatMatched(NO_FILES_REASON.to_string()));
        }

        let ctx = LoadContext {
            root,
            reader: &self.reader,
        };
        let mut parse_errors = ParseErrors::new();
        let mut attempted = Vec::new();

        for parser in &self.parsers {
            if parser.select(files).is_empty() {
                continue;
            }
            match parser.load(files, &ctx, &mut parse_errors) {
                Ok(load) => return Ok(self.finish(parser.format(), load, parse_errors)),
                Err(e) if e.is_fallthrough() => {
                    debug!("{}", e);
                    attempted.push(parser.format().to_string());
                }
                Err(e) => return Err(e),
            }
        }

        let reason = if attempted.is_empty() {
            NO_FILES_REASON.to_string()
        } else {
            format!("no resources parsed from {} files", attempted.join(", "))
        };
        Err(Error::NoFormatMatched(reason))
    }

    fn finish(&self, format: IacFormat, load: Load, parse_errors: ParseErrors) -> AnalysisResult {
        let mut graph = ResourceGraph::build(load.resources, &load.remaps);

        let mut used_fallback = false;
        if graph.edges.is_empty() {
            for edge in fallback_chain(&graph.resources) {
                graph.add_edge(edge);
            }
            used_fallback = !graph.edges.is_empty();
        }

        let hierarchy = build_hierarchy(&graph, &load.remaps);
        let stats = graph.stats();
        info!(
            "{}: {} resources, {} edges, {} networks",
            format,
            stats.resources,
            stats.edges,
            hierarchy.len()
        );

        AnalysisResult {
            format,
            graph,
            hierarchy,
            used_fallback,
            parse_errors,
        }
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf> {
    root.canonicalize()
        .map_err(|_| Error::PathNotFound(root.to_path_buf()))
}
