// Source file discovery and capped reading
//
// Every read goes through `SourceReader::read_limited`, which never fails:
// unreadable and binary files come back as an `<ERROR: ...>` string so one
// bad file cannot abort a run. Content reaches the loaders unredacted;
// `redact_secrets` is for text echoed back to the user.

use crate::config::Config;
use crate::error::Result;
use crate::parser::IacFormat;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;
use walkdir::WalkDir;

/// Appended to content cut at the byte cap
pub const TRUNCATION_MARKER: &str = "\n\n<TRUNCATED: file exceeded size limit>\n";

/// Prefix of synthetic content for files that could not be read
pub const ERROR_PREFIX: &str = "<ERROR:";

static SECRET_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(password|passwd|secret|token|access[_-]?key|secret[_-]?key|private[_-]?key)\s*([:=])\s*("[^"]*"|'[^']*'|[^\s#]+)"#,
    )
    .expect("secret pattern is valid")
});

/// Directories never worth descending into
const SKIPPED_DIRS: &[&str] = &[".git", ".terraform", "node_modules", ".venv", "venv"];

/// A file read for one run
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Format family by extension/name, `None` if unrecognized
    pub format: Option<IacFormat>,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            format: IacFormat::classify(&path),
            path,
            content: content.into(),
        }
    }

    /// Whether the content is a synthetic read error
    pub fn is_error(&self) -> bool {
        self.content.starts_with(ERROR_PREFIX)
    }
}

/// Reads IaC sources under the configured limits
#[derive(Debug, Clone)]
pub struct SourceReader {
    max_files: usize,
    max_bytes_per_file: usize,
    exclude: Vec<glob::Pattern>,
}

impl SourceReader {
    pub fn new(max_files: usize, max_bytes_per_file: usize) -> Self {
        Self {
            max_files,
            max_bytes_per_file,
            exclude: Vec::new(),
        }
    }

    /// Build a reader from config limits and exclude globs
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut reader = Self::new(config.limits.max_files, config.limits.max_bytes_per_file);
        for pattern in &config.discovery.exclude {
            reader.exclude.push(glob::Pattern::new(pattern)?);
        }
        Ok(reader)
    }

    /// Read a file, truncating past the byte cap. Never fails.
    pub fn read_limited(&self, path: &Path) -> String {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => return format!("{} failed to read file: {}>", ERROR_PREFIX, e),
        };

        if data.contains(&0) {
            return format!("{} binary file>", ERROR_PREFIX);
        }

        let (data, suffix) = if data.len() > self.max_bytes_per_file {
            (&data[..self.max_bytes_per_file], TRUNCATION_MARKER)
        } else {
            (&data[..], "")
        };

        let text = String::from_utf8_lossy(data);
        let mut text = text.replace("\r\n", "\n").replace('\r', "\n");
        text.push_str(suffix);
        text
    }

    /// Find IaC files under `root`, sorted, honoring exclude globs
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(root).follow_links(true).into_iter().filter_entry(|e| {
            e.depth() == 0
                || !e
                    .file_name()
                    .to_str()
                    .map(|n| SKIPPED_DIRS.contains(&n))
                    .unwrap_or(false)
        });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || IacFormat::classify(path).is_none() {
                continue;
            }
            if self.is_excluded(path, root) {
                continue;
            }
            files.push(path.to_path_buf());
        }

        files.sort();
        Ok(files)
    }

    fn is_excluded(&self, path: &Path, root: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        self.exclude.iter().any(|p| p.matches_path(relative))
    }

    /// Read the first `max_files` paths, in parallel, preserving order
    pub fn read_all(&self, paths: &[PathBuf], show_progress: bool) -> Vec<SourceFile> {
        let selected = &paths[..paths.len().min(self.max_files)];
        if selected.len() < paths.len() {
            debug!(
                "Input truncated from {} to {} files",
                paths.len(),
                selected.len()
            );
        }

        let progress = if show_progress {
            let pb = ProgressBar::new(selected.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            Some(pb)
        } else {
            None
        };

        let files = selected
            .par_iter()
            .map(|path| {
                let file = SourceFile::new(path.clone(), self.read_limited(path));
                if let Some(ref pb) = progress {
                    pb.inc(1);
                }
                file
            })
            .collect();

        if let Some(pb) = progress {
            pb.finish_with_message("Reading complete");
        }

        files
    }
}

/// Replace likely secret assignments with a quoted placeholder
pub fn redact_secrets(text: &str) -> String {
    SECRET_ASSIGNMENT
        .replace_all(text, r#"${1}${2}"REDACTED""#)
        .into_owned()
}

/// Split a whitespace-separated changed-files list
pub fn split_changed_files(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// Resolve `rel` under `root`, rejecting anything that escapes it
pub fn safe_path_under(root: &Path, rel: &str) -> Option<PathBuf> {
    let rel = rel.trim();
    if rel.is_empty() {
        return None;
    }

    let normalized = rel.replace('\\', "/");
    let candidate = Path::new(&normalized);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(normalized.trim_start_matches('/'))
    };

    let resolved = normalize(&joined);
    if resolved.starts_with(normalize(root)) {
        Some(resolved)
    } else {
        None
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
