use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "infragraph.toml";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub limits: LimitsConfig,
    pub discovery: DiscoveryConfig,
    pub output: OutputConfig,
    pub diagram: DiagramConfig,
}

/// Crude backpressure against pathological inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_files: usize,
    pub max_bytes_per_file: usize,
}

/// File discovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub exclude: Vec<String>,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub directory: PathBuf,
}

/// Diagram settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    pub enabled: bool,
    pub direction: Direction,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Mermaid,
    Json,
}

/// Flowchart direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    LR,
    RL,
    TB,
    BT,
}

impl Direction {
    /// Parse a direction, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "LR" => Some(Direction::LR),
            "RL" => Some(Direction::RL),
            "TB" | "TD" => Some(Direction::TB),
            "BT" => Some(Direction::BT),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::LR => "LR",
            Direction::RL => "RL",
            Direction::TB => "TB",
            Direction::BT => "BT",
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_files: 25,
            max_bytes_per_file: 30_000,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            exclude: vec![
                ".git/**".to_string(),
                ".terraform/**".to_string(),
                "node_modules/**".to_string(),
            ],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            directory: PathBuf::from("./artifacts"),
        }
    }
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            direction: Direction::default(),
        }
    }
}

/// CLI overrides, applied on top of the file config
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub output: Option<PathBuf>,
    pub exclude: Vec<String>,
    pub format: Option<String>,
    pub direction: Option<String>,
    pub max_files: Option<usize>,
    pub max_bytes: Option<usize>,
    pub no_diagrams: bool,
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file or return defaults
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Merge CLI arguments into config (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: CliOverrides) -> Result<()> {
        if let Some(out) = cli.output {
            self.output.directory = out;
        }

        if !cli.exclude.is_empty() {
            self.discovery.exclude.extend(cli.exclude);
        }

        if let Some(fmt) = cli.format {
            self.output.format = match fmt.to_lowercase().as_str() {
                "json" => OutputFormat::Json,
                "mermaid" | "mmd" => OutputFormat::Mermaid,
                "markdown" | "md" => OutputFormat::Markdown,
                other => return Err(Error::other(format!("Unknown format: {}", other))),
            };
        }

        if let Some(dir) = cli.direction {
            self.diagram.direction = Direction::parse(&dir).ok_or_else(|| {
                Error::config_validation(format!("direction must be LR, RL, TB or BT, got {}", dir))
            })?;
        }

        if let Some(n) = cli.max_files {
            self.limits.max_files = n;
        }

        if let Some(n) = cli.max_bytes {
            self.limits.max_bytes_per_file = n;
        }

        if cli.no_diagrams {
            self.diagram.enabled = false;
        }

        self.validate()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_files == 0 {
            return Err(Error::config_validation("max_files must be at least 1"));
        }

        if self.limits.max_bytes_per_file == 0 {
            return Err(Error::config_validation(
                "max_bytes_per_file must be at least 1",
            ));
        }

        for pattern in &self.discovery.exclude {
            glob::Pattern::new(pattern)?;
        }

        Ok(())
    }
}
