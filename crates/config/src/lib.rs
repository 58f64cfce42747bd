//! Configuration loading, validation, and management for docpack.
//!
//! Loads configuration from `~/.docpack/config.toml` with environment
//! variable overrides. Every field has a serde default, so an empty file
//! (or no file) yields a working configuration.

use docpack_core::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.docpack/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Total token budget for one run
    #[serde(default = "default_total_budget")]
    pub total_budget: usize,

    /// Fraction of the total budget given to each category
    #[serde(default)]
    pub allocation: BudgetAllocation,

    /// Scoring constants
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Selection behaviour
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Token counting
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
}

fn default_total_budget() -> usize {
    100_000
}

/// Budget percentages per category, plus the reserved buffer.
///
/// The fractions must sum to 1.0; that check belongs to the budget allocator
/// and runs before anything is scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAllocation {
    #[serde(default = "default_metadata_pct")]
    pub metadata: f64,

    #[serde(default = "default_dependencies_pct")]
    pub dependencies: f64,

    #[serde(default = "default_structure_pct")]
    pub structure: f64,

    #[serde(default = "default_api_documentation_pct")]
    pub api_documentation: f64,

    #[serde(default = "default_examples_pct")]
    pub examples: f64,

    #[serde(default = "default_configuration_pct")]
    pub configuration: f64,

    #[serde(default = "default_buffer_pct")]
    pub buffer: f64,
}

fn default_metadata_pct() -> f64 {
    0.005
}
fn default_dependencies_pct() -> f64 {
    0.01
}
fn default_structure_pct() -> f64 {
    0.05
}
fn default_api_documentation_pct() -> f64 {
    0.60
}
fn default_examples_pct() -> f64 {
    0.20
}
fn default_configuration_pct() -> f64 {
    0.035
}
fn default_buffer_pct() -> f64 {
    0.10
}

impl Default for BudgetAllocation {
    fn default() -> Self {
        Self {
            metadata: default_metadata_pct(),
            dependencies: default_dependencies_pct(),
            structure: default_structure_pct(),
            api_documentation: default_api_documentation_pct(),
            examples: default_examples_pct(),
            configuration: default_configuration_pct(),
            buffer: default_buffer_pct(),
        }
    }
}

impl BudgetAllocation {
    /// The fraction configured for a category.
    pub fn fraction(&self, category: Category) -> f64 {
        match category {
            Category::Metadata => self.metadata,
            Category::Dependencies => self.dependencies,
            Category::Structure => self.structure,
            Category::ApiDocumentation => self.api_documentation,
            Category::Examples => self.examples,
            Category::Configuration => self.configuration,
        }
    }

    /// Build an allocation from a name → fraction map, as an external
    /// collaborator would hand it over. Unknown names are ignored; missing
    /// names are reported.
    pub fn from_map(map: &BTreeMap<String, f64>) -> Result<Self, String> {
        let get = |name: &str| {
            map.get(name)
                .copied()
                .ok_or_else(|| name.to_string())
        };
        Ok(Self {
            metadata: get("metadata")?,
            dependencies: get("dependencies")?,
            structure: get("structure")?,
            api_documentation: get("api_documentation")?,
            examples: get("examples")?,
            configuration: get("configuration")?,
            buffer: get("buffer")?,
        })
    }

    /// Category fractions followed by the buffer, in processing order.
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        let mut entries: Vec<(&'static str, f64)> = Category::ALL
            .iter()
            .map(|c| (c.as_str(), self.fraction(*c)))
            .collect();
        entries.push(("buffer", self.buffer));
        entries
    }
}

/// Tunable scoring constants: base priorities per item kind, then the
/// multiplicative modifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    // --- Base priorities ---
    #[serde(default = "default_public_class")]
    pub public_class: f64,
    #[serde(default = "default_public_function")]
    pub public_function: f64,
    #[serde(default = "default_entry_point")]
    pub entry_point: f64,
    #[serde(default = "default_configuration")]
    pub configuration: f64,
    #[serde(default = "default_private_member")]
    pub private_member: f64,
    #[serde(default = "default_test_usage")]
    pub test_usage: f64,
    #[serde(default = "default_example")]
    pub example: f64,
    #[serde(default = "default_property")]
    pub property: f64,
    #[serde(default = "default_magic_method")]
    pub magic_method: f64,
    #[serde(default = "default_module")]
    pub module: f64,
    #[serde(default = "default_metadata")]
    pub metadata: f64,
    #[serde(default = "default_dependencies")]
    pub dependencies: f64,

    // --- Modifiers ---
    #[serde(default = "default_well_documented_class")]
    pub well_documented_class: f64,
    #[serde(default = "default_well_documented_member")]
    pub well_documented_member: f64,
    #[serde(default = "default_class_doc_min_chars")]
    pub class_doc_min_chars: usize,
    #[serde(default = "default_member_doc_min_chars")]
    pub member_doc_min_chars: usize,
    #[serde(default = "default_inheritance")]
    pub inheritance: f64,
    #[serde(default = "default_keyword_class")]
    pub keyword_class: f64,
    #[serde(default = "default_keyword_member")]
    pub keyword_member: f64,
    #[serde(default = "default_framework_class")]
    pub framework_class: f64,
    #[serde(default = "default_framework_member")]
    pub framework_member: f64,
    #[serde(default = "default_entry_point_bonus")]
    pub entry_point_bonus: f64,
    #[serde(default = "default_private_class")]
    pub private_class: f64,
    #[serde(default = "default_private_member_penalty")]
    pub private_member_penalty: f64,
    #[serde(default = "default_basic_usage")]
    pub basic_usage: f64,
    #[serde(default = "default_executable")]
    pub executable: f64,

    /// Name fragments that mark an item as central to the project
    #[serde(default = "default_important_keywords")]
    pub important_keywords: Vec<String>,

    /// Framework name → indicative name/doc fragments
    #[serde(default = "default_framework_patterns")]
    pub framework_patterns: BTreeMap<String, Vec<String>>,
}

fn default_public_class() -> f64 {
    10.0
}
fn default_public_function() -> f64 {
    9.0
}
fn default_entry_point() -> f64 {
    10.0
}
fn default_configuration() -> f64 {
    6.0
}
fn default_private_member() -> f64 {
    3.0
}
fn default_test_usage() -> f64 {
    4.0
}
fn default_example() -> f64 {
    9.0
}
fn default_property() -> f64 {
    6.0
}
fn default_magic_method() -> f64 {
    4.0
}
fn default_module() -> f64 {
    5.0
}
fn default_metadata() -> f64 {
    10.0
}
fn default_dependencies() -> f64 {
    7.0
}
fn default_well_documented_class() -> f64 {
    1.3
}
fn default_well_documented_member() -> f64 {
    1.2
}
fn default_class_doc_min_chars() -> usize {
    50
}
fn default_member_doc_min_chars() -> usize {
    30
}
fn default_inheritance() -> f64 {
    1.2
}
fn default_keyword_class() -> f64 {
    1.3
}
fn default_keyword_member() -> f64 {
    1.2
}
fn default_framework_class() -> f64 {
    1.2
}
fn default_framework_member() -> f64 {
    1.1
}
fn default_entry_point_bonus() -> f64 {
    1.5
}
fn default_private_class() -> f64 {
    0.5
}
fn default_private_member_penalty() -> f64 {
    0.6
}
fn default_basic_usage() -> f64 {
    1.3
}
fn default_executable() -> f64 {
    1.1
}

fn default_important_keywords() -> Vec<String> {
    [
        "main", "init", "setup", "configure", "run", "execute", "process", "create", "build",
        "generate", "parse", "validate", "authenticate", "handle", "client", "server", "api",
        "handler", "manager", "controller", "service", "factory", "builder", "adapter",
        "strategy",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_framework_patterns() -> BTreeMap<String, Vec<String>> {
    let table: &[(&str, &[&str])] = &[
        ("flask", &["flask", "route", "blueprint"]),
        ("django", &["django", "queryset", "urlpatterns"]),
        ("fastapi", &["fastapi", "pydantic", "basemodel", "depends"]),
        ("sqlalchemy", &["sqlalchemy", "declarative_base", "session"]),
        ("pytest", &["pytest", "fixture", "parametrize"]),
        ("click", &["click", "command", "option"]),
        ("asyncio", &["asyncio", "coroutine", "await"]),
    ];
    table
        .iter()
        .map(|(name, patterns)| {
            (
                name.to_string(),
                patterns.iter().map(|p| p.to_string()).collect(),
            )
        })
        .collect()
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            public_class: default_public_class(),
            public_function: default_public_function(),
            entry_point: default_entry_point(),
            configuration: default_configuration(),
            private_member: default_private_member(),
            test_usage: default_test_usage(),
            example: default_example(),
            property: default_property(),
            magic_method: default_magic_method(),
            module: default_module(),
            metadata: default_metadata(),
            dependencies: default_dependencies(),
            well_documented_class: default_well_documented_class(),
            well_documented_member: default_well_documented_member(),
            class_doc_min_chars: default_class_doc_min_chars(),
            member_doc_min_chars: default_member_doc_min_chars(),
            inheritance: default_inheritance(),
            keyword_class: default_keyword_class(),
            keyword_member: default_keyword_member(),
            framework_class: default_framework_class(),
            framework_member: default_framework_member(),
            entry_point_bonus: default_entry_point_bonus(),
            private_class: default_private_class(),
            private_member_penalty: default_private_member_penalty(),
            basic_usage: default_basic_usage(),
            executable: default_executable(),
            important_keywords: default_important_keywords(),
            framework_patterns: default_framework_patterns(),
        }
    }
}

impl ScoringConfig {
    /// Every numeric constant with its name, for validation and display.
    fn constants(&self) -> [(&'static str, f64); 24] {
        [
            ("public_class", self.public_class),
            ("public_function", self.public_function),
            ("entry_point", self.entry_point),
            ("configuration", self.configuration),
            ("private_member", self.private_member),
            ("test_usage", self.test_usage),
            ("example", self.example),
            ("property", self.property),
            ("magic_method", self.magic_method),
            ("module", self.module),
            ("metadata", self.metadata),
            ("dependencies", self.dependencies),
            ("well_documented_class", self.well_documented_class),
            ("well_documented_member", self.well_documented_member),
            ("inheritance", self.inheritance),
            ("keyword_class", self.keyword_class),
            ("keyword_member", self.keyword_member),
            ("framework_class", self.framework_class),
            ("framework_member", self.framework_member),
            ("entry_point_bonus", self.entry_point_bonus),
            ("private_class", self.private_class),
            ("private_member_penalty", self.private_member_penalty),
            ("basic_usage", self.basic_usage),
            ("executable", self.executable),
        ]
    }
}

/// Which greedy procedure fills the sub-budgets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Per-item, efficiency-ranked fill (canonical).
    #[default]
    EfficiencyRanked,
    /// Legacy whole-module accumulation, kept for compatibility.
    WholeModule,
}

impl std::str::FromStr for SelectionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "efficiency_ranked" | "efficiency" => Ok(Self::EfficiencyRanked),
            "whole_module" | "module" => Ok(Self::WholeModule),
            other => Err(format!("unknown selection strategy: {other}")),
        }
    }
}

impl std::fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EfficiencyRanked => write!(f, "efficiency_ranked"),
            Self::WholeModule => write!(f, "whole_module"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub strategy: SelectionStrategy,

    /// Try to compress items that do not fit into the remaining headroom
    #[serde(default = "default_true")]
    pub compression: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::default(),
            compression: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// Path to a `tokenizer.json` for exact counts (needs the `hf-tokenizer` feature)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Scoring worker threads; 0 = available parallelism
    #[serde(default)]
    pub threads: usize,
}

impl AppConfig {
    /// Load configuration from the default path (~/.docpack/config.toml).
    ///
    /// Environment variables override the file:
    /// - `DOCPACK_TOTAL_BUDGET`
    /// - `DOCPACK_STRATEGY`
    /// - `DOCPACK_TOKENIZER`
    /// - `DOCPACK_THREADS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Apply `DOCPACK_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("DOCPACK_TOTAL_BUDGET") {
            self.total_budget = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "DOCPACK_TOTAL_BUDGET must be a non-negative integer, got '{raw}'"
                ))
            })?;
        }

        if let Some(raw) = lookup("DOCPACK_STRATEGY") {
            self.selection.strategy = raw
                .trim()
                .parse::<SelectionStrategy>()
                .map_err(ConfigError::ValidationError)?;
        }

        if let Some(raw) = lookup("DOCPACK_TOKENIZER") {
            self.tokenizer.path = Some(PathBuf::from(raw));
        }

        if let Some(raw) = lookup("DOCPACK_THREADS") {
            self.tokenizer.threads = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "DOCPACK_THREADS must be a non-negative integer, got '{raw}'"
                ))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".docpack")
    }

    /// Validate the configuration.
    ///
    /// Percentages are only range-checked here; whether they sum to 1.0 is
    /// decided by the budget allocator at the start of a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.allocation.entries() {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "allocation.{name} must be between 0.0 and 1.0, got {value}"
                )));
            }
        }

        for (name, value) in self.scoring.constants() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "scoring.{name} must be a non-negative number, got {value}"
                )));
            }
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            total_budget: default_total_budget(),
            allocation: BudgetAllocation::default(),
            scoring: ScoringConfig::default(),
            selection: SelectionConfig::default(),
            tokenizer: TokenizerConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for docpack_core::Error {
    fn from(err: ConfigError) -> Self {
        docpack_core::Error::Config {
            message: err.to_string(),
        }
    }
}
