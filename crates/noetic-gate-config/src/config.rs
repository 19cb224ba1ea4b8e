// noetic-gate-config/src/config.rs
// ============================================================================
// Module: Noetic Gate Configuration
// Description: Configuration loading and validation for a Noetic Gate host.
// Purpose: Provide strict, fail-closed config parsing with boundary-validated
//          defaults the runner falls back on when a request omits them (§10.3).
// Dependencies: noetic-gate-core, serde, toml, ron, serde_yaml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML, RON, or YAML file, selected by file
//! extension. Missing or invalid configuration fails closed: `load` refuses
//! to hand back a config the runner could misinterpret as "no budget limit".

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use noetic_gate_core::LayerSource;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "noetic-gate.toml";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Default token budget applied when a run request omits one.
const DEFAULT_TOKEN_BUDGET: u64 = 10_000;
/// Default tool-call budget applied when a run request omits one.
const DEFAULT_TOOL_CALL_BUDGET: u32 = 50;
/// Default wall-clock time budget, in seconds, applied when a run request omits one.
const DEFAULT_TIME_BUDGET_SECONDS: u64 = 600;
/// Default risk envelope applied when a run request omits one.
const DEFAULT_RISK_ENVELOPE: f64 = 1.0;
/// Default maximum tolerable loss applied when a run request omits one.
const DEFAULT_RISK_MAX_LOSS: f64 = 0.1;
/// Default evidence-staleness window, in seconds, for freshly observed evidence.
const DEFAULT_STALE_IF_OLDER_THAN_SECONDS: u64 = 300;
/// Default template registry directory, relative to the host's working directory.
const DEFAULT_TEMPLATE_REGISTRY_PATH: &str = "templates";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading or validating an [`OrchestratorConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the config file from disk failed.
    #[error("config io error: {0}")]
    Io(String),
    /// The file extension does not map to a supported format.
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),
    /// The file's contents could not be parsed in the detected format.
    #[error("config parse error: {0}")]
    Parse(String),
    /// The configuration parsed but failed a boundary or consistency check.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Root configuration for a Noetic Gate host process.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    /// Default episode budgets applied when `run_template` omits them.
    #[serde(default)]
    pub defaults: DefaultBudgetsConfig,
    /// Location of the episode template registry.
    #[serde(default)]
    pub template_registry: TemplateRegistryConfig,
    /// Per-layer system-prompt file paths.
    #[serde(default)]
    pub prompts: PromptPathsConfig,
    /// Evidence freshness defaults.
    #[serde(default)]
    pub evidence: EvidenceDefaultsConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            defaults: DefaultBudgetsConfig::default(),
            template_registry: TemplateRegistryConfig::default(),
            prompts: PromptPathsConfig::default(),
            evidence: EvidenceDefaultsConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Loads configuration from disk, selecting a deserializer by the path's
    /// extension (`.toml`, `.ron`, `.yaml`/`.yml`).
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] when the file cannot be read,
    /// [`ConfigError::UnsupportedFormat`] for an unrecognized extension,
    /// [`ConfigError::Parse`] when the content does not parse, or
    /// [`ConfigError::Invalid`] when parsed values fail validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_owned()));
        }
        let content = std::str::from_utf8(&bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_owned()))?;
        let config = parse_by_extension(path, content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration's boundary and consistency constraints.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] when any field is out of range or
    /// structurally inconsistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.defaults.validate()?;
        self.template_registry.validate()?;
        self.prompts.validate()?;
        self.evidence.validate()?;
        Ok(())
    }
}

fn parse_by_extension(path: &Path, content: &str) -> Result<OrchestratorConfig, ConfigError> {
    match path.extension().and_then(std::ffi::OsStr::to_str) {
        Some("toml") => toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string())),
        Some("ron") => ron::from_str(content).map_err(|err| ConfigError::Parse(err.to_string())),
        Some("yaml" | "yml") => serde_yaml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string())),
        Some(other) => Err(ConfigError::UnsupportedFormat(other.to_owned())),
        None => Err(ConfigError::UnsupportedFormat("(no extension)".to_owned())),
    }
}

/// Default episode budgets, applied by the runner when a `RunTemplateRequest`
/// omits the corresponding field.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct DefaultBudgetsConfig {
    /// Default token budget.
    #[serde(default = "default_token_budget")]
    pub token_budget: u64,
    /// Default tool-call budget.
    #[serde(default = "default_tool_call_budget")]
    pub tool_call_budget: u32,
    /// Default wall-clock time budget, in seconds.
    #[serde(default = "default_time_budget_seconds")]
    pub time_budget_seconds: u64,
    /// Default risk envelope in `[0, 1]`.
    #[serde(default = "default_risk_envelope")]
    pub risk_envelope: f64,
    /// Default maximum tolerable loss in `[0, 1]`.
    #[serde(default = "default_risk_max_loss")]
    pub risk_max_loss: f64,
}

impl Default for DefaultBudgetsConfig {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            tool_call_budget: default_tool_call_budget(),
            time_budget_seconds: default_time_budget_seconds(),
            risk_envelope: default_risk_envelope(),
            risk_max_loss: default_risk_max_loss(),
        }
    }
}

impl DefaultBudgetsConfig {
    /// Validates that every budget field is non-negative and risk fields fall
    /// inside `[0, 1]`.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.risk_envelope) {
            return Err(ConfigError::Invalid("defaults.risk_envelope must be within [0, 1]".to_owned()));
        }
        if !(0.0..=1.0).contains(&self.risk_max_loss) {
            return Err(ConfigError::Invalid("defaults.risk_max_loss must be within [0, 1]".to_owned()));
        }
        if self.time_budget_seconds == 0 {
            return Err(ConfigError::Invalid("defaults.time_budget_seconds must be greater than zero".to_owned()));
        }
        Ok(())
    }
}

const fn default_token_budget() -> u64 {
    DEFAULT_TOKEN_BUDGET
}

const fn default_tool_call_budget() -> u32 {
    DEFAULT_TOOL_CALL_BUDGET
}

const fn default_time_budget_seconds() -> u64 {
    DEFAULT_TIME_BUDGET_SECONDS
}

const fn default_risk_envelope() -> f64 {
    DEFAULT_RISK_ENVELOPE
}

const fn default_risk_max_loss() -> f64 {
    DEFAULT_RISK_MAX_LOSS
}

/// Location of the episode template registry: a directory of RON template files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TemplateRegistryConfig {
    /// Directory containing `*.ron` episode template files.
    #[serde(default = "default_template_registry_path")]
    pub path: PathBuf,
}

impl Default for TemplateRegistryConfig {
    fn default() -> Self {
        Self {
            path: default_template_registry_path(),
        }
    }
}

impl TemplateRegistryConfig {
    /// Validates that the configured path is non-empty.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("template_registry.path must be non-empty".to_owned()));
        }
        Ok(())
    }

    /// Lists the `*.ron` template files in the registry directory.
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] when the directory cannot be read.
    pub fn template_files(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let entries = fs::read_dir(&self.path).map_err(|err| ConfigError::Io(err.to_string()))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| ConfigError::Io(err.to_string()))?;
            let candidate = entry.path();
            if candidate.extension().and_then(std::ffi::OsStr::to_str) == Some("ron") {
                files.push(candidate);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn default_template_registry_path() -> PathBuf {
    PathBuf::from(DEFAULT_TEMPLATE_REGISTRY_PATH)
}

/// Per-layer system-prompt file paths. Prompt text itself is out of scope;
/// only the file location is configured here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct PromptPathsConfig {
    /// Maps each layer (or the integrity principal) to its system-prompt file.
    #[serde(default)]
    pub paths: BTreeMap<LayerSource, PathBuf>,
}

impl PromptPathsConfig {
    /// Validates that every configured path is non-empty.
    fn validate(&self) -> Result<(), ConfigError> {
        for path in self.paths.values() {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("prompts.paths entries must be non-empty".to_owned()));
            }
        }
        Ok(())
    }

    /// Reads and returns the prompt text for every configured layer.
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] when a configured prompt file cannot be read.
    pub fn load_all(&self) -> Result<BTreeMap<LayerSource, String>, ConfigError> {
        let mut loaded = BTreeMap::new();
        for (layer, path) in &self.paths {
            let text = fs::read_to_string(path).map_err(|err| ConfigError::Io(err.to_string()))?;
            loaded.insert(*layer, text);
        }
        Ok(loaded)
    }
}

/// Evidence freshness defaults used to populate an `Epistemics` envelope when
/// a layer emits a packet without an explicit staleness window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct EvidenceDefaultsConfig {
    /// Default number of seconds before observed evidence is considered stale.
    #[serde(default = "default_stale_if_older_than_seconds")]
    pub stale_if_older_than_seconds: u64,
}

impl Default for EvidenceDefaultsConfig {
    fn default() -> Self {
        Self {
            stale_if_older_than_seconds: default_stale_if_older_than_seconds(),
        }
    }
}

impl EvidenceDefaultsConfig {
    /// Validates that the staleness window is non-zero.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.stale_if_older_than_seconds == 0 {
            return Err(ConfigError::Invalid("evidence.stale_if_older_than_seconds must be greater than zero".to_owned()));
        }
        Ok(())
    }
}

const fn default_stale_if_older_than_seconds() -> u64 {
    DEFAULT_STALE_IF_OLDER_THAN_SECONDS
}
