//! Shell configuration loaded from TOML with `CONCH_*` environment overrides.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration. Resolution order for the file itself is: explicit
//! path, `$CONCH_CONFIG`, `./conch.toml`, built-in defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use crate::error::{Result, ShellError};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "CONCH_CONFIG";

/// Prefix for per-key environment overrides.
pub const ENV_PREFIX: &str = "CONCH_";

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "conch.toml";

/// Top-level shell configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub core: CoreConfig,
    pub completion: CompletionConfig,
    pub modules: ModulesConfig,
}

/// Module lifecycle settings (`[core]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Always-on module, loaded at startup and kept out of lazy discovery.
    pub root_module: String,
    /// Modules loaded eagerly right after discovery, before the first prompt.
    pub preload_modules: Vec<String>,
    /// Extra module names kept out of discovery.
    pub exclude: Vec<String>,
    /// Directory scanned for module subdirectories. `None` uses the
    /// built-in module table.
    pub modules_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            root_module: "core".to_string(),
            preload_modules: Vec::new(),
            exclude: Vec::new(),
            modules_dir: None,
        }
    }
}

/// Completion engine settings (`[completion]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub enabled: bool,
    /// `false` restricts matching to the exact-prefix tier.
    pub fuzzy: bool,
    pub max_edit_distance: usize,
    /// Upper bound on candidates examined by the edit-distance tier.
    pub edit_distance_candidate_limit: usize,
    pub show_descriptions: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fuzzy: true,
            max_edit_distance: 2,
            edit_distance_candidate_limit: 256,
            show_descriptions: true,
        }
    }
}

/// Module naming settings (`[modules]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModulesConfig {
    /// Module name -> factory key overrides for the naming strategy.
    /// Entries from the file are layered over the built-in ones.
    #[serde(deserialize_with = "merge_name_mappings")]
    pub name_mappings: HashMap<String, String>,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            name_mappings: default_name_mappings(),
        }
    }
}

fn default_name_mappings() -> HashMap<String, String> {
    HashMap::from([
        ("ssh".to_string(), "SSH".to_string()),
        ("api".to_string(), "API".to_string()),
    ])
}

fn merge_name_mappings<'de, D>(deserializer: D) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let user = HashMap::<String, String>::deserialize(deserializer)?;
    let mut mappings = default_name_mappings();
    mappings.extend(user);
    Ok(mappings)
}

impl ShellConfig {
    /// Parse a configuration from a TOML string.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ShellError::Config(format!("conch.toml: {e}")))
    }

    /// Read and parse a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| ShellError::Config(format!("{}: {e}", path.display())))
    }

    /// Load the effective configuration: file (if any) plus process
    /// environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match locate(explicit) {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                Self::from_file(&path)?
            },
            None => {
                log::debug!("No config file found, using defaults");
                Self::default()
            },
        };
        config.apply_env(std::env::vars())?;
        Ok(config)
    }

    /// Apply `CONCH_<SECTION>_<KEY>` overrides from `vars`.
    ///
    /// Unknown `CONCH_*` keys are ignored; malformed values are an error.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(key) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match key {
                "CORE_ROOT_MODULE" => self.core.root_module = value,
                "CORE_PRELOAD_MODULES" => self.core.preload_modules = split_list(&value),
                "CORE_EXCLUDE" => self.core.exclude = split_list(&value),
                "CORE_MODULES_DIR" => {
                    self.core.modules_dir = (!value.is_empty()).then(|| PathBuf::from(value));
                },
                "COMPLETION_ENABLED" => self.completion.enabled = parse_bool(key, &value)?,
                "COMPLETION_FUZZY" => self.completion.fuzzy = parse_bool(key, &value)?,
                "COMPLETION_SHOW_DESCRIPTIONS" => {
                    self.completion.show_descriptions = parse_bool(key, &value)?;
                },
                "COMPLETION_MAX_EDIT_DISTANCE" => {
                    self.completion.max_edit_distance = parse_usize(key, &value)?;
                },
                "COMPLETION_EDIT_DISTANCE_CANDIDATE_LIMIT" => {
                    self.completion.edit_distance_candidate_limit = parse_usize(key, &value)?;
                },
                _ => continue,
            }
            log::debug!("Config override from environment: {ENV_PREFIX}{key}");
        }
        Ok(())
    }
}

/// Pick the config file to read, if any.
fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_ENV)
        && !path.is_empty()
    {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    local.is_file().then_some(local)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ShellError::Config(format!(
            "{ENV_PREFIX}{key}: expected a boolean, got '{other}'"
        ))),
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| {
        ShellError::Config(format!(
            "{ENV_PREFIX}{key}: expected a non-negative integer, got '{value}'"
        ))
    })
}
