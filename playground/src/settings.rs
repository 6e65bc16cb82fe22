use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::SettingsError;
use crate::validation::{ValidationLimits, MAX_SOURCE_CHARS};

// ============ Python Identifier Validation ============

/// Python reserved keywords that cannot be used as identifiers
const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await",
    "break", "class", "continue", "def", "del", "elif", "else", "except",
    "finally", "for", "from", "global", "if", "import", "in", "is",
    "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Validate that a string is a valid Python identifier.
///
/// Rules:
/// - ASCII letters, digits, and underscores only
/// - Cannot start with a digit
/// - Cannot be a Python keyword
/// - Cannot be empty
pub fn validate_python_identifier(name: &str) -> Result<(), String> {
    let Some(first_char) = name.chars().next() else {
        return Err("Python identifier cannot be empty".to_string());
    };

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(format!(
            "Python identifier must start with a letter or underscore, got '{}'",
            first_char
        ));
    }

    for (i, c) in name.chars().enumerate() {
        if !c.is_ascii_alphanumeric() && c != '_' {
            return Err(format!(
                "Python identifier can only contain letters, digits, and underscores. \
                Invalid character '{}' at position {}",
                c, i
            ));
        }
    }

    if PYTHON_KEYWORDS.contains(&name) {
        return Err(format!("'{}' is a Python reserved keyword", name));
    }

    Ok(())
}

// ============ Settings ============

/// Persisted playground configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaygroundSettings {
    /// Timeout for a plain run, in milliseconds
    pub run_timeout_ms: u64,
    /// Deadline for a whole test batch, in milliseconds
    pub test_timeout_ms: u64,
    pub repl_timeout_ms: u64,
    pub max_source_chars: usize,
    /// Output beyond this many characters is cut off in run results
    pub max_output_chars: usize,
    /// Global names kept by a session reset, besides `_`-prefixed ones
    pub preserved_bindings: Vec<String>,
    /// Page that share links point to
    pub share_base_url: String,
}

pub const DEFAULT_SHARE_BASE_URL: &str = "https://python-playground.local/";

impl Default for PlaygroundSettings {
    fn default() -> Self {
        Self {
            run_timeout_ms: 30_000,
            test_timeout_ms: 30_000,
            repl_timeout_ms: 10_000,
            max_source_chars: MAX_SOURCE_CHARS,
            max_output_chars: 10_000,
            preserved_bindings: python_sandbox::protocol::DEFAULT_PRESERVED_BINDINGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            share_base_url: DEFAULT_SHARE_BASE_URL.to_string(),
        }
    }
}

impl PlaygroundSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        let limits = [
            ("run_timeout_ms", self.run_timeout_ms as usize),
            ("test_timeout_ms", self.test_timeout_ms as usize),
            ("repl_timeout_ms", self.repl_timeout_ms as usize),
            ("max_source_chars", self.max_source_chars),
            ("max_output_chars", self.max_output_chars),
        ];
        if let Some(&(field, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return Err(SettingsError::ZeroLimit { field });
        }

        for name in &self.preserved_bindings {
            validate_python_identifier(name)
                .map_err(|e| SettingsError::InvalidBinding(format!("{}: {}", name, e)))?;
        }
        Ok(())
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_millis(self.test_timeout_ms)
    }

    pub fn repl_timeout(&self) -> Duration {
        Duration::from_millis(self.repl_timeout_ms)
    }

    pub fn validation_limits(&self) -> ValidationLimits {
        ValidationLimits {
            max_source_chars: self.max_source_chars,
        }
    }

    pub fn session_config(&self) -> python_sandbox::SessionConfig {
        python_sandbox::SessionConfig {
            preserved_bindings: self.preserved_bindings.clone(),
        }
    }
}

/// Get the path to the config file
pub fn get_config_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".python-playground").join("config.json")
}

/// Load settings from the default config file
pub async fn load_settings() -> PlaygroundSettings {
    load_settings_from(&get_config_path()).await
}

/// Load settings from `config_path`, falling back to defaults when the file
/// is missing, malformed, or holds invalid values
pub async fn load_settings_from(config_path: &Path) -> PlaygroundSettings {
    let contents = match fs::read_to_string(config_path).await {
        Ok(contents) => contents,
        Err(e) => {
            debug!(path = %config_path.display(), error = %e, "no config file, using defaults");
            return PlaygroundSettings::default();
        }
    };

    let settings: PlaygroundSettings = match serde_json::from_str(&contents) {
        Ok(settings) => settings,
        Err(e) => {
            warn!(path = %config_path.display(), error = %e, "failed to parse settings, using defaults");
            return PlaygroundSettings::default();
        }
    };

    if let Err(e) = settings.validate() {
        warn!(path = %config_path.display(), error = %e, "invalid settings, using defaults");
        return PlaygroundSettings::default();
    }

    debug!(path = %config_path.display(), "settings loaded");
    settings
}

/// Save settings to the default config file
pub async fn save_settings(settings: &PlaygroundSettings) -> Result<PathBuf, SettingsError> {
    let config_path = get_config_path();
    save_settings_to(settings, &config_path).await?;
    Ok(config_path)
}

pub async fn save_settings_to(
    settings: &PlaygroundSettings,
    config_path: &Path,
) -> Result<(), SettingsError> {
    settings.validate()?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let contents = serde_json::to_string_pretty(settings)?;
    fs::write(config_path, contents).await?;

    info!(path = %config_path.display(), "settings saved");
    Ok(())
}
