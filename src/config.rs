//! JSON configuration for the parser and the lint rules.
//!
//! ```json
//! {
//!   "parser": { "max_nesting_depth": 64, "lex_mode": "php" },
//!   "lint": { "line-length": { "level": "error", "max": 100 } }
//! }
//! ```
//!
//! Every field is optional and unknown fields are rejected.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::lint::LintConfig;
use crate::parser::ParserConfig;

/// File looked up by [`Config::discover`].
pub const DEFAULT_CONFIG_FILE: &str = "php-syntax.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub parser: ParserConfig,
    pub lint: LintConfig,
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load `php-syntax.json` from `dir` when it exists, defaults
    /// otherwise.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(DEFAULT_CONFIG_FILE);
        if path.is_file() {
            Self::load(&path)
        } else {
            tracing::debug!(dir = %dir.display(), "no configuration file, using defaults");
            Ok(Self::default())
        }
    }
}
