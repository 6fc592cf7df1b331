//! CLI configuration loaded from RON.
//!
//! Lives at `~/.config/threadline/cli.ron` (platform config dir via `dirs`):
//!
//! ```ron
//! (
//!     format: Json,
//!     summary_width: 60,
//!     sort: true,
//! )
//! ```
//!
//! Every field is optional. Command-line flags override file values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How flattened items are printed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum OutputFormat {
    /// Indented human-readable outline.
    #[default]
    Outline,
    /// Display items as pretty JSON.
    Json,
}

/// Settings shared by the config file and the command line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub format: OutputFormat,
    /// Max characters of message content shown per outline line.
    pub summary_width: usize,
    /// Sort messages by `createdAt` before flattening.
    pub sort: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Outline,
            summary_width: 48,
            sort: false,
        }
    }
}

/// Error type for config loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Get the default config file path (~/.config/threadline/cli.ron).
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("threadline").join("cli.ron"))
}

/// Parse a config from RON text.
pub fn parse_config(text: &str) -> Result<CliConfig, ConfigError> {
    Ok(ron::from_str(text)?)
}

/// Load the config.
///
/// An explicit path must exist. The default path may be absent, in which
/// case defaults apply. A file that exists but does not parse is an error
/// either way.
pub fn load_config(explicit: Option<&Path>) -> Result<CliConfig, ConfigError> {
    let path = match explicit {
        Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
        Some(path) => path.to_path_buf(),
        None => {
            let Some(path) = config_file_path() else {
                tracing::debug!("no config directory available, using defaults");
                return Ok(CliConfig::default());
            };
            if !path.exists() {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                return Ok(CliConfig::default());
            }
            path
        }
    };

    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let config = parse_config(&text)?;
    tracing::debug!(path = %path.display(), ?config, "loaded config");
    Ok(config)
}
