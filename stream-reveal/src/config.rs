//! Reveal settings loaded from TOML.
//!
//! ```toml
//! commit_tick_interval_ms = 50
//! unwrap_markdown_fence = true
//! strip_empty_fences = true
//! ```
//!
//! Every key is optional; omitted keys take the defaults shown above.

use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::markdown_fence::MarkdownNormalization;

pub const DEFAULT_COMMIT_TICK_INTERVAL_MS: u64 = 50;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse stream config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("commit_tick_interval_ms must be greater than zero")]
    InvalidTickInterval,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    /// Delay between two revealed lines.
    pub commit_tick_interval_ms: u64,
    /// Unwrap a message that is entirely enclosed in a ```` ```markdown ```` fence.
    pub unwrap_markdown_fence: bool,
    /// Drop fenced code blocks that contain only whitespace.
    pub strip_empty_fences: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            commit_tick_interval_ms: DEFAULT_COMMIT_TICK_INTERVAL_MS,
            unwrap_markdown_fence: true,
            strip_empty_fences: true,
        }
    }
}

impl StreamConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("no stream config at {}; using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn commit_tick_interval(&self) -> Duration {
        Duration::from_millis(self.commit_tick_interval_ms)
    }

    pub fn normalization(&self) -> MarkdownNormalization {
        MarkdownNormalization {
            unwrap_markdown_fence: self.unwrap_markdown_fence,
            strip_empty_fences: self.strip_empty_fences,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.commit_tick_interval_ms == 0 {
            return Err(ConfigError::InvalidTickInterval);
        }
        Ok(())
    }
}
