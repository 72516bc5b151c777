use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::theme::{self, ThemeSnapshot};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
}

/// Reader settings, loaded from a TOML file:
///
/// ```toml
/// data_dir = "/var/lib/folio"
///
/// [theme]
/// page = "page_dark"
/// line = "line_2"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    /// Overrides the platform data directory used for bookmark records.
    pub data_dir: Option<PathBuf>,
    pub theme: ThemeDefaults,
}

/// Registered rule names selected when a session starts. Axes left out keep
/// the catalog default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeDefaults {
    pub page: Option<String>,
    pub line: Option<String>,
    pub font_size: Option<String>,
    pub font: Option<String>,
}

impl ReaderConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// The snapshot new sessions start from. Unknown rule names are dropped
    /// with a warning rather than failing the whole config.
    pub fn initial_theme(&self) -> ThemeSnapshot {
        let mut snapshot = ThemeSnapshot::default();
        let names = [
            &self.theme.page,
            &self.theme.line,
            &self.theme.font_size,
            &self.theme.font,
        ];
        for name in names.into_iter().flatten() {
            match theme::find(name) {
                Some(value) => snapshot.set(value),
                None => warn!(name = name.as_str(), "unknown presentation rule in config"),
            }
        }
        snapshot
    }
}
