//! # Configuration
//!
//! Optional TOML configuration for the command line front end.
//!
//! Sources, highest priority first:
//! 1. Command line flags (`--database`, `--units`, `--link`)
//! 2. `WIRELIST_DB` environment variable (database path only)
//! 3. The config file: `--config <path>`, else `wirelist.toml` in the
//!    working directory when present
//! 4. Built-in defaults
//!
//! ```toml
//! database = "harness.redb"
//! units = ["PSU", "CTRL"]
//! link = false
//!
//! [report]
//! pins = [10, 5, 6, 4, 20, 12, 16, 4]
//! conductors = [12, 6, 4, 5, 6, 5, 4, 6, 12]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use wirelist_core::{ReportWidths, ViewFilter, WirelistError};

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "wirelist.toml";

/// Database used when nothing else names one.
pub const DEFAULT_DATABASE: &str = "wirelist.redb";

/// Environment variable overriding the configured database path.
pub const DATABASE_ENV: &str = "WIRELIST_DB";

/// Contents of a `wirelist.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Database file.
    pub database: Option<PathBuf>,
    /// Report column widths.
    pub report: ReportWidths,
    /// Default unit filter; empty shows every unit.
    pub units: Vec<String>,
    /// Default link filter state.
    pub link: bool,
}

impl Config {
    /// Parse a config document.
    pub fn from_toml_str(text: &str) -> Result<Self, WirelistError> {
        toml::from_str(text)
            .map_err(|e| WirelistError::SerializationError(format!("Config: {}", e)))
    }

    /// Load the config file.
    ///
    /// An explicit path must exist. Without one, `wirelist.toml` in the
    /// working directory is used if present, else the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, WirelistError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !local.is_file() {
                    return Ok(Self::default());
                }
                local
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|e| {
            WirelistError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Pick the database path: flag, then environment, then config, then
    /// `wirelist.redb`.
    #[must_use]
    pub fn database_path(&self, flag: Option<&Path>, env: Option<&str>) -> PathBuf {
        if let Some(path) = flag {
            return path.to_path_buf();
        }
        if let Some(path) = env.filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }
        self.database
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE))
    }

    /// Build the view filter. Flags replace the configured units and can
    /// only switch the link filter on.
    #[must_use]
    pub fn view_filter(&self, units: Option<&[String]>, link: bool) -> ViewFilter {
        let mut filter = ViewFilter::with_units(units.unwrap_or(&self.units).iter().cloned());
        filter.link = link || self.link;
        filter
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config = Config::from_toml_str("").expect("parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.report, ReportWidths::default());
    }

    #[test]
    fn parses_every_field() {
        let config = Config::from_toml_str(
            r#"
            database = "harness.redb"
            units = ["PSU", "CTRL"]
            link = true

            [report]
            pins = [8, 4, 6, 4, 10, 12, 16, 4]
            "#,
        )
        .expect("parse");

        assert_eq!(config.database, Some(PathBuf::from("harness.redb")));
        assert_eq!(config.units, vec!["PSU", "CTRL"]);
        assert!(config.link);
        assert_eq!(config.report.pins[0], 8);
        // Unset tables keep their defaults.
        assert_eq!(config.report.conductors, ReportWidths::default().conductors);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = Config::from_toml_str("colour = true").expect_err("unknown key");
        assert!(matches!(err, WirelistError::SerializationError(_)));
    }

    #[test]
    fn database_precedence() {
        let config = Config {
            database: Some(PathBuf::from("from-config.redb")),
            ..Config::default()
        };

        assert_eq!(
            config.database_path(Some(Path::new("flag.redb")), Some("env.redb")),
            PathBuf::from("flag.redb")
        );
        assert_eq!(
            config.database_path(None, Some("env.redb")),
            PathBuf::from("env.redb")
        );
        assert_eq!(
            config.database_path(None, None),
            PathBuf::from("from-config.redb")
        );
        assert_eq!(
            Config::default().database_path(None, Some("")),
            PathBuf::from(DEFAULT_DATABASE)
        );
    }

    #[test]
    fn flag_units_replace_configured_units() {
        let config = Config {
            units: vec!["PSU".to_string()],
            ..Config::default()
        };

        let from_config = config.view_filter(None, false);
        assert!(from_config.admits("PSU"));
        assert!(!from_config.admits("CTRL"));

        let flags = vec!["CTRL".to_string()];
        let from_flags = config.view_filter(Some(&flags), true);
        assert!(from_flags.admits("CTRL"));
        assert!(!from_flags.admits("PSU"));
        assert!(from_flags.link);

        assert!(Config::default().view_filter(None, false).admits("ANY"));
    }

    #[test]
    fn load_explicit_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "link = true\n").expect("write");

        let config = Config::load(Some(&path)).expect("load");
        assert!(config.link);

        let missing = Config::load(Some(&dir.path().join("missing.toml")));
        assert!(matches!(missing, Err(WirelistError::IoError(_))));
    }
}
