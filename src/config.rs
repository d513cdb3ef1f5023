//! Configuration loading for paxdesk.
//!
//! Values come from (highest precedence first) `PAXDESK_*` environment
//! variables, a TOML file, and built-in defaults.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "paxdesk.toml";

const ENV_PREFIX: &str = "PAXDESK_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the flight and passenger files.
    pub data_dir: PathBuf,
    /// Oldest age, in whole years, a passenger may have.
    pub max_age_years: u32,
    /// Number of `backup_k_` copies kept per data file. 0 disables backups.
    pub backup_retention: u32,
    pub flights_file: String,
    pub passengers_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            max_age_years: 120,
            backup_retention: 5,
            flights_file: "flights.txt".to_string(),
            passengers_file: "passengers.txt".to_string(),
        }
    }
}

impl Config {
    /// Loads the configuration, reading `config_path` or `paxdesk.toml` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or a value is invalid.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let config_file = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()?;
        config.validate()?;
        tracing::debug!(file = %config_file.display(), ?config, "configuration loaded");
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error if any value is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.max_age_years == 0 {
            return Err(Error::ConfigValidation(
                "max_age_years must be greater than 0".to_string(),
            ));
        }
        for (key, name) in [
            ("flights_file", &self.flights_file),
            ("passengers_file", &self.passengers_file),
        ] {
            if name.trim().is_empty() {
                return Err(Error::ConfigValidation(format!("{key} must not be empty")));
            }
        }
        if self.flights_file == self.passengers_file {
            return Err(Error::ConfigValidation(
                "flights_file and passengers_file must differ".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(120, config.max_age_years);
        assert_eq!(5, config.backup_retention);
        assert_eq!("flights.txt", config.flights_file);
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            "data_dir = \"/var/lib/paxdesk\"\nbackup_retention = 2\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path.as_path())).unwrap();

        assert_eq!(PathBuf::from("/var/lib/paxdesk"), config.data_dir);
        assert_eq!(2, config.backup_retention);
        assert_eq!(120, config.max_age_years);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(Some(dir.path().join("absent.toml").as_path())).unwrap();
        assert_eq!(Config::default().passengers_file, config.passengers_file);
    }

    #[test]
    fn test_load_rejects_bad_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");

        fs::write(&path, "max_age_years = 0\n").unwrap();
        assert!(matches!(
            Config::load_from(Some(path.as_path())),
            Err(Error::ConfigValidation(_))
        ));

        fs::write(&path, "max_age_years = \"old\"\n").unwrap();
        let err = Config::load_from(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, Error::ConfigLoad(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_validate_file_names() {
        let config = Config {
            flights_file: " ".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            passengers_file: "flights.txt".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
