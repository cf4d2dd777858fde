use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// App settings read from `fieldbook.toml` in the data directory. Every
/// field is optional; a missing file means all defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Card processing fee rate, e.g. `0.029`. Enables fee synthesis when
    /// matching payables.
    pub processing_fee_rate: Option<Decimal>,
    /// Override for the database location.
    pub database_path: Option<PathBuf>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }
}

pub fn data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "fieldbook", "Fieldbook")
        .context("could not determine an app data directory")?;
    Ok(dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("fieldbook.toml")).unwrap();
        assert!(config.processing_fee_rate.is_none());
        assert!(config.database_path.is_none());
    }

    #[test]
    fn parses_fee_rate_and_db_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fieldbook.toml");
        std::fs::write(
            &path,
            "processing_fee_rate = \"0.029\"\ndatabase_path = \"/tmp/books.db\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.processing_fee_rate, Some(Decimal::new(29, 3)));
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/books.db")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fieldbook.toml");
        std::fs::write(&path, "fee = 0.029\n").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
