use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::db::DB_FILE;
use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_dir_string")]
    pub data_dir: String,
    #[serde(default)]
    pub church_name: String,
}

fn default_data_dir_string() -> String {
    default_data_dir().to_string_lossy().to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir_string(),
            church_name: String::new(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("church-ledger")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("church-ledger")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| LedgerError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn get_data_dir() -> PathBuf {
    PathBuf::from(&load_settings().data_dir)
}

pub fn ledger_db_path() -> PathBuf {
    get_data_dir().join(DB_FILE)
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/ledger".to_string(),
            church_name: "Igreja Betel".to_string(),
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.church_name, "Igreja Betel");
        assert_eq!(loaded.data_dir, "/tmp/ledger");
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert!(s.church_name.is_empty());
        assert!(s.data_dir.ends_with("church-ledger"));
    }

    #[test]
    fn test_partial_file_merges_with_defaults() {
        let s: Settings = serde_json::from_str(r#"{"church_name": "Betel"}"#).unwrap();
        assert_eq!(s.church_name, "Betel");
        assert!(!s.data_dir.is_empty());
    }

    #[test]
    fn test_shellexpand_keeps_missing_paths() {
        assert_eq!(shellexpand_path("/no/such/dir/here"), "/no/such/dir/here");
    }
}
