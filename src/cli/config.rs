use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::store::{FileTokenStore, STORAGE_FILE};
use crate::config::ClientConfig;

const SETTINGS_FILE: &str = "settings.json";

/// Persisted CLI preferences
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliSettings {
    pub api_root: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CliSettings {
    pub fn set_api_root(&mut self, root: &str) {
        self.api_root = Some(root.trim().to_string());
        self.updated_at = Some(Utc::now());
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("TASKDESK_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("taskdesk")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_settings() -> anyhow::Result<CliSettings> {
    let settings_file = get_config_dir()?.join(SETTINGS_FILE);

    if !settings_file.exists() {
        return Ok(CliSettings::default());
    }

    let content = fs::read_to_string(settings_file)?;
    let settings: CliSettings = serde_json::from_str(&content)?;
    Ok(settings)
}

pub fn save_settings(settings: &CliSettings) -> anyhow::Result<()> {
    let settings_file = get_config_dir()?.join(SETTINGS_FILE);

    let content = serde_json::to_string_pretty(settings)?;
    fs::write(settings_file, content)?;
    Ok(())
}

pub fn storage_path() -> anyhow::Result<PathBuf> {
    Ok(get_config_dir()?.join(STORAGE_FILE))
}

/// Token store backing the CLI session
pub fn token_store(config: &ClientConfig) -> anyhow::Result<FileTokenStore> {
    Ok(FileTokenStore::new(storage_path()?, config.session.storage_key.clone()))
}

/// Effective client configuration: environment first, then the saved API
/// root, then a command-line override.
pub fn resolve_client_config(api_root_override: Option<&str>) -> anyhow::Result<ClientConfig> {
    let mut config = crate::config::config().clone();

    if std::env::var("TASKDESK_API_ROOT").is_err() {
        if let Some(root) = load_settings()?.api_root {
            config = config.with_api_root(&root);
        }
    }
    if let Some(root) = api_root_override {
        config = config.with_api_root(root);
    }

    Ok(config)
}
