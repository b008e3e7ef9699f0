use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// On-disk settings. API keys here are fallbacks; process environment
/// variables always win.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub perplexity_api_key: Option<String>,
    pub model: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Env var first, then the config file value.
    pub fn resolve_key(&self, env_var: &str, file_value: &Option<String>) -> Option<String> {
        std::env::var(env_var).ok().or_else(|| file_value.clone())
    }

    pub fn openai_key(&self) -> Option<String> {
        self.resolve_key("OPENAI_API_KEY", &self.openai_api_key)
    }

    pub fn perplexity_key(&self) -> Option<String> {
        self.resolve_key("PERPLEXITY_API_KEY", &self.perplexity_api_key)
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::app_dir()?.join("config.json"))
    }

    /// Per-user directory holding the config file and the log file.
    pub fn app_dir() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("jaunt"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            openai_api_key: Some("sk-test".to_string()),
            perplexity_api_key: None,
            model: Some("gpt-4o".to_string()),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(loaded.perplexity_api_key, None);
        assert_eq!(loaded.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.openai_api_key.is_none());
        assert!(loaded.model.is_none());
    }

    #[test]
    fn test_resolve_key_prefers_env() {
        let config = Config {
            openai_api_key: Some("from-file".to_string()),
            ..Config::default()
        };

        let resolved = config.resolve_key("JAUNT_TEST_UNSET_KEY", &config.openai_api_key);
        assert_eq!(resolved.as_deref(), Some("from-file"));

        std::env::set_var("JAUNT_TEST_SET_KEY", "from-env");
        let resolved = config.resolve_key("JAUNT_TEST_SET_KEY", &config.openai_api_key);
        assert_eq!(resolved.as_deref(), Some("from-env"));
        std::env::remove_var("JAUNT_TEST_SET_KEY");
    }
}
