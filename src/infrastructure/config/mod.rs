//! Configuration management

use crate::application::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub fortune: FortuneConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
    pub prefix: String,
}

/// Settings for the fortune plugin itself
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct FortuneConfig {
    /// Path to the SQLite database holding the fortune texts
    pub database: PathBuf,
    /// Draws allowed per user per day
    pub daily_limit: u32,
    /// Command word that triggers a draw
    pub trigger: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "fortune-bot".to_string(),
                prefix: "/".to_string(),
            },
            fortune: FortuneConfig {
                database: PathBuf::from("fortunes.db"),
                daily_limit: 3,
                trigger: "fortune".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: impl Into<PathBuf>) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.into(), yaml)
            .map_err(|e| ConfigError::Parse(format!("Failed to write config: {}", e)))
    }

    /// Defaults with environment overrides. Only the database path
    /// (`FORTUNE_DB`) and command prefix (`BOT_PREFIX`) can come from the
    /// environment; limit and trigger are config-file only.
    pub fn load_env() -> Self {
        // Load from environment variables
        let mut config = Config::default();

        if let Ok(db) = std::env::var("FORTUNE_DB") {
            config.fortune.database = PathBuf::from(db);
        }

        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            config.bot.prefix = prefix;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_plugin_contract() {
        let config = Config::default();
        assert_eq!(config.fortune.daily_limit, 3);
        assert_eq!(config.fortune.trigger, "fortune");
        assert_eq!(config.bot.prefix, "/");
    }

    #[test]
    fn parses_yaml() {
        let yaml = "\
bot:
  name: testbot
  prefix: '!'
fortune:
  database: /tmp/fortunes.db
  daily-limit: 5
  trigger: draw
";
        let config: Config = serde_yaml::from_str(yaml).expect("valid yaml");
        assert_eq!(config.bot.name, "testbot");
        assert_eq!(config.fortune.daily_limit, 5);
        assert_eq!(config.fortune.trigger, "draw");
    }

    #[test]
    fn env_overrides_database_and_prefix() {
        std::env::set_var("FORTUNE_DB", "/tmp/env-fortunes.db");
        std::env::set_var("BOT_PREFIX", "!");

        let config = Config::load_env();
        assert_eq!(config.fortune.database, PathBuf::from("/tmp/env-fortunes.db"));
        assert_eq!(config.bot.prefix, "!");
        // Everything else stays at the defaults.
        assert_eq!(config.fortune.daily_limit, 3);
        assert_eq!(config.fortune.trigger, "fortune");

        std::env::remove_var("FORTUNE_DB");
        std::env::remove_var("BOT_PREFIX");
    }

    #[test]
    fn roundtrips_through_yaml() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).expect("serializes");
        let parsed: Config = serde_yaml::from_str(&yaml).expect("parses back");
        assert_eq!(parsed.fortune.daily_limit, config.fortune.daily_limit);
        assert_eq!(parsed.bot.name, config.bot.name);
    }
}
