//! Digest configuration loading.
//!
//! Each digest is described by one TOML file in a configs directory
//! (`configs/<name>.toml` by default):
//!
//! ```toml
//! name = "Tech Weekly"
//! description = "Rust and systems news"
//! days_lookback = 7
//!
//! [feeds]
//! "Rust Blog" = "https://blog.rust-lang.org/feed.xml"
//!
//! [prompt]
//! template = "Summarize these {article_count} articles ({date_range}):\n{article_list}"
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory searched when no configs directory is given.
pub const DEFAULT_CONFIGS_DIR: &str = "configs";

pub const DEFAULT_DAYS_LOOKBACK: u32 = 7;

/// A validated digest configuration.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    pub name: String,
    pub description: String,
    pub schedule: String,
    /// Feed name to URL, in file order.
    pub feeds: Vec<(String, String)>,
    pub days_lookback: u32,
    pub email_subject: String,
    pub sender_name: String,
    pub prompt_template: String,
}

/// On-disk shape before defaults and validation.
#[derive(Debug, Deserialize)]
struct RawConfig {
    name: Option<String>,
    #[serde(default)]
    description: String,
    schedule: Option<String>,
    feeds: Option<toml::Table>,
    days_lookback: Option<u32>,
    email_subject: Option<String>,
    sender_name: Option<String>,
    #[serde(default)]
    prompt: PromptSection,
}

#[derive(Debug, Default, Deserialize)]
struct PromptSection {
    #[serde(default)]
    template: String,
}

/// Summary of a configuration, for listings.
#[derive(Debug, Clone)]
pub struct ConfigSummary {
    pub name: String,
    pub description: String,
    pub schedule: String,
    pub feed_count: usize,
    pub feeds: Vec<String>,
}

impl DigestConfig {
    /// Load `<configs_dir>/<name>.toml`; the extension is optional in `name`.
    pub fn load(name: &str, configs_dir: &Path) -> Result<Self, ConfigError> {
        let file_name = if name.ends_with(".toml") {
            name.to_string()
        } else {
            format!("{}.toml", name)
        };
        let path = configs_dir.join(file_name);

        if !path.exists() {
            return Err(ConfigError::NotFound {
                path,
                available: list_available_configs(configs_dir),
            });
        }

        tracing::info!(path = %path.display(), "Loading config");

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        let config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse { path, source },
            other => other,
        })?;

        tracing::info!(
            "Loaded config: {} ({} feeds)",
            config.name,
            config.feeds.len()
        );
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            source: e,
        })?;

        let mut missing = Vec::new();
        if raw.name.is_none() {
            missing.push("name".to_string());
        }
        if raw.feeds.is_none() {
            missing.push("feeds".to_string());
        }
        let (Some(name), Some(table)) = (raw.name, raw.feeds) else {
            return Err(ConfigError::MissingFields(missing));
        };

        if table.is_empty() {
            return Err(ConfigError::EmptyFeeds);
        }

        let mut feeds = Vec::with_capacity(table.len());
        for (feed_name, value) in table {
            let Some(feed_url) = value.as_str() else {
                return Err(ConfigError::InvalidFeedUrl {
                    feed: feed_name,
                    reason: "URL must be a string".into(),
                });
            };
            url::Url::parse(feed_url).map_err(|e| ConfigError::InvalidFeedUrl {
                feed: feed_name.clone(),
                reason: e.to_string(),
            })?;
            feeds.push((feed_name, feed_url.to_string()));
        }

        Ok(Self {
            description: raw.description,
            schedule: raw.schedule.unwrap_or_else(|| "weekly".into()),
            feeds,
            days_lookback: raw.days_lookback.unwrap_or(DEFAULT_DAYS_LOOKBACK),
            email_subject: raw
                .email_subject
                .unwrap_or_else(|| format!("{} Digest", name)),
            sender_name: raw.sender_name.unwrap_or_else(|| name.clone()),
            prompt_template: raw.prompt.template,
            name,
        })
    }

    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            schedule: self.schedule.clone(),
            feed_count: self.feeds.len(),
            feeds: self.feeds.iter().map(|(name, _)| name.clone()).collect(),
        }
    }
}

/// Names (file stems) of every `.toml` file in `configs_dir`, sorted.
pub fn list_available_configs(configs_dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(configs_dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
        .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}

/// Load a configuration and summarize it.
pub fn config_info(name: &str, configs_dir: &Path) -> Result<ConfigSummary, ConfigError> {
    DigestConfig::load(name, configs_dir).map(|config| config.summary())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {path} (available configs: {available:?})")]
    NotFound {
        path: PathBuf,
        available: Vec<String>,
    },

    #[error("Failed to read config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Config missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Config 'feeds' must be a non-empty table")]
    EmptyFeeds,

    #[error("Invalid URL for feed '{feed}': {reason}")]
    InvalidFeedUrl { feed: String, reason: String },

    #[error("Config '{0}' has no prompt template")]
    MissingPrompt(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
name = "Tech Weekly"
description = "Systems news"
schedule = "daily"
days_lookback = 3
email_subject = "Your Tech Weekly"
sender_name = "Tech Bot"

[feeds]
"Zeta" = "https://zeta.example.com/feed.xml"
"Alpha" = "https://alpha.example.com/rss"

[prompt]
template = "Summarize {article_count} articles"
"#;

    #[test]
    fn test_full_config() {
        let config = DigestConfig::from_toml(FULL).unwrap();
        assert_eq!(config.name, "Tech Weekly");
        assert_eq!(config.schedule, "daily");
        assert_eq!(config.days_lookback, 3);
        assert_eq!(config.email_subject, "Your Tech Weekly");
        assert_eq!(config.sender_name, "Tech Bot");
        assert_eq!(config.prompt_template, "Summarize {article_count} articles");
    }

    #[test]
    fn test_feeds_keep_file_order() {
        let config = DigestConfig::from_toml(FULL).unwrap();
        let names: Vec<_> = config.feeds.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn test_defaults() {
        let content = r#"
name = "Minimal"
[feeds]
"One" = "https://one.example.com/feed"
"#;
        let config = DigestConfig::from_toml(content).unwrap();
        assert_eq!(config.description, "");
        assert_eq!(config.schedule, "weekly");
        assert_eq!(config.days_lookback, DEFAULT_DAYS_LOOKBACK);
        assert_eq!(config.email_subject, "Minimal Digest");
        assert_eq!(config.sender_name, "Minimal");
        assert_eq!(config.prompt_template, "");
    }

    #[test]
    fn test_missing_required_fields() {
        let err = DigestConfig::from_toml("description = \"nothing\"").unwrap_err();
        match err {
            ConfigError::MissingFields(fields) => assert_eq!(fields, vec!["name", "feeds"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_feeds_rejected() {
        let err = DigestConfig::from_toml("name = \"x\"\n[feeds]\n").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyFeeds));
    }

    #[test]
    fn test_invalid_feed_url_rejected() {
        let content = "name = \"x\"\n[feeds]\nbad = \"not a url\"\n";
        let err = DigestConfig::from_toml(content).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFeedUrl { ref feed, .. } if feed == "bad"));
    }

    #[test]
    fn test_non_string_feed_rejected() {
        let content = "name = \"x\"\n[feeds]\nbad = 3\n";
        assert!(matches!(
            DigestConfig::from_toml(content).unwrap_err(),
            ConfigError::InvalidFeedUrl { .. }
        ));
    }

    #[test]
    fn test_load_missing_file_lists_available() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("weekly.toml"), FULL).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        match DigestConfig::load("daily", dir.path()).unwrap_err() {
            ConfigError::NotFound { available, .. } => assert_eq!(available, vec!["weekly"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_with_and_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("weekly.toml"), FULL).unwrap();

        assert!(DigestConfig::load("weekly", dir.path()).is_ok());
        assert!(DigestConfig::load("weekly.toml", dir.path()).is_ok());
    }

    #[test]
    fn test_load_parse_error_carries_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.toml"), "name = ").unwrap();

        match DigestConfig::load("broken", dir.path()).unwrap_err() {
            ConfigError::Parse { path, .. } => assert!(path.ends_with("broken.toml")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_config_info() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("weekly.toml"), FULL).unwrap();

        let info = config_info("weekly", dir.path()).unwrap();
        assert_eq!(info.feed_count, 2);
        assert_eq!(info.feeds, vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        assert!(list_available_configs(Path::new("/nonexistent/estuary/configs")).is_empty());
    }
}
