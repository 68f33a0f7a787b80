//! Application configuration management
//!
//! Configuration is a YAML file. Sections this service does not consume
//! (email transport, recipients, template texts) are tolerated so one file can
//! drive the whole newsletter pipeline.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize, Serializer};
use url::Url;

use crate::catalog::DEFAULT_MAX_CONCURRENT_FOLDERS;

/// Used when neither `--config` nor `CONFIG_PATH` is given
pub const DEFAULT_CONFIG_PATH: &str = "./config/config.yml";

/// Upper bound for `jellyfin.observed_period_days` (about a century)
pub const MAX_OBSERVED_PERIOD_DAYS: u32 = 36_500;

/// A credential that never shows up in logs or serialized output
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Console,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

/// Present only when the newsletter should run on a schedule
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Cron expression with a leading seconds field, e.g. `0 0 8 * * Mon`
    pub cron: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JellyfinConfig {
    pub url: String,
    pub api_token: Secret,
    pub watched_film_folders: Vec<String>,
    #[serde(rename = "watched_tv_folders")]
    pub watched_series_folders: Vec<String>,
    /// Trailing days within which an item counts as recently added
    pub observed_period_days: u32,
    #[serde(default = "default_max_concurrent_folders")]
    pub max_concurrent_folders: usize,
}

fn default_max_concurrent_folders() -> usize {
    DEFAULT_MAX_CONCURRENT_FOLDERS
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbConfig {
    /// API read access token (v4 bearer)
    pub api_key: Secret,
}

/// Digest ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    DateDesc,
    DateAsc,
    NameAsc,
    NameDesc,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailTemplateConfig {
    /// Language used for TMDB lookups
    pub language: String,
    pub sort_mode: SortMode,
}

impl Default for EmailTemplateConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            sort_mode: SortMode::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DryRunConfig {
    pub enabled: bool,
    pub output_directory: PathBuf,
    pub output_filename: String,
}

impl Default for DryRunConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_directory: PathBuf::from("./dry-run"),
            output_filename: "newsletter.json".to_string(),
        }
    }
}

impl DryRunConfig {
    pub fn output_path(&self) -> PathBuf {
        self.output_directory.join(&self.output_filename)
    }
}

/// Application configuration loaded from a YAML file
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub scheduler: Option<SchedulerConfig>,

    pub jellyfin: JellyfinConfig,

    pub tmdb: TmdbConfig,

    #[serde(default)]
    pub email_template: EmailTemplateConfig,

    #[serde(default, rename = "dry-run")]
    pub dry_run: DryRunConfig,
}

impl Config {
    /// Pick the configuration file: CLI flag, then `CONFIG_PATH`, then the default
    pub fn resolve_path(cli_path: Option<PathBuf>) -> PathBuf {
        cli_path
            .or_else(|| env::var("CONFIG_PATH").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Read, parse and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(content).context("Failed to decode configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Check semantic constraints serde cannot express. All problems are
    /// reported at once.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        match Url::parse(&self.jellyfin.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => problems.push(format!(
                "jellyfin.url must use http or https, got '{}'",
                url.scheme()
            )),
            Err(e) => problems.push(format!("jellyfin.url is not a valid URL: {}", e)),
        }

        if self.jellyfin.api_token.is_empty() {
            problems.push("jellyfin.api_token is required".to_string());
        }
        if self.jellyfin.observed_period_days == 0 {
            problems.push("jellyfin.observed_period_days must be at least 1".to_string());
        } else if self.jellyfin.observed_period_days > MAX_OBSERVED_PERIOD_DAYS {
            problems.push(format!(
                "jellyfin.observed_period_days must be at most {}, got {}",
                MAX_OBSERVED_PERIOD_DAYS, self.jellyfin.observed_period_days
            ));
        }
        if self.jellyfin.max_concurrent_folders == 0 {
            problems.push("jellyfin.max_concurrent_folders must be at least 1".to_string());
        }
        if self.jellyfin.watched_film_folders.is_empty()
            && self.jellyfin.watched_series_folders.is_empty()
        {
            problems.push(
                "at least one of jellyfin.watched_film_folders or jellyfin.watched_tv_folders must list a folder"
                    .to_string(),
            );
        }
        if self.tmdb.api_key.is_empty() {
            problems.push("tmdb.api_key is required".to_string());
        }
        if let Some(scheduler) = &self.scheduler
            && scheduler.cron.trim().is_empty()
        {
            problems.push("scheduler.cron must not be empty".to_string());
        }

        let language = &self.email_template.language;
        if language.is_empty() || !language.chars().all(|c| c.is_ascii_alphabetic()) {
            problems.push(format!(
                "email_template.language must be alphabetic, got '{}'",
                language
            ));
        }

        if self.dry_run.enabled && self.dry_run.output_filename.trim().is_empty() {
            problems.push("dry-run.output_filename is required when dry-run is enabled".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("Invalid configuration:\n  - {}", problems.join("\n  - "))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const FULL_CONFIG: &str = r#"
log:
  level: DEBUG
  format: console
scheduler:
  cron: "0 0 8 1 * *"
jellyfin:
  url: "https://jellyfin.example.com"
  api_token: "jf-token"
  watched_film_folders: ["Movies"]
  watched_tv_folders: ["Shows", "Anime"]
  observed_period_days: 30
tmdb:
  api_key: "tmdb-token"
email_template:
  language: "fr"
  subject: "New this month"
  title: "Hello"
  subtitle: "What's new"
  sort_mode: name_asc
email:
  smtp_server: "smtp.example.com"
  smtp_port: 587
recipients:
  - "someone@example.com"
dry-run:
  enabled: true
  output_directory: "/tmp/newsletter"
"#;

    const MINIMAL_CONFIG: &str = r#"
jellyfin:
  url: "http://localhost:8096"
  api_token: "jf-token"
  watched_film_folders: []
  watched_tv_folders: ["Shows"]
  observed_period_days: 7
tmdb:
  api_key: "tmdb-token"
"#;

    #[test]
    fn test_full_config_parses() {
        let config = Config::from_yaml_str(FULL_CONFIG).unwrap();

        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Console);
        assert_eq!(config.scheduler.unwrap().cron, "0 0 8 1 * *");
        assert_eq!(config.jellyfin.api_token.expose(), "jf-token");
        assert_eq!(config.jellyfin.watched_series_folders, vec!["Shows", "Anime"]);
        assert_eq!(config.jellyfin.observed_period_days, 30);
        assert_eq!(config.email_template.language, "fr");
        assert_eq!(config.email_template.sort_mode, SortMode::NameAsc);
        assert!(config.dry_run.enabled);
        assert_eq!(
            config.dry_run.output_path(),
            PathBuf::from("/tmp/newsletter/newsletter.json")
        );
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::from_yaml_str(MINIMAL_CONFIG).unwrap();

        assert_eq!(config.log.level, LogLevel::Info);
        assert_eq!(config.log.format, LogFormat::Json);
        assert!(config.scheduler.is_none());
        assert_eq!(
            config.jellyfin.max_concurrent_folders,
            DEFAULT_MAX_CONCURRENT_FOLDERS
        );
        assert_eq!(config.email_template.language, "en");
        assert_eq!(config.email_template.sort_mode, SortMode::DateDesc);
        assert!(!config.dry_run.enabled);
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let yaml = r#"
jellyfin:
  url: "ftp://jellyfin.example.com"
  api_token: ""
  watched_film_folders: []
  watched_tv_folders: []
  observed_period_days: 0
tmdb:
  api_key: "  "
"#;
        let err = Config::from_yaml_str(yaml).unwrap_err().to_string();
        assert!(err.contains("jellyfin.url must use http or https"));
        assert!(err.contains("jellyfin.api_token is required"));
        assert!(err.contains("observed_period_days must be at least 1"));
        assert!(err.contains("at least one of"));
        assert!(err.contains("tmdb.api_key is required"));
    }

    #[test]
    fn test_negative_window_is_rejected() {
        let yaml = MINIMAL_CONFIG.replace("observed_period_days: 7", "observed_period_days: -3");
        assert!(Config::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_oversized_window_is_rejected() {
        let yaml =
            MINIMAL_CONFIG.replace("observed_period_days: 7", "observed_period_days: 4000000000");
        let err = Config::from_yaml_str(&yaml).unwrap_err().to_string();
        assert!(err.contains("observed_period_days must be at most 36500, got 4000000000"));

        let yaml = MINIMAL_CONFIG.replace("observed_period_days: 7", "observed_period_days: 36500");
        assert!(Config::from_yaml_str(&yaml).is_ok());
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        let yaml = format!("log:\n  level: LOUD\n{}", MINIMAL_CONFIG);
        assert!(Config::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_secrets_are_redacted() {
        let config = Config::from_yaml_str(MINIMAL_CONFIG).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("jf-token"));
        assert!(!debug.contains("tmdb-token"));
        assert!(debug.contains("[REDACTED]"));
        assert_eq!(
            serde_json::to_string(&config.tmdb.api_key).unwrap(),
            "\"[REDACTED]\""
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL_CONFIG.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.jellyfin.url, "http://localhost:8096");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/definitely/not/here.yml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read configuration file"));
    }

    #[test]
    fn test_cli_path_wins() {
        let path = Config::resolve_path(Some(PathBuf::from("/etc/newsletter.yml")));
        assert_eq!(path, PathBuf::from("/etc/newsletter.yml"));
    }
}
