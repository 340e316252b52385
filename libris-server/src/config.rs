use crate::error::{ConfigError, LibrisError, Result};
use serde::Deserialize;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_bind() -> String {
    "[::]:5000".into()
}

fn default_workers() -> usize {
    4
}

fn default_connection_rate() -> usize {
    256
}

fn default_database_path() -> PathBuf {
    PathBuf::from("libris.sqlite")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_max_idle_connections() -> usize {
    8
}

fn default_enable_compression() -> bool {
    false
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    #[serde(default = "default_bind")]
    pub(crate) bind: String,
    #[serde(default = "default_workers")]
    pub(crate) workers: usize,
    #[serde(default = "default_connection_rate")]
    pub(crate) max_connection_rate: usize,

    #[serde(default = "default_database_path")]
    pub(crate) database_path: PathBuf,
    #[serde(default = "default_busy_timeout_ms")]
    pub(crate) busy_timeout_ms: u64,
    #[serde(default = "default_max_idle_connections")]
    pub(crate) max_idle_connections: usize,

    #[serde(default = "default_enable_compression")]
    pub(crate) enable_compression: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            workers: default_workers(),
            max_connection_rate: default_connection_rate(),
            database_path: default_database_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            max_idle_connections: default_max_idle_connections(),
            enable_compression: default_enable_compression(),
        }
    }
}

impl Config {
    pub(crate) fn load(settings_file: &Path) -> Result<Config> {
        let contents = read_to_string(settings_file).map_err(|e| ConfigError::ReadFile {
            path: settings_file.display().to_string(),
            source: e,
        })?;
        Self::parse(&contents)
    }

    pub(crate) fn parse(contents: &str) -> Result<Config> {
        toml::from_str(contents).map_err(|e| LibrisError::from(ConfigError::from(e)))
    }

    pub(crate) fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Apply environment overrides and reject unusable settings.
    fn finish(mut self, database_override: Option<PathBuf>) -> Result<Config> {
        if let Some(path) = database_override {
            self.database_path = path;
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid {
                reason: "workers must be greater than 0".to_string(),
            }
            .into());
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                reason: "database_path must not be empty".to_string(),
            }
            .into());
        }
        Ok(self)
    }
}

pub(crate) fn load() -> Result<Config> {
    let settings = match std::env::var("CONFIG_FILE") {
        Err(_) => {
            if Path::new("settings.toml").exists() {
                Config::load(Path::new("settings.toml"))?
            } else {
                Config::default()
            }
        }
        Ok(settings_file) => Config::load(Path::new(&settings_file))?,
    };
    let database_override = std::env::var_os("LIBRIS_DATABASE").map(PathBuf::from);
    if database_override.is_some() {
        log::info!("database path overridden by LIBRIS_DATABASE");
    }
    settings.finish(database_override)
}
