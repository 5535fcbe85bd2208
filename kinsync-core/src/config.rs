//! Global kinsync configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{KinsyncError, KinsyncResult};

static DEFAULT_DATA_DIR: &str = "~/.local/share/kinsync";
static DEFAULT_SYNC_INTERVAL: &str = "5m";
static DEFAULT_FETCH_TIMEOUT: &str = "30s";
const DEFAULT_SERVER_PORT: u16 = 4097;

const SOURCES_FILE: &str = "sources.toml";
const EVENTS_DIR: &str = "events";

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_sync_interval() -> String {
    DEFAULT_SYNC_INTERVAL.to_string()
}

fn default_fetch_timeout() -> String {
    DEFAULT_FETCH_TIMEOUT.to_string()
}

fn default_server_port() -> u16 {
    DEFAULT_SERVER_PORT
}

/// Configuration at ~/.config/kinsync/config.toml, overridable with
/// `KINSYNC_*` environment variables (e.g. `KINSYNC_SYNC_INTERVAL=10m`).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KinsyncConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// How often auto-sync sources are polled (humantime, e.g. "5m")
    #[serde(default = "default_sync_interval")]
    pub sync_interval: String,

    /// Upper bound on a single feed download (humantime, e.g. "30s")
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: String,

    /// IANA zone used for feed dates without a UTC marker. Defaults to the
    /// host's zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    #[serde(default = "default_server_port")]
    pub server_port: u16,
}

impl Default for KinsyncConfig {
    fn default() -> Self {
        KinsyncConfig {
            data_dir: default_data_dir(),
            sync_interval: default_sync_interval(),
            fetch_timeout: default_fetch_timeout(),
            timezone: None,
            server_port: default_server_port(),
        }
    }
}

impl KinsyncConfig {
    pub fn config_path() -> KinsyncResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| KinsyncError::Config("Could not determine config directory".into()))?
            .join("kinsync");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location, writing a commented template first
    /// if no config file exists yet.
    pub fn load() -> KinsyncResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> KinsyncResult<Self> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("KINSYNC").try_parsing(true))
            .build()
            .map_err(|e| KinsyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| KinsyncError::Config(e.to_string()))
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> KinsyncResult<()> {
        let contents = format!(
            "\
# kinsync configuration

# Where subscriptions and imported events are stored:
# data_dir = \"{}\"

# How often auto-sync calendars are refreshed:
# sync_interval = \"{}\"

# Give up on a feed download after:
# fetch_timeout = \"{}\"

# Time zone for feed times without a UTC marker (defaults to this machine's):
# timezone = \"America/Chicago\"

# Port for kinsync-server:
# server_port = {}
",
            DEFAULT_DATA_DIR, DEFAULT_SYNC_INTERVAL, DEFAULT_FETCH_TIMEOUT, DEFAULT_SERVER_PORT
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                KinsyncError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| KinsyncError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    pub fn data_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned();
        PathBuf::from(full_path_str)
    }

    pub fn sources_path(&self) -> PathBuf {
        self.data_path().join(SOURCES_FILE)
    }

    pub fn events_path(&self) -> PathBuf {
        self.data_path().join(EVENTS_DIR)
    }

    pub fn sync_interval(&self) -> KinsyncResult<Duration> {
        parse_duration("sync_interval", &self.sync_interval)
    }

    pub fn fetch_timeout(&self) -> KinsyncResult<Duration> {
        parse_duration("fetch_timeout", &self.fetch_timeout)
    }

    /// The zone feed-local times are read in.
    pub fn timezone(&self) -> KinsyncResult<Tz> {
        match &self.timezone {
            Some(name) => name
                .parse()
                .map_err(|_| KinsyncError::Config(format!("Unknown time zone '{}'", name))),
            None => Ok(iana_time_zone::get_timezone()
                .ok()
                .and_then(|name| name.parse().ok())
                .unwrap_or(Tz::UTC)),
        }
    }
}

fn parse_duration(key: &str, value: &str) -> KinsyncResult<Duration> {
    let duration = humantime::parse_duration(value)
        .map_err(|e| KinsyncError::Config(format!("Invalid {key} '{value}': {e}")))?;

    if duration.is_zero() {
        return Err(KinsyncError::Config(format!("{key} must be greater than zero")));
    }

    Ok(duration)
}
