use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::IngestError;
use crate::protocol::DEFAULT_MAX_FRAME_BYTES;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/photodrop.conf";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5001;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub max_frame_bytes: u32,
    /// Per-read deadline; `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// 0 = unlimited
    pub max_connections: usize,
    /// 0 = unbounded
    pub queue_capacity: usize,
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            read_timeout: Some(Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS)),
            max_connections: 0,
            queue_capacity: 0,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl Config {
    /// Load configuration from `PHOTODROP_CONFIG` (or the default path) and
    /// apply environment overrides.
    pub fn load() -> Result<Self, IngestError> {
        let config_path = std::env::var("PHOTODROP_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Load configuration from a specific file, then apply environment overrides.
    ///
    /// A missing file is not an error; defaults are used.
    pub fn load_from(config_path: &Path) -> Result<Self, IngestError> {
        let mut config = Config::default();

        if config_path.exists() {
            let content = std::fs::read_to_string(config_path).map_err(|e| {
                IngestError::Config(format!("Cannot read {}: {}", config_path.display(), e))
            })?;
            config.apply_file(&content)?;
        }

        config.apply_env()?;
        Ok(config)
    }

    /// Apply `key = value` lines. Blank lines and `#` comments are skipped,
    /// unknown keys are ignored.
    pub fn apply_file(&mut self, content: &str) -> Result<(), IngestError> {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                self.set(key.trim(), value.trim())?;
            }
        }
        Ok(())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), IngestError> {
        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "bind_address" => self.bind_address = value.to_string(),
            "port" => self.port = parse_value(key, value)?,
            "max_frame_bytes" => self.max_frame_bytes = parse_value(key, value)?,
            "read_timeout_secs" => {
                self.read_timeout = secs_to_timeout(parse_value(key, value)?);
            }
            "max_connections" => self.max_connections = parse_value(key, value)?,
            "queue_capacity" => self.queue_capacity = parse_value(key, value)?,
            "poll_interval_ms" => {
                let ms: u64 = parse_value(key, value)?;
                if ms == 0 {
                    return Err(IngestError::Config(
                        "poll_interval_ms must be greater than 0".to_string(),
                    ));
                }
                self.poll_interval = Duration::from_millis(ms);
            }
            _ => {}
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), IngestError> {
        if let Ok(val) = std::env::var("PHOTODROP_DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("PHOTODROP_BIND_ADDRESS") {
            self.bind_address = val;
        }
        if let Ok(val) = std::env::var("PHOTODROP_PORT") {
            self.port = val
                .parse()
                .map_err(|_| IngestError::Config(format!("Invalid PHOTODROP_PORT: {}", val)))?;
        }
        Ok(())
    }

    /// Socket address to listen on.
    pub fn bind_addr(&self) -> Result<SocketAddr, IngestError> {
        let ip: IpAddr = self.bind_address.parse().map_err(|_| {
            IngestError::Config(format!("Invalid bind address: {}", self.bind_address))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Convert a seconds value where 0 disables the deadline.
pub fn secs_to_timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, IngestError> {
    value
        .parse()
        .map_err(|_| IngestError::Config(format!("Invalid {}: {}", key, value)))
}
