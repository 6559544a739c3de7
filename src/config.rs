use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Duration;
use crate::errors::ConfigError;
use crate::data_models::RainDisplayRule;

pub const DEFAULT_PORT: &str = "COM6";
pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_IMAGE_PATH: &str = "cam_image.jpg";
pub const DEFAULT_IMAGE_WIDTH: u32 = 400;
pub const DEFAULT_IMAGE_HEIGHT: u32 = 500;
pub const DEFAULT_TITLE: &str = "Agrobot V1.0";
pub const DEFAULT_REFRESH_MS: u64 = 250;

// Serial link settings used for every poll
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LinkConfig {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

impl LinkConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Full dashboard configuration. Every field has a default, so a config file
/// only needs to name the values it changes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub link: LinkConfig,
    pub poll_interval_secs: u64,
    pub image_path: Option<PathBuf>,
    pub image_width: u32,
    pub image_height: u32,
    pub title: String,
    pub rain_display_rule: RainDisplayRule,
    pub refresh_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            image_path: Some(PathBuf::from(DEFAULT_IMAGE_PATH)),
            image_width: DEFAULT_IMAGE_WIDTH,
            image_height: DEFAULT_IMAGE_HEIGHT,
            title: DEFAULT_TITLE.to_string(),
            rain_display_rule: RainDisplayRule::default(),
            refresh_ms: DEFAULT_REFRESH_MS,
        }
    }
}

impl DashboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }

    /// Rejects settings the polling loop or the image pane cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.link.port.trim().is_empty() {
            return Err(invalid("link.port", "port name must not be empty"));
        }
        if self.link.baud_rate == 0 {
            return Err(invalid("link.baud_rate", "baud rate must be greater than zero"));
        }
        if self.link.read_timeout_ms == 0 {
            return Err(invalid("link.read_timeout_ms", "read timeout must be greater than zero"));
        }
        if self.poll_interval_secs == 0 {
            return Err(invalid("poll_interval_secs", "poll interval must be at least one second"));
        }
        if self.image_width == 0 || self.image_height == 0 {
            return Err(invalid(
                "image_width/image_height",
                &format!("image size {}x{} has a zero dimension", self.image_width, self.image_height),
            ));
        }
        if self.refresh_ms == 0 {
            return Err(invalid("refresh_ms", "refresh interval must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        message: message.to_string(),
    }
}

// Load the configuration from a JSON file
pub fn load_config(path_str: &str) -> Result<DashboardConfig, ConfigError> {
    let path = PathBuf::from(path_str);
    if !path.exists() {
        return Err(ConfigError::NotFound { path });
    }

    let file = File::open(&path).map_err(|e| ConfigError::IoError {
        path: path.clone(),
        source: e,
    })?;
    let reader = BufReader::new(file);

    let config: DashboardConfig = serde_json::from_reader(reader).map_err(|e| ConfigError::JsonParseError {
        path: path.clone(),
        source: e,
    })?;
    log::debug!("Loaded configuration from {}: {:?}", path.display(), config);

    Ok(config)
}
