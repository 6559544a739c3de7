use crate::config::{load_config, DashboardConfig};
use crate::data_models::RainDisplayRule;
use crate::errors::ConfigError;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "sensor_dashboard")]
#[command(about = "Live environmental sensor readouts from a serial/Bluetooth link", long_about = None)]
pub struct Args {
    /// JSON configuration file. Command line values override it.
    #[arg(long, env = "SENSOR_DASHBOARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Serial port name (e.g. COM6, /dev/rfcomm0, /dev/ttyUSB0)
    #[arg(long, env = "SENSOR_PORT")]
    pub port: Option<String>,

    /// Baud rate of the link
    #[arg(long, env = "SENSOR_BAUD_RATE")]
    pub baud_rate: Option<u32>,

    /// How long to wait for one record, in milliseconds
    #[arg(long, env = "SENSOR_READ_TIMEOUT_MS")]
    pub read_timeout_ms: Option<u64>,

    /// Seconds to sleep between polls
    #[arg(long, env = "SENSOR_POLL_INTERVAL_SECS")]
    pub interval_secs: Option<u64>,

    /// Camera snapshot to show next to the readouts
    #[arg(long, env = "SENSOR_IMAGE")]
    pub image: Option<PathBuf>,

    /// Show the black placeholder instead of loading any image
    #[arg(long, conflicts_with = "image")]
    pub no_image: bool,

    /// Panel title
    #[arg(long)]
    pub title: Option<String>,

    /// How the rain readout is derived
    #[arg(long, value_enum)]
    pub rain_rule: Option<RainDisplayRule>,

    /// Stop after this many polls (runs forever when omitted)
    #[arg(long)]
    pub max_polls: Option<u64>,

    /// List available serial ports and exit
    #[arg(long)]
    pub list_ports: bool,
}

impl Args {
    /// Builds the effective configuration: defaults, then the config file,
    /// then command line / environment values.
    pub fn resolve_config(&self) -> Result<DashboardConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(&path.to_string_lossy())?,
            None => DashboardConfig::default(),
        };
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut DashboardConfig) {
        if let Some(port) = &self.port {
            config.link.port = port.clone();
        }
        if let Some(baud_rate) = self.baud_rate {
            config.link.baud_rate = baud_rate;
        }
        if let Some(timeout) = self.read_timeout_ms {
            config.link.read_timeout_ms = timeout;
        }
        if let Some(interval) = self.interval_secs {
            config.poll_interval_secs = interval;
        }
        if let Some(image) = &self.image {
            config.image_path = Some(image.clone());
        }
        if self.no_image {
            config.image_path = None;
        }
        if let Some(title) = &self.title {
            config.title = title.clone();
        }
        if let Some(rule) = self.rain_rule {
            config.rain_display_rule = rule;
        }
    }
}
