use std::io;
use std::path::PathBuf;
use std::string::FromUtf8Error;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse JSON configuration in {path}: {source}")]
    JsonParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Configuration file not found at {path}")]
    NotFound { path: PathBuf },
    #[error("Invalid configuration value for '{field}': {message}")]
    Invalid { field: String, message: String },
}

/// Failures of the serial link for a single poll. None of these are fatal.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("No data on {port} within {timeout:?}")]
    Timeout { port: String, timeout: Duration },
    #[error("IO error reading from {port}: {source}")]
    Io {
        port: String,
        #[source]
        source: io::Error,
    },
    #[error("Received bytes on {port} are not valid UTF-8: {source}")]
    Decode {
        port: String,
        #[source]
        source: FromUtf8Error,
    },
    #[error("Serial port {port} closed before a full line was received")]
    Disconnected { port: String },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Expected {expected} fields but found {found} in record '{line}'")]
    FieldCount {
        expected: usize,
        found: usize,
        line: String,
    },
    #[error("Field '{field}' has value '{value}' which is not a valid {expected_type}")]
    InvalidField {
        field: &'static str,
        value: String,
        expected_type: &'static str,
    },
    #[error("Unexpected data after the record in '{line}'")]
    TrailingData { line: String },
    #[error("Error splitting record '{line}': {source}")]
    Csv {
        line: String,
        #[source]
        source: csv::Error,
    },
}

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Failed to load image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Errors that stop the dashboard binary. Everything raised inside a poll
/// cycle is handled by the poller instead.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Configuration loading failed: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to enumerate serial ports: {0}")]
    PortEnumeration(#[from] serialport::Error),
    #[error("Terminal output failed: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to start the {name} thread: {source}")]
    ThreadSpawn {
        name: String,
        #[source]
        source: io::Error,
    },
}
