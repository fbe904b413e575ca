//! Configuration file support for cyd-sampler
//!
//! Configuration is stored in TOML format at:
//! - Linux: `~/.config/cyd-sampler/config.toml`
//! - macOS: `~/Library/Application Support/cyd-sampler/config.toml`
//! - Windows: `%APPDATA%\cyd-sampler\config.toml`
//!
//! All device values are fixed for a session. Nothing here is renegotiated
//! with the hardware.

use crate::error::{Error, Result};
use crate::midi::ManufacturerId;
use crate::sysex::{CommandBuilder, DEFAULT_UPLOAD_PAYLOAD_LIMIT, MAX_SLOTS};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Number of sample slots on a Circuit Tracks
pub const DEFAULT_NUM_SLOTS: usize = 64;

/// Default SysEx device id
pub const DEFAULT_DEVICE_ID: u8 = 0x01;

/// Default wait between the device inquiry and reading replies
pub const DEFAULT_SETTLE_MS: u64 = 500;

/// Default wait after a slot query
pub const DEFAULT_QUERY_WAIT_MS: u64 = 200;

/// Default maximum sample file size (256 KiB)
pub const DEFAULT_MAX_SAMPLE_SIZE: usize = 256 * 1024;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default log filter when `RUST_LOG` is not set
    pub log_level: LogLevel,
    /// Target device settings
    pub device: DeviceSettings,
    /// Host MIDI link settings
    pub midi: MidiSettings,
    /// Sample file settings
    pub storage: StorageSettings,
}

impl Config {
    /// Load configuration from the default config file location
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Err(Error::Config(format!("Config file not found at {:?}", path)))
        }
    }

    /// Load and validate configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location, or defaults when there
    /// is no config file.
    ///
    /// A file that exists but does not parse or validate is an error.
    pub fn load_or_default() -> Result<Self> {
        match Self::config_path() {
            Ok(path) => Self::load_or_default_from(&path),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file, or defaults if it is missing
    pub fn load_or_default_from(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default config file location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "cyd-sampler") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            Err(Error::Config("Could not determine config directory".to_string()))
        }
    }

    /// Create a default config file with comments
    pub fn create_default_config_file() -> Result<PathBuf> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, DEFAULT_CONFIG_FILE)?;
        Ok(path)
    }

    /// Check values the wire protocol cannot carry
    pub fn validate(&self) -> Result<()> {
        let device = &self.device;
        if device.num_slots == 0 || device.num_slots > MAX_SLOTS {
            return Err(Error::Config(format!(
                "num_slots must be between 1 and {}, got {}",
                MAX_SLOTS, device.num_slots
            )));
        }
        if device.device_id > 0x7F {
            return Err(Error::Config(format!(
                "device_id {:#04X} is not a MIDI data byte",
                device.device_id
            )));
        }
        if device.upload_payload_limit == 0 {
            return Err(Error::Config("upload_payload_limit must be positive".to_string()));
        }
        if self.midi.max_sysex_len == Some(0) {
            return Err(Error::Config("max_sysex_len must be positive when set".to_string()));
        }
        Ok(())
    }
}

/// Log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter string understood by `env_logger`
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Target device settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Number of sample slots
    pub num_slots: usize,
    /// Manufacturer id used for command frames and detection
    pub manufacturer_id: ManufacturerId,
    /// SysEx device id byte
    pub device_id: u8,
    /// Maximum encoded sample bytes per upload frame
    pub upload_payload_limit: usize,
    /// Wait after the device inquiry before reading replies
    pub settle_ms: u64,
    /// Wait after a slot query
    pub query_wait_ms: u64,
    /// Sample rate expected by the device (informational)
    pub sample_rate: u32,
    /// Largest sample file accepted for a slot
    pub max_sample_size: usize,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            num_slots: DEFAULT_NUM_SLOTS,
            manufacturer_id: ManufacturerId::NOVATION,
            device_id: DEFAULT_DEVICE_ID,
            upload_payload_limit: DEFAULT_UPLOAD_PAYLOAD_LIMIT,
            settle_ms: DEFAULT_SETTLE_MS,
            query_wait_ms: DEFAULT_QUERY_WAIT_MS,
            sample_rate: 22050,
            max_sample_size: DEFAULT_MAX_SAMPLE_SIZE,
        }
    }
}

impl DeviceSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn query_wait(&self) -> Duration {
        Duration::from_millis(self.query_wait_ms)
    }

    /// Command builder addressed to this device
    pub fn command_builder(&self) -> CommandBuilder {
        CommandBuilder::new(self.manufacturer_id, self.device_id, self.upload_payload_limit)
    }
}

/// Host MIDI link settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiSettings {
    /// MIDI client name shown to the host
    pub client_name: String,
    /// Input port name pattern (case-insensitive substring)
    pub input_port: String,
    /// Output port name pattern (case-insensitive substring)
    pub output_port: String,
    /// Upper bound on a single SysEx capture; unbounded if absent
    pub max_sysex_len: Option<usize>,
}

impl Default for MidiSettings {
    fn default() -> Self {
        Self {
            client_name: "cyd-sampler".to_string(),
            input_port: "circuit tracks".to_string(),
            output_port: "circuit tracks".to_string(),
            max_sysex_len: Some(64 * 1024),
        }
    }
}

/// Sample file settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory relative sample paths resolve against
    pub samples_dir: PathBuf,
    /// Accepted file extensions, without the dot
    pub supported_extensions: Vec<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            samples_dir: PathBuf::from("samples"),
            supported_extensions: vec!["wav".to_string(), "raw".to_string()],
        }
    }
}

const DEFAULT_CONFIG_FILE: &str = r#"# cyd-sampler configuration file

# Log level when RUST_LOG is not set: error, warn, info, debug, trace
log_level = "info"

[device]
# Number of sample slots on the device (1-128)
num_slots = 64

# SysEx manufacturer id (Novation)
manufacturer_id = [0x00, 0x20, 0x29]

# SysEx device id
device_id = 0x01

# Encoded sample bytes carried by one upload frame
upload_payload_limit = 256

# Wait after the device inquiry before reading replies (ms)
settle_ms = 500

# Wait after a slot query (ms)
query_wait_ms = 200

# Device sample rate (Hz)
sample_rate = 22050

# Largest accepted sample file (bytes)
max_sample_size = 262144

[midi]
# MIDI client name
client_name = "cyd-sampler"

# Host port name patterns (case-insensitive substring match)
input_port = "circuit tracks"
output_port = "circuit tracks"

# Largest SysEx payload accepted from the device (bytes)
# Remove to accept captures of any length
max_sysex_len = 65536

[storage]
# Relative sample paths resolve against this directory
samples_dir = "samples"

# Accepted sample file extensions
supported_extensions = ["wav", "raw"]
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.device.num_slots, 64);
        assert_eq!(config.device.manufacturer_id, ManufacturerId::NOVATION);
        assert_eq!(config.device.device_id, 0x01);
        assert_eq!(config.device.upload_payload_limit, 256);
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_file_matches_defaults() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG_FILE).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.device.num_slots, defaults.device.num_slots);
        assert_eq!(parsed.device.manufacturer_id, defaults.device.manufacturer_id);
        assert_eq!(parsed.device.settle_ms, defaults.device.settle_ms);
        assert_eq!(parsed.device.max_sample_size, defaults.device.max_sample_size);
        assert_eq!(parsed.midi.max_sysex_len, defaults.midi.max_sysex_len);
        assert_eq!(parsed.storage.supported_extensions, defaults.storage.supported_extensions);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Config = toml::from_str("[device]\nnum_slots = 16\n").unwrap();
        assert_eq!(parsed.device.num_slots, 16);
        assert_eq!(parsed.device.device_id, DEFAULT_DEVICE_ID);
        assert_eq!(parsed.midi.client_name, "cyd-sampler");
    }

    #[test]
    fn test_invalid_manufacturer_id_is_rejected() {
        let result: std::result::Result<Config, _> =
            toml::from_str("[device]\nmanufacturer_id = [0, 32]\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_unencodable_values() {
        let mut config = Config::default();
        config.device.num_slots = 129;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.device.device_id = 0x80;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.device.upload_payload_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.device.num_slots = 32;
        config.midi.input_port = "usb midi".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.device.num_slots, 32);
        assert_eq!(loaded.midi.input_port, "usb midi");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.device.num_slots, DEFAULT_NUM_SLOTS);
        assert_eq!(config.device.device_id, DEFAULT_DEVICE_ID);
    }

    #[test]
    fn test_invalid_file_is_not_replaced_by_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        fs::write(&path, "[device]\nnum_slots = 16\ndevice_id = 0x90\n").unwrap();
        match Config::load_or_default_from(&path) {
            Err(Error::Config(msg)) => assert!(msg.contains("device_id")),
            other => panic!("Expected config error, got {:?}", other),
        }

        fs::write(&path, "[device\nnum_slots = 16\n").unwrap();
        assert!(matches!(Config::load_or_default_from(&path), Err(Error::TomlParse(_))));

        fs::write(&path, "[device]\nnum_slots = 16\n").unwrap();
        assert_eq!(Config::load_or_default_from(&path).unwrap().device.num_slots, 16);
    }
}
