//! Error types for the sampler engine

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the device or managing slots.
///
/// Transport failures are reported to the immediate caller and never retried.
/// Precondition violations (`NotConnected`, `SlotOutOfRange`, `EmptySlot`,
/// `EmptySample`, `SampleTooLarge`) are returned before anything is sent or
/// mutated.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial write or read failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Host MIDI backend error (port lookup, connection)
    #[error("MIDI error: {0}")]
    Midi(String),

    /// A device command was issued before the device was detected
    #[error("Device not connected")]
    NotConnected,

    /// Slot index outside `[0, num_slots)`
    #[error("Slot {slot} out of range (device has {num_slots} slots)")]
    SlotOutOfRange { slot: usize, num_slots: usize },

    /// Upload requested for a slot that holds no sample data
    #[error("Slot {0} has no sample data")]
    EmptySlot(usize),

    /// Sample file exists but is empty
    #[error("Sample file {0:?} is empty")]
    EmptySample(PathBuf),

    /// Sample file exceeds the configured size limit
    #[error("Sample file {path:?} is {size} bytes (limit {max})")]
    SampleTooLarge { path: PathBuf, size: usize, max: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}
