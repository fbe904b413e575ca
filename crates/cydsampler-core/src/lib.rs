//! cydsampler-core - MIDI transport and sample upload engine
//!
//! Drives a Novation Circuit Tracks from a sampler front end over a plain
//! serial MIDI link:
//!
//! - Frames an unframed byte stream into MIDI messages
//! - Packs 8-bit sample data into 7-bit SysEx payloads
//! - Detects the device with a Universal Device Inquiry
//! - Builds Upload Sample, Query Slot and Save Project frames
//! - Tracks sample slots and the queue of slots awaiting upload
//!
//! # Usage as a Library
//!
//! ```no_run
//! use cydsampler_core::{CircuitTracks, Config, FsSampleStorage, MemoryPort, SampleRegistry};
//! use std::path::Path;
//!
//! let config = Config::load_or_default()?;
//! let mut device = CircuitTracks::from_config(MemoryPort::new(), &config);
//! let storage = FsSampleStorage::from_config(&config);
//! let mut registry = SampleRegistry::from_config(&config);
//!
//! if device.detect()? {
//!     registry.assign(5, Path::new("kick.wav"), &storage)?;
//!     let report = registry.upload_all_pending(&mut device);
//!     println!("uploaded {:?}, failed {:?}", report.uploaded, report.failed);
//! }
//! # Ok::<(), cydsampler_core::Error>(())
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod framer;
pub mod midi;
pub mod samples;
pub mod seven_bit;
pub mod sysex;
pub mod transport;

// Re-export main types
pub use config::{Config, DeviceSettings, LogLevel, MidiSettings, StorageSettings};
pub use device::{CircuitTracks, DeviceSession, DEVICE_INQUIRY};
pub use error::{Error, Result};
pub use framer::MidiFramer;
pub use midi::{ManufacturerId, MidiMessage};
pub use samples::{
    FsSampleStorage, SampleRegistry, SampleSlot, SampleStorage, SampleUploader, SlotStatus, UploadReport,
};
pub use seven_bit::{decode_7bit, encode_7bit};
pub use sysex::{build_frame, Command, CommandBuilder};
pub use transport::{MemoryPort, SerialPort};

#[cfg(feature = "native")]
pub use transport::{list_ports, MidirPort};
