//! SysEx frame assembly for Circuit Tracks commands
//!
//! Every command frame has the shape
//!
//! ```text
//! F0 <manufacturer id> <device id> <command> <payload...> F7
//! ```

use crate::midi::{ManufacturerId, SYSEX_END, SYSEX_START};
use crate::seven_bit::encode_7bit;

/// Default cap on encoded sample bytes carried by one upload frame
pub const DEFAULT_UPLOAD_PAYLOAD_LIMIT: usize = 256;

/// Slot numbers travel as one data byte, so slots are `0..MAX_SLOTS`
pub const MAX_SLOTS: usize = 128;

/// Device command codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Write sample data into a slot
    UploadSample = 0x01,
    /// Ask the device about a slot
    QuerySlot = 0x02,
    /// Persist the current project on the device
    SaveProject = 0x03,
}

impl Command {
    /// Wire value of the command byte
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Wrap data in `F0 <manufacturer id> ... F7`.
pub fn build_frame(manufacturer: &ManufacturerId, data: &[u8]) -> Vec<u8> {
    let id = manufacturer.as_bytes();
    let mut frame = Vec::with_capacity(data.len() + id.len() + 2);
    frame.push(SYSEX_START);
    frame.extend_from_slice(id);
    frame.extend_from_slice(data);
    frame.push(SYSEX_END);
    frame
}

/// Builds command frames addressed to one device.
///
/// The builder only borrows sample data for the duration of a call.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    manufacturer: ManufacturerId,
    device_id: u8,
    upload_payload_limit: usize,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new(ManufacturerId::NOVATION, 0x01, DEFAULT_UPLOAD_PAYLOAD_LIMIT)
    }
}

impl CommandBuilder {
    /// `device_id` must be a MIDI data byte (`<= 0x7F`). Debug builds panic
    /// otherwise; `Config::validate` rejects such ids before a builder is made.
    pub fn new(manufacturer: ManufacturerId, device_id: u8, upload_payload_limit: usize) -> Self {
        debug_assert!(device_id <= 0x7F, "device id {:#04X} is not a data byte", device_id);
        Self {
            manufacturer,
            device_id,
            upload_payload_limit,
        }
    }

    pub fn manufacturer(&self) -> &ManufacturerId {
        &self.manufacturer
    }

    pub fn device_id(&self) -> u8 {
        self.device_id
    }

    pub fn upload_payload_limit(&self) -> usize {
        self.upload_payload_limit
    }

    /// Upload Sample: slot byte followed by the 7-bit encoded sample,
    /// truncated to the payload limit.
    ///
    /// Anything past the limit is not transmitted. One call carries one
    /// frame; samples are not chunked across frames. `slot` must be below
    /// [`MAX_SLOTS`].
    pub fn upload_sample(&self, slot: usize, sample: &[u8]) -> Vec<u8> {
        let mut encoded = encode_7bit(sample);
        if encoded.len() > self.upload_payload_limit {
            log::debug!(
                "Truncating slot {} upload from {} to {} encoded bytes",
                slot,
                encoded.len(),
                self.upload_payload_limit
            );
            encoded.truncate(self.upload_payload_limit);
        }
        self.frame(Command::UploadSample, &[slot_byte(slot)], &encoded)
    }

    /// Query Slot: slot byte only. `slot` must be below [`MAX_SLOTS`].
    pub fn query_slot(&self, slot: usize) -> Vec<u8> {
        self.frame(Command::QuerySlot, &[slot_byte(slot)], &[])
    }

    /// Save Project: no payload
    pub fn save_project(&self) -> Vec<u8> {
        self.frame(Command::SaveProject, &[], &[])
    }

    fn frame(&self, command: Command, header: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut data = Vec::with_capacity(2 + header.len() + payload.len());
        data.push(self.device_id);
        data.push(command.code());
        data.extend_from_slice(header);
        data.extend_from_slice(payload);
        build_frame(&self.manufacturer, &data)
    }
}

fn slot_byte(slot: usize) -> u8 {
    debug_assert!(slot < MAX_SLOTS, "slot {} does not fit a data byte", slot);
    (slot & 0xFF) as u8
}
