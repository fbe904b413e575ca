//! MIDI message and manufacturer identifier types

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Start of a System Exclusive frame
pub const SYSEX_START: u8 = 0xF0;

/// End of a System Exclusive frame
pub const SYSEX_END: u8 = 0xF7;

/// Status nibble for Note Off
pub const NOTE_OFF: u8 = 0x80;

/// Status nibble for Note On
pub const NOTE_ON: u8 = 0x90;

/// Status nibble for Control Change
pub const CONTROL_CHANGE: u8 = 0xB0;

/// A decoded MIDI message.
///
/// Every data byte is in `0..=127`. The `F0`/`F7` framing bytes are never part
/// of a SysEx payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note on: channel 0-15, note 0-127, velocity 0-127
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Note off: channel 0-15, note 0-127, release velocity 0-127
    NoteOff { channel: u8, note: u8, velocity: u8 },
    /// Control change: channel 0-15, controller 0-127, value 0-127
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// System exclusive payload, without the framing bytes
    SysEx { payload: Vec<u8> },
}

impl MidiMessage {
    /// Convert to raw MIDI bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            MidiMessage::NoteOn { channel, note, velocity } => {
                vec![NOTE_ON | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::NoteOff { channel, note, velocity } => {
                vec![NOTE_OFF | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::ControlChange { channel, controller, value } => {
                vec![CONTROL_CHANGE | (channel & 0x0F), controller & 0x7F, value & 0x7F]
            }
            MidiMessage::SysEx { payload } => {
                let mut bytes = Vec::with_capacity(payload.len() + 2);
                bytes.push(SYSEX_START);
                bytes.extend(payload.iter().map(|b| b & 0x7F));
                bytes.push(SYSEX_END);
                bytes
            }
        }
    }

    /// The channel of a channel voice message
    pub fn channel(&self) -> Option<u8> {
        match self {
            MidiMessage::NoteOn { channel, .. }
            | MidiMessage::NoteOff { channel, .. }
            | MidiMessage::ControlChange { channel, .. } => Some(*channel),
            MidiMessage::SysEx { .. } => None,
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "Note On  ch={} note={} vel={}", channel, note, velocity)
            }
            MidiMessage::NoteOff { channel, note, velocity } => {
                write!(f, "Note Off ch={} note={} vel={}", channel, note, velocity)
            }
            MidiMessage::ControlChange { channel, controller, value } => {
                write!(f, "CC       ch={} cc={} val={}", channel, controller, value)
            }
            MidiMessage::SysEx { payload } => {
                write!(f, "SysEx    {} bytes:", payload.len())?;
                for byte in payload.iter().take(20) {
                    write!(f, " {:02X}", byte)?;
                }
                if payload.len() > 20 {
                    write!(f, " ...")?;
                }
                Ok(())
            }
        }
    }
}

/// Equipment vendor identifier carried right after `F0`.
///
/// Compared by exact byte sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub enum ManufacturerId {
    /// One-byte identifier
    Short(u8),
    /// Three-byte identifier, always starting with `00`
    Extended([u8; 3]),
}

impl ManufacturerId {
    /// Novation / Focusrite
    pub const NOVATION: Self = Self::Extended([0x00, 0x20, 0x29]);

    /// Universal non-realtime SysEx
    pub const UNIVERSAL_NON_REALTIME: Self = Self::Short(0x7E);

    /// The identifier bytes as they appear on the wire
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ManufacturerId::Short(byte) => std::slice::from_ref(byte),
            ManufacturerId::Extended(bytes) => bytes,
        }
    }

    /// Whether a SysEx payload starts with this identifier
    pub fn matches(&self, payload: &[u8]) -> bool {
        payload.starts_with(self.as_bytes())
    }
}

impl Default for ManufacturerId {
    fn default() -> Self {
        Self::NOVATION
    }
}

impl TryFrom<&[u8]> for ManufacturerId {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if let Some(byte) = bytes.iter().find(|b| **b > 0x7F) {
            return Err(Error::Config(format!(
                "manufacturer id byte {:#04X} is not a MIDI data byte",
                byte
            )));
        }
        match *bytes {
            [0x00] => Err(Error::Config(
                "one-byte manufacturer id 00 is reserved for three-byte ids".to_string(),
            )),
            [byte] => Ok(Self::Short(byte)),
            [a, b, c] => Ok(Self::Extended([a, b, c])),
            _ => Err(Error::Config(format!(
                "manufacturer id must be 1 or 3 bytes, got {}",
                bytes.len()
            ))),
        }
    }
}

impl TryFrom<Vec<u8>> for ManufacturerId {
    type Error = Error;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::try_from(bytes.as_slice())
    }
}

impl From<ManufacturerId> for Vec<u8> {
    fn from(id: ManufacturerId) -> Self {
        id.as_bytes().to_vec()
    }
}

impl fmt::Display for ManufacturerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex: Vec<String> = self.as_bytes().iter().map(|b| format!("{:02X}", b)).collect();
        write!(f, "{}", hex.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_message_bytes() {
        let note_on = MidiMessage::NoteOn { channel: 0, note: 60, velocity: 100 };
        assert_eq!(note_on.to_bytes(), vec![0x90, 60, 100]);

        let note_off = MidiMessage::NoteOff { channel: 1, note: 48, velocity: 64 };
        assert_eq!(note_off.to_bytes(), vec![0x81, 48, 64]);

        let cc = MidiMessage::ControlChange { channel: 15, controller: 1, value: 64 };
        assert_eq!(cc.to_bytes(), vec![0xBF, 1, 64]);
    }

    #[test]
    fn test_sysex_bytes_are_framed() {
        let msg = MidiMessage::SysEx { payload: vec![0x00, 0x20, 0x29] };
        assert_eq!(msg.to_bytes(), vec![0xF0, 0x00, 0x20, 0x29, 0xF7]);
        assert_eq!(msg.channel(), None);
    }

    #[test]
    fn test_manufacturer_id_matching() {
        assert!(ManufacturerId::NOVATION.matches(&[0x00, 0x20, 0x29, 0x01]));
        assert!(!ManufacturerId::NOVATION.matches(&[0x00, 0x20]));
        assert!(!ManufacturerId::NOVATION.matches(&[0x01, 0x02, 0x03]));
        assert!(ManufacturerId::Short(0x41).matches(&[0x41, 0x10]));
    }

    #[test]
    fn test_manufacturer_id_from_bytes() {
        assert_eq!(
            ManufacturerId::try_from(vec![0x00, 0x20, 0x29]).unwrap(),
            ManufacturerId::NOVATION
        );
        assert_eq!(ManufacturerId::try_from(vec![0x7E]).unwrap(), ManufacturerId::Short(0x7E));
        assert!(ManufacturerId::try_from(vec![0x00]).is_err());
        assert!(ManufacturerId::try_from(vec![0x00, 0x20]).is_err());
        assert!(ManufacturerId::try_from(vec![0x80]).is_err());
        assert_eq!(ManufacturerId::NOVATION.to_string(), "00 20 29");
    }
}
