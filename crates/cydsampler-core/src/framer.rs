//! Byte stream to MIDI message framing
//!
//! [`MidiFramer`] pulls bytes from a [`SerialPort`] one at a time and turns
//! them into [`MidiMessage`]s. Bytes of a message that has not fully arrived
//! yet stay inside the framer, so `try_read_message` never blocks and never
//! loses a partially received message between calls.
//!
//! Decoding rules:
//! - `F0` starts a SysEx capture that ends at `F7`.
//! - `8n`, `9n` and `Bn` take exactly two data bytes.
//! - Any other status byte is dropped, together with the data bytes that
//!   follow it.
//! - Real-time bytes (`F8`..`FF`) are dropped wherever they appear, including
//!   in the middle of a SysEx capture.
//! - Any other status byte arriving during a SysEx capture aborts the capture
//!   and starts the next message.

use crate::midi::{MidiMessage, CONTROL_CHANGE, NOTE_OFF, NOTE_ON, SYSEX_END, SYSEX_START};
use crate::transport::SerialPort;

#[derive(Debug)]
enum State {
    /// Waiting for a status byte
    Idle,
    /// Collecting the two data bytes of a channel voice message
    Channel { status: u8, data: [u8; 2], len: usize },
    /// Inside `F0 ... F7`
    SysEx { payload: Vec<u8>, overflowed: bool },
}

/// Incremental MIDI message framer
#[derive(Debug)]
pub struct MidiFramer {
    state: State,
    max_sysex_len: Option<usize>,
}

impl Default for MidiFramer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl MidiFramer {
    /// Create a framer. `max_sysex_len` bounds the payload of a single SysEx
    /// capture; `None` leaves it unbounded.
    pub fn new(max_sysex_len: Option<usize>) -> Self {
        Self {
            state: State::Idle,
            max_sysex_len,
        }
    }

    /// Whether part of a message has been received but not yet completed
    pub fn has_partial(&self) -> bool {
        !matches!(self.state, State::Idle)
    }

    /// Read the next complete message, if one is available.
    ///
    /// Consumes bytes from the port only up to the end of the returned
    /// message. Returns `None` once the port has no more bytes.
    pub fn try_read_message<P: SerialPort + ?Sized>(&mut self, port: &mut P) -> Option<MidiMessage> {
        while port.bytes_available() > 0 {
            for byte in port.read(1) {
                if let Some(message) = self.push(byte) {
                    log::debug!("MIDI in: {}", message);
                    return Some(message);
                }
            }
        }
        None
    }

    /// Drain every message currently available on the port
    pub fn drain<P: SerialPort + ?Sized>(&mut self, port: &mut P) -> Vec<MidiMessage> {
        let mut messages = Vec::new();
        while let Some(message) = self.try_read_message(port) {
            messages.push(message);
        }
        messages
    }

    /// Feed one byte. Returns a message when this byte completes one.
    pub fn push(&mut self, byte: u8) -> Option<MidiMessage> {
        if byte >= 0xF8 {
            return None;
        }

        if byte & 0x80 != 0 {
            return self.push_status(byte);
        }

        match &mut self.state {
            State::Idle => {
                log::trace!("Dropping data byte {:#04X} without status", byte);
                None
            }
            State::Channel { status, data, len } => {
                data[*len] = byte;
                *len += 1;
                if *len < 2 {
                    return None;
                }
                let message = Self::channel_message(*status, *data);
                self.state = State::Idle;
                message
            }
            State::SysEx { payload, overflowed } => {
                match self.max_sysex_len {
                    Some(max) if payload.len() >= max => *overflowed = true,
                    _ => payload.push(byte),
                }
                None
            }
        }
    }

    fn push_status(&mut self, status: u8) -> Option<MidiMessage> {
        let previous = std::mem::replace(&mut self.state, State::Idle);

        if let State::SysEx { payload, overflowed } = previous {
            if status == SYSEX_END {
                if overflowed {
                    log::warn!(
                        "Dropping SysEx longer than {} bytes",
                        self.max_sysex_len.unwrap_or_default()
                    );
                    return None;
                }
                return Some(MidiMessage::SysEx { payload });
            }
            log::warn!(
                "SysEx interrupted by status {:#04X} after {} bytes, discarding",
                status,
                payload.len()
            );
        } else if let State::Channel { status: pending, .. } = previous {
            log::debug!("Incomplete message {:#04X} interrupted by {:#04X}", pending, status);
        }

        self.state = match status {
            SYSEX_START => State::SysEx {
                payload: Vec::new(),
                overflowed: false,
            },
            s if matches!(s & 0xF0, NOTE_OFF | NOTE_ON | CONTROL_CHANGE) => State::Channel {
                status: s,
                data: [0; 2],
                len: 0,
            },
            s => {
                log::trace!("Dropping unsupported status {:#04X}", s);
                State::Idle
            }
        };
        None
    }

    fn channel_message(status: u8, data: [u8; 2]) -> Option<MidiMessage> {
        let channel = status & 0x0F;
        match status & 0xF0 {
            NOTE_ON => Some(MidiMessage::NoteOn {
                channel,
                note: data[0],
                velocity: data[1],
            }),
            NOTE_OFF => Some(MidiMessage::NoteOff {
                channel,
                note: data[0],
                velocity: data[1],
            }),
            CONTROL_CHANGE => Some(MidiMessage::ControlChange {
                channel,
                controller: data[0],
                value: data[1],
            }),
            _ => None,
        }
    }
}
