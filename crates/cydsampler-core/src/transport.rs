//! Serial byte transports
//!
//! The engine talks to the device through [`SerialPort`], a plain byte pipe
//! with no framing of its own. Two implementations are provided:
//!
//! - [`MemoryPort`] keeps inbound bytes in a queue and records every write.
//!   Used by tests and dry runs.
//! - [`MidirPort`] (feature `native`) bridges host MIDI ports via `midir`.

use std::collections::VecDeque;
use std::io;

/// An unframed, bidirectional byte stream.
pub trait SerialPort {
    /// Number of inbound bytes that can be read without waiting
    fn bytes_available(&self) -> usize;

    /// Read up to `n` bytes. Returns fewer (possibly none) if fewer are
    /// available.
    fn read(&mut self, n: usize) -> Vec<u8>;

    /// Write all bytes to the link
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// In-memory transport
#[derive(Debug, Default)]
pub struct MemoryPort {
    inbound: VecDeque<u8>,
    writes: Vec<Vec<u8>>,
    fail_writes: bool,
}

impl MemoryPort {
    /// Create an empty port
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a port with bytes already waiting to be read
    pub fn with_inbound(bytes: &[u8]) -> Self {
        let mut port = Self::new();
        port.push_inbound(bytes);
        port
    }

    /// Queue bytes as if they had arrived from the device
    pub fn push_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    /// Every successful write, in order
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// All written bytes concatenated
    pub fn written(&self) -> Vec<u8> {
        self.writes.concat()
    }

    /// Forget recorded writes
    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    /// Make subsequent writes fail (or succeed again)
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

impl SerialPort for MemoryPort {
    fn bytes_available(&self) -> usize {
        self.inbound.len()
    }

    fn read(&mut self, n: usize) -> Vec<u8> {
        let n = n.min(self.inbound.len());
        self.inbound.drain(..n).collect()
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "link down"));
        }
        self.writes.push(bytes.to_vec());
        Ok(())
    }
}

#[cfg(feature = "native")]
pub use native::{list_ports, MidirPort};

#[cfg(feature = "native")]
mod native {
    use super::SerialPort;
    use crate::error::{Error, Result};
    use crossbeam_channel::{unbounded, Receiver};
    use midir::{Ignore, MidiIO, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
    use std::io;

    /// Host MIDI ports used as a serial link.
    ///
    /// The input callback forwards every received byte into a channel; reads
    /// drain that channel without blocking.
    pub struct MidirPort {
        rx: Receiver<u8>,
        output: MidiOutputConnection,
        _input: MidiInputConnection<()>,
        input_name: String,
        output_name: String,
    }

    impl MidirPort {
        /// Open the first input and output ports whose names contain the
        /// given patterns (case-insensitive).
        pub fn open(client_name: &str, input_pattern: &str, output_pattern: &str) -> Result<Self> {
            let mut midi_in = MidiInput::new(client_name)
                .map_err(|e| Error::Midi(format!("Failed to create MIDI input: {}", e)))?;
            // SysEx must come through; clock and active sensing are noise here
            midi_in.ignore(Ignore::TimeAndActiveSense);

            let (in_port, input_name) = find_port(&midi_in, input_pattern)?;

            let (tx, rx) = unbounded();
            let input = midi_in
                .connect(
                    &in_port,
                    "cyd-sampler-in",
                    move |_timestamp, bytes, _| {
                        for &byte in bytes {
                            let _ = tx.send(byte);
                        }
                    },
                    (),
                )
                .map_err(|e| Error::Midi(format!("Failed to connect to '{}': {}", input_name, e)))?;

            let midi_out = MidiOutput::new(client_name)
                .map_err(|e| Error::Midi(format!("Failed to create MIDI output: {}", e)))?;
            let (out_port, output_name) = find_port(&midi_out, output_pattern)?;
            let output = midi_out
                .connect(&out_port, "cyd-sampler-out")
                .map_err(|e| Error::Midi(format!("Failed to connect to '{}': {}", output_name, e)))?;

            log::info!("MIDI link open: in='{}' out='{}'", input_name, output_name);

            Ok(Self {
                rx,
                output,
                _input: input,
                input_name,
                output_name,
            })
        }

        /// Name of the connected input port
        pub fn input_name(&self) -> &str {
            &self.input_name
        }

        /// Name of the connected output port
        pub fn output_name(&self) -> &str {
            &self.output_name
        }
    }

    impl SerialPort for MidirPort {
        fn bytes_available(&self) -> usize {
            self.rx.len()
        }

        fn read(&mut self, n: usize) -> Vec<u8> {
            self.rx.try_iter().take(n).collect()
        }

        fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.output
                .send(bytes)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
        }
    }

    fn find_port<T: MidiIO>(io: &T, pattern: &str) -> Result<(T::Port, String)> {
        let pattern = pattern.to_lowercase();
        io.ports()
            .into_iter()
            .filter_map(|port| io.port_name(&port).ok().map(|name| (port, name)))
            .find(|(_, name)| name.to_lowercase().contains(&pattern))
            .ok_or_else(|| Error::Midi(format!("No MIDI port found matching '{}'", pattern)))
    }

    /// List host MIDI input and output port names
    pub fn list_ports(client_name: &str) -> Result<(Vec<String>, Vec<String>)> {
        let midi_in = MidiInput::new(client_name)
            .map_err(|e| Error::Midi(format!("Failed to create MIDI input: {}", e)))?;
        let midi_out = MidiOutput::new(client_name)
            .map_err(|e| Error::Midi(format!("Failed to create MIDI output: {}", e)))?;

        let inputs = midi_in
            .ports()
            .iter()
            .enumerate()
            .map(|(i, port)| midi_in.port_name(port).unwrap_or_else(|_| format!("Unknown Device {}", i)))
            .collect();
        let outputs = midi_out
            .ports()
            .iter()
            .enumerate()
            .map(|(i, port)| midi_out.port_name(port).unwrap_or_else(|_| format!("Unknown Device {}", i)))
            .collect();

        Ok((inputs, outputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_port_short_read() {
        let mut port = MemoryPort::with_inbound(&[1, 2, 3]);
        assert_eq!(port.bytes_available(), 3);
        assert_eq!(port.read(2), vec![1, 2]);
        assert_eq!(port.read(5), vec![3]);
        assert!(port.read(1).is_empty());
    }

    #[test]
    fn test_memory_port_records_writes() {
        let mut port = MemoryPort::new();
        port.write(&[0xF0, 0xF7]).unwrap();
        port.write(&[0x90, 60, 100]).unwrap();
        assert_eq!(port.writes().len(), 2);
        assert_eq!(port.written(), vec![0xF0, 0xF7, 0x90, 60, 100]);

        port.set_fail_writes(true);
        assert!(port.write(&[0xFE]).is_err());
        assert_eq!(port.writes().len(), 2);
    }
}
