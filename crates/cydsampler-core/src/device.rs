//! Circuit Tracks device link
//!
//! [`CircuitTracks`] owns the serial link and the framer, negotiates device
//! identity, and sends the device commands. Every command is gated on the
//! [`DeviceSession`]: while no device has been detected, commands are
//! declined with [`Error::NotConnected`] and nothing is written.

use crate::config::{Config, DeviceSettings};
use crate::error::{Error, Result};
use crate::framer::MidiFramer;
use crate::midi::{ManufacturerId, MidiMessage};
use crate::samples::SampleUploader;
use crate::sysex::{build_frame, CommandBuilder};
use crate::transport::SerialPort;
use std::time::Duration;

/// Universal Device Inquiry body
pub const DEVICE_INQUIRY: [u8; 4] = [0x7E, 0x00, 0x06, 0x01];

/// Connection state shared by the negotiator and the command path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSession {
    connected: bool,
    manufacturer: Option<ManufacturerId>,
}

impl DeviceSession {
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Manufacturer id of the last detected device
    pub fn manufacturer(&self) -> Option<&ManufacturerId> {
        self.manufacturer.as_ref()
    }

    fn connect(&mut self, manufacturer: ManufacturerId) {
        self.connected = true;
        self.manufacturer = Some(manufacturer);
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }
}

/// Controller for one Circuit Tracks over a serial link
pub struct CircuitTracks<P: SerialPort> {
    port: P,
    framer: MidiFramer,
    builder: CommandBuilder,
    session: DeviceSession,
    settle_delay: Duration,
    query_wait: Duration,
}

impl<P: SerialPort> CircuitTracks<P> {
    /// Create a controller. No traffic happens until [`detect`](Self::detect).
    pub fn new(port: P, settings: &DeviceSettings, max_sysex_len: Option<usize>) -> Self {
        Self {
            port,
            framer: MidiFramer::new(max_sysex_len),
            builder: settings.command_builder(),
            session: DeviceSession::default(),
            settle_delay: settings.settle_delay(),
            query_wait: settings.query_wait(),
        }
    }

    /// Create a controller from a full configuration
    pub fn from_config(port: P, config: &Config) -> Self {
        Self::new(port, &config.device, config.midi.max_sysex_len)
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    pub fn builder(&self) -> &CommandBuilder {
        &self.builder
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn into_port(self) -> P {
        self.port
    }

    /// Send `F0 <manufacturer> data F7`
    pub fn send_sysex(&mut self, manufacturer: &ManufacturerId, data: &[u8]) -> Result<()> {
        let frame = build_frame(manufacturer, data);
        self.write(&frame)
    }

    /// Send a single MIDI message
    pub fn send_message(&mut self, message: &MidiMessage) -> Result<()> {
        self.write(&message.to_bytes())
    }

    /// Read the next complete inbound message, if any
    pub fn read_message(&mut self) -> Option<MidiMessage> {
        self.framer.try_read_message(&mut self.port)
    }

    /// Send the device inquiry, wait for the settle delay, and collect every
    /// SysEx payload that has arrived by then.
    ///
    /// Non-SysEx messages received meanwhile are consumed and discarded.
    pub fn detect_devices(&mut self) -> Result<Vec<Vec<u8>>> {
        self.send_sysex(&ManufacturerId::UNIVERSAL_NON_REALTIME, &DEVICE_INQUIRY)?;

        if !self.settle_delay.is_zero() {
            std::thread::sleep(self.settle_delay);
        }

        let responses = self
            .framer
            .drain(&mut self.port)
            .into_iter()
            .filter_map(|message| match message {
                MidiMessage::SysEx { payload } => Some(payload),
                _ => None,
            })
            .collect::<Vec<_>>();

        log::debug!("Device inquiry collected {} SysEx replies", responses.len());
        Ok(responses)
    }

    /// Run the device inquiry and update the session.
    ///
    /// The session is connected if any reply starts with the configured
    /// manufacturer id, and disconnected otherwise.
    pub fn detect(&mut self) -> Result<bool> {
        let target = *self.builder.manufacturer();
        let responses = self.detect_devices()?;

        if responses.iter().any(|payload| target.matches(payload)) {
            self.session.connect(target);
            log::info!("Circuit Tracks detected (manufacturer {})", target);
            Ok(true)
        } else {
            self.session.disconnect();
            log::warn!("Circuit Tracks not found ({} replies)", responses.len());
            Ok(false)
        }
    }

    /// Send one Upload Sample frame for `slot`
    pub fn upload_sample(&mut self, slot: usize, data: &[u8]) -> Result<()> {
        self.require_connected("upload sample")?;
        let frame = self.builder.upload_sample(slot, data);
        log::debug!("Uploading slot {} ({} sample bytes, {} frame bytes)", slot, data.len(), frame.len());
        self.write(&frame)
    }

    /// Send a Query Slot frame.
    ///
    /// Replies are read after the query wait and only logged; no decoded
    /// result is returned.
    pub fn query_slot(&mut self, slot: usize) -> Result<()> {
        self.require_connected("query slot")?;
        let frame = self.builder.query_slot(slot);
        self.write(&frame)?;

        if !self.query_wait.is_zero() {
            std::thread::sleep(self.query_wait);
        }
        for message in self.framer.drain(&mut self.port) {
            log::debug!("Slot {} query reply: {}", slot, message);
        }
        Ok(())
    }

    /// Send a Save Project frame
    pub fn save_project(&mut self) -> Result<()> {
        self.require_connected("save project")?;
        let frame = self.builder.save_project();
        self.write(&frame)
    }

    fn require_connected(&self, action: &str) -> Result<()> {
        if self.session.is_connected() {
            Ok(())
        } else {
            log::warn!("Cannot {}: Circuit Tracks not connected", action);
            Err(Error::NotConnected)
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.port.write(bytes).map_err(|e| {
            log::warn!("MIDI send error: {}", e);
            Error::Transport(e.to_string())
        })
    }
}

impl<P: SerialPort> SampleUploader for CircuitTracks<P> {
    fn upload_sample(&mut self, slot: usize, data: &[u8]) -> Result<()> {
        CircuitTracks::upload_sample(self, slot, data)
    }
}
