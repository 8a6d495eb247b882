// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Connection lifecycle.
//!
//! A [`Session`] is either disconnected or holds exactly one listening MIDI
//! input together with the relay that owns the serial port. The two are
//! acquired together in [`Session::connect`] and released together in
//! [`Session::disconnect`]; a failed connect releases whatever it had
//! already acquired before returning.

use std::mem;
use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::devices::resolve_port_name;
use crate::error::BridgeError;
use crate::midi::{MidiBackend, MidiListener};
use crate::relay::{Relay, RelayMonitor, RelaySnapshot};
use crate::serial::SerialBackend;

/// Live resources of an established connection
pub struct Connection {
    listener: Box<dyn MidiListener>,
    relay: Relay,
}

impl Connection {
    /// Name of the MIDI input device
    pub fn midi_device(&self) -> &str {
        self.listener.name()
    }

    /// OS identifier of the serial port
    pub fn serial_port(&self) -> &str {
        self.relay.port()
    }

    /// Whether the relay worker is still forwarding
    pub fn is_relaying(&self) -> bool {
        self.relay.is_running()
    }

    fn close(self) {
        let Connection { listener, relay } = self;
        // Stop the producer before the consumer
        listener.stop_listening();
        relay.shutdown();
    }
}

/// Connection state
pub enum ConnectionState {
    Disconnected,
    Connected(Connection),
}

/// Owns the backends and the current connection state
pub struct Session<M: MidiBackend, S: SerialBackend> {
    midi: M,
    serial: S,
    config: BridgeConfig,
    state: ConnectionState,
    monitor: Arc<RelayMonitor>,
}

impl<M: MidiBackend, S: SerialBackend> Session<M, S> {
    pub fn new(midi: M, serial: S, config: BridgeConfig) -> Self {
        Self {
            midi,
            serial,
            config,
            state: ConnectionState::Disconnected,
            monitor: Arc::new(RelayMonitor::default()),
        }
    }

    /// Names of the available MIDI input devices
    pub fn midi_devices(&self) -> Result<Vec<String>, BridgeError> {
        self.midi.input_names()
    }

    /// Open `midi_name` and the serial port named in `serial_display`, then
    /// start relaying.
    ///
    /// `serial_display` is a device display name such as
    /// `"USB Serial Device (COM3)"`; it is resolved against the ports the OS
    /// currently reports. On error the session stays disconnected.
    pub fn connect(&mut self, midi_name: &str, serial_display: &str) -> Result<(), BridgeError> {
        if let ConnectionState::Connected(conn) = &self.state {
            return Err(BridgeError::AlreadyConnected {
                midi: conn.midi_device().to_string(),
                port: conn.serial_port().to_string(),
            });
        }

        match self.open(midi_name, serial_display) {
            Ok(connection) => {
                tracing::info!(
                    midi = connection.midi_device(),
                    port = connection.serial_port(),
                    baud = self.config.serial.baud_rate,
                    "connected"
                );
                self.state = ConnectionState::Connected(connection);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(midi = midi_name, serial = serial_display, error = %e, "connect failed");
                Err(e)
            }
        }
    }

    fn open(&self, midi_name: &str, serial_display: &str) -> Result<Connection, BridgeError> {
        let device = self.midi.open(midi_name)?;

        let ports = self.serial.port_names()?;
        let port = resolve_port_name(serial_display, &ports)
            .ok_or_else(|| BridgeError::NoMatchingPort(serial_display.to_string()))?;
        let link = self.serial.open(port, &self.config.serial)?;

        self.monitor.reset();
        let relay = Relay::spawn(link, &self.config.relay, self.monitor.clone())?;
        let listener = device.start_listening(relay.sink().into_handler())?;

        Ok(Connection { listener, relay })
    }

    /// Stop relaying and release both devices. Does nothing when already
    /// disconnected.
    pub fn disconnect(&mut self) {
        match mem::replace(&mut self.state, ConnectionState::Disconnected) {
            ConnectionState::Connected(connection) => {
                let midi = connection.midi_device().to_string();
                let port = connection.serial_port().to_string();
                connection.close();
                let snapshot = self.monitor.snapshot();
                tracing::info!(
                    midi = %midi,
                    port = %port,
                    forwarded = snapshot.forwarded,
                    dropped = snapshot.dropped,
                    "disconnected"
                );
            }
            ConnectionState::Disconnected => {
                tracing::debug!("disconnect requested while not connected");
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    /// The active connection, if any
    pub fn connection(&self) -> Option<&Connection> {
        match &self.state {
            ConnectionState::Connected(conn) => Some(conn),
            ConnectionState::Disconnected => None,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Relay counters for the current (or last) connection
    pub fn relay_snapshot(&self) -> RelaySnapshot {
        self.monitor.snapshot()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

impl<M: MidiBackend, S: SerialBackend> Drop for Session<M, S> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
