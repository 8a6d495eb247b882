// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI input through midir.
//!
//! Messages are handed to the registered handler exactly as the driver
//! delivers them; nothing is parsed or validated here.

use midir::{Ignore, MidiInput, MidiInputConnection, MidiInputPort};

use super::{MessageHandler, MidiBackend, MidiInputDevice, MidiListener};
use crate::config::{IgnoreSetting, MidiConfig};
use crate::error::BridgeError;

/// MIDI backend using the platform MIDI stack
#[derive(Debug, Clone)]
pub struct MidirBackend {
    client_name: String,
    ignore: IgnoreSetting,
}

impl MidirBackend {
    pub fn new(config: &MidiConfig) -> Self {
        Self {
            client_name: config.client_name.clone(),
            ignore: config.ignore,
        }
    }

    fn client(&self) -> Result<MidiInput, BridgeError> {
        let mut input = MidiInput::new(&self.client_name)
            .map_err(|e| BridgeError::MidiInit(e.to_string()))?;
        input.ignore(ignore_flags(self.ignore));
        Ok(input)
    }
}

impl Default for MidirBackend {
    fn default() -> Self {
        Self::new(&MidiConfig::default())
    }
}

impl MidiBackend for MidirBackend {
    fn input_names(&self) -> Result<Vec<String>, BridgeError> {
        let input = self.client()?;
        input
            .ports()
            .iter()
            .map(|port| {
                input
                    .port_name(port)
                    .map_err(|e| BridgeError::Enumeration(e.to_string()))
            })
            .collect()
    }

    fn open(&self, name: &str) -> Result<Box<dyn MidiInputDevice>, BridgeError> {
        let input = self.client()?;
        let port = input
            .ports()
            .into_iter()
            .find(|port| input.port_name(port).map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| BridgeError::MidiDeviceNotFound(name.to_string()))?;

        tracing::debug!(device = name, "MIDI input opened");
        Ok(Box::new(MidirDevice {
            input,
            port,
            name: name.to_string(),
            connection_name: format!("{} input", self.client_name),
        }))
    }
}

/// An opened midir input port
struct MidirDevice {
    input: MidiInput,
    port: MidiInputPort,
    name: String,
    connection_name: String,
}

impl MidiInputDevice for MidirDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn start_listening(
        self: Box<Self>,
        mut handler: MessageHandler,
    ) -> Result<Box<dyn MidiListener>, BridgeError> {
        let MidirDevice {
            input,
            port,
            name,
            connection_name,
        } = *self;

        let connection = input
            .connect(
                &port,
                &connection_name,
                move |_stamp, message, _| handler(message),
                (),
            )
            .map_err(|e| BridgeError::MidiConnect {
                device: name.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(device = %name, "MIDI input listening");
        Ok(Box::new(MidirListener { connection, name }))
    }
}

/// A live midir connection; closing it drops the handler
struct MidirListener {
    connection: MidiInputConnection<()>,
    name: String,
}

impl MidiListener for MidirListener {
    fn name(&self) -> &str {
        &self.name
    }

    fn stop_listening(self: Box<Self>) {
        let MidirListener { connection, name } = *self;
        let _ = connection.close();
        tracing::debug!(device = %name, "MIDI input closed");
    }
}

fn ignore_flags(setting: IgnoreSetting) -> Ignore {
    match setting {
        IgnoreSetting::None => Ignore::None,
        IgnoreSetting::Sysex => Ignore::Sysex,
        IgnoreSetting::Time => Ignore::Time,
        IgnoreSetting::ActiveSense => Ignore::ActiveSense,
        IgnoreSetting::SysexAndTime => Ignore::SysexAndTime,
        IgnoreSetting::SysexAndActiveSense => Ignore::SysexAndActiveSense,
        IgnoreSetting::TimeAndActiveSense => Ignore::TimeAndActiveSense,
        IgnoreSetting::All => Ignore::All,
    }
}

/// List available MIDI inputs as (index, name) pairs
pub fn list_inputs(backend: &dyn MidiBackend) -> Result<Vec<(usize, String)>, BridgeError> {
    Ok(backend.input_names()?.into_iter().enumerate().collect())
}

/// Print all available MIDI inputs to stdout
pub fn print_inputs(backend: &dyn MidiBackend) -> Result<(), BridgeError> {
    let inputs = list_inputs(backend)?;
    if inputs.is_empty() {
        println!("No MIDI inputs found.");
    } else {
        println!("Available MIDI inputs:");
        for (i, name) in inputs {
            println!("  {}: {}", i, name);
        }
    }
    Ok(())
}
