// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI input abstraction layer.
//!
//! This module provides a trait-based abstraction over MIDI input so the
//! session can be driven by the system MIDI stack (via midir) or by a test
//! double. Opening a device and starting to listen are separate steps: a
//! device is opened first, and only once the serial side is ready does it
//! start delivering messages.

pub mod input;

use crate::error::BridgeError;

pub use input::{list_inputs, print_inputs, MidirBackend};

/// Callback invoked from the MIDI driver thread with each raw message
pub type MessageHandler = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Access to the MIDI input subsystem.
pub trait MidiBackend {
    /// Names of the available input devices, in OS enumeration order
    fn input_names(&self) -> Result<Vec<String>, BridgeError>;

    /// Open an input device by its exact name
    fn open(&self, name: &str) -> Result<Box<dyn MidiInputDevice>, BridgeError>;
}

/// An opened MIDI input device that is not yet listening.
///
/// Dropping it releases the device.
pub trait MidiInputDevice {
    /// Device name
    fn name(&self) -> &str;

    /// Register the handler and begin delivering messages
    fn start_listening(
        self: Box<Self>,
        handler: MessageHandler,
    ) -> Result<Box<dyn MidiListener>, BridgeError>;
}

/// A MIDI input device that is delivering messages.
pub trait MidiListener {
    /// Device name
    fn name(&self) -> &str;

    /// Stop delivering messages and release the device
    fn stop_listening(self: Box<Self>);
}
