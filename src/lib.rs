// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! midi2com: forward MIDI input to a serial (COM) port.
//!
//! Every message received from the selected MIDI input is written
//! byte-for-byte to the selected serial port at the MIDI baud rate, and any
//! bytes the device sends back are read and discarded.

pub mod config;
pub mod devices;
pub mod error;
pub mod logging;
pub mod midi;
pub mod relay;
pub mod serial;
pub mod session;
pub mod ui;

pub use config::BridgeConfig;
pub use error::BridgeError;
pub use session::{ConnectionState, Session};
