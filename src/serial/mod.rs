// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Serial port abstraction.
//!
//! A [`SerialLink`] is owned by exactly one thread at a time: the session
//! opens it and hands it to the relay worker, which drops it on shutdown.

pub mod port;

use std::io;

use crate::config::SerialConfig;
use crate::error::BridgeError;

pub use port::{print_ports, SerialPortBackend};

/// Access to the serial port subsystem.
pub trait SerialBackend {
    /// OS identifiers of the available ports (e.g. `COM3`, `/dev/ttyUSB0`)
    fn port_names(&self) -> Result<Vec<String>, BridgeError>;

    /// Open a port with the given parameters
    fn open(&self, port: &str, settings: &SerialConfig) -> Result<Box<dyn SerialLink>, BridgeError>;
}

/// An open serial port.
///
/// Dropping the link closes the port.
pub trait SerialLink: Send {
    /// OS identifier of the port
    fn name(&self) -> &str;

    /// Write every byte, blocking until the OS has accepted them
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Number of received bytes waiting to be read
    fn bytes_to_read(&self) -> io::Result<usize>;

    /// Read into `buf`, returning the number of bytes read
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}
