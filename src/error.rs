// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Error types shared by the device, serial and session layers.

use thiserror::Error;

/// Failures raised while enumerating devices or setting up a connection.
///
/// Every variant that can come out of `Session::connect` leaves the session
/// disconnected; the message text is what the user gets to see.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("failed to initialize MIDI input: {0}")]
    MidiInit(String),

    #[error("MIDI input device '{0}' not found")]
    MidiDeviceNotFound(String),

    #[error("failed to open MIDI input '{device}': {reason}")]
    MidiConnect { device: String, reason: String },

    #[error("device enumeration failed: {0}")]
    Enumeration(String),

    #[error("no serial port matches '{0}'")]
    NoMatchingPort(String),

    #[error("failed to open serial port {port}: {reason}")]
    SerialOpen { port: String, reason: String },

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error("invalid device name pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("failed to start relay worker: {0}")]
    RelaySpawn(String),

    #[error("already connected to '{midi}' -> {port}")]
    AlreadyConnected { midi: String, port: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_underlying_text() {
        let err = BridgeError::SerialOpen {
            port: "COM3".to_string(),
            reason: "Access is denied.".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to open serial port COM3: Access is denied."
        );

        let err = BridgeError::NoMatchingPort("USB Serial Device (COM7)".to_string());
        assert!(err.to_string().contains("USB Serial Device (COM7)"));
    }
}
