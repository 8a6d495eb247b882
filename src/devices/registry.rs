// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Plug-and-play device registry access.

use serialport::{SerialPortInfo, SerialPortType};

use crate::error::BridgeError;

/// Source of hardware entries and their display names.
///
/// Entries without a display name are reported as `None` and skipped by
/// the name filter.
pub trait DeviceRegistry {
    fn entry_names(&self) -> Result<Vec<Option<String>>, BridgeError>;
}

/// Registry backed by the operating system's serial port enumeration
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialPortRegistry;

impl DeviceRegistry for SerialPortRegistry {
    fn entry_names(&self) -> Result<Vec<Option<String>>, BridgeError> {
        let ports = serialport::available_ports()
            .map_err(|e| BridgeError::Enumeration(e.to_string()))?;
        Ok(ports.iter().map(display_name).collect())
    }
}

/// Human-readable name for a port, e.g. `"USB Serial Device (COM3)"`
pub fn display_name(info: &SerialPortInfo) -> Option<String> {
    let port = info.port_name.as_str();
    if port.is_empty() {
        return None;
    }

    let product = match &info.port_type {
        SerialPortType::UsbPort(usb) => usb.product.clone(),
        SerialPortType::BluetoothPort => Some("Bluetooth Serial".to_string()),
        _ => None,
    };

    Some(match product {
        Some(product) if product.contains(port) => product,
        Some(product) => format!("{} ({})", product, port),
        None => port.to_string(),
    })
}
