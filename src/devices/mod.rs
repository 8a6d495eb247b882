// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Device enumeration.
//!
//! Serial-capable devices are found by scanning the display names of
//! plug-and-play entries for a COM port designator, e.g.
//! `"USB Serial Device (COM3)"`. The chosen display name is later mapped
//! back to an OS port identifier with [`resolve_port_name`].

pub mod registry;

pub use registry::{DeviceRegistry, SerialPortRegistry};

use regex::Regex;

use crate::error::BridgeError;

/// `COM1` through `COM999`, not followed by another digit
pub const DEFAULT_COM_PATTERN: &str = r"COM[1-9][0-9]{0,2}(?:[^0-9]|$)";

/// Compiled filter for serial-capable device names
#[derive(Debug, Clone)]
pub struct ComNameFilter {
    regex: Regex,
}

impl ComNameFilter {
    /// Compile a filter from a regular expression
    pub fn new(pattern: &str) -> Result<Self, BridgeError> {
        let regex = Regex::new(pattern).map_err(|e| BridgeError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { regex })
    }

    /// Check whether a display name designates a serial device
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// Keep the matching names, in order, skipping entries without a name
    pub fn filter<I>(&self, entries: I) -> Vec<String>
    where
        I: IntoIterator<Item = Option<String>>,
    {
        entries
            .into_iter()
            .flatten()
            .filter(|name| self.matches(name))
            .collect()
    }

    /// The source pattern
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

impl Default for ComNameFilter {
    fn default() -> Self {
        Self {
            regex: Regex::new(DEFAULT_COM_PATTERN).expect("default COM pattern is valid"),
        }
    }
}

/// List display names of serial-capable devices known to the registry.
///
/// Duplicates are preserved and an empty result is not an error.
pub fn serial_device_names(
    registry: &dyn DeviceRegistry,
    filter: &ComNameFilter,
) -> Result<Vec<String>, BridgeError> {
    let entries = registry.entry_names()?;
    let names = filter.filter(entries);
    tracing::debug!(count = names.len(), pattern = filter.pattern(), "serial devices enumerated");
    Ok(names)
}

/// Map a device display name to the OS port identifier it mentions.
///
/// A port matches when its identifier is a substring of the display name.
/// When several ports match, the longest identifier wins so that
/// `"Device (COM12)"` resolves to `COM12` rather than `COM1`.
pub fn resolve_port_name<'a>(display_name: &str, ports: &'a [String]) -> Option<&'a str> {
    ports
        .iter()
        .filter(|port| !port.is_empty() && display_name.contains(port.as_str()))
        .max_by_key(|port| port.len())
        .map(String::as_str)
}
