// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration for the bridge.
//!
//! Settings are read from an optional TOML file. Every key has a default
//! so an empty file (or no file at all) yields the standard MIDI serial
//! setup: 31250 baud, 8 data bits, no parity, 1 stop bit.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::devices::{ComNameFilter, DEFAULT_COM_PATTERN};

/// Standard MIDI serial baud rate
pub const MIDI_BAUD_RATE: u32 = 31250;

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// Serial port parameters and device matching
    pub serial: SerialConfig,
    /// MIDI input settings
    pub midi: MidiConfig,
    /// Relay queue settings
    pub relay: RelayConfig,
    /// Terminal UI settings
    pub ui: UiConfig,
    /// Logging settings
    pub log: LogConfig,
}

impl BridgeConfig {
    /// Load a configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config = Self::from_toml(&contents)?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Parse a configuration from a TOML string
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse TOML configuration")
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Check values that the type system cannot
    pub fn validate(&self) -> Result<()> {
        if self.serial.baud_rate == 0 {
            return Err(anyhow!("serial.baud_rate must be greater than zero"));
        }
        if !(5..=8).contains(&self.serial.data_bits) {
            return Err(anyhow!(
                "serial.data_bits must be between 5 and 8, got {}",
                self.serial.data_bits
            ));
        }
        if !(1..=2).contains(&self.serial.stop_bits) {
            return Err(anyhow!(
                "serial.stop_bits must be 1 or 2, got {}",
                self.serial.stop_bits
            ));
        }
        ComNameFilter::new(&self.serial.name_pattern)?;

        if self.relay.queue_capacity == 0 {
            return Err(anyhow!("relay.queue_capacity must be greater than zero"));
        }
        if self.ui.frame_rate == 0 {
            return Err(anyhow!("ui.frame_rate must be greater than zero"));
        }
        self.log.max_level()?;
        Ok(())
    }
}

/// Serial port configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SerialConfig {
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits (5-8)
    pub data_bits: u8,
    /// Parity checking
    pub parity: ParitySetting,
    /// Stop bits (1 or 2)
    pub stop_bits: u8,
    /// Read timeout in milliseconds. Writes ignore it and wait until every byte is accepted
    pub timeout_ms: u64,
    /// Regular expression selecting serial-capable device names
    pub name_pattern: String,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: MIDI_BAUD_RATE,
            data_bits: 8,
            parity: ParitySetting::None,
            stop_bits: 1,
            timeout_ms: 10,
            name_pattern: DEFAULT_COM_PATTERN.to_string(),
        }
    }
}

/// Parity setting
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParitySetting {
    #[default]
    None,
    Odd,
    Even,
}

/// MIDI input configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MidiConfig {
    /// Client name registered with the MIDI subsystem
    pub client_name: String,
    /// Message classes the MIDI driver should swallow
    pub ignore: IgnoreSetting,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            client_name: "midi2com".to_string(),
            ignore: IgnoreSetting::None,
        }
    }
}

/// Which incoming MIDI message classes are filtered out before relaying
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreSetting {
    #[default]
    None,
    Sysex,
    Time,
    ActiveSense,
    SysexAndTime,
    SysexAndActiveSense,
    TimeAndActiveSense,
    All,
}

/// Relay configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    /// Messages buffered between the MIDI driver and the serial writer
    pub queue_capacity: usize,
    /// Read and discard bytes the serial device sends back after each write
    pub drain_replies: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            drain_replies: true,
        }
    }
}

/// Terminal UI configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    /// Redraw rate
    pub frame_rate: u32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { frame_rate: 30 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Maximum level: trace, debug, info, warn or error
    pub level: String,
    /// Log file; required for log output while the terminal UI is running
    pub file: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LogConfig {
    /// Parsed maximum level
    pub fn max_level(&self) -> Result<tracing::Level> {
        tracing::Level::from_str(&self.level)
            .map_err(|_| anyhow!("log.level '{}' is not a valid level", self.level))
    }
}
