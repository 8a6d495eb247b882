// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Serial ports through the serialport crate.

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use super::{SerialBackend, SerialLink};
use crate::config::{ParitySetting, SerialConfig};
use crate::error::BridgeError;

/// Serial backend using the operating system's serial driver
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialPortBackend;

impl SerialBackend for SerialPortBackend {
    fn port_names(&self) -> Result<Vec<String>, BridgeError> {
        let ports = serialport::available_ports()
            .map_err(|e| BridgeError::Enumeration(e.to_string()))?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    fn open(&self, port: &str, settings: &SerialConfig) -> Result<Box<dyn SerialLink>, BridgeError> {
        let handle = serialport::new(port, settings.baud_rate)
            .data_bits(data_bits(settings.data_bits)?)
            .parity(parity(settings.parity))
            .stop_bits(stop_bits(settings.stop_bits)?)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(settings.timeout_ms))
            .open()
            .map_err(|e| BridgeError::SerialOpen {
                port: port.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(
            port,
            baud = settings.baud_rate,
            data_bits = settings.data_bits,
            stop_bits = settings.stop_bits,
            "serial port opened"
        );

        Ok(Box::new(SystemSerialLink {
            name: port.to_string(),
            port: handle,
        }))
    }
}

/// An open OS serial port
struct SystemSerialLink {
    name: String,
    port: Box<dyn SerialPort>,
}

impl SerialLink for SystemSerialLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        write_blocking(&mut self.port, bytes)
    }

    fn bytes_to_read(&self) -> io::Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

/// Write every byte, waiting as long as the driver needs.
///
/// The port timeout is meant for reads, but some drivers apply it to writes
/// as well, so a long SysEx at 31250 baud can come back short or timed out.
/// Those cases are retried; only real I/O errors are returned.
fn write_blocking<W: Write + ?Sized>(writer: &mut W, mut bytes: &[u8]) -> io::Result<()> {
    while !bytes.is_empty() {
        match writer.write(bytes) {
            Ok(n) => bytes = &bytes[n..],
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                ) => {}
            Err(e) => return Err(e),
        }
    }
    writer.flush()
}

impl Drop for SystemSerialLink {
    fn drop(&mut self) {
        tracing::debug!(port = %self.name, "serial port closed");
    }
}

fn data_bits(bits: u8) -> Result<DataBits, BridgeError> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        other => Err(BridgeError::InvalidSetting(format!(
            "unsupported data bits: {}",
            other
        ))),
    }
}

fn stop_bits(bits: u8) -> Result<StopBits, BridgeError> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        other => Err(BridgeError::InvalidSetting(format!(
            "unsupported stop bits: {}",
            other
        ))),
    }
}

fn parity(setting: ParitySetting) -> Parity {
    match setting {
        ParitySetting::None => Parity::None,
        ParitySetting::Odd => Parity::Odd,
        ParitySetting::Even => Parity::Even,
    }
}

/// Print the OS port identifiers to stdout
pub fn print_ports(backend: &dyn SerialBackend) -> Result<(), BridgeError> {
    let ports = backend.port_names()?;
    if ports.is_empty() {
        println!("No serial ports found.");
    } else {
        println!("Available serial ports:");
        for (i, name) in ports.iter().enumerate() {
            println!("  {}: {}", i, name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writer that accepts `chunk` bytes per call and times out every other call
    struct SlowWriter {
        chunk: usize,
        calls: usize,
        written: Vec<u8>,
        fail_with: Option<io::ErrorKind>,
    }

    impl SlowWriter {
        fn new(chunk: usize) -> Self {
            Self {
                chunk,
                calls: 0,
                written: Vec::new(),
                fail_with: None,
            }
        }
    }

    impl Write for SlowWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.calls += 1;
            if let Some(kind) = self.fail_with {
                return Err(io::Error::new(kind, "port gone"));
            }
            match self.calls % 3 {
                0 => Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out")),
                1 => Ok(0),
                _ => {
                    let n = buf.len().min(self.chunk);
                    self.written.extend_from_slice(&buf[..n]);
                    Ok(n)
                }
            }
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_survives_timeouts_and_short_writes() {
        let sysex: Vec<u8> = std::iter::once(0xF0)
            .chain((0..510).map(|i| (i % 0x80) as u8))
            .chain(std::iter::once(0xF7))
            .collect();
        let mut writer = SlowWriter::new(7);

        write_blocking(&mut writer, &sysex).unwrap();

        assert_eq!(writer.written, sysex);
        assert!(writer.calls > sysex.len() / 7);
    }

    #[test]
    fn test_write_reports_real_errors() {
        let mut writer = SlowWriter::new(7);
        writer.fail_with = Some(io::ErrorKind::BrokenPipe);

        let err = write_blocking(&mut writer, &[0x90, 60, 100]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(writer.calls, 1);
    }

    #[test]
    fn test_midi_line_settings() {
        let settings = SerialConfig::default();
        assert_eq!(data_bits(settings.data_bits).unwrap(), DataBits::Eight);
        assert_eq!(stop_bits(settings.stop_bits).unwrap(), StopBits::One);
        assert_eq!(parity(settings.parity), Parity::None);
    }

    #[test]
    fn test_unsupported_settings() {
        assert!(matches!(data_bits(9), Err(BridgeError::InvalidSetting(_))));
        assert!(matches!(stop_bits(0), Err(BridgeError::InvalidSetting(_))));
    }

    #[test]
    fn test_open_missing_port() {
        let err = SerialPortBackend
            .open("COM-does-not-exist", &SerialConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, BridgeError::SerialOpen { .. }));
    }

    #[test]
    fn test_port_names_does_not_panic() {
        let ports = SerialPortBackend.port_names();
        println!("Port query: {:?}", ports);
    }
}
