// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::io::stdin;

use anyhow::{anyhow, Result};
use midi2com::devices::{serial_device_names, ComNameFilter, SerialPortRegistry};
use midi2com::logging::{self, LogTarget};
use midi2com::midi::{print_inputs, MidirBackend};
use midi2com::serial::{print_ports, SerialPortBackend};
use midi2com::ui::{format_bytes, App, Controller};
use midi2com::{BridgeConfig, Session};

fn print_usage() {
    println!("midi2com - Forward MIDI input to a serial port");
    println!();
    println!("Usage: midi2com [--config <PATH>] [COMMAND]");
    println!();
    println!("Commands:");
    println!("  (none)                     Start the interactive terminal UI");
    println!("  --list-midi                List available MIDI inputs");
    println!("  --list-serial              List serial devices matching the COM pattern");
    println!("  --list-ports               List raw serial port identifiers");
    println!("  --connect <MIDI> <SERIAL>  Relay MIDI input <MIDI> to serial device <SERIAL>");
    println!("                             until Enter is pressed");
    println!("  --help                     Show this help message");
    println!();
    println!("Options:");
    println!("  --config <PATH>            Load settings from a TOML file");
}

/// Pull `--config <PATH>` out of the argument list
fn take_config(args: &mut Vec<String>) -> Result<BridgeConfig> {
    match args.iter().position(|a| a == "--config") {
        Some(i) => {
            let path = args
                .get(i + 1)
                .cloned()
                .ok_or_else(|| anyhow!("--config requires a file path"))?;
            args.drain(i..=i + 1);
            BridgeConfig::load(&path)
        }
        None => Ok(BridgeConfig::default()),
    }
}

fn list_serial(config: &BridgeConfig) -> Result<()> {
    let filter = ComNameFilter::new(&config.serial.name_pattern)?;
    let names = serial_device_names(&SerialPortRegistry, &filter)?;
    if names.is_empty() {
        println!("No serial devices found.");
    } else {
        println!("Available serial devices:");
        for (i, name) in names.iter().enumerate() {
            println!("  {}: {}", i, name);
        }
    }
    Ok(())
}

fn run_headless(config: BridgeConfig, midi: &str, serial: &str) -> Result<()> {
    let backend = MidirBackend::new(&config.midi);
    let mut session = Session::new(backend, SerialPortBackend, config);

    println!("Connecting '{}' -> '{}'...", midi, serial);
    session.connect(midi, serial)?;
    if let Some(conn) = session.connection() {
        println!(
            "Forwarding {} -> {} at {} baud (press Enter to stop)...",
            conn.midi_device(),
            conn.serial_port(),
            session.config().serial.baud_rate
        );
    }

    let mut line = String::new();
    stdin().read_line(&mut line)?;

    session.disconnect();
    let snapshot = session.relay_snapshot();
    println!(
        "Stopped. Forwarded {} messages ({} bytes), discarded {} reply bytes, dropped {}.",
        snapshot.forwarded, snapshot.bytes_written, snapshot.bytes_drained, snapshot.dropped
    );
    if let Some(last) = snapshot.recent.last() {
        println!("Last message: {}", format_bytes(last));
    }
    if let Some(fault) = snapshot.fault {
        return Err(anyhow!("Relay stopped early: {}", fault));
    }
    Ok(())
}

fn run_tui(config: BridgeConfig) -> Result<()> {
    logging::init(&config.log, LogTarget::FileOnly)?;

    let filter = ComNameFilter::new(&config.serial.name_pattern)?;
    let frame_rate = config.ui.frame_rate;
    let backend = MidirBackend::new(&config.midi);
    let session = Session::new(backend, SerialPortBackend, config);
    let controller = Controller::new(session, Box::new(SerialPortRegistry), filter);

    let mut app = App::new(controller, frame_rate)?;
    app.run()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().collect();
    let config = take_config(&mut args)?;

    if args.len() < 2 {
        return run_tui(config);
    }

    if matches!(args[1].as_str(), "--help" | "-h") {
        print_usage();
        return Ok(());
    }
    logging::init(&config.log, LogTarget::Console)?;

    match args[1].as_str() {
        "--list-midi" => {
            print_inputs(&MidirBackend::new(&config.midi))?;
        }
        "--list-serial" => {
            list_serial(&config)?;
        }
        "--list-ports" => {
            print_ports(&SerialPortBackend)?;
        }
        "--connect" => {
            if args.len() < 4 {
                eprintln!("Error: --connect requires a MIDI input name and a serial device name");
                eprintln!("Use --list-midi and --list-serial to see available devices");
                std::process::exit(1);
            }
            let (midi, serial) = (args[2].clone(), args[3].clone());
            run_headless(config, &midi, &serial)?;
        }
        _ => {
            eprintln!("Unknown option: {}", args[1]);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_take_config_absent() {
        let mut argv = args(&["midi2com", "--list-midi"]);
        let config = take_config(&mut argv).unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(argv, args(&["midi2com", "--list-midi"]));
    }

    #[test]
    fn test_take_config_missing_path() {
        let mut argv = args(&["midi2com", "--config"]);
        assert!(take_config(&mut argv).is_err());
    }

    #[test]
    fn test_take_config_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[serial]\nbaud_rate = 38400\n").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let mut argv = args(&["midi2com", "--config", &path, "--list-serial"]);
        let config = take_config(&mut argv).unwrap();
        assert_eq!(config.serial.baud_rate, 38400);
        assert_eq!(argv, args(&["midi2com", "--list-serial"]));
    }
}
