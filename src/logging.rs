// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Log output setup.

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};

use crate::config::LogConfig;

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Command-line use: stderr unless a file is configured
    Console,
    /// Terminal UI owns the screen: only a configured file
    FileOnly,
}

/// Install the global subscriber.
///
/// Returns `false` when nothing was installed because the terminal UI is
/// running without a log file.
pub fn init(config: &LogConfig, target: LogTarget) -> Result<bool> {
    let level = config.max_level()?;
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    match (&config.file, target) {
        (Some(path), _) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow!("Failed to install logger: {}", e))?;
        }
        (None, LogTarget::Console) => {
            builder
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow!("Failed to install logger: {}", e))?;
        }
        (None, LogTarget::FileOnly) => return Ok(false),
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tui_without_file_installs_nothing() {
        let config = LogConfig::default();
        assert!(!init(&config, LogTarget::FileOnly).unwrap());
    }

    #[test]
    fn test_invalid_level() {
        let config = LogConfig {
            level: "chatty".to_string(),
            file: None,
        };
        assert!(init(&config, LogTarget::Console).is_err());
    }
}
