// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Relay activity counters.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Number of recently forwarded messages kept for display
pub const RECENT_CAPACITY: usize = 8;

/// Counters shared between the relay worker, the MIDI handler and the UI
#[derive(Debug, Default)]
pub struct RelayMonitor {
    forwarded: AtomicU64,
    bytes_written: AtomicU64,
    bytes_drained: AtomicU64,
    dropped: AtomicU64,
    recent: Mutex<VecDeque<Vec<u8>>>,
    fault: Mutex<Option<String>>,
}

impl RelayMonitor {
    pub fn record_forwarded(&self, message: &[u8]) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
        self.bytes_written
            .fetch_add(message.len() as u64, Ordering::Relaxed);

        if let Ok(mut recent) = self.recent.lock() {
            if recent.len() == RECENT_CAPACITY {
                recent.pop_front();
            }
            recent.push_back(message.to_vec());
        }
    }

    pub fn record_drained(&self, count: usize) {
        self.bytes_drained.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fault(&self, fault: String) {
        if let Ok(mut slot) = self.fault.lock() {
            *slot = Some(fault);
        }
    }

    /// Clear everything; called when a new connection starts
    pub fn reset(&self) {
        self.forwarded.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
        self.bytes_drained.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        if let Ok(mut recent) = self.recent.lock() {
            recent.clear();
        }
        if let Ok(mut slot) = self.fault.lock() {
            *slot = None;
        }
    }

    /// Copy of the current counters
    pub fn snapshot(&self) -> RelaySnapshot {
        RelaySnapshot {
            forwarded: self.forwarded.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            bytes_drained: self.bytes_drained.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            recent: self
                .recent
                .lock()
                .map(|r| r.iter().cloned().collect())
                .unwrap_or_default(),
            fault: self.fault.lock().ok().and_then(|f| f.clone()),
        }
    }
}

/// Point-in-time view of relay activity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelaySnapshot {
    /// Messages written to the serial port
    pub forwarded: u64,
    /// Bytes written to the serial port
    pub bytes_written: u64,
    /// Reply bytes read and discarded
    pub bytes_drained: u64,
    /// Messages dropped (relay closed or queue full)
    pub dropped: u64,
    /// Most recent forwarded messages, oldest first
    pub recent: Vec<Vec<u8>>,
    /// Last I/O error that stopped the relay
    pub fault: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_is_bounded() {
        let monitor = RelayMonitor::default();
        for note in 0..(RECENT_CAPACITY as u8 + 3) {
            monitor.record_forwarded(&[0x90, note, 100]);
        }

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.forwarded, RECENT_CAPACITY as u64 + 3);
        assert_eq!(snapshot.recent.len(), RECENT_CAPACITY);
        assert_eq!(snapshot.recent[0], vec![0x90, 3, 100]);
    }

    #[test]
    fn test_reset() {
        let monitor = RelayMonitor::default();
        monitor.record_forwarded(&[0xF8]);
        monitor.record_drained(4);
        monitor.record_dropped();
        monitor.record_fault("timed out".to_string());

        monitor.reset();
        assert_eq!(monitor.snapshot(), RelaySnapshot::default());
    }
}
