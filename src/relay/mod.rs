// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI-to-serial message relay.
//!
//! The MIDI driver thread never touches the serial port. Its handler copies
//! each message into a bounded channel through a [`MessageSink`]; a single
//! worker thread owns the [`SerialLink`] and writes the messages out in the
//! order they were queued. Closing the relay shuts a shared gate first, so
//! anything pushed or still queued afterwards is dropped, not written.

mod monitor;

pub use monitor::{RelayMonitor, RelaySnapshot, RECENT_CAPACITY};

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::RelayConfig;
use crate::error::BridgeError;
use crate::midi::MessageHandler;
use crate::serial::SerialLink;

/// How often the worker re-checks the gate while the queue is idle
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Producer side of the relay, handed to the MIDI driver
#[derive(Clone)]
pub struct MessageSink {
    tx: SyncSender<Vec<u8>>,
    open: Arc<AtomicBool>,
    monitor: Arc<RelayMonitor>,
}

impl MessageSink {
    /// Queue a message for the serial port.
    ///
    /// Never blocks. Returns `false` if the message was dropped because the
    /// relay is closed or the queue is full.
    pub fn push(&self, message: &[u8]) -> bool {
        if !self.open.load(Ordering::Acquire) {
            tracing::trace!(len = message.len(), "relay closed, message dropped");
            self.monitor.record_dropped();
            return false;
        }

        match self.tx.try_send(message.to_vec()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(len = message.len(), "relay queue full, message dropped");
                self.monitor.record_dropped();
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("relay worker gone, message dropped");
                self.monitor.record_dropped();
                false
            }
        }
    }

    /// Wrap the sink as a MIDI message handler
    pub fn into_handler(self) -> MessageHandler {
        Box::new(move |message: &[u8]| {
            self.push(message);
        })
    }
}

/// A running relay worker and the serial port it owns
pub struct Relay {
    port: String,
    open: Arc<AtomicBool>,
    tx: SyncSender<Vec<u8>>,
    worker: Option<JoinHandle<()>>,
    monitor: Arc<RelayMonitor>,
}

impl Relay {
    /// Start a worker thread that takes ownership of `link`
    pub fn spawn(
        link: Box<dyn SerialLink>,
        config: &RelayConfig,
        monitor: Arc<RelayMonitor>,
    ) -> Result<Self, BridgeError> {
        let port = link.name().to_string();
        let (tx, rx) = mpsc::sync_channel(config.queue_capacity.max(1));
        let open = Arc::new(AtomicBool::new(true));

        let worker = {
            let open = open.clone();
            let monitor = monitor.clone();
            let drain = config.drain_replies;
            thread::Builder::new()
                .name(format!("relay {}", port))
                .spawn(move || run_worker(link, rx, open, drain, monitor))
                .map_err(|e| BridgeError::RelaySpawn(e.to_string()))?
        };

        tracing::debug!(port = %port, capacity = config.queue_capacity, "relay started");
        Ok(Self {
            port,
            open,
            tx,
            worker: Some(worker),
            monitor,
        })
    }

    /// A new producer handle
    pub fn sink(&self) -> MessageSink {
        MessageSink {
            tx: self.tx.clone(),
            open: self.open.clone(),
            monitor: self.monitor.clone(),
        }
    }

    /// OS identifier of the serial port
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Whether the worker is still forwarding messages
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().map_or(false, |w| !w.is_finished())
    }

    /// Close the gate, wait for the worker to exit and release the port
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.open.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!(port = %self.port, "relay worker panicked");
            }
            tracing::debug!(port = %self.port, "relay stopped");
        }
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(
    mut link: Box<dyn SerialLink>,
    rx: Receiver<Vec<u8>>,
    open: Arc<AtomicBool>,
    drain: bool,
    monitor: Arc<RelayMonitor>,
) {
    loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(message) => {
                if !open.load(Ordering::Acquire) {
                    monitor.record_dropped();
                    break;
                }
                if let Err(e) = forward(link.as_mut(), &message, drain, &monitor) {
                    tracing::error!(port = %link.name(), error = %e, "serial relay failed");
                    monitor.record_fault(e.to_string());
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if !open.load(Ordering::Acquire) {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    for _ in rx.try_iter() {
        monitor.record_dropped();
    }
}

/// Write one message, then discard whatever the device has sent back
pub fn forward(
    link: &mut dyn SerialLink,
    message: &[u8],
    drain: bool,
    monitor: &RelayMonitor,
) -> io::Result<()> {
    link.write_all(message)?;
    monitor.record_forwarded(message);
    tracing::trace!(bytes = ?message, "forwarded");

    if drain {
        let discarded = drain_replies(link)?;
        monitor.record_drained(discarded);
    }
    Ok(())
}

/// Read and discard the bytes currently buffered on the port.
///
/// The read buffer is sized to what the port reports as available at the
/// time of the call. Returns the number of bytes discarded.
pub fn drain_replies(link: &mut dyn SerialLink) -> io::Result<usize> {
    let available = link.bytes_to_read()?;
    if available == 0 {
        return Ok(0);
    }

    let mut buf = vec![0u8; available];
    let mut read = 0;
    while read < available {
        match link.read_available(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(read)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Instant;

    #[derive(Default)]
    struct PortState {
        written: Vec<u8>,
        inbound: VecDeque<u8>,
        read_sizes: Vec<usize>,
        fail_writes: bool,
    }

    /// Mock serial link for testing
    struct MockLink {
        state: Arc<Mutex<PortState>>,
    }

    impl SerialLink for MockLink {
        fn name(&self) -> &str {
            "COM9"
        }

        fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
            let mut state = self.state.lock().unwrap();
            if state.fail_writes {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device removed"));
            }
            state.written.extend_from_slice(bytes);
            Ok(())
        }

        fn bytes_to_read(&self) -> io::Result<usize> {
            Ok(self.state.lock().unwrap().inbound.len())
        }

        fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut state = self.state.lock().unwrap();
            state.read_sizes.push(buf.len());
            let n = buf.len().min(state.inbound.len());
            for slot in buf.iter_mut().take(n) {
                *slot = state.inbound.pop_front().unwrap();
            }
            Ok(n)
        }
    }

    fn mock_link() -> (MockLink, Arc<Mutex<PortState>>) {
        let state = Arc::new(Mutex::new(PortState::default()));
        (MockLink { state: state.clone() }, state)
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_forward_writes_and_drains() {
        let (mut link, state) = mock_link();
        state.lock().unwrap().inbound.extend([0xFE, 0x01, 0x02]);
        let monitor = RelayMonitor::default();

        forward(&mut link, &[0x90, 60, 100], true, &monitor).unwrap();

        let state = state.lock().unwrap();
        assert_eq!(state.written, vec![0x90, 60, 100]);
        assert!(state.inbound.is_empty());
        assert_eq!(state.read_sizes, vec![3]);

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.forwarded, 1);
        assert_eq!(snapshot.bytes_written, 3);
        assert_eq!(snapshot.bytes_drained, 3);
    }

    #[test]
    fn test_forward_without_drain_leaves_input() {
        let (mut link, state) = mock_link();
        state.lock().unwrap().inbound.push_back(0xF8);
        let monitor = RelayMonitor::default();

        forward(&mut link, &[0xB0, 7, 127], false, &monitor).unwrap();

        let state = state.lock().unwrap();
        assert_eq!(state.inbound.len(), 1);
        assert!(state.read_sizes.is_empty());
    }

    #[test]
    fn test_drain_with_nothing_buffered_skips_read() {
        let (mut link, state) = mock_link();
        assert_eq!(drain_replies(&mut link).unwrap(), 0);
        assert!(state.lock().unwrap().read_sizes.is_empty());
    }

    #[test]
    fn test_relay_forwards_in_order() {
        let (link, state) = mock_link();
        let monitor = Arc::new(RelayMonitor::default());
        let relay = Relay::spawn(Box::new(link), &RelayConfig::default(), monitor.clone()).unwrap();
        assert_eq!(relay.port(), "COM9");

        let sink = relay.sink();
        assert!(sink.push(&[0x90, 60, 100]));
        assert!(sink.push(&[0x80, 60, 0]));
        assert!(sink.push(&[0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7]));

        assert!(wait_until(|| monitor.snapshot().forwarded == 3));
        relay.shutdown();

        assert_eq!(
            state.lock().unwrap().written,
            vec![0x90, 60, 100, 0x80, 60, 0, 0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7]
        );
    }

    /// Link whose writes hold until the test lets them through
    struct StalledLink {
        written: Arc<Mutex<Vec<u8>>>,
        entered: mpsc::Sender<()>,
        release: Receiver<()>,
    }

    impl SerialLink for StalledLink {
        fn name(&self) -> &str {
            "COM9"
        }

        fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
            let _ = self.entered.send(());
            // Returns Err once the sender is dropped, which releases every write
            let _ = self.release.recv();
            self.written.lock().unwrap().extend_from_slice(bytes);
            Ok(())
        }

        fn bytes_to_read(&self) -> io::Result<usize> {
            Ok(0)
        }

        fn read_available(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let link = StalledLink {
            written: written.clone(),
            entered: entered_tx,
            release: release_rx,
        };
        let config = RelayConfig {
            queue_capacity: 1,
            ..Default::default()
        };
        let monitor = Arc::new(RelayMonitor::default());
        let relay = Relay::spawn(Box::new(link), &config, monitor.clone()).unwrap();
        let sink = relay.sink();

        // First message is taken by the worker, which then stalls in the write
        assert!(sink.push(&[0x90, 60, 100]));
        entered_rx.recv_timeout(Duration::from_secs(2)).unwrap();

        // Second fills the single slot, third finds the queue full
        let queued = sink.push(&[0x80, 60, 0]);
        let started = Instant::now();
        let overflowed = sink.push(&[0xF8]);
        let push_time = started.elapsed();
        let dropped = monitor.snapshot().dropped;

        drop(release_tx);

        assert!(queued);
        assert!(!overflowed);
        assert!(push_time < Duration::from_millis(500));
        assert_eq!(dropped, 1);

        assert!(wait_until(|| monitor.snapshot().forwarded == 2));
        relay.shutdown();
        assert_eq!(*written.lock().unwrap(), vec![0x90, 60, 100, 0x80, 60, 0]);
        assert_eq!(monitor.snapshot().dropped, 1);
    }

    #[test]
    fn test_push_after_shutdown_is_dropped() {
        let (link, state) = mock_link();
        let monitor = Arc::new(RelayMonitor::default());
        let relay = Relay::spawn(Box::new(link), &RelayConfig::default(), monitor.clone()).unwrap();
        let sink = relay.sink();

        relay.shutdown();

        assert!(!sink.push(&[0x90, 64, 90]));
        assert!(state.lock().unwrap().written.is_empty());
        assert_eq!(monitor.snapshot().dropped, 1);
    }

    #[test]
    fn test_handler_pushes_into_relay() {
        let (link, state) = mock_link();
        let monitor = Arc::new(RelayMonitor::default());
        let relay = Relay::spawn(Box::new(link), &RelayConfig::default(), monitor.clone()).unwrap();

        let mut handler = relay.sink().into_handler();
        handler(&[0xC0, 5]);

        assert!(wait_until(|| monitor.snapshot().forwarded == 1));
        drop(relay);
        assert_eq!(state.lock().unwrap().written, vec![0xC0, 5]);
    }

    #[test]
    fn test_write_failure_stops_worker() {
        let (link, state) = mock_link();
        state.lock().unwrap().fail_writes = true;
        let monitor = Arc::new(RelayMonitor::default());
        let relay = Relay::spawn(Box::new(link), &RelayConfig::default(), monitor.clone()).unwrap();

        relay.sink().push(&[0x90, 60, 100]);

        assert!(wait_until(|| !relay.is_running()));
        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.forwarded, 0);
        assert!(snapshot.fault.unwrap().contains("device removed"));
    }
}
