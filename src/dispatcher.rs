//! Non-blocking submission front-end
//!
//! [`AsyncLogger`]'s producer API blocks until the consumer loop takes the
//! record. A [`Dispatcher`] puts a bounded queue in front of it, drained by
//! a single forwarding thread, so callers return immediately. What happens
//! when the queue is full is decided by the configured [`OverflowPolicy`].

use crate::core::{
    AsyncLogger, LoggerError, LoggerMetrics, OverflowCallback, OverflowPolicy, Result,
    DRAIN_POLL_INTERVAL,
};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};
use std::fmt::{self, Display};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default time [`Dispatcher`] waits for its forwarding thread when dropped
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Dispatcher {
    logger: Arc<AsyncLogger>,
    sender: Option<Sender<Vec<u8>>>,
    /// Kept for evicting the oldest record under `DropOldest`
    receiver: Receiver<Vec<u8>>,
    /// Records accepted but not yet handed to the logger
    pending: Arc<AtomicUsize>,
    forwarder: Option<thread::JoinHandle<()>>,
    capacity: usize,
    overflow_policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
}

impl Dispatcher {
    pub fn new(
        logger: Arc<AsyncLogger>,
        capacity: usize,
        overflow_policy: OverflowPolicy,
    ) -> Result<Self> {
        Self::with_callback(logger, capacity, overflow_policy, None)
    }

    /// Create a dispatcher that also notifies `on_overflow` when records
    /// are dropped
    pub fn with_callback(
        logger: Arc<AsyncLogger>,
        capacity: usize,
        overflow_policy: OverflowPolicy,
        on_overflow: Option<OverflowCallback>,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(LoggerError::config(
                "Dispatcher",
                "capacity must be non-zero",
            ));
        }

        let (sender, receiver) = bounded::<Vec<u8>>(capacity);
        let pending = Arc::new(AtomicUsize::new(0));

        let forwarder = {
            let logger = Arc::clone(&logger);
            let receiver = receiver.clone();
            let pending = Arc::clone(&pending);
            thread::Builder::new()
                .name("alog-dispatch".to_string())
                .spawn(move || {
                    for record in receiver.iter() {
                        logger.print_bytes(record);
                        pending.fetch_sub(1, Ordering::AcqRel);
                    }
                })?
        };

        Ok(Self {
            logger,
            sender: Some(sender),
            receiver,
            pending,
            forwarder: Some(forwarder),
            capacity,
            overflow_policy,
            on_overflow,
        })
    }

    /// The logger records are forwarded to
    pub fn logger(&self) -> &Arc<AsyncLogger> {
        &self.logger
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn overflow_policy(&self) -> &OverflowPolicy {
        &self.overflow_policy
    }

    /// Records accepted but not yet handed to the logger
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    fn metrics(&self) -> &LoggerMetrics {
        self.logger.metrics()
    }

    /// Queue a raw record
    ///
    /// Returns `false` if the record was dropped, either by the overflow
    /// policy or because the dispatcher has shut down.
    pub fn submit(&self, record: Vec<u8>) -> bool {
        let Some(ref sender) = self.sender else {
            return false;
        };

        // Counted before the send so a concurrent drain cannot miss it
        self.pending.fetch_add(1, Ordering::AcqRel);
        match sender.try_send(record) {
            Ok(()) => {
                self.metrics().record_submitted();
                true
            }
            Err(TrySendError::Full(record)) => {
                self.metrics().record_queue_full();
                if self.overflow_policy.may_block() {
                    self.metrics().record_block();
                }
                self.handle_overflow(sender, record)
            }
            Err(TrySendError::Disconnected(_)) => {
                self.pending.fetch_sub(1, Ordering::AcqRel);
                false
            }
        }
    }

    pub fn print(&self, message: impl Display) -> bool {
        self.submit(message.to_string().into_bytes())
    }

    pub fn println(&self, message: impl Display) -> bool {
        self.submit(format!("{}\n", message).into_bytes())
    }

    pub fn printf(&self, args: fmt::Arguments<'_>) -> bool {
        self.submit(format!("{}\n", args).into_bytes())
    }

    fn handle_overflow(&self, sender: &Sender<Vec<u8>>, record: Vec<u8>) -> bool {
        match &self.overflow_policy {
            OverflowPolicy::DropNewest => {
                self.pending.fetch_sub(1, Ordering::AcqRel);
                self.metrics().record_dropped();
                false
            }

            OverflowPolicy::DropOldest => {
                let mut record = record;
                loop {
                    if self.receiver.try_recv().is_ok() {
                        self.pending.fetch_sub(1, Ordering::AcqRel);
                        self.alert_dropped();
                    }
                    match sender.try_send(record) {
                        Ok(()) => {
                            self.metrics().record_submitted();
                            return true;
                        }
                        Err(TrySendError::Full(again)) => record = again,
                        Err(TrySendError::Disconnected(_)) => {
                            self.pending.fetch_sub(1, Ordering::AcqRel);
                            return false;
                        }
                    }
                }
            }

            OverflowPolicy::Block => {
                match sender.send(record) {
                    Ok(()) => {
                        self.metrics().record_submitted();
                        true
                    }
                    Err(_) => {
                        self.pending.fetch_sub(1, Ordering::AcqRel);
                        false
                    }
                }
            }

            OverflowPolicy::BlockWithTimeout(timeout) => {
                match sender.send_timeout(record, *timeout) {
                    Ok(()) => {
                        self.metrics().record_submitted();
                        true
                    }
                    Err(SendTimeoutError::Timeout(_)) => {
                        self.pending.fetch_sub(1, Ordering::AcqRel);
                        self.alert_dropped();
                        false
                    }
                    Err(SendTimeoutError::Disconnected(_)) => {
                        self.pending.fetch_sub(1, Ordering::AcqRel);
                        false
                    }
                }
            }

            OverflowPolicy::AlertAndDrop => {
                self.pending.fetch_sub(1, Ordering::AcqRel);
                self.alert_dropped();
                false
            }
        }
    }

    /// Count a dropped record, alerting on the first and every 1000th
    fn alert_dropped(&self) {
        let dropped_count = self.metrics().record_dropped();

        let should_alert = dropped_count == 0 || (dropped_count + 1) % 1000 == 0;
        if should_alert {
            eprintln!(
                "[ALOG WARNING] Dispatch queue full, {} records dropped ({} policy). \
                 Consider a larger capacity or a blocking policy.",
                dropped_count + 1,
                self.overflow_policy
            );

            if let Some(ref callback) = self.on_overflow {
                callback(dropped_count + 1);
            }
        }
    }

    /// Wait until every accepted record reached the logger, then
    /// [`finish`](AsyncLogger::finish) it
    pub fn drain(&self) -> Result<()> {
        while self.pending() != 0 {
            thread::sleep(DRAIN_POLL_INTERVAL);
        }
        self.logger.finish()
    }

    /// Stop accepting records and wait for the forwarding thread to hand
    /// over what is queued
    ///
    /// Returns `true` if the forwarding thread finished within `timeout`.
    /// It can only finish while the logger's consumer loop is running.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        drop(self.sender.take());

        let Some(handle) = self.forwarder.take() else {
            return true;
        };

        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    eprintln!("[ALOG ERROR] Dispatch thread panicked during shutdown: {:?}", e);
                    return false;
                }
                return true;
            }

            if start.elapsed() >= timeout {
                eprintln!(
                    "[ALOG WARNING] Dispatch thread did not finish within {:?}; \
                     {} records still pending.",
                    timeout,
                    self.pending()
                );
                return false;
            }

            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("capacity", &self.capacity)
            .field("pending", &self.pending())
            .field("overflow_policy", &self.overflow_policy)
            .finish()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Queued records can only move while a consumer loop runs
        if self.pending() == 0 || !self.logger.is_active() {
            drop(self.sender.take());
            return;
        }
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::SharedBuffer;
    use std::sync::atomic::AtomicU64;

    fn idle_logger() -> (Arc<AsyncLogger>, SharedBuffer) {
        let out = SharedBuffer::new();
        (Arc::new(AsyncLogger::new(out.clone(), 16, 1024)), out)
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let (logger, _) = idle_logger();
        assert!(Dispatcher::new(logger, 0, OverflowPolicy::Block).is_err());
    }

    #[test]
    fn test_submit_does_not_block_and_drains() {
        let (logger, out) = idle_logger();
        let dispatcher = Dispatcher::new(Arc::clone(&logger), 64, OverflowPolicy::Block).unwrap();

        // No consumer loop yet: records wait in the queue
        for i in 0..10 {
            assert!(dispatcher.println(i));
        }
        assert!(dispatcher.pending() > 0);

        let _consumer = logger.spawn().unwrap();
        dispatcher.drain().unwrap();

        let expected: String = (0..10).map(|i| format!("{}\n", i)).collect();
        assert_eq!(out.to_string_lossy(), expected);
        assert_eq!(dispatcher.pending(), 0);
        assert_eq!(logger.metrics().submitted(), 10);
    }

    #[test]
    fn test_drop_newest_when_full() {
        let (logger, _out) = idle_logger();
        let dispatcher =
            Dispatcher::new(Arc::clone(&logger), 2, OverflowPolicy::DropNewest).unwrap();

        // One record is held by the blocked forwarder, two fill the queue
        let accepted = (0..10).filter(|i| dispatcher.println(i)).count();

        assert!(accepted <= 3, "accepted {}", accepted);
        assert_eq!(logger.metrics().dropped_count() as usize, 10 - accepted);
        assert!(logger.metrics().queue_full_events() > 0);
    }

    #[test]
    fn test_alert_and_drop_invokes_callback() {
        let (logger, _out) = idle_logger();
        let alerts = Arc::new(AtomicU64::new(0));
        let alerts_clone = Arc::clone(&alerts);

        let dispatcher = Dispatcher::with_callback(
            Arc::clone(&logger),
            1,
            OverflowPolicy::AlertAndDrop,
            Some(Arc::new(move |_count| {
                alerts_clone.fetch_add(1, Ordering::Relaxed);
            })),
        )
        .unwrap();

        for i in 0..20 {
            dispatcher.println(i);
        }

        // First drop always alerts
        assert!(alerts.load(Ordering::Relaxed) >= 1);
        assert!(logger.metrics().dropped_count() > 0);
    }

    #[test]
    fn test_drop_oldest_keeps_newest() {
        let (logger, out) = idle_logger();
        let dispatcher =
            Dispatcher::new(Arc::clone(&logger), 4, OverflowPolicy::DropOldest).unwrap();

        for i in 0..50 {
            assert!(dispatcher.println(i));
        }

        let _consumer = logger.spawn().unwrap();
        dispatcher.drain().unwrap();

        let content = out.to_string_lossy();
        assert!(content.ends_with("46\n47\n48\n49\n"), "got {:?}", content);
        assert!(logger.metrics().dropped_count() > 0);
    }

    #[test]
    fn test_block_with_timeout_drops_after_waiting() {
        let (logger, _out) = idle_logger();
        let dispatcher = Dispatcher::new(
            Arc::clone(&logger),
            1,
            OverflowPolicy::BlockWithTimeout(Duration::from_millis(5)),
        )
        .unwrap();

        let accepted = (0..5).filter(|i| dispatcher.println(i)).count();
        assert!(accepted < 5);
        assert!(logger.metrics().block_events() > 0);
    }

    #[test]
    fn test_shutdown_times_out_while_logger_is_idle() {
        let (logger, out) = idle_logger();
        let mut dispatcher =
            Dispatcher::new(Arc::clone(&logger), 4, OverflowPolicy::Block).unwrap();

        for i in 0..3 {
            assert!(dispatcher.println(i));
        }

        // The forwarder is stuck handing the first record to a logger
        // with no consumer loop
        assert!(!dispatcher.shutdown(Duration::from_millis(20)));
        assert_eq!(dispatcher.pending(), 3);
        assert!(!dispatcher.println("late"));

        // Once a loop starts, the detached forwarder still delivers
        let _consumer = logger.spawn().unwrap();
        while dispatcher.pending() != 0 {
            thread::sleep(DRAIN_POLL_INTERVAL);
        }
        logger.finish().unwrap();
        assert_eq!(out.to_string_lossy(), "0\n1\n2\n");
    }

    #[test]
    fn test_submit_after_shutdown_is_rejected() {
        let (logger, _out) = idle_logger();
        let mut dispatcher = Dispatcher::new(logger, 4, OverflowPolicy::Block).unwrap();

        assert!(dispatcher.shutdown(Duration::from_secs(1)));
        assert!(!dispatcher.println("late"));
    }
}
