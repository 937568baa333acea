//! Asynchronous log sink
//!
//! An [`AsyncLogger`] decouples any number of producer threads from a single
//! consumer loop that owns all writes to the output sink. Producers hand
//! records over a rendezvous channel, so a burst can never outrun the
//! consumer by more than the number of producers blocked in a send.

use super::{
    config::SinkConfig,
    error::{LoggerError, Result},
    metrics::LoggerMetrics,
    state::{ActivityGate, LoggerState},
    writer::{BufferedWriter, WriteOutcome},
};
use crate::sinks::StdoutSink;
use crossbeam_channel::{bounded, select, Receiver, SendTimeoutError, Sender};
use parking_lot::Mutex;
use std::fmt::{self, Display};
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Interval at which [`AsyncLogger::finish`] polls for producers still
/// blocked in a handoff
pub const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Interval at which a pending drain request re-checks that the consumer
/// loop is still running
const DRAIN_RECHECK_INTERVAL: Duration = Duration::from_millis(10);

const FATAL_PREFIX: &str = "fatal: ";
const PANIC_PREFIX: &str = "panic: ";

enum Command {
    Record(Vec<u8>),
    /// Write any stowed bytes, flush, and report the outcome
    Drain(Sender<io::Result<()>>),
}

pub struct AsyncLogger {
    writer: Mutex<BufferedWriter>,
    records_tx: Sender<Command>,
    records_rx: Receiver<Command>,
    terminate_tx: Sender<()>,
    terminate_rx: Receiver<()>,
    /// Producers that have started but not finished a handoff
    in_flight: AtomicUsize,
    gate: ActivityGate,
    metrics: LoggerMetrics,
    config: SinkConfig,
}

impl AsyncLogger {
    /// Create an inactive logger writing to `sink`
    ///
    /// `records_count` is kept as a queue-depth hint only; the handoff
    /// stays a rendezvous. A `buffer_size` of zero gives an unbuffered
    /// writer.
    pub fn new<W>(sink: W, records_count: usize, buffer_size: usize) -> Self
    where
        W: Write + Send + 'static,
    {
        Self::from_parts(Box::new(sink), SinkConfig::new(records_count, buffer_size))
    }

    /// Create an inactive logger from a validated configuration
    pub fn with_config<W>(sink: W, config: SinkConfig) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        config.validate()?;
        Ok(Self::from_parts(Box::new(sink), config))
    }

    fn from_parts(sink: Box<dyn Write + Send>, config: SinkConfig) -> Self {
        let (records_tx, records_rx) = bounded(0);
        let (terminate_tx, terminate_rx) = bounded(1);

        Self {
            writer: Mutex::new(BufferedWriter::new(sink, config.buffer_size)),
            records_tx,
            records_rx,
            terminate_tx,
            terminate_rx,
            in_flight: AtomicUsize::new(0),
            gate: ActivityGate::new(),
            metrics: LoggerMetrics::new(),
            config,
        }
    }

    /// Create a builder for AsyncLogger
    ///
    /// # Example
    /// ```
    /// use async_log_sink::prelude::*;
    ///
    /// let logger = AsyncLogger::builder()
    ///     .sink(SharedBuffer::new())
    ///     .buffer_size(4096)
    ///     .build()
    ///     .unwrap();
    /// assert!(!logger.is_active());
    /// ```
    #[must_use]
    pub fn builder() -> AsyncLoggerBuilder {
        AsyncLoggerBuilder::new()
    }

    /// Run the consumer loop on the calling thread
    ///
    /// Blocks while another loop owns this logger. Returns `Ok(())` once a
    /// forced termination interrupts the loop. An unrecoverable sink error
    /// ends the loop with an error and leaves the logger
    /// [`LoggerState::Faulted`]; calling `run` again then fails with
    /// [`LoggerError::Faulted`] until [`AsyncLogger::recover`] is called.
    pub fn run(&self) -> Result<()> {
        self.gate.acquire()?;

        let mut stow: Vec<u8> = Vec::new();
        loop {
            select! {
                recv(self.terminate_rx) -> _ => {
                    if !stow.is_empty() {
                        let _ = self.writer.lock().write_pending(&mut stow);
                    }
                    self.gate.release();
                    return Ok(());
                }
                recv(self.records_rx) -> command => {
                    if let Some(exit) = self.handle(command.ok(), &mut stow) {
                        return exit;
                    }
                }
            }
        }
    }

    /// Process one command; `Some` ends the loop with that result
    fn handle(&self, command: Option<Command>, stow: &mut Vec<u8>) -> Option<Result<()>> {
        match command {
            Some(Command::Record(record)) => {
                let error = self.consume(record, stow).err()?;
                self.metrics.record_fault();
                self.gate.fault();
                eprintln!("[ALOG ERROR] Consumer loop stopped on sink error: {}", error);
                Some(Err(LoggerError::io_operation(
                    "writing record",
                    "sink rejected write",
                    error,
                )))
            }
            Some(Command::Drain(ack)) => {
                let _ = ack.send(self.drain_stow(stow));
                None
            }
            None => {
                // Both channel ends live in `self`
                self.gate.release();
                Some(Err(LoggerError::ChannelReceiveError))
            }
        }
    }

    /// Spawn a named thread running [`AsyncLogger::run`]
    pub fn spawn(self: &Arc<Self>) -> Result<thread::JoinHandle<Result<()>>> {
        let logger = Arc::clone(self);
        let handle = thread::Builder::new()
            .name("alog-consumer".to_string())
            .spawn(move || logger.run())?;
        Ok(handle)
    }

    fn consume(&self, record: Vec<u8>, stow: &mut Vec<u8>) -> io::Result<()> {
        let record = if stow.is_empty() {
            record
        } else {
            let mut joined = std::mem::take(stow);
            joined.extend_from_slice(&record);
            joined
        };

        // Short writes are retried with the next record rather than by
        // flushing eagerly
        match self.writer.lock().write_record(&record) {
            WriteOutcome::Complete => {
                self.metrics.record_written(record.len());
                Ok(())
            }
            WriteOutcome::Short { written } => {
                self.metrics.record_written(written);
                self.metrics.record_short_write();
                stow.extend_from_slice(&record[written..]);
                Ok(())
            }
            WriteOutcome::Failed { error, .. } => Err(error),
        }
    }

    fn drain_stow(&self, stow: &mut Vec<u8>) -> io::Result<()> {
        let mut writer = self.writer.lock();
        let before = stow.len();
        let result = writer.write_pending(stow);
        self.metrics.record_partial(before - stow.len());
        result?;
        writer.flush()
    }

    /// Whether a consumer loop currently owns this logger
    pub fn is_active(&self) -> bool {
        self.gate.state() == LoggerState::Active
    }

    pub fn state(&self) -> LoggerState {
        self.gate.state()
    }

    /// Clear a sink fault so that `run` may be called again
    ///
    /// Returns `true` if the logger was faulted.
    pub fn recover(&self) -> bool {
        self.gate.recover()
    }

    /// Number of producers currently blocked handing over a record
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Flush everything handed to the logger so far
    ///
    /// While a consumer loop runs this is [`AsyncLogger::finish`], so bytes
    /// the loop stowed after a short write are written as well. Otherwise
    /// the writer is flushed directly.
    pub fn flush(&self) -> Result<()> {
        if self.is_active() {
            self.finish()
        } else {
            self.flush_writer()
        }
    }

    fn flush_writer(&self) -> Result<()> {
        self.writer
            .lock()
            .flush()
            .map_err(|e| LoggerError::io_operation("flushing", "sink rejected flush", e))
    }

    /// Wait until every submitted record has been written and flushed
    ///
    /// Meant for shutdown, once producers have stopped submitting. Waits
    /// for producers still blocked in a handoff, then asks the consumer
    /// loop to write any stowed bytes and flush, and waits for its
    /// acknowledgement. Without a running loop the writer is flushed
    /// directly; producers blocked on a stopped loop keep this waiting.
    pub fn finish(&self) -> Result<()> {
        while self.in_flight() != 0 {
            thread::sleep(DRAIN_POLL_INTERVAL);
        }

        let (ack_tx, ack_rx) = bounded(1);
        let mut command = Command::Drain(ack_tx);
        loop {
            if !self.is_active() {
                return self.flush_writer();
            }
            match self.records_tx.send_timeout(command, DRAIN_RECHECK_INTERVAL) {
                Ok(()) => break,
                Err(SendTimeoutError::Timeout(pending)) => command = pending,
                Err(SendTimeoutError::Disconnected(_)) => return Err(LoggerError::ChannelSendError),
            }
        }

        ack_rx
            .recv()
            .map_err(|_| LoggerError::ChannelReceiveError)?
            .map_err(|e| LoggerError::io_operation("draining", "sink rejected flush", e))
    }

    /// Hand a raw record to the consumer loop
    ///
    /// Blocks until the loop receives it; blocks indefinitely while no loop
    /// is running.
    pub fn print_bytes(&self, record: Vec<u8>) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        // Cannot disconnect: the receiver lives as long as `self`
        let _ = self.records_tx.send(Command::Record(record));
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    /// Submit `message` as-is, without a trailing newline
    pub fn print(&self, message: impl Display) {
        self.print_bytes(message.to_string().into_bytes());
    }

    /// Submit `message` followed by a newline
    pub fn println(&self, message: impl Display) {
        self.print_bytes(format!("{}\n", message).into_bytes());
    }

    /// Submit formatted arguments followed by a newline
    ///
    /// Usually called through the [`printf!`](crate::printf) macro.
    pub fn printf(&self, args: fmt::Arguments<'_>) {
        self.print_bytes(format!("{}\n", args).into_bytes());
    }

    /// Stop the consumer loop, write `record` directly, and flush
    ///
    /// Write errors are discarded: forced termination must not fail.
    fn interrupt(&self, record: &[u8]) {
        // A full slot means a request is already pending
        let _ = self.terminate_tx.try_send(());
        self.gate.wait_until_stopped();

        let _ = self.writer.lock().write_final(record);

        // No loop took the request; do not let it stop the next one
        let _ = self.terminate_rx.try_recv();
    }

    /// Write `"fatal: "` and `message`, flush, and exit the process with
    /// status 1
    pub fn fatal(&self, message: impl Display) -> ! {
        self.interrupt(format!("{}{}", FATAL_PREFIX, message).as_bytes());
        std::process::exit(1)
    }

    pub fn fatalln(&self, message: impl Display) -> ! {
        self.interrupt(format!("{}{}\n", FATAL_PREFIX, message).as_bytes());
        std::process::exit(1)
    }

    pub fn fatalf(&self, args: fmt::Arguments<'_>) -> ! {
        self.interrupt(format!("{}{}\n", FATAL_PREFIX, args).as_bytes());
        std::process::exit(1)
    }

    /// Same as [`AsyncLogger::fatal`], but panics with `message` instead of
    /// exiting
    pub fn panic(&self, message: impl Display) -> ! {
        let message = message.to_string();
        self.interrupt(format!("{}{}", PANIC_PREFIX, message).as_bytes());
        panic!("{}", message)
    }

    pub fn panicln(&self, message: impl Display) -> ! {
        let message = message.to_string();
        self.interrupt(format!("{}{}\n", PANIC_PREFIX, message).as_bytes());
        panic!("{}", message)
    }

    pub fn panicf(&self, args: fmt::Arguments<'_>) -> ! {
        let message = args.to_string();
        self.interrupt(format!("{}{}\n", PANIC_PREFIX, message).as_bytes());
        panic!("{}", message)
    }
}

impl fmt::Debug for AsyncLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncLogger")
            .field("state", &self.state())
            .field("in_flight", &self.in_flight())
            .field("config", &self.config)
            .finish()
    }
}

impl Drop for AsyncLogger {
    fn drop(&mut self) {
        if let Err(e) = self.writer.get_mut().flush() {
            eprintln!("[ALOG ERROR] Failed to flush during drop: {}", e);
        }
    }
}

/// Builder for constructing an AsyncLogger with a fluent API
///
/// The sink defaults to standard output.
///
/// # Example
/// ```
/// use async_log_sink::prelude::*;
///
/// let logger = AsyncLogger::builder()
///     .sink(SharedBuffer::new())
///     .records_count(32)
///     .buffer_size(4096)
///     .build()
///     .unwrap();
/// assert_eq!(logger.config().records_count, 32);
/// ```
pub struct AsyncLoggerBuilder {
    sink: Option<Box<dyn Write + Send>>,
    config: SinkConfig,
}

impl AsyncLoggerBuilder {
    pub fn new() -> Self {
        Self {
            sink: None,
            config: SinkConfig::default(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn sink<W: Write + Send + 'static>(mut self, sink: W) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Set the queue-depth hint
    #[must_use = "builder methods return a new value"]
    pub fn records_count(mut self, records_count: usize) -> Self {
        self.config.records_count = records_count;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.config.buffer_size = buffer_size;
        self
    }

    /// Replace the whole configuration
    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: SinkConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<AsyncLogger> {
        self.config.validate()?;
        let sink = self.sink.unwrap_or_else(|| Box::new(StdoutSink::new()));
        Ok(AsyncLogger::from_parts(sink, self.config))
    }
}

impl Default for AsyncLoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
