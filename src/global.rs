//! Process-wide default instance
//!
//! Convenience functions that delegate to one shared [`AsyncLogger`], created
//! on first use with a [`StdoutSink`] and the default [`SinkConfig`], and
//! replaceable wholesale with [`init`]. Nothing in [`crate::core`] depends on
//! this module; code that can pass a logger around should do so instead.
//!
//! The `print` family goes through a [`Dispatcher`], so callers never block
//! on the consumer loop; records submitted while its queue is full follow
//! the configured [`OverflowPolicy`](crate::OverflowPolicy). The `fatal` and
//! `panic` families act on the logger directly.
//!
//! ```no_run
//! use async_log_sink::global;
//! use std::thread;
//!
//! thread::spawn(|| {
//!     if let Err(e) = global::run() {
//!         eprintln!("log sink stopped: {}", e);
//!     }
//! });
//!
//! global::println("service started");
//! global::finish().unwrap();
//! ```

use crate::core::{AsyncLogger, Result, SinkConfig};
use crate::dispatcher::Dispatcher;
use crate::sinks::StdoutSink;
use parking_lot::{const_rwlock, RwLock};
use std::fmt::{self, Display};
use std::io::Write;
use std::sync::Arc;

static DEFAULT: RwLock<Option<Arc<DefaultInstance>>> = const_rwlock(None);

/// The shared logger together with its submission front-end
#[derive(Debug)]
pub struct DefaultInstance {
    logger: Arc<AsyncLogger>,
    dispatcher: Dispatcher,
}

impl DefaultInstance {
    fn new<W>(sink: W, config: SinkConfig) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        let capacity = config.dispatch_capacity;
        let policy = config.overflow_policy.clone();
        let logger = Arc::new(AsyncLogger::with_config(sink, config)?);
        let dispatcher = Dispatcher::new(Arc::clone(&logger), capacity, policy)?;
        Ok(Self { logger, dispatcher })
    }

    pub fn logger(&self) -> &Arc<AsyncLogger> {
        &self.logger
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

fn instance() -> Result<Arc<DefaultInstance>> {
    if let Some(ref current) = *DEFAULT.read() {
        return Ok(Arc::clone(current));
    }

    let mut slot = DEFAULT.write();
    if let Some(ref current) = *slot {
        return Ok(Arc::clone(current));
    }
    let created = Arc::new(DefaultInstance::new(StdoutSink::new(), SinkConfig::default())?);
    *slot = Some(Arc::clone(&created));
    Ok(created)
}

/// Replace the default instance
///
/// A consumer loop already running on the previous instance keeps running
/// on it; start a new one with [`run`].
pub fn init<W>(sink: W, records_count: usize, buffer_size: usize) -> Result<()>
where
    W: Write + Send + 'static,
{
    init_with(sink, SinkConfig::new(records_count, buffer_size))
}

/// Replace the default instance using a full configuration
pub fn init_with<W>(sink: W, config: SinkConfig) -> Result<()>
where
    W: Write + Send + 'static,
{
    let replacement = Arc::new(DefaultInstance::new(sink, config)?);
    *DEFAULT.write() = Some(replacement);
    Ok(())
}

/// Drain and remove the default instance
///
/// Records still queued are written if a consumer loop is running;
/// otherwise the writer is only flushed. The next call to any function in
/// this module creates a fresh standard-output instance.
pub fn teardown() -> Result<()> {
    let Some(current) = DEFAULT.write().take() else {
        return Ok(());
    };
    if current.logger.is_active() {
        current.dispatcher.drain()
    } else {
        current.logger.flush()
    }
}

/// The default logger, for callers that want the blocking producer API
pub fn logger() -> Result<Arc<AsyncLogger>> {
    Ok(Arc::clone(&instance()?.logger))
}

/// Run the consumer loop of the default instance on the calling thread
pub fn run() -> Result<()> {
    instance()?.logger.run()
}

pub fn flush() -> Result<()> {
    instance()?.logger.flush()
}

pub fn is_active() -> bool {
    instance().map(|i| i.logger.is_active()).unwrap_or(false)
}

/// Wait until everything submitted through this module is written and
/// flushed
pub fn finish() -> Result<()> {
    instance()?.dispatcher.drain()
}

fn submit(record: Vec<u8>) -> bool {
    match instance() {
        Ok(current) => current.dispatcher.submit(record),
        Err(e) => {
            eprintln!("[ALOG ERROR] Default instance unavailable: {}", e);
            false
        }
    }
}

/// Queue `message` without a trailing newline; returns `false` if dropped
pub fn print(message: impl Display) -> bool {
    submit(message.to_string().into_bytes())
}

pub fn println(message: impl Display) -> bool {
    submit(format!("{}\n", message).into_bytes())
}

pub fn printf(args: fmt::Arguments<'_>) -> bool {
    submit(format!("{}\n", args).into_bytes())
}

fn forced() -> Arc<AsyncLogger> {
    match instance() {
        Ok(current) => Arc::clone(&current.logger),
        Err(e) => {
            eprintln!("[ALOG ERROR] Default instance unavailable: {}", e);
            std::process::exit(1)
        }
    }
}

pub fn fatal(message: impl Display) -> ! {
    forced().fatal(message)
}

pub fn fatalln(message: impl Display) -> ! {
    forced().fatalln(message)
}

pub fn fatalf(args: fmt::Arguments<'_>) -> ! {
    forced().fatalf(args)
}

pub fn panic(message: impl Display) -> ! {
    forced().panic(message)
}

pub fn panicln(message: impl Display) -> ! {
    forced().panicln(message)
}

pub fn panicf(args: fmt::Arguments<'_>) -> ! {
    forced().panicf(args)
}
