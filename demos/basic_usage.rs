//! Basic async sink usage
//!
//! Demonstrates the producer API, draining, the non-blocking dispatcher
//! and the process-wide default instance.
//!
//! Run with: cargo run --example basic_usage

use async_log_sink::prelude::*;
use async_log_sink::{global, printf};
use std::sync::Arc;
use std::thread;

fn main() -> Result<()> {
    println!("=== Async Log Sink - Basic Usage Example ===\n");

    // An explicit instance writing to standard output
    let logger = Arc::new(
        AsyncLogger::builder()
            .sink(StdoutSink::new())
            .buffer_size(4096)
            .build()?,
    );
    let _consumer = logger.spawn()?;

    println!("1. Producer API:");
    logger.print("print without newline, ");
    logger.println("println with one");
    printf!(logger, "printf: {} + {} = {}", 2, 2, 4);
    logger.finish()?;

    println!("\n2. Concurrent producers:");
    let handles: Vec<_> = (0..4)
        .map(|id| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..3 {
                    printf!(logger, "   thread {} record {}", id, i);
                }
            })
        })
        .collect();
    for handle in handles {
        let _ = handle.join();
    }
    logger.finish()?;

    println!("\n3. Non-blocking dispatcher:");
    let dispatcher = Dispatcher::new(Arc::clone(&logger), 128, OverflowPolicy::AlertAndDrop)?;
    for i in 0..5 {
        dispatcher.printf(format_args!("   queued record {}", i));
    }
    dispatcher.drain()?;

    println!("\n4. Default instance:");
    thread::spawn(|| {
        if let Err(e) = global::run() {
            eprintln!("default sink stopped: {}", e);
        }
    });
    global::println("   hello from the default instance");
    global::finish()?;

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
