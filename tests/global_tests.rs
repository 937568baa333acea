//! Tests for the process-wide default instance
//!
//! The default instance is shared by every test in a binary, so the whole
//! lifecycle runs as one sequential test.

#![cfg(feature = "global")]

use async_log_sink::global;
use async_log_sink::prelude::*;
use std::thread;

#[test]
fn test_default_instance_lifecycle() {
    // Lazily created on first use, inactive until run
    assert!(!global::is_active());

    let out = SharedBuffer::new();
    global::init(out.clone(), 32, 256).expect("Failed to init default instance");
    let logger = global::logger().unwrap();
    assert_eq!(logger.config().records_count, 32);
    assert_eq!(logger.config().buffer_size, 256);

    // Submissions return immediately even before the loop starts
    assert!(global::print("a"));
    assert!(global::println("b"));
    assert!(global::printf(format_args!("{}", "c")));

    let consumer = thread::spawn(global::run);
    while !global::is_active() {
        thread::yield_now();
    }

    global::finish().expect("Failed to finish");
    assert_eq!(out.to_string_lossy(), "ab\nc\n");

    // Replacing the instance leaves the old loop on the old logger
    let replacement = SharedBuffer::new();
    global::init(replacement.clone(), 16, 1024).unwrap();
    assert!(!global::is_active());
    assert!(logger.is_active());

    let result = std::panic::catch_unwind(|| global::panicln("stop"));
    assert!(result.is_err());
    assert_eq!(replacement.to_string_lossy(), "panic: stop\n");

    // Stop the loop still running on the first instance
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        logger.panic("old");
    }));
    assert!(result.is_err());
    assert!(consumer.join().unwrap().is_ok());
    assert_eq!(out.to_string_lossy(), "ab\nc\npanic: old");

    global::teardown().unwrap();
    assert!(global::teardown().is_ok());
}
