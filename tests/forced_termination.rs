//! Forced termination tests
//!
//! `fatal` exits the process, so it is exercised in a child process: the
//! test binary re-runs itself with an environment variable selecting the
//! child role, and the parent inspects the exit status and the log file.

use async_log_sink::prelude::*;
use async_log_sink::{fatalf, panicf};
use std::env;
use std::fs::{self, File};
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;

const CHILD_LOG_ENV: &str = "ASYNC_LOG_SINK_FATAL_CHILD_LOG";
const CHILD_VARIANT_ENV: &str = "ASYNC_LOG_SINK_FATAL_CHILD_VARIANT";
const PRIOR_RECORDS: usize = 25;

/// Child role: log some records, then terminate through `fatal*`
#[test]
fn fatal_child() {
    let Ok(path) = env::var(CHILD_LOG_ENV) else {
        // Running as a regular test: nothing to do
        return;
    };
    let variant = env::var(CHILD_VARIANT_ENV).unwrap_or_default();

    let file = File::create(&path).expect("Failed to create log file");
    let logger = Arc::new(AsyncLogger::new(file, 16, 1 << 16));
    let _consumer = logger.spawn().expect("Failed to spawn consumer loop");

    for i in 0..PRIOR_RECORDS {
        logger.println(format!("record {}", i));
    }

    match variant.as_str() {
        "fatalln" => logger.fatalln("boom"),
        "fatalf" => fatalf!(logger, "{}", "boom"),
        _ => logger.fatal("boom"),
    }
}

fn run_child(variant: &str) -> (Option<i32>, String) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join(format!("{}.log", variant));

    let status = Command::new(env::current_exe().expect("test binary path"))
        .args(["--exact", "fatal_child", "--nocapture", "--test-threads=1"])
        .env(CHILD_LOG_ENV, &log_file)
        .env(CHILD_VARIANT_ENV, variant)
        .status()
        .expect("Failed to run child process");

    let content = fs::read_to_string(&log_file).expect("Failed to read log file");
    (status.code(), content)
}

fn expected_prefix() -> String {
    (0..PRIOR_RECORDS).map(|i| format!("record {}\n", i)).collect()
}

#[test]
fn test_fatal_flushes_prior_records_and_exits() {
    let (code, content) = run_child("fatal");

    assert_eq!(code, Some(1));
    assert_eq!(content, format!("{}fatal: boom", expected_prefix()));
}

#[test]
fn test_fatalln_appends_newline() {
    let (code, content) = run_child("fatalln");

    assert_eq!(code, Some(1));
    assert_eq!(content, format!("{}fatal: boom\n", expected_prefix()));
}

#[test]
fn test_fatalf_formats_message() {
    let (code, content) = run_child("fatalf");

    assert_eq!(code, Some(1));
    assert!(content.starts_with(&expected_prefix()));
    assert!(content.ends_with("fatal: boom\n"));
}

#[test]
fn test_panic_flushes_prior_records_and_unwinds() {
    let out = SharedBuffer::new();
    let logger = Arc::new(AsyncLogger::new(out.clone(), 16, 1 << 16));
    let consumer = logger.spawn().unwrap();

    for i in 0..PRIOR_RECORDS {
        logger.println(format!("record {}", i));
    }

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        panicf!(logger, "{}", "boom");
    }));

    let payload = result.expect_err("panicf must unwind");
    assert_eq!(payload.downcast_ref::<String>().map(String::as_str), Some("boom"));
    assert!(consumer.join().unwrap().is_ok());
    assert_eq!(out.to_string_lossy(), format!("{}panic: boom\n", expected_prefix()));
}

#[test]
fn test_panic_after_fault_still_writes() {
    use std::io::{self, Write};

    struct FailsOnce {
        out: SharedBuffer,
        failed: bool,
    }

    impl Write for FailsOnce {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if !self.failed {
                self.failed = true;
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            self.out.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let out = SharedBuffer::new();
    let sink = FailsOnce {
        out: out.clone(),
        failed: false,
    };
    let logger = Arc::new(AsyncLogger::new(sink, 16, 0));
    let consumer = logger.spawn().unwrap();

    logger.println("dropped");
    assert!(consumer.join().unwrap().is_err());
    assert_eq!(logger.state(), LoggerState::Faulted);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        logger.panic("after fault");
    }));
    assert!(result.is_err());
    assert_eq!(out.to_string_lossy(), "panic: after fault");
}
