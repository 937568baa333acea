//! Async sink versus synchronous baseline
//!
//! Spawns worker threads that each emit a number of JSON-ish events and
//! times the same workload through a mutex-guarded buffered file and
//! through the async sink.
//!
//! Run with: cargo run --example compare -- -e 50 -t 7 -r 32 -b 4096

use async_log_sink::prelude::*;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

struct Options {
    events: usize,
    threads: usize,
    records: usize,
    buffer_size: usize,
}

impl Options {
    fn from_args() -> Self {
        let mut options = Options {
            events: 50,
            threads: 7,
            records: 32,
            buffer_size: 4096,
        };

        let args: Vec<String> = std::env::args().skip(1).collect();
        for pair in args.chunks(2) {
            let value = pair.get(1).and_then(|v| v.parse().ok());
            match (pair[0].as_str(), value) {
                ("-e", Some(v)) => options.events = v,
                ("-t", Some(v)) => options.threads = v,
                ("-r", Some(v)) => options.records = v,
                ("-b", Some(v)) => options.buffer_size = v,
                (flag, _) => eprintln!("ignoring argument {}", flag),
            }
        }
        options
    }
}

/// Simulated per-event work: a random value hashed twice, the second
/// round chained on the first
fn job(rng: &mut StdRng) -> u64 {
    let value: u64 = rng.gen_range(0..10_000);

    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    let first = hasher.finish();

    let mut hasher = DefaultHasher::new();
    (first, value).hash(&mut hasher);
    hasher.finish() % 10_000
}

fn event(thread_id: usize, rng: &mut StdRng) -> String {
    format!(
        "{{\"thread\": {}, \"timestamp\": \"{}\", \"result\": {}}}\n",
        thread_id,
        chrono::Local::now().to_rfc3339(),
        job(rng)
    )
}

fn main() -> Result<()> {
    let options = Options::from_args();

    // Synchronous baseline
    let baseline = Mutex::new(BufWriter::new(File::create("baseline.log")?));
    let start = Instant::now();
    thread::scope(|scope| {
        for thread_id in 0..options.threads {
            let baseline = &baseline;
            let events = options.events;
            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(thread_id as u64 * 2);
                for _ in 0..events {
                    let record = event(thread_id, &mut rng);
                    let _ = baseline.lock().write_all(record.as_bytes());
                }
            });
        }
    });
    baseline.lock().flush()?;
    println!("sync:  {:?}", start.elapsed());

    // Async sink
    let logger = Arc::new(AsyncLogger::new(
        File::create("async.log")?,
        options.records,
        options.buffer_size,
    ));
    let _consumer = logger.spawn()?;

    let start = Instant::now();
    thread::scope(|scope| {
        for thread_id in 0..options.threads {
            let logger = &logger;
            let events = options.events;
            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(thread_id as u64);
                for _ in 0..events {
                    logger.print(event(thread_id, &mut rng));
                }
            });
        }
    });
    logger.finish()?;
    println!("async: {:?}", start.elapsed());

    Ok(())
}
