//! Ready-made output sinks
//!
//! Any `std::io::Write + Send + 'static` value can be handed to
//! [`AsyncLogger`](crate::AsyncLogger); these cover the common cases.

pub mod console;
pub mod memory;

pub use console::{StderrSink, StdoutSink};
pub use memory::SharedBuffer;
