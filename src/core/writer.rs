//! Buffered writer wrapping the output sink

use std::fmt;
use std::io::{self, BufWriter, ErrorKind, Write};

/// How many consecutive short writes without any progress a flush or a
/// final write tolerates before giving up
pub const STALLED_WRITE_LIMIT: usize = 16;

/// Result of a single attempt to hand a record to the buffered writer
#[derive(Debug)]
pub enum WriteOutcome {
    /// Every byte was accepted
    Complete,
    /// The sink stopped accepting bytes; `written` bytes were taken and the
    /// rest should be retried later
    Short { written: usize },
    /// The sink failed; the writer should not be used for normal records
    Failed { written: usize, error: io::Error },
}

/// Whether an I/O error only means "try again later"
pub fn is_short_write(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::WriteZero | ErrorKind::Interrupted | ErrorKind::WouldBlock
    )
}

pub struct BufferedWriter {
    inner: BufWriter<Box<dyn Write + Send>>,
}

impl BufferedWriter {
    pub fn new(sink: Box<dyn Write + Send>, buffer_size: usize) -> Self {
        Self {
            inner: BufWriter::with_capacity(buffer_size, sink),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Bytes sitting in the buffer, not yet handed to the sink
    pub fn buffered(&self) -> usize {
        self.inner.buffer().len()
    }

    /// Write as much of `bytes` as the writer accepts without flushing
    /// beyond what the buffer itself needs
    pub fn write_record(&mut self, bytes: &[u8]) -> WriteOutcome {
        let mut written = 0;
        while written < bytes.len() {
            match self.inner.write(&bytes[written..]) {
                Ok(0) => return WriteOutcome::Short { written },
                Ok(n) => written += n,
                Err(error) if is_short_write(&error) => return WriteOutcome::Short { written },
                Err(error) => return WriteOutcome::Failed { written, error },
            }
        }
        WriteOutcome::Complete
    }

    /// Write all of `pending`, removing bytes from its front as the sink
    /// takes them
    ///
    /// Short writes are retried for as long as the sink keeps making
    /// progress. On error, `pending` holds exactly the bytes not yet taken.
    pub fn write_pending(&mut self, pending: &mut Vec<u8>) -> io::Result<()> {
        let mut stalled = 0;
        while !pending.is_empty() {
            let buffered_before = self.buffered();
            match self.write_record(pending) {
                WriteOutcome::Complete => pending.clear(),
                WriteOutcome::Short { written } => {
                    pending.drain(..written);
                    if written > 0 || self.buffered() < buffered_before {
                        stalled = 0;
                    } else {
                        stalled += 1;
                        if stalled >= STALLED_WRITE_LIMIT {
                            return Err(io::Error::new(
                                ErrorKind::WriteZero,
                                "sink stopped accepting bytes",
                            ));
                        }
                    }
                }
                WriteOutcome::Failed { written, error } => {
                    pending.drain(..written);
                    return Err(error);
                }
            }
        }
        Ok(())
    }

    pub fn write_fully(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_pending(&mut bytes.to_vec())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        let mut stalled = 0;
        loop {
            let buffered_before = self.buffered();
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(error) if is_short_write(&error) => {
                    if self.buffered() < buffered_before {
                        stalled = 0;
                    } else {
                        stalled += 1;
                        if stalled >= STALLED_WRITE_LIMIT {
                            return Err(error);
                        }
                    }
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Write and flush one last record, used by forced termination
    pub fn write_final(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_fully(bytes)?;
        self.flush()
    }
}

impl fmt::Debug for BufferedWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedWriter")
            .field("capacity", &self.capacity())
            .field("buffered", &self.buffered())
            .finish()
    }
}
