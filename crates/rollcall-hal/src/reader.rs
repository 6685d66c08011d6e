//! Line-oriented card reader adapter.
//!
//! Reader firmware (or a development stand-in) writes one UID per line to
//! a serial device; this adapter turns that stream into bounded-wait
//! [`CardReader`] polls via a reader thread and a channel.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use thiserror::Error;

use rollcall_core::{CardReader, CardUid, ValidationError};

/// Reader adapter errors.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("failed to open reader device: {0}")]
    Open(#[from] std::io::Error),
    #[error("invalid UID from reader: {0}")]
    InvalidUid(#[from] ValidationError),
}

/// Reads UIDs line-by-line from any [`BufRead`] source.
///
/// The source is drained on a dedicated thread so `read_next` can honor
/// its timeout even though `BufRead` has no bounded-wait read. Whitespace
/// is trimmed and empty lines skipped; one line is one tap.
#[derive(Debug)]
pub struct LineReader {
    rx: Receiver<String>,
    eof: bool,
}

impl LineReader {
    /// Spawns the reader thread over an arbitrary source.
    pub fn spawn<R>(source: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for line in source.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!(error = %e, "reader stream error, stopping");
                        break;
                    }
                };
                let uid = line.trim();
                if uid.is_empty() {
                    continue;
                }
                if tx.send(uid.to_string()).is_err() {
                    // Receiver dropped; session is over.
                    break;
                }
            }
        });
        Self { rx, eof: false }
    }

    /// Opens a serial device (or FIFO) path.
    pub fn from_device(path: &Path) -> Result<Self, ReaderError> {
        let file = std::fs::File::open(path)?;
        Ok(Self::spawn(BufReader::new(file)))
    }

    /// Reads taps from standard input. Useful on hosts without a reader.
    #[must_use]
    pub fn stdin() -> Self {
        Self::spawn(BufReader::new(std::io::stdin()))
    }
}

impl CardReader for LineReader {
    type Error = ReaderError;

    fn read_next(&mut self, timeout: Duration) -> Result<Option<CardUid>, Self::Error> {
        if self.eof {
            // The stream is gone; pace the caller's polling instead of
            // spinning until its deadline.
            thread::sleep(timeout);
            return Ok(None);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(line) => Ok(Some(CardUid::new(line)?)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                tracing::debug!("reader stream closed");
                self.eof = true;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const WAIT: Duration = Duration::from_secs(1);

    #[test]
    fn reads_uids_in_order() {
        let mut reader = LineReader::spawn(Cursor::new("111\n222\n333\n"));
        assert_eq!(reader.read_next(WAIT).unwrap().unwrap().as_str(), "111");
        assert_eq!(reader.read_next(WAIT).unwrap().unwrap().as_str(), "222");
        assert_eq!(reader.read_next(WAIT).unwrap().unwrap().as_str(), "333");
    }

    #[test]
    fn skips_blank_and_whitespace_lines() {
        let mut reader = LineReader::spawn(Cursor::new("\n   \n  589569966  \n"));
        assert_eq!(
            reader.read_next(WAIT).unwrap().unwrap().as_str(),
            "589569966"
        );
    }

    #[test]
    fn returns_none_after_eof() {
        let mut reader = LineReader::spawn(Cursor::new("111\n"));
        assert!(reader.read_next(WAIT).unwrap().is_some());
        assert!(
            reader
                .read_next(Duration::from_millis(10))
                .unwrap()
                .is_none()
        );
        // And keeps returning None without error.
        assert!(
            reader
                .read_next(Duration::from_millis(10))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn open_missing_device_fails() {
        let result = LineReader::from_device(Path::new("/nonexistent/reader0"));
        assert!(matches!(result, Err(ReaderError::Open(_))));
    }
}
