//! Error-reporting sink handed to the path-based loaders.

use crate::error::ErrorKind;

/// Receives one record per failed decode.
pub trait ErrorSink {
    fn report(&mut self, kind: ErrorKind, message: &str);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
}

/// Append-only in-memory sink. The most recent record is what callers
/// usually surface to the user.
#[derive(Debug, Default)]
pub struct ErrorLog {
    records: Vec<ErrorRecord>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&ErrorRecord> {
        self.records.last()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl ErrorSink for ErrorLog {
    fn report(&mut self, kind: ErrorKind, message: &str) {
        log::warn!("[{}] {}", kind, message);
        self.records.push(ErrorRecord {
            kind,
            message: message.to_owned(),
        });
    }
}
