//! Deduplicating warning channel.

use crate::diagnostic::DiagnosticSink;
use crate::error::bound_message;

/// Remembers the last warning and how many times in a row it was raised.
#[derive(Debug, Clone)]
pub struct WarningBuffer {
    last: String,
    count: usize,
    capacity: usize,
}

impl Default for WarningBuffer {
    fn default() -> Self {
        Self::new(256)
    }
}

impl WarningBuffer {
    /// Create a buffer whose messages are bounded to `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            last: String::new(),
            count: 0,
            capacity,
        }
    }

    /// Raise a warning.
    ///
    /// An exact repeat of the previous warning only bumps the counter. A
    /// different message first flushes the pending repeat summary.
    pub fn warn(&mut self, message: &str, sink: &mut dyn DiagnosticSink) {
        let mut message = message.to_string();
        bound_message(&mut message, self.capacity);
        if self.count > 0 && message == self.last {
            self.count += 1;
            return;
        }
        self.flush(sink);
        sink.warning(&message);
        self.last = message;
        self.count = 1;
    }

    /// Emit the repeat summary, if any, and forget the last warning.
    pub fn flush(&mut self, sink: &mut dyn DiagnosticSink) {
        if self.count > 1 {
            sink.repeated(self.count);
        }
        self.last.clear();
        self.count = 0;
    }

    /// The last warning message, or `""` after a flush.
    pub fn last(&self) -> &str {
        &self.last
    }

    /// How many times in a row the last warning was raised.
    pub fn count(&self) -> usize {
        self.count
    }
}
