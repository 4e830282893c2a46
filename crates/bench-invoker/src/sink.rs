//! Where invoker output goes.

use parking_lot::Mutex;

/// Line-oriented output target owned by one invoker.
///
/// Called from the transport task while the invoker's state is locked, so
/// implementations must not block or call back into the invoker.
pub trait OutputSink: Send + Sync {
    /// Append one line of output.
    fn append(&self, line: &str);

    /// Discard everything appended so far.
    fn clear(&self) {}
}

/// In-memory sink.
#[derive(Debug, Default)]
pub struct BufferSink {
    lines: Mutex<Vec<String>>,
}

impl BufferSink {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the appended lines.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// All lines joined with newlines.
    pub fn contents(&self) -> String {
        self.lines.lock().join("\n")
    }

    /// Most recent line.
    pub fn last_line(&self) -> Option<String> {
        self.lines.lock().last().cloned()
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    /// Whether nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl OutputSink for BufferSink {
    fn append(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }

    fn clear(&self) {
        self.lines.lock().clear();
    }
}
