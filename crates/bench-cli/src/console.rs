//! Terminal output sink.

use std::io::Write;

use bench_invoker::{BufferSink, OutputSink};

/// Prints each line with a panel prefix and keeps a copy for saving.
pub struct ConsoleSink {
    prefix: String,
    buffer: BufferSink,
}

impl ConsoleSink {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            buffer: BufferSink::new(),
        }
    }

    /// Everything printed since the last clear.
    pub fn contents(&self) -> String {
        self.buffer.contents()
    }
}

impl OutputSink for ConsoleSink {
    fn append(&self, line: &str) {
        let _ = write_prefixed(&mut std::io::stdout().lock(), &self.prefix, line);
        self.buffer.append(line);
    }

    fn clear(&self) {
        self.buffer.clear();
    }
}

/// Write `line` as one or more `[prefix] ...` lines. An empty line still
/// prints the bare prefix so the console matches the saved output.
fn write_prefixed(out: &mut impl Write, prefix: &str, line: &str) -> std::io::Result<()> {
    if line.is_empty() {
        return writeln!(out, "[{prefix}]");
    }
    for part in line.lines() {
        writeln!(out, "[{prefix}] {part}")?;
    }
    Ok(())
}
