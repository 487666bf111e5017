// ==============================================================================
// Stream Drain: Forward Child-Process Output Line by Line
// ==============================================================================
//
// A child process that fills its stdout or stderr pipe blocks until somebody
// reads it. If the parent only waits for exit, a chatty translator deadlocks.
// Each of the two streams therefore gets its own reader thread, which forwards
// complete lines to the log sink as they arrive.

use std::io::{self, BufRead, BufReader, Read};
use std::thread::{self, JoinHandle};

use crate::log::{DynLogSink, LogSink, Severity};

/// Spawn a named thread that reads `stream` to end-of-stream, forwarding each
/// line to `sink` at `severity`.
///
/// A read error is logged at [`Severity::Error`] and ends the drain; it never
/// propagates to the thread that owns the child process.
pub fn spawn_drain<R>(
    name: &str,
    stream: R,
    severity: Severity,
    sink: DynLogSink,
) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name(format!("drain-{name}"))
        .spawn(move || drain(stream, severity, sink.as_ref()))
}

/// Read `stream` line by line on the current thread.
pub fn drain<R: Read>(stream: R, severity: Severity, sink: &dyn LogSink) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = trim_line_ending(&buf);
                sink.log(severity, &String::from_utf8_lossy(line));
            }
            Err(e) => {
                sink.error(&format!("error reading process output: {e}"));
                break;
            }
        }
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
