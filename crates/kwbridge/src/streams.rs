//! Console redirection from the managed runtime into host streams.

use std::io::{self, Write as _};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use kwbridge_runtime::{ManagedRuntime, PrintStream};
use parking_lot::Mutex;
use thiserror::Error;

use crate::support::{OutputStreamWriter, WRITER_CLASS, Writer};

/// A host text stream console output is forwarded to.
pub trait HostStream: Send + Sync {
    fn write_str(&self, s: &str) -> io::Result<()>;

    fn flush(&self) -> io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Stdout;

impl HostStream for Stdout {
    fn write_str(&self, s: &str) -> io::Result<()> {
        io::stdout().lock().write_all(s.as_bytes())
    }

    fn flush(&self) -> io::Result<()> {
        io::stdout().lock().flush()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Stderr;

impl HostStream for Stderr {
    fn write_str(&self, s: &str) -> io::Result<()> {
        io::stderr().lock().write_all(s.as_bytes())
    }

    fn flush(&self) -> io::Result<()> {
        io::stderr().lock().flush()
    }
}

/// In-memory host stream. Clones share the buffer.
#[derive(Debug, Default, Clone)]
pub struct BufferStream {
    text: Arc<Mutex<String>>,
    flushes: Arc<AtomicUsize>,
}

impl BufferStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.text.lock().clone()
    }

    /// Return the buffered text and clear the buffer.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.text.lock())
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::Relaxed)
    }
}

impl HostStream for BufferStream {
    fn write_str(&self, s: &str) -> io::Result<()> {
        self.text.lock().push_str(s);
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// The host's standard output and error pair.
#[derive(Clone)]
pub struct HostStreams {
    pub out: Arc<dyn HostStream>,
    pub err: Arc<dyn HostStream>,
}

impl HostStreams {
    pub fn new(out: Arc<dyn HostStream>, err: Arc<dyn HostStream>) -> Self {
        Self { out, err }
    }

    /// The process's own stdout and stderr.
    pub fn stdio() -> Self {
        Self::new(Arc::new(Stdout), Arc::new(Stderr))
    }
}

impl Default for HostStreams {
    fn default() -> Self {
        Self::stdio()
    }
}

/// Decodes console bytes as UTF-8 and forwards the text to a host stream.
///
/// A character split across writes is held back until its last byte arrives,
/// including across flushes: print streams flush after every byte range, so a
/// flush cannot mark the end of a character. An unfinished sequence still
/// pending when the writer is dropped is discarded. Invalid sequences come out
/// as U+FFFD.
pub struct HostWriter {
    target: Arc<dyn HostStream>,
    pending: Mutex<Vec<u8>>,
}

impl HostWriter {
    pub fn new(target: Arc<dyn HostStream>) -> Self {
        Self {
            target,
            pending: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, bytes: &[u8]) -> io::Result<()> {
        let text = {
            let mut pending = self.pending.lock();
            pending.extend_from_slice(bytes);
            decode_available(&mut pending)
        };
        if text.is_empty() {
            return Ok(());
        }
        self.target.write_str(&text)
    }
}

/// Decode the complete prefix of `pending`, leaving an unfinished trailing
/// sequence in place.
fn decode_available(pending: &mut Vec<u8>) -> String {
    let mut text = String::new();
    let mut start = 0;
    while start < pending.len() {
        match std::str::from_utf8(&pending[start..]) {
            Ok(s) => {
                text.push_str(s);
                start = pending.len();
            }
            Err(e) => {
                let valid_end = start + e.valid_up_to();
                text.push_str(&String::from_utf8_lossy(&pending[start..valid_end]));
                match e.error_len() {
                    Some(bad) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        start = valid_end + bad;
                    }
                    None => {
                        start = valid_end;
                        break;
                    }
                }
            }
        }
    }
    pending.drain(..start);
    text
}

impl Writer for HostWriter {
    fn write(&self, b: u8) -> io::Result<()> {
        self.push(&[b])
    }

    fn write_bytes(&self, buf: &[u8], off: usize, len: usize) -> io::Result<()> {
        let range = off
            .checked_add(len)
            .filter(|end| *end <= buf.len())
            .map(|end| off..end)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("range {off}+{len} out of bounds for length {}", buf.len()),
                )
            })?;
        self.push(&buf[range])
    }

    fn flush(&self) -> io::Result<()> {
        self.target.flush()
    }
}

/// Stream capture could not be enabled. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureWarning {
    #[error("failed to enable stdout/stderr capture: managed runtime not started")]
    RuntimeNotStarted,

    #[error("failed to enable stdout/stderr capture: support class {class} unavailable ({reason})")]
    SupportMissing { class: String, reason: String },

    #[error("failed to enable stdout/stderr capture: {0}")]
    Install(String),
}

/// Rewires the runtime's console channels to host streams.
pub struct StreamBridge {
    streams: HostStreams,
}

impl StreamBridge {
    pub fn new(streams: HostStreams) -> Self {
        Self { streams }
    }

    /// Replace both console channels with UTF-8 autoflush print streams
    /// over the host streams. Requires the support writer class.
    pub fn install(&self, runtime: &ManagedRuntime) -> Result<(), CaptureWarning> {
        runtime
            .find_class(WRITER_CLASS)
            .map_err(|e| CaptureWarning::SupportMissing {
                class: WRITER_CLASS.to_string(),
                reason: e.to_string(),
            })?;

        let out = print_stream(&self.streams.out)?;
        let err = print_stream(&self.streams.err)?;
        runtime.console().set_out(out);
        runtime.console().set_err(err);
        tracing::debug!("Console output redirected to host streams");
        Ok(())
    }
}

fn print_stream(target: &Arc<dyn HostStream>) -> Result<PrintStream, CaptureWarning> {
    let writer = Arc::new(HostWriter::new(target.clone()));
    PrintStream::new(Arc::new(OutputStreamWriter::new(writer)), true, "UTF-8")
        .map_err(|e| CaptureWarning::Install(e.to_string()))
}
