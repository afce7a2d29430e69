use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::error::RuntimeError;

/// Byte sink behind a console channel.
pub trait OutputStream: Send + Sync {
    fn write(&self, b: u8) -> io::Result<()>;

    /// Write `buf[off..off + len]`.
    fn write_bytes(&self, buf: &[u8], off: usize, len: usize) -> io::Result<()> {
        let end = off
            .checked_add(len)
            .filter(|end| *end <= buf.len())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("range {off}+{len} out of bounds for length {}", buf.len()),
                )
            })?;
        for b in &buf[off..end] {
            self.write(*b)?;
        }
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Which process stream a [`NativeStream`] writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeTarget {
    Stdout,
    Stderr,
}

/// The process's own stdout/stderr, used before anyone rewires the console.
#[derive(Debug, Clone, Copy)]
pub struct NativeStream {
    target: NativeTarget,
}

impl NativeStream {
    pub fn new(target: NativeTarget) -> Self {
        Self { target }
    }
}

impl OutputStream for NativeStream {
    fn write(&self, b: u8) -> io::Result<()> {
        self.write_bytes(&[b], 0, 1)
    }

    fn write_bytes(&self, buf: &[u8], off: usize, len: usize) -> io::Result<()> {
        let chunk = buf.get(off..off.saturating_add(len)).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "byte range out of bounds")
        })?;
        match self.target {
            NativeTarget::Stdout => io::stdout().lock().write_all(chunk),
            NativeTarget::Stderr => io::stderr().lock().write_all(chunk),
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self.target {
            NativeTarget::Stdout => io::stdout().flush(),
            NativeTarget::Stderr => io::stderr().flush(),
        }
    }
}

/// Text printing on top of an [`OutputStream`].
///
/// Printing never fails: I/O errors set a sticky flag readable through
/// [`PrintStream::check_error`].
pub struct PrintStream {
    out: Arc<dyn OutputStream>,
    autoflush: bool,
    error: AtomicBool,
}

impl PrintStream {
    /// Create a print stream encoding text as `encoding`.
    ///
    /// Only UTF-8 is supported.
    pub fn new(
        out: Arc<dyn OutputStream>,
        autoflush: bool,
        encoding: &str,
    ) -> Result<Self, RuntimeError> {
        let normalized = encoding.to_ascii_uppercase().replace('_', "-");
        if normalized != "UTF-8" && normalized != "UTF8" {
            return Err(RuntimeError::UnsupportedEncoding(encoding.to_string()));
        }
        Ok(Self {
            out,
            autoflush,
            error: AtomicBool::new(false),
        })
    }

    pub(crate) fn native(target: NativeTarget) -> Self {
        Self {
            out: Arc::new(NativeStream::new(target)),
            autoflush: true,
            error: AtomicBool::new(false),
        }
    }

    pub fn print(&self, s: &str) {
        let bytes = s.as_bytes();
        let result = self.out.write_bytes(bytes, 0, bytes.len());
        self.record(result);
        if self.autoflush && s.contains('\n') {
            self.flush();
        }
    }

    pub fn println(&self, s: &str) {
        let mut line = String::with_capacity(s.len() + 1);
        line.push_str(s);
        line.push('\n');
        self.print(&line);
    }

    pub fn write(&self, b: u8) {
        let result = self.out.write(b);
        self.record(result);
        if self.autoflush && b == b'\n' {
            self.flush();
        }
    }

    pub fn write_bytes(&self, buf: &[u8], off: usize, len: usize) {
        let result = self.out.write_bytes(buf, off, len);
        self.record(result);
        if self.autoflush {
            self.flush();
        }
    }

    pub fn flush(&self) {
        let result = self.out.flush();
        self.record(result);
    }

    /// True once any write or flush has failed.
    pub fn check_error(&self) -> bool {
        self.error.load(Ordering::Relaxed)
    }

    fn record(&self, result: io::Result<()>) {
        if let Err(e) = result {
            tracing::debug!(error = %e, "console write failed");
            self.error.store(true, Ordering::Relaxed);
        }
    }
}

/// The runtime's two console channels.
pub struct Console {
    out: RwLock<Arc<PrintStream>>,
    err: RwLock<Arc<PrintStream>>,
}

impl Console {
    pub(crate) fn native() -> Self {
        Self {
            out: RwLock::new(Arc::new(PrintStream::native(NativeTarget::Stdout))),
            err: RwLock::new(Arc::new(PrintStream::native(NativeTarget::Stderr))),
        }
    }

    pub fn out(&self) -> Arc<PrintStream> {
        self.out.read().clone()
    }

    pub fn err(&self) -> Arc<PrintStream> {
        self.err.read().clone()
    }

    pub fn set_out(&self, stream: PrintStream) {
        *self.out.write() = Arc::new(stream);
    }

    pub fn set_err(&self, stream: PrintStream) {
        *self.err.write() = Arc::new(stream);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        bytes: Mutex<Vec<u8>>,
        flushes: Mutex<usize>,
    }

    impl OutputStream for Recorder {
        fn write(&self, b: u8) -> io::Result<()> {
            self.bytes.lock().push(b);
            Ok(())
        }

        fn flush(&self) -> io::Result<()> {
            *self.flushes.lock() += 1;
            Ok(())
        }
    }

    struct Broken;

    impl OutputStream for Broken {
        fn write(&self, _b: u8) -> io::Result<()> {
            Err(io::Error::other("closed"))
        }
    }

    #[test]
    fn println_encodes_utf8_and_flushes() {
        let recorder = Arc::new(Recorder::default());
        let stream = PrintStream::new(recorder.clone(), true, "UTF-8").unwrap();

        stream.println("grüß 😂");

        assert_eq!(
            String::from_utf8(recorder.bytes.lock().clone()).unwrap(),
            "grüß 😂\n"
        );
        assert_eq!(*recorder.flushes.lock(), 1);
        assert!(!stream.check_error());
    }

    #[test]
    fn default_write_bytes_honours_sub_range() {
        let recorder = Recorder::default();
        recorder.write_bytes(b"abcdef", 2, 3).unwrap();
        assert_eq!(recorder.bytes.lock().as_slice(), b"cde");

        let err = recorder.write_bytes(b"abc", 2, 5).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn unsupported_encoding_is_rejected() {
        let result = PrintStream::new(Arc::new(Recorder::default()), true, "ISO-8859-1");
        assert!(matches!(result, Err(RuntimeError::UnsupportedEncoding(_))));
        assert!(PrintStream::new(Arc::new(Recorder::default()), true, "utf_8").is_ok());
    }

    #[test]
    fn failures_set_sticky_error_flag() {
        let stream = PrintStream::new(Arc::new(Broken), false, "UTF-8").unwrap();
        stream.print("lost");
        assert!(stream.check_error());
    }

    #[test]
    fn console_channels_are_replaceable() {
        let console = Console::native();
        let recorder = Arc::new(Recorder::default());
        console.set_err(PrintStream::new(recorder.clone(), true, "UTF-8").unwrap());

        console.err().print("oops");
        assert_eq!(recorder.bytes.lock().as_slice(), b"oops");
    }
}
