use std::io;
use std::sync::Arc;

use kwbridge_runtime::{ClassDef, OutputStream};

use super::WRITER_CLASS;

/// Host-side byte sink a console channel forwards to.
pub trait Writer: Send + Sync {
    fn write(&self, b: u8) -> io::Result<()>;

    /// Write exactly `buf[off..off + len]`.
    fn write_bytes(&self, buf: &[u8], off: usize, len: usize) -> io::Result<()>;

    fn flush(&self) -> io::Result<()>;
}

/// Console stream adapter: every byte, byte range and flush goes to a
/// [`Writer`].
pub struct OutputStreamWriter {
    writer: Arc<dyn Writer>,
}

impl OutputStreamWriter {
    pub fn new(writer: Arc<dyn Writer>) -> Self {
        Self { writer }
    }
}

impl OutputStream for OutputStreamWriter {
    fn write(&self, b: u8) -> io::Result<()> {
        self.writer.write(b)
    }

    fn write_bytes(&self, buf: &[u8], off: usize, len: usize) -> io::Result<()> {
        self.writer.write_bytes(buf, off, len)
    }

    fn flush(&self) -> io::Result<()> {
        self.writer.flush()
    }
}

pub(crate) fn writer_class() -> Arc<ClassDef> {
    ClassDef::builder(WRITER_CLASS)
        .doc("Console output stream forwarding bytes and flushes to a host writer.")
        .build()
}
