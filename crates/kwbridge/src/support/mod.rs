//! The bridge's own classes inside the managed runtime.
//!
//! [`SupportLibrary`] is what the packaged support archive contains: the
//! keyword helper, the console writer adapter and the domain exceptions.
//! The lifecycle manager mounts it at the archive path it locates; until then
//! none of these classes resolve.

pub mod exceptions;
pub mod helper;
pub mod writer;

use std::sync::Arc;

use kwbridge_runtime::{ClassDef, ClassLibrary, ClassProvider};

pub use writer::{OutputStreamWriter, Writer};

pub const HELPER_CLASS: &str = "kwbridge.helper.LibraryHelper";
pub const WRITER_CLASS: &str = "kwbridge.helper.OutputStreamWriter";

/// Class annotation carrying library metadata: `scope`, `version`,
/// `docFormat` and `documentation`.
pub const LIBRARY_ANNOTATION: &str = "kwbridge.Library";

/// File name prefix of the packaged support archive.
pub const ARCHIVE_PREFIX: &str = "kwbridge-support-";
pub const ARCHIVE_EXTENSION: &str = "kar";

pub struct SupportLibrary {
    classes: ClassLibrary,
}

impl SupportLibrary {
    pub fn new() -> Self {
        Self {
            classes: ClassLibrary::new("kwbridge-support")
                .with_class(helper::helper_class())
                .with_class(writer::writer_class()),
        }
    }

    pub fn class_names(&self) -> Vec<&str> {
        self.classes.class_names()
    }
}

impl Default for SupportLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassProvider for SupportLibrary {
    fn name(&self) -> &str {
        self.classes.name()
    }

    fn find_class(&self, name: &str) -> anyhow::Result<Option<Arc<ClassDef>>> {
        self.classes.find_class(name)
    }
}
