use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::class::ClassDef;

/// Source of class definitions mounted at a class path entry.
///
/// This is the in-process counterpart of an archive or a classes directory:
/// classes become resolvable once their entry is on the search path.
pub trait ClassProvider: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Look up a class by fully qualified name.
    fn find_class(&self, name: &str) -> anyhow::Result<Option<Arc<ClassDef>>>;
}

/// A fixed set of classes, the simplest [`ClassProvider`].
pub struct ClassLibrary {
    name: String,
    classes: Vec<Arc<ClassDef>>,
}

impl ClassLibrary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classes: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: Arc<ClassDef>) -> Self {
        self.classes.push(class);
        self
    }

    pub fn class_names(&self) -> Vec<&str> {
        self.classes.iter().map(|c| c.name()).collect()
    }
}

impl ClassProvider for ClassLibrary {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_class(&self, name: &str) -> anyhow::Result<Option<Arc<ClassDef>>> {
        Ok(self.classes.iter().find(|c| c.name() == name).cloned())
    }
}

/// One search path entry.
#[derive(Clone)]
pub struct ClassPathEntry {
    path: PathBuf,
    provider: Option<Arc<dyn ClassProvider>>,
}

impl ClassPathEntry {
    /// A plain path with nothing mounted on it.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            provider: None,
        }
    }

    /// A path whose classes come from `provider`.
    pub fn library(path: impl Into<PathBuf>, provider: Arc<dyn ClassProvider>) -> Self {
        Self {
            path: path.into(),
            provider: Some(provider),
        }
    }

    pub fn as_path(&self) -> &Path {
        &self.path
    }

    pub fn provider(&self) -> Option<&Arc<dyn ClassProvider>> {
        self.provider.as_ref()
    }
}

impl fmt::Debug for ClassPathEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassPathEntry")
            .field("path", &self.path)
            .field("provider", &self.provider.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}

impl From<PathBuf> for ClassPathEntry {
    fn from(path: PathBuf) -> Self {
        Self::path(path)
    }
}

impl From<&Path> for ClassPathEntry {
    fn from(path: &Path) -> Self {
        Self::path(path)
    }
}

impl From<&str> for ClassPathEntry {
    fn from(path: &str) -> Self {
        Self::path(path)
    }
}

/// Ordered class search path.
#[derive(Debug, Default)]
pub struct ClassPath {
    entries: Vec<ClassPathEntry>,
}

impl ClassPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Returns false if the path is already present.
    pub fn add(&mut self, entry: ClassPathEntry) -> bool {
        if self.entries.iter().any(|e| e.path == entry.path) {
            tracing::debug!(path = %entry.path.display(), "Class path entry already present");
            return false;
        }
        tracing::debug!(path = %entry.path.display(), "Class path entry added");
        self.entries.push(entry);
        true
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.iter().map(|e| e.path.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Search mounted providers in path order.
    pub fn find_class(&self, name: &str) -> anyhow::Result<Option<Arc<ClassDef>>> {
        for entry in &self.entries {
            let Some(provider) = &entry.provider else {
                continue;
            };
            if let Some(class) = provider.find_class(name)? {
                tracing::debug!(class = name, provider = provider.name(), "Class resolved");
                return Ok(Some(class));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library(name: &str, classes: &[&str]) -> Arc<dyn ClassProvider> {
        let mut lib = ClassLibrary::new(name);
        for class in classes {
            lib = lib.with_class(ClassDef::builder(*class).doc(name).build());
        }
        Arc::new(lib)
    }

    #[test]
    fn duplicate_paths_are_ignored() {
        let mut cp = ClassPath::new();
        assert!(cp.add("lib/a.kar".into()));
        assert!(!cp.add("lib/a.kar".into()));
        assert!(cp.add("lib/b.kar".into()));
        assert_eq!(cp.paths(), vec![PathBuf::from("lib/a.kar"), PathBuf::from("lib/b.kar")]);
    }

    #[test]
    fn resolution_follows_path_order() {
        let mut cp = ClassPath::new();
        cp.add(ClassPathEntry::path("plain"));
        cp.add(ClassPathEntry::library("first", library("first", &["a.Shared", "a.One"])));
        cp.add(ClassPathEntry::library("second", library("second", &["a.Shared", "a.Two"])));

        let shared = cp.find_class("a.Shared").unwrap().unwrap();
        assert_eq!(shared.documentation(), Some("first"));
        let two = cp.find_class("a.Two").unwrap().unwrap();
        assert_eq!(two.documentation(), Some("second"));
        assert!(cp.find_class("a.Missing").unwrap().is_none());
    }
}
