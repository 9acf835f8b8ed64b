//! Template sources.
//!
//! The expander never touches the filesystem directly: it reads templates
//! and variable files through a [`TemplateStore`], which also creates blank
//! stubs for missing per-parameter templates.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Read access to templates by name, plus stub creation.
pub trait TemplateStore {
    /// Read the named file. A missing file is an `io::ErrorKind::NotFound`
    /// error; an existing empty file is `Ok("")`.
    fn read(&self, name: &str) -> io::Result<String>;

    /// Create an empty file under `name` unless one already exists.
    fn create_stub(&self, name: &str) -> io::Result<()>;

    /// How `name` is shown in diagnostics.
    fn display_name(&self, name: &str) -> String {
        name.to_string()
    }
}

/// Templates in a directory tree.
#[derive(Debug, Clone)]
pub struct FsTemplateStore {
    root: PathBuf,
}

impl FsTemplateStore {
    /// Store rooted at `root`; template names are paths relative to it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The search root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of a template.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl TemplateStore for FsTemplateStore {
    fn read(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.path_of(name))
    }

    fn create_stub(&self, name: &str) -> io::Result<()> {
        let path = self.path_of(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn display_name(&self, name: &str) -> String {
        self.path_of(name).display().to_string()
    }
}

/// In-memory templates.
///
/// Stubs created during expansion become empty entries, so a second run
/// sees them as existing but empty.
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    files: RefCell<BTreeMap<String, String>>,
}

impl MemoryTemplateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file (builder pattern).
    pub fn with(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    /// Add or replace a file.
    pub fn insert(&self, name: impl Into<String>, text: impl Into<String>) {
        self.files.borrow_mut().insert(name.into(), text.into());
    }

    /// Contents of a file.
    pub fn get(&self, name: &str) -> Option<String> {
        self.files.borrow().get(name).cloned()
    }

    /// `true` when the file exists.
    pub fn contains(&self, name: &str) -> bool {
        self.files.borrow().contains_key(name)
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn read(&self, name: &str) -> io::Result<String> {
        self.get(name).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no template named {name}"))
        })
    }

    fn create_stub(&self, name: &str) -> io::Result<()> {
        self.files
            .borrow_mut()
            .entry(name.to_string())
            .or_default();
        Ok(())
    }
}
