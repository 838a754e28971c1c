//! Turning directive paths into bytes.

use crate::error::ResolveError;
use crate::fs_utils::{confine_path, read_file_bytes};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Source of the content spliced in for a directive
pub trait Resolver {
    /// Returns the full content named by `path`.
    ///
    /// # Errors
    ///
    /// Returns a `ResolveError` when the path can't be found, opened or read.
    fn resolve(&self, path: &str) -> Result<Vec<u8>, ResolveError>;
}

impl<R: Resolver + ?Sized> Resolver for &R {
    fn resolve(&self, path: &str) -> Result<Vec<u8>, ResolveError> {
        (**self).resolve(path)
    }
}

/// Resolves directive paths against the filesystem
#[derive(Debug, Clone, Default)]
pub struct FsResolver {
    base_dir: Option<PathBuf>,
    confine_to_base: bool,
}

impl FsResolver {
    /// Relative paths are joined onto `base_dir`, or used as written when it is `None`.
    pub fn new(base_dir: Option<PathBuf>, confine_to_base: bool) -> Self {
        Self {
            base_dir,
            confine_to_base,
        }
    }

    /// Maps a directive path to the file that would be read for it
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::OutsideBaseDir` when confinement is on and the
    /// path escapes the base directory.
    pub fn locate(&self, path: &str) -> Result<PathBuf, ResolveError> {
        let located = match &self.base_dir {
            Some(base) => base.join(path),
            None => PathBuf::from(path),
        };

        if !self.confine_to_base {
            return Ok(located);
        }
        let base = self.base_dir.as_deref().unwrap_or_else(|| Path::new("."));
        confine_path(&located, base)
    }
}

impl Resolver for FsResolver {
    fn resolve(&self, path: &str) -> Result<Vec<u8>, ResolveError> {
        read_file_bytes(&self.locate(path)?)
    }
}

/// In-memory resolver keyed by the exact directive path
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `content` under `path`, replacing any previous entry.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> &mut Self {
        self.files.insert(path.into(), content.into());
        self
    }
}

impl Resolver for MemoryResolver {
    fn resolve(&self, path: &str) -> Result<Vec<u8>, ResolveError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound {
                path: PathBuf::from(path),
            })
    }
}
