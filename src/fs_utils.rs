use crate::error::{ResolveError, Result, TemplateError};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::info;

/// Reads the full contents of a referenced file
///
/// # Errors
///
/// - `ResolveError::NotFound` if the path doesn't exist.
/// - `ResolveError::OpenFailed` if the path is a directory, its metadata can't
///   be read (e.g. a symlink loop), or it can't be opened.
/// - `ResolveError::ReadFailed` if reading the opened file fails.
pub fn read_file_bytes(path: &Path) -> std::result::Result<Vec<u8>, ResolveError> {
    let metadata = fs::metadata(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ResolveError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ResolveError::OpenFailed {
            path: path.to_path_buf(),
            source,
        },
    })?;

    if metadata.is_dir() {
        return Err(ResolveError::OpenFailed {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::IsADirectory, "is a directory"),
        });
    }

    let mut file = File::open(path).map_err(|source| ResolveError::OpenFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let mut contents = Vec::new();
    file.read_to_end(&mut contents)
        .map_err(|source| ResolveError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(contents)
}

/// Ensures `path` stays inside `base_dir` once `..` and symlinks are resolved
///
/// A path that doesn't exist yet is checked through its parent directory.
///
/// # Errors
///
/// - `ResolveError::OutsideBaseDir` if the resolved path escapes the base directory.
/// - `ResolveError::NotFound` if neither the path nor its parent can be canonicalized.
pub fn confine_path(path: &Path, base_dir: &Path) -> std::result::Result<PathBuf, ResolveError> {
    let not_found = || ResolveError::NotFound {
        path: path.to_path_buf(),
    };

    let canonical = path
        .canonicalize()
        .or_else(|_| match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => parent.canonicalize().map(|p| p.join(name)),
            _ => Err(io::Error::from(io::ErrorKind::NotFound)),
        })
        .map_err(|_| not_found())?;

    let base_canonical = base_dir.canonicalize().map_err(|_| ResolveError::NotFound {
        path: base_dir.to_path_buf(),
    })?;
    if !canonical.starts_with(&base_canonical) {
        return Err(ResolveError::OutsideBaseDir { path: canonical });
    }

    Ok(canonical)
}

/// Whether `path` names standard input (`-`)
pub fn is_stdin(path: &Path) -> bool {
    path == Path::new("-")
}

/// Opens the input template
///
/// # Errors
///
/// - `TemplateError::SourceNotFound` if the path doesn't exist.
/// - `TemplateError::SourceOpenFailed` if it exists but can't be opened.
pub fn open_source(path: &Path) -> Result<File> {
    if let Err(source) = fs::metadata(path) {
        return Err(match source.kind() {
            io::ErrorKind::NotFound => TemplateError::SourceNotFound {
                path: path.to_path_buf(),
            },
            _ => TemplateError::SourceOpenFailed {
                path: path.to_path_buf(),
                source,
            },
        });
    }

    File::open(path).map_err(|source| TemplateError::SourceOpenFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads an entire template, from a file or from stdin for `-`
///
/// # Errors
///
/// Returns the errors of [`open_source`], or `TemplateError::SourceReadFailed`.
pub fn read_source(path: &Path) -> Result<Vec<u8>> {
    let mut contents = Vec::new();
    let read = if is_stdin(path) {
        io::stdin().lock().read_to_end(&mut contents)
    } else {
        open_source(path)?.read_to_end(&mut contents)
    };
    read.map_err(|source| TemplateError::SourceReadFailed {
        source_name: path.display().to_string(),
        source,
    })?;
    Ok(contents)
}

/// Whether `a` and `b` name the same existing file
///
/// Hard links and symlinks to one file compare equal on Unix. Paths that
/// can't be inspected (missing, `-`, ...) never match.
pub fn same_file(a: &Path, b: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if let (Ok(a), Ok(b)) = (fs::metadata(a), fs::metadata(b)) {
            return a.dev() == b.dev() && a.ino() == b.ino();
        }
        false
    }
    #[cfg(not(unix))]
    {
        match (a.canonicalize(), b.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

/// Creates (or truncates) an output file
///
/// # Errors
///
/// Returns `TemplateError::SinkCreateFailed` if the file can't be created.
pub fn create_output(path: &Path) -> Result<File> {
    File::create(path).map_err(|source| TemplateError::SinkCreateFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Output that replaces its target file only once everything was written
///
/// Output goes to a temporary file next to the target. [`InPlaceOutput::persist`]
/// renames it over the target; dropping it without persisting removes the
/// temporary and leaves the target untouched.
#[derive(Debug)]
pub struct InPlaceOutput {
    target: PathBuf,
    temp: TempPath,
}

impl InPlaceOutput {
    /// Creates the temporary file and returns its writable handle
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::SinkCreateFailed` if the temporary file can't be created.
    pub fn create(target: &Path) -> Result<(File, Self)> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let (file, temp) = tempfile::Builder::new()
            .prefix(".config-template")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|source| TemplateError::SinkCreateFailed {
                path: dir.to_path_buf(),
                source,
            })?
            .into_parts();

        Ok((
            file,
            Self {
                target: target.to_path_buf(),
                temp,
            },
        ))
    }

    /// Path of the file that will be replaced
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Moves the temporary file over the target
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::PersistFailed` if the rename fails.
    pub fn persist(self) -> Result<()> {
        let permissions = fs::metadata(&self.target).map(|m| m.permissions()).ok();
        if let Some(permissions) = permissions {
            fs::set_permissions(&self.temp, permissions)?;
        }

        self.temp
            .persist(&self.target)
            .map_err(|e| TemplateError::PersistFailed {
                path: self.target.clone(),
                source: e.error,
            })?;
        info!(path = %self.target.display(), "replaced input with expanded output");
        Ok(())
    }
}
