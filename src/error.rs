use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn a directive path into bytes
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The referenced path does not exist
    #[error("'{path}' doesn't exist")]
    NotFound { path: PathBuf },

    /// The referenced path exists but could not be opened
    #[error("cannot open '{path}': {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The referenced file was opened but reading it failed
    #[error("cannot read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The referenced path escapes the configured base directory
    #[error("'{path}' is outside the base directory")]
    OutsideBaseDir { path: PathBuf },
}

/// Main error type for config-template operations
#[derive(Error, Debug)]
pub enum TemplateError {
    /// The input template does not exist
    #[error("input '{path}' doesn't exist")]
    SourceNotFound { path: PathBuf },

    /// The input template exists but could not be opened
    #[error("cannot open input file '{path}': {source}")]
    SourceOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading from a source failed mid-stream
    #[error("cannot read '{source_name}': {source}")]
    SourceReadFailed {
        source_name: String,
        #[source]
        source: io::Error,
    },

    /// An output file could not be created
    #[error("cannot create output file '{path}': {source}")]
    SinkCreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing or flushing an output failed
    #[error("cannot write '{sink}': {source}")]
    SinkWriteFailed {
        sink: String,
        #[source]
        source: io::Error,
    },

    /// A directive named a file that could not be resolved
    #[error("referenced path '{path}' is unresolvable: {source}")]
    ReferencedPathUnresolvable {
        path: String,
        #[source]
        source: ResolveError,
    },

    /// Nested includes went deeper than the configured limit
    #[error("include depth limit of {limit} exceeded while expanding '{path}'")]
    IncludeDepthExceeded { path: String, limit: usize },

    /// The expanded temporary file could not replace the input
    #[error("cannot replace '{path}' with expanded output: {source}")]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Overwrite in place was requested for standard input
    #[error("cannot overwrite input in place when reading from stdin")]
    StdinOverwrite,

    /// A dry run found directives naming files that can't be read
    #[error("{count} of {total} directives reference missing or unreadable files")]
    UnresolvedDirectives { count: usize, total: usize },

    /// IO error outside of the source/sink pipeline
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TemplateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TemplateError::SourceNotFound {
            path: PathBuf::from("/test/template.txt"),
        };
        assert_eq!(format!("{err}"), "input '/test/template.txt' doesn't exist");

        let err = TemplateError::ReferencedPathUnresolvable {
            path: "/no/such/file".to_string(),
            source: ResolveError::NotFound {
                path: PathBuf::from("/no/such/file"),
            },
        };
        assert_eq!(
            format!("{err}"),
            "referenced path '/no/such/file' is unresolvable: '/no/such/file' doesn't exist"
        );

        let err = TemplateError::SinkWriteFailed {
            sink: "<stdout>".to_string(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"),
        };
        assert_eq!(format!("{err}"), "cannot write '<stdout>': pipe closed");

        let err = TemplateError::IncludeDepthExceeded {
            path: "loop.txt".to_string(),
            limit: 64,
        };
        assert!(format!("{err}").contains("64"));
        assert!(format!("{err}").contains("loop.txt"));
    }

    #[test]
    fn test_unresolved_directives_display() {
        let err = TemplateError::UnresolvedDirectives { count: 2, total: 5 };
        assert_eq!(
            format!("{err}"),
            "2 of 5 directives reference missing or unreadable files"
        );
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error as _;

        let err = TemplateError::ReferencedPathUnresolvable {
            path: "a.txt".to_string(),
            source: ResolveError::ReadFailed {
                path: PathBuf::from("a.txt"),
                source: io::Error::other("disk on fire"),
            },
        };
        let resolve = err.source().unwrap();
        assert!(resolve.to_string().starts_with("cannot read 'a.txt'"));
        assert_eq!(resolve.source().unwrap().to_string(), "disk on fire");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "test");
        let err: TemplateError = io_err.into();
        assert!(matches!(err, TemplateError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: TemplateError = json_err.into();
        assert!(matches!(err, TemplateError::Json(_)));
    }
}
