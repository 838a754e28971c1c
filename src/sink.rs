//! Writing one byte stream to several destinations in step.

use crate::error::{Result, TemplateError};
use std::io::{self, BufWriter, Write};

/// Display name used for the standard output sink
pub const STDOUT_NAME: &str = "<stdout>";

struct Sink<'a> {
    name: String,
    writer: BufWriter<Box<dyn Write + 'a>>,
}

/// Ordered set of buffered output destinations
///
/// Every write reaches each sink in insertion order; the first failure stops
/// the write and is returned. Sinks are closed when the set is dropped.
#[derive(Default)]
pub struct SinkSet<'a> {
    sinks: Vec<Sink<'a>>,
}

impl<'a> SinkSet<'a> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Appends a destination. `name` identifies it in error messages.
    pub fn push<W: Write + 'a>(&mut self, name: impl Into<String>, writer: W) {
        self.sinks.push(Sink {
            name: name.into(),
            writer: BufWriter::new(Box::new(writer)),
        });
    }

    pub fn push_stdout(&mut self) {
        self.push(STDOUT_NAME, io::stdout());
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Names of the sinks in write order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sinks.iter().map(|sink| sink.name.as_str())
    }

    /// Writes `bytes` to every sink
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::SinkWriteFailed` for the first sink that fails.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        for sink in &mut self.sinks {
            sink.writer
                .write_all(bytes)
                .map_err(|source| TemplateError::SinkWriteFailed {
                    sink: sink.name.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Pushes buffered bytes down to every destination
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::SinkWriteFailed` for the first sink that fails.
    pub fn flush(&mut self) -> Result<()> {
        for sink in &mut self.sinks {
            sink.writer
                .flush()
                .map_err(|source| TemplateError::SinkWriteFailed {
                    sink: sink.name.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Flushes and closes every sink
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::SinkWriteFailed` for the first sink that fails to flush.
    pub fn finish(mut self) -> Result<()> {
        self.flush()
    }
}

impl std::fmt::Debug for SinkSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    #[test]
    fn test_fan_out_identical_bytes() {
        let mut first = Vec::new();
        let mut second = Vec::new();
        {
            let mut sinks = SinkSet::new();
            sinks.push("first", &mut first);
            sinks.push("second", &mut second);
            assert_eq!(sinks.len(), 2);

            sinks.write_all(b"hello ").unwrap();
            sinks.write_all(b"world").unwrap();
            sinks.finish().unwrap();
        }
        assert_eq!(first, b"hello world");
        assert_eq!(first, second);
    }

    #[test]
    fn test_names_in_order() {
        let mut sinks = SinkSet::new();
        sinks.push("out.txt", Vec::new());
        sinks.push(STDOUT_NAME, Vec::new());
        assert_eq!(sinks.names().collect::<Vec<_>>(), ["out.txt", "<stdout>"]);
        assert_eq!(format!("{sinks:?}"), r#"["out.txt", "<stdout>"]"#);
    }

    #[test]
    fn test_failure_names_sink() {
        let mut good = Vec::new();
        let mut sinks = SinkSet::new();
        sinks.push("good", &mut good);
        sinks.push("broken", FailingWriter);

        // Small writes stay in the buffer until flushed
        sinks.write_all(b"abc").unwrap();
        let err = sinks.flush().unwrap_err();
        match err {
            TemplateError::SinkWriteFailed { sink, .. } => assert_eq!(sink, "broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_large_write_failure_short_circuits() {
        let mut sinks = SinkSet::new();
        sinks.push("broken", FailingWriter);
        sinks.push("never", Vec::new());

        let big = vec![b'x'; 64 * 1024];
        let err = sinks.write_all(&big).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::SinkWriteFailed { ref sink, .. } if sink == "broken"
        ));
    }

    #[test]
    fn test_empty_set() {
        let mut sinks = SinkSet::default();
        assert!(sinks.is_empty());
        sinks.write_all(b"dropped").unwrap();
        sinks.finish().unwrap();
    }
}
