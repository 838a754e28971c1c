use crate::error::{Result, TemplateError};
use crate::machine::DirectiveMachine;
use crate::pattern::Delimiters;
use crate::resolver::{FsResolver, Resolver};
use crate::sink::SinkSet;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Default limit on nested includes
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 64;

/// Configuration for template expansion
#[derive(Debug, Clone)]
pub struct ExpandConfig {
    /// Markers framing a directive
    pub delimiters: Delimiters,
    /// Directory relative directive paths are resolved against (`None` = working directory)
    pub base_dir: Option<PathBuf>,
    /// Reject directive paths that escape `base_dir`
    pub confine_to_base: bool,
    /// Maximum include nesting (`None` = unbounded)
    pub max_include_depth: Option<usize>,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            delimiters: Delimiters::default(),
            base_dir: None,
            confine_to_base: false,
            max_include_depth: Some(DEFAULT_MAX_INCLUDE_DEPTH),
        }
    }
}

/// Drives a [`DirectiveMachine`] over a byte stream, splicing in every
/// referenced file and expanding the directives inside it as well.
#[derive(Debug)]
pub struct Expander<R> {
    delimiters: Delimiters,
    max_include_depth: Option<usize>,
    resolver: R,
}

impl Expander<FsResolver> {
    /// Expander reading referenced files from disk
    pub fn from_config(config: &ExpandConfig) -> Self {
        let resolver = FsResolver::new(config.base_dir.clone(), config.confine_to_base);
        Self::new(config, resolver)
    }
}

impl<R: Resolver> Expander<R> {
    pub fn new(config: &ExpandConfig, resolver: R) -> Self {
        Self {
            delimiters: config.delimiters.clone(),
            max_include_depth: config.max_include_depth,
            resolver,
        }
    }

    /// Expands `source` into every sink, then flushes them
    ///
    /// `source_name` labels the source in read errors.
    ///
    /// # Errors
    ///
    /// - `TemplateError::SourceReadFailed` if reading the source fails.
    /// - `TemplateError::ReferencedPathUnresolvable` if a directive names a file
    ///   that can't be resolved, at any nesting level.
    /// - `TemplateError::IncludeDepthExceeded` if includes nest too deeply.
    /// - `TemplateError::SinkWriteFailed` if any sink fails.
    pub fn expand<S: Read>(&self, source: S, source_name: &str, sinks: &mut SinkSet) -> Result<()> {
        self.expand_source(source, source_name, sinks, 0)?;
        sinks.flush()
    }

    /// Expands an in-memory template and returns the result
    ///
    /// # Errors
    ///
    /// Same as [`Expander::expand`], minus sink failures.
    pub fn expand_to_vec(&self, template: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        {
            let mut sinks = SinkSet::new();
            sinks.push("<memory>", &mut output);
            self.expand(template, "<memory>", &mut sinks)?;
        }
        Ok(output)
    }

    fn expand_source<S: Read>(
        &self,
        source: S,
        source_name: &str,
        sinks: &mut SinkSet,
        depth: usize,
    ) -> Result<()> {
        let mut machine = DirectiveMachine::new(&self.delimiters);
        let mut emitted = Vec::new();

        for byte in BufReader::new(source).bytes() {
            let byte = byte.map_err(|source| TemplateError::SourceReadFailed {
                source_name: source_name.to_string(),
                source,
            })?;

            let ready = machine.transform(byte, &mut emitted);
            if !emitted.is_empty() {
                sinks.write_all(&emitted)?;
                emitted.clear();
            }
            if let Some(path) = ready {
                self.include(&path, sinks, depth + 1)?;
            }
        }

        machine.flush(&mut emitted);
        if !emitted.is_empty() {
            trace!(source = source_name, bytes = emitted.len(), "flushing unterminated directive");
            sinks.write_all(&emitted)?;
        }
        Ok(())
    }

    fn include(&self, path: &str, sinks: &mut SinkSet, depth: usize) -> Result<()> {
        if let Some(limit) = self.max_include_depth
            && depth > limit
        {
            return Err(TemplateError::IncludeDepthExceeded {
                path: path.to_string(),
                limit,
            });
        }

        let content =
            self.resolver
                .resolve(path)
                .map_err(|source| TemplateError::ReferencedPathUnresolvable {
                    path: path.to_string(),
                    source,
                })?;
        debug!(path, depth, bytes = content.len(), "expanding include");

        self.expand_source(content.as_slice(), path, sinks, depth)
    }
}

/// Expands an in-memory template, reading referenced files from disk
///
/// # Errors
///
/// See [`Expander::expand`].
pub fn process_template(template: &[u8], config: &ExpandConfig) -> Result<Vec<u8>> {
    Expander::from_config(config).expand_to_vec(template)
}

/// Expands the template file at `path` into `sinks`
///
/// # Errors
///
/// - `TemplateError::SourceNotFound` or `TemplateError::SourceOpenFailed` if
///   the template can't be opened.
/// - Any error of [`Expander::expand`].
pub fn process_template_file(path: &Path, config: &ExpandConfig, sinks: &mut SinkSet) -> Result<()> {
    let source = crate::fs_utils::open_source(path)?;
    Expander::from_config(config).expand(source, &path.display().to_string(), sinks)
}
