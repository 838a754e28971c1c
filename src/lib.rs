//! # config-template
//!
//! A streaming include preprocessor. Wherever a template contains a directive
//! such as `{{file "parts/db.yaml"}}`, the named file's bytes are spliced into
//! the output in its place. Included files are expanded the same way, and
//! everything else passes through byte for byte.
//!
//! ## Features
//!
//! - Single pass, one byte at a time, no regex and no line buffering
//! - Nested includes, bounded by a configurable depth limit
//! - Custom delimiter pairs (`%file "x"%`, `<<file "x">>`, ...)
//! - Fan-out to any number of outputs, including stdout
//! - Overwrite a template in place through a temporary file
//!
//! ## Usage
//!
//! ### As a Library
//!
//! ```no_run
//! use config_template::{process_template, ExpandConfig};
//!
//! let template = b"# app\n{{file \"parts/db.yaml\"}}\n";
//! let config = ExpandConfig::default();
//!
//! match process_template(template, &config) {
//!     Ok(output) => print!("{}", String::from_utf8_lossy(&output)),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```
//!
//! ### As a CLI Tool
//!
//! ```bash
//! # Expand a template into a file
//! config-template app.tmpl.yaml app.yaml
//!
//! # Expand into two files and echo to the screen
//! config-template app.tmpl.yaml a.yaml b.yaml --print
//!
//! # Expand a template in place
//! config-template app.yaml --overwrite
//! ```

pub mod error;
pub mod expand;
pub mod fs_utils;
pub mod machine;
pub mod pattern;
pub mod resolver;
pub mod scan;
pub mod sink;

// Re-export main types and functions for convenience
pub use error::{ResolveError, Result, TemplateError};
pub use expand::{
    DEFAULT_MAX_INCLUDE_DEPTH, ExpandConfig, Expander, process_template, process_template_file,
};
pub use machine::DirectiveMachine;
pub use pattern::{Delimiters, is_path_byte};
pub use resolver::{FsResolver, MemoryResolver, Resolver};
pub use scan::{Directive, find_directives};
pub use sink::SinkSet;
