//! Directive delimiters and the path character set.
//!
//! A directive has the shape `<open>file "<path>"<close>`. The machine only
//! ever sees the two fixed halves around the path: the begin marker
//! (`<open>file "`) and the end marker (`"<close>`).

/// Default opening delimiter
pub const DEFAULT_OPEN: &str = "{{";
/// Default closing delimiter
pub const DEFAULT_CLOSE: &str = "}}";

/// The begin/end markers framing a directive's path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    begin: String,
    end: String,
}

impl Delimiters {
    /// Builds the markers for `<open>file "` ... `"<close>`.
    pub fn new(open: &str, close: &str) -> Self {
        Self {
            begin: format!("{open}file \""),
            end: format!("\"{close}"),
        }
    }

    /// Builds the markers from a user supplied `[open, close]` pair.
    ///
    /// Anything other than exactly two parts falls back to the default pair.
    pub fn from_pair<S: AsRef<str>>(pair: &[S]) -> Self {
        match pair {
            [open, close] => Self::new(open.as_ref(), close.as_ref()),
            _ => Self::default(),
        }
    }

    /// Full begin marker, e.g. `{{file "`
    pub fn begin(&self) -> &[u8] {
        self.begin.as_bytes()
    }

    /// Full end marker, e.g. `"}}`
    pub fn end(&self) -> &[u8] {
        self.end.as_bytes()
    }

    /// Length in bytes of a complete directive naming `path`.
    pub fn directive_len(&self, path: &str) -> usize {
        self.begin.len() + path.len() + self.end.len()
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new(DEFAULT_OPEN, DEFAULT_CLOSE)
    }
}

/// Whether `byte` may appear inside a directive's path.
///
/// Allowed: ASCII letters and digits plus `_ . - / \ space < > | : ( ) & ;`.
pub const fn is_path_byte(byte: u8) -> bool {
    matches!(
        byte,
        b'a'..=b'z'
            | b'A'..=b'Z'
            | b'0'..=b'9'
            | b'_'
            | b'.'
            | b'-'
            | b'/'
            | b'\\'
            | b' '
            | b'<'
            | b'>'
            | b'|'
            | b':'
            | b'('
            | b')'
            | b'&'
            | b';'
    )
}
