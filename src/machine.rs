//! Byte-at-a-time recognizer for include directives.
//!
//! [`DirectiveMachine`] consumes one byte per call. Literal bytes are
//! appended to a caller supplied buffer; when a directive closes, the path it
//! named is handed back so the caller can splice in the referenced content.
//! A failed partial match replays exactly the bytes it swallowed, so input
//! bytes are never lost or duplicated. There is no backtracking: a byte that
//! breaks a match may only restart the begin marker from its first byte.

use crate::pattern::{Delimiters, is_path_byte};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum State {
    /// Pass-through, nothing buffered
    #[default]
    Idle,
    /// A proper prefix of the begin marker has matched
    Begin(usize),
    /// Begin marker complete, collecting path bytes
    Path(String),
    /// Non-empty path complete, a proper prefix of the end marker has matched
    End { path: String, matched: usize },
}

/// Streaming directive recognizer bound to one delimiter pair.
///
/// One instance serves one input stream. Nested includes get their own
/// instance sharing the same [`Delimiters`].
#[derive(Debug)]
pub struct DirectiveMachine<'a> {
    delimiters: &'a Delimiters,
    state: State,
}

impl<'a> DirectiveMachine<'a> {
    pub fn new(delimiters: &'a Delimiters) -> Self {
        Self {
            delimiters,
            state: State::Idle,
        }
    }

    /// Feeds one byte.
    ///
    /// Bytes that are known to be literal text are appended to `out`. When
    /// `byte` completes a directive the machine returns to idle and the
    /// directive's path is returned; nothing is appended in that case.
    pub fn transform(&mut self, byte: u8, out: &mut Vec<u8>) -> Option<String> {
        let delimiters = self.delimiters;
        let begin = delimiters.begin();
        let end = delimiters.end();

        match self.state {
            State::Idle if byte == begin[0] => {
                self.state = begin_progress(1, begin.len());
                return None;
            }
            State::Begin(matched) if byte == begin[matched] => {
                self.state = begin_progress(matched + 1, begin.len());
                return None;
            }
            State::Path(ref mut path) if is_path_byte(byte) => {
                path.push(char::from(byte));
                return None;
            }
            State::Path(ref mut path) if !path.is_empty() && byte == end[0] => {
                let path = std::mem::take(path);
                return self.end_progress(path, 1);
            }
            State::End {
                ref mut path,
                matched,
            } if byte == end[matched] => {
                let path = std::mem::take(path);
                return self.end_progress(path, matched + 1);
            }
            _ => {}
        }

        let stale = std::mem::take(&mut self.state);
        replay(&stale, delimiters, out);
        if byte == begin[0] {
            self.state = begin_progress(1, begin.len());
        } else {
            out.push(byte);
        }
        None
    }

    /// Drains any partially matched bytes into `out` verbatim and resets.
    ///
    /// An unterminated directive at end of input is literal text, not an error.
    pub fn flush(&mut self, out: &mut Vec<u8>) {
        let stale = std::mem::take(&mut self.state);
        replay(&stale, self.delimiters, out);
    }

    /// True when no bytes are being held back.
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    fn end_progress(&mut self, path: String, matched: usize) -> Option<String> {
        if matched == self.delimiters.end().len() {
            self.state = State::Idle;
            Some(path)
        } else {
            self.state = State::End { path, matched };
            None
        }
    }
}

fn begin_progress(matched: usize, begin_len: usize) -> State {
    if matched == begin_len {
        State::Path(String::new())
    } else {
        State::Begin(matched)
    }
}

/// Writes back the literal bytes a state has consumed so far.
fn replay(state: &State, delimiters: &Delimiters, out: &mut Vec<u8>) {
    match state {
        State::Idle => {}
        State::Begin(matched) => out.extend_from_slice(&delimiters.begin()[..*matched]),
        State::Path(path) => {
            out.extend_from_slice(delimiters.begin());
            out.extend_from_slice(path.as_bytes());
        }
        State::End { path, matched } => {
            out.extend_from_slice(delimiters.begin());
            out.extend_from_slice(path.as_bytes());
            out.extend_from_slice(&delimiters.end()[..*matched]);
        }
    }
}
