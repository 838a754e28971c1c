use crate::machine::DirectiveMachine;
use crate::pattern::Delimiters;

/// A directive recognized in a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// The path between the quotes
    pub path: String,
    /// Byte offset of the first byte of the begin marker
    pub start: usize,
    /// Byte offset just past the end marker
    pub end: usize,
}

/// Finds the top-level directives in `template` without resolving them
///
/// Recognition is identical to expansion, so every returned directive is one
/// that expansion would replace.
pub fn find_directives(template: &[u8], delimiters: &Delimiters) -> Vec<Directive> {
    let mut machine = DirectiveMachine::new(delimiters);
    let mut literal = Vec::new();
    let mut directives = Vec::new();

    for (offset, &byte) in template.iter().enumerate() {
        if let Some(path) = machine.transform(byte, &mut literal) {
            let end = offset + 1;
            directives.push(Directive {
                start: end - delimiters.directive_len(&path),
                end,
                path,
            });
        }
        literal.clear();
    }

    directives
}
