//! Lexical context of a cursor, read straight from the source text
//!
//! Editor queries run while the user is typing, so the tree often lacks the
//! node being written. These scans look at the raw text instead.

/// What the cursor sits in on its own line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineContext {
    Code,
    /// Inside a quoted string opened at byte `start`
    String { start: usize },
    Comment,
}

pub fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Source text from the start of the cursor's line up to the cursor
pub fn line_prefix(source: &str, offset: usize) -> Option<(usize, &str)> {
    let before = source.get(..offset)?;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    Some((line_start, &before[line_start..]))
}

pub fn line_context(source: &str, offset: usize) -> LineContext {
    let Some((line_start, line)) = line_prefix(source, offset) else {
        return LineContext::Code;
    };
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'-' if bytes.get(i + 1) == Some(&b'-') => return LineContext::Comment,
            quote @ (b'"' | b'\'' | b'`') => {
                let start = i;
                i += 1;
                loop {
                    match bytes.get(i) {
                        None => return LineContext::String { start: line_start + start },
                        Some(b'\\') => i += 2,
                        Some(&c) if c == quote => break,
                        Some(_) => i += 1,
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    LineContext::Code
}

/// Whether `text` ends with `word` as a whole word
pub fn ends_with_word(text: &str, word: &str) -> bool {
    text.strip_suffix(word)
        .is_some_and(|rest| !rest.chars().next_back().is_some_and(is_ident_char))
}

/// Opening parenthesis of the innermost unclosed `(` before `offset`, with
/// the number of commas seen directly inside it. Strings, comments and
/// nested brackets are skipped.
pub fn innermost_paren(source: &str, offset: usize) -> Option<(usize, usize)> {
    struct Open {
        byte: u8,
        at: usize,
        commas: usize,
    }

    let bytes = source.as_bytes();
    let end = offset.min(bytes.len());
    let mut stack: Vec<Open> = Vec::new();
    let mut i = 0;
    while i < end {
        match bytes[i] {
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = match long_bracket_level(bytes, i + 2) {
                    Some(level) => skip_long_bracket(bytes, i + 2, level),
                    None => bytes[i..].iter().position(|&b| b == b'\n').map_or(bytes.len(), |p| i + p),
                };
                continue;
            }
            b'[' => {
                if let Some(level) = long_bracket_level(bytes, i) {
                    i = skip_long_bracket(bytes, i, level);
                    continue;
                }
                stack.push(Open { byte: b'[', at: i, commas: 0 });
            }
            quote @ (b'"' | b'\'' | b'`') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote && bytes[i] != b'\n' {
                    i += if bytes[i] == b'\\' { 2 } else { 1 };
                }
            }
            b'(' | b'{' => stack.push(Open { byte: bytes[i], at: i, commas: 0 }),
            b')' | b'}' | b']' => {
                stack.pop();
            }
            b',' => {
                if let Some(top) = stack.last_mut() {
                    top.commas += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    stack
        .iter()
        .rev()
        .find(|open| open.byte == b'(')
        .map(|open| (open.at, open.commas))
}

/// Level of a long bracket `[==[` starting at `at`
fn long_bracket_level(bytes: &[u8], at: usize) -> Option<usize> {
    if bytes.get(at) != Some(&b'[') {
        return None;
    }
    let level = bytes[at + 1..].iter().take_while(|&&b| b == b'=').count();
    (bytes.get(at + 1 + level) == Some(&b'[')).then_some(level)
}

/// Offset just past the `]==]` closing the long bracket opened at `at`
fn skip_long_bracket(bytes: &[u8], at: usize, level: usize) -> usize {
    let mut close = Vec::with_capacity(level + 2);
    close.push(b']');
    close.extend(std::iter::repeat(b'=').take(level));
    close.push(b']');
    let body = at + level + 2;
    bytes
        .get(body..)
        .and_then(|rest| rest.windows(close.len()).position(|w| w == close.as_slice()))
        .map_or(bytes.len(), |p| body + p + close.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_line_context() {
        let source = "local a = 'x' -- note";
        assert_eq!(line_context(source, 8), LineContext::Code);
        assert_eq!(line_context(source, 12), LineContext::String { start: 10 });
        assert_eq!(line_context(source, 13), LineContext::Code);
        assert_eq!(line_context(source, source.len()), LineContext::Comment);
        assert_eq!(line_context("x = \"a\\\"b", 9), LineContext::String { start: 4 });
    }

    #[test]
    fn test_innermost_paren_counts_commas() {
        let source = "f(1, g(2, 3), ";
        assert_eq!(innermost_paren(source, source.len()), Some((1, 2)));
        let source = "f(1, g(2, ";
        assert_eq!(innermost_paren(source, source.len()), Some((6, 1)));
    }

    #[test]
    fn test_innermost_paren_skips_strings_and_tables() {
        let source = "f('(,', { a, b }, --[[ ( ]] ";
        assert_eq!(innermost_paren(source, source.len()), Some((1, 2)));
        assert_eq!(innermost_paren("f(1)", 4), None);
    }

    #[test]
    fn test_ends_with_word() {
        assert!(ends_with_word("local function", "function"));
        assert!(!ends_with_word("myfunction", "function"));
    }
}
