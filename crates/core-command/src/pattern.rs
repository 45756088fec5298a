//! Regex compilation for the command language.
//!
//! The accepted flavor is the `regex` crate's byte syntax with three
//! adjustments inherited from the command grammar: `\/` stands for a literal
//! delimiter, `\<` and `\>` are word boundaries, and `(?i)` toggles case
//! folding inline (supported natively). Patterns are compiled in multi-line
//! mode so `^` and `$` anchor per line, which is what structural loops over
//! a range expect.

use crate::{CommandError, Result};
use core_text::ByteRange;
use regex::bytes::{Captures, Regex, RegexBuilder};

pub struct Pattern {
    re: Regex,
}

/// Rewrite command-language escapes into `regex` syntax.
fn translate(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('/') => out.push('/'),
            Some('<') | Some('>') => out.push_str("\\b"),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

impl Pattern {
    pub fn compile(pattern: &str) -> Result<Self> {
        let re = RegexBuilder::new(&translate(pattern))
            .multi_line(true)
            .build()
            .map_err(|e| CommandError::Regex(e.to_string()))?;
        Ok(Self { re })
    }

    pub fn is_match(&self, haystack: &[u8]) -> bool {
        self.re.is_match(haystack)
    }

    /// All match ranges in `haystack`, rebased by `base`.
    pub fn find_all(&self, haystack: &[u8], base: usize) -> Vec<ByteRange> {
        self.re
            .find_iter(haystack)
            .map(|m| ByteRange::new(base + m.start(), base + m.end()))
            .collect()
    }

    /// First match at or after `from` with end-of-range wraparound, rebased
    /// by `base`. Mirrors forward address search: the scan starts at dot and
    /// continues from the top when nothing follows.
    pub fn find_forward(&self, haystack: &[u8], base: usize, from: usize) -> Option<ByteRange> {
        let matches = self.find_all(haystack, base);
        matches
            .iter()
            .find(|m| m.start >= from)
            .or(matches.first())
            .copied()
    }

    /// Last match ending at or before `from`, wrapping to the bottom.
    pub fn find_backward(&self, haystack: &[u8], base: usize, from: usize) -> Option<ByteRange> {
        let matches = self.find_all(haystack, base);
        matches
            .iter()
            .rev()
            .find(|m| m.end <= from)
            .or(matches.last())
            .copied()
    }

    pub fn captures_iter<'r, 'h>(
        &'r self,
        haystack: &'h [u8],
    ) -> impl Iterator<Item = Captures<'h>> + 'r
    where
        'h: 'r,
    {
        self.re.captures_iter(haystack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_boundaries_translate() {
        let p = Pattern::compile(r"\<foo\>").unwrap();
        assert!(p.is_match(b"a foo b"));
        assert!(!p.is_match(b"foobar"));
    }

    #[test]
    fn escaped_delimiter_is_literal() {
        let p = Pattern::compile(r"a\/b").unwrap();
        assert!(p.is_match(b"a/b"));
    }

    #[test]
    fn inline_case_fold() {
        let p = Pattern::compile(r"(?i)hello").unwrap();
        assert!(p.is_match(b"HeLLo"));
    }

    #[test]
    fn anchors_are_per_line() {
        let p = Pattern::compile(r"^b$").unwrap();
        assert!(p.is_match(b"a\nb\nc\n"));
    }

    #[test]
    fn forward_search_wraps() {
        let p = Pattern::compile("ab").unwrap();
        let hay = b"ab cd ab";
        assert_eq!(p.find_forward(hay, 0, 1), Some(ByteRange::new(6, 8)));
        assert_eq!(p.find_forward(hay, 0, 7), Some(ByteRange::new(0, 2)));
    }

    #[test]
    fn backward_search_wraps() {
        let p = Pattern::compile("ab").unwrap();
        let hay = b"ab cd ab";
        assert_eq!(p.find_backward(hay, 0, 5), Some(ByteRange::new(0, 2)));
        assert_eq!(p.find_backward(hay, 0, 1), Some(ByteRange::new(6, 8)));
    }

    #[test]
    fn compile_error_reports_regex_kind() {
        assert!(matches!(
            Pattern::compile("(unclosed"),
            Err(CommandError::Regex(_))
        ));
    }
}
