//! Address grammar and evaluation.
//!
//! An address evaluates against the buffer to a byte range. Simple forms
//! (line number, `#` byte offset, `/re/`, `?re?`, `'mark`, `.`, `$`) compose
//! with `+ - , ;`. `a,b` spans start-of-a to end-of-b; `a;b` additionally
//! evaluates `b` with dot set to `a`. `+`/`-` advance by whole lines for
//! line-number operands, by bytes for `#` operands, and by searching for
//! regex operands.

use crate::pattern::Pattern;
use crate::{CommandError, Result};
use core_text::{ByteRange, Text};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Simple {
    /// 1-based line; 0 addresses the empty range before the first line.
    Line(usize),
    /// `$`: the empty range at end of file.
    Last,
    /// `#n`: the empty range at byte offset n.
    Byte(usize),
    /// `/re/` forward or `?re?` backward search from dot.
    Regex { pattern: String, back: bool },
    /// `'m`: the named mark.
    Mark(char),
    /// `.`: the current dot.
    Dot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Simple(Simple),
    Compose {
        op: char,
        lhs: Option<Box<Address>>,
        rhs: Option<Box<Address>>,
    },
}

impl Address {
    /// Resolve against `text` with the given dot.
    pub fn eval(&self, text: &Text, dot: ByteRange) -> Result<ByteRange> {
        match self {
            Address::Simple(simple) => eval_simple(simple, text, dot),
            Address::Compose { op, lhs, rhs } => match op {
                ',' | ';' => {
                    let left = match lhs {
                        Some(a) => a.eval(text, dot)?,
                        None => ByteRange::at(0),
                    };
                    let right_dot = if *op == ';' { left } else { dot };
                    let right = match rhs {
                        Some(a) => a.eval(text, right_dot)?,
                        None => ByteRange::at(text.size()),
                    };
                    if left.start > right.end {
                        return Err(CommandError::Address);
                    }
                    Ok(ByteRange::new(left.start, right.end))
                }
                '+' | '-' => {
                    let base = match lhs {
                        Some(a) => a.eval(text, dot)?,
                        None => dot,
                    };
                    let amount = rhs.as_deref();
                    advance(text, base, *op == '-', amount)
                }
                _ => Err(CommandError::Address),
            },
        }
    }
}

fn eval_simple(simple: &Simple, text: &Text, dot: ByteRange) -> Result<ByteRange> {
    match simple {
        Simple::Line(n) => text.line_range(*n).map_err(|_| CommandError::Address),
        Simple::Last => Ok(ByteRange::at(text.size())),
        Simple::Byte(n) => {
            if *n > text.size() {
                Err(CommandError::Address)
            } else {
                Ok(ByteRange::at(*n))
            }
        }
        Simple::Regex { pattern, back } => {
            let pat = Pattern::compile(pattern)?;
            let content = text.bytes();
            let found = if *back {
                pat.find_backward(&content, 0, dot.start)
            } else {
                pat.find_forward(&content, 0, dot.end)
            };
            found.ok_or(CommandError::Address)
        }
        Simple::Mark(name) => text
            .mark_get(*name)
            .map(ByteRange::at)
            .ok_or(CommandError::Address),
        Simple::Dot => Ok(dot),
    }
}

/// `base + amount` / `base - amount`.
fn advance(
    text: &Text,
    base: ByteRange,
    back: bool,
    amount: Option<&Address>,
) -> Result<ByteRange> {
    match amount {
        // A bare `+`/`-` moves one line.
        None => advance_lines(text, base, back, 1),
        Some(Address::Simple(Simple::Line(n))) => advance_lines(text, base, back, *n),
        Some(Address::Simple(Simple::Byte(n))) => {
            if back {
                base.start
                    .checked_sub(*n)
                    .map(ByteRange::at)
                    .ok_or(CommandError::Address)
            } else {
                let pos = base.end + n;
                if pos > text.size() {
                    Err(CommandError::Address)
                } else {
                    Ok(ByteRange::at(pos))
                }
            }
        }
        Some(Address::Simple(Simple::Regex { pattern, back: _ })) => {
            let pat = Pattern::compile(pattern)?;
            let content = text.bytes();
            let found = if back {
                pat.find_backward(&content, 0, base.start)
            } else {
                pat.find_forward(&content, 0, base.end)
            };
            found.ok_or(CommandError::Address)
        }
        Some(_) => Err(CommandError::Address),
    }
}

fn advance_lines(text: &Text, base: ByteRange, back: bool, n: usize) -> Result<ByteRange> {
    let from = if back {
        text.byte_to_line(base.start)
    } else if base.is_empty() {
        text.byte_to_line(base.end)
    } else {
        // The exclusive end of a line range already sits on the next line;
        // count from the last byte actually covered.
        text.byte_to_line(base.end - 1)
    };
    let target = if back {
        from.checked_sub(n).ok_or(CommandError::Address)?
    } else {
        from + n
    };
    text.line_range(target).map_err(|_| CommandError::Address)
}
