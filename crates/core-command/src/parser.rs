//! Hand-rolled command parser.
//!
//! One call parses one command, which may carry a leading address, a text
//! argument (`/delimited/` or here-text terminated by a lone `.`), a nested
//! body (loops and filters), or a braced group. Shell verbs (`|`, `<`, `>`)
//! and file verbs (`w`, `e`) consume the rest of their line verbatim.

use crate::address::{Address, Simple};
use crate::{CommandError, Result};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub addr: Option<Address>,
    pub verb: Verb,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    /// Bare address: set dot.
    Select,
    Append(Vec<u8>),
    Insert(Vec<u8>),
    Change(Vec<u8>),
    Delete,
    Substitute {
        pattern: String,
        template: Template,
        all: bool,
        nth: Option<usize>,
    },
    Print,
    /// `x/re/ cmd`: loop over matches; without a body the matches become
    /// the new dots.
    LoopMatch {
        pattern: Option<String>,
        body: Option<Box<Command>>,
    },
    /// `y/re/ cmd`: loop over the spans between matches.
    LoopGap {
        pattern: Option<String>,
        body: Option<Box<Command>>,
    },
    /// `g/re/ cmd` and `v/re/ cmd`: conditional filter.
    Guard {
        pattern: String,
        negate: bool,
        body: Option<Box<Command>>,
    },
    Pipe(String),
    ReadInto(String),
    WriteOut(String),
    Write {
        path: Option<PathBuf>,
    },
    Edit {
        path: PathBuf,
        force: bool,
    },
    Quit {
        force: bool,
    },
    Mark(char),
    Group(Vec<Command>),
}

/// Substitution replacement, pre-split into literal runs and group
/// references (`&` and `\0`..`\9`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Part {
    Lit(Vec<u8>),
    Group(usize),
}

impl Template {
    pub(crate) fn parts(&self) -> &[Part] {
        &self.parts
    }
}

struct Parser<'a> {
    b: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            b: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.b.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.b.len()
    }

    fn skip_blanks(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.pos += 1;
        }
    }

    fn skip_separators(&mut self) {
        while matches!(
            self.peek(),
            Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b';')
        ) {
            self.pos += 1;
        }
    }

    /// Everything up to (not including) the next newline, trimmed.
    fn rest_of_line(&mut self) -> String {
        let start = self.pos;
        while !matches!(self.peek(), None | Some(b'\n')) {
            self.pos += 1;
        }
        let line = std::str::from_utf8(&self.b[start..self.pos])
            .unwrap_or("")
            .trim()
            .to_string();
        self.eat(b'\n');
        line
    }

    fn number(&mut self) -> Option<usize> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        std::str::from_utf8(&self.b[start..self.pos])
            .ok()?
            .parse()
            .ok()
    }

    /// Collect until an unescaped `delim` (or end of line/input, if the
    /// closing delimiter is omitted). Escape pairs are kept verbatim for the
    /// regex translator.
    fn until_delim(&mut self, delim: u8) -> String {
        let mut out = Vec::new();
        while let Some(c) = self.peek() {
            if c == delim {
                self.pos += 1;
                break;
            }
            if c == b'\n' {
                break;
            }
            if c == b'\\' {
                self.pos += 1;
                out.push(b'\\');
                if let Some(escaped) = self.bump() {
                    out.push(escaped);
                }
                continue;
            }
            self.pos += 1;
            out.push(c);
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}

pub fn parse(input: &str) -> Result<Command> {
    let mut p = Parser::new(input);
    let cmd = parse_command(&mut p)?;
    p.skip_separators();
    if let Some(c) = p.peek() {
        return Err(CommandError::Command(c as char));
    }
    Ok(cmd)
}

pub(crate) fn parse_address_str(input: &str) -> Result<Address> {
    let mut p = Parser::new(input);
    parse_address(&mut p)?.ok_or(CommandError::Address)
}

fn parse_command(p: &mut Parser) -> Result<Command> {
    p.skip_blanks();
    let addr = parse_address(p)?;
    p.skip_blanks();
    let verb = match p.peek() {
        None => Verb::Select,
        Some(b'a') => {
            p.bump();
            Verb::Append(text_argument(p)?)
        }
        Some(b'i') => {
            p.bump();
            Verb::Insert(text_argument(p)?)
        }
        Some(b'c') => {
            p.bump();
            Verb::Change(text_argument(p)?)
        }
        Some(b'd') => {
            p.bump();
            Verb::Delete
        }
        Some(b'p') => {
            p.bump();
            Verb::Print
        }
        Some(b's') => {
            p.bump();
            substitute(p)?
        }
        Some(b'x') => {
            p.bump();
            let pattern = optional_pattern(p);
            let body = optional_body(p)?;
            Verb::LoopMatch { pattern, body }
        }
        Some(b'y') => {
            p.bump();
            let pattern = optional_pattern(p);
            let body = optional_body(p)?;
            Verb::LoopGap { pattern, body }
        }
        Some(c @ (b'g' | b'v')) => {
            p.bump();
            p.skip_blanks();
            if !p.eat(b'/') {
                return Err(CommandError::Regex("missing pattern".into()));
            }
            let pattern = p.until_delim(b'/');
            let body = optional_body(p)?;
            Verb::Guard {
                pattern,
                negate: c == b'v',
                body,
            }
        }
        Some(b'|') => {
            p.bump();
            shell_verb(p, Verb::Pipe)?
        }
        Some(b'<') => {
            p.bump();
            shell_verb(p, Verb::ReadInto)?
        }
        Some(b'>') => {
            p.bump();
            shell_verb(p, Verb::WriteOut)?
        }
        Some(b'w') => {
            p.bump();
            let rest = p.rest_of_line();
            Verb::Write {
                path: (!rest.is_empty()).then(|| PathBuf::from(rest)),
            }
        }
        Some(b'e') => {
            p.bump();
            let force = p.eat(b'!');
            let rest = p.rest_of_line();
            if rest.is_empty() {
                return Err(CommandError::Filename);
            }
            Verb::Edit {
                path: PathBuf::from(rest),
                force,
            }
        }
        Some(b'q') => {
            p.bump();
            Verb::Quit { force: p.eat(b'!') }
        }
        Some(b'k') => {
            p.bump();
            p.skip_blanks();
            match p.bump() {
                Some(c) if c.is_ascii_lowercase() => Verb::Mark(c as char),
                _ => return Err(CommandError::Address),
            }
        }
        Some(b'{') => {
            p.bump();
            let mut cmds = Vec::new();
            loop {
                p.skip_separators();
                if p.eat(b'}') {
                    break;
                }
                if p.at_end() {
                    return Err(CommandError::UnmatchedBrace);
                }
                cmds.push(parse_command(p)?);
            }
            Verb::Group(cmds)
        }
        Some(b'\n') | Some(b';') | Some(b'}') => Verb::Select,
        Some(other) => return Err(CommandError::Command(other as char)),
    };
    Ok(Command { addr, verb })
}

fn shell_verb(p: &mut Parser, make: fn(String) -> Verb) -> Result<Verb> {
    let cmd = p.rest_of_line();
    if cmd.is_empty() {
        Err(CommandError::Shell("missing shell command".into()))
    } else {
        Ok(make(cmd))
    }
}

/// `/pattern/` if present.
fn optional_pattern(p: &mut Parser) -> Option<String> {
    p.skip_blanks();
    if p.eat(b'/') {
        Some(p.until_delim(b'/'))
    } else {
        None
    }
}

/// A nested body command, unless the input (or surrounding group) ends here.
fn optional_body(p: &mut Parser) -> Result<Option<Box<Command>>> {
    p.skip_blanks();
    match p.peek() {
        None | Some(b'\n') | Some(b'}') | Some(b';') => Ok(None),
        Some(_) => Ok(Some(Box::new(parse_command(p)?))),
    }
}

/// Text argument of `a`/`i`/`c`: `/delimited/` with escapes, or here-text on
/// the following lines terminated by a lone `.`.
fn text_argument(p: &mut Parser) -> Result<Vec<u8>> {
    p.skip_blanks();
    match p.peek() {
        Some(b'/') => {
            p.bump();
            let mut out = Vec::new();
            while let Some(c) = p.bump() {
                match c {
                    b'/' => break,
                    b'\\' => match p.bump() {
                        Some(b'n') => out.push(b'\n'),
                        Some(b't') => out.push(b'\t'),
                        Some(b'\\') => out.push(b'\\'),
                        Some(b'/') => out.push(b'/'),
                        Some(other) => {
                            out.push(b'\\');
                            out.push(other);
                        }
                        None => out.push(b'\\'),
                    },
                    other => out.push(other),
                }
            }
            Ok(out)
        }
        None | Some(b'\n') => {
            p.eat(b'\n');
            let mut out = Vec::new();
            loop {
                if p.at_end() {
                    break;
                }
                let start = p.pos;
                while !matches!(p.peek(), None | Some(b'\n')) {
                    p.pos += 1;
                }
                let line = &p.b[start..p.pos];
                p.eat(b'\n');
                if line == b"." {
                    break;
                }
                out.extend_from_slice(line);
                out.push(b'\n');
            }
            Ok(out)
        }
        Some(_) => Err(CommandError::Text),
    }
}

fn substitute(p: &mut Parser) -> Result<Verb> {
    let delim = match p.bump() {
        Some(c) if c.is_ascii_punctuation() => c,
        _ => return Err(CommandError::Text),
    };
    let pattern = p.until_delim(delim);
    if pattern.is_empty() {
        return Err(CommandError::Regex("empty pattern".into()));
    }
    let template = replacement(p, delim)?;
    let mut all = false;
    let mut nth = None;
    loop {
        match p.peek() {
            Some(b'g') => {
                p.bump();
                all = true;
            }
            Some(c) if c.is_ascii_digit() => {
                nth = p.number();
            }
            _ => break,
        }
    }
    Ok(Verb::Substitute {
        pattern,
        template,
        all,
        nth,
    })
}

fn replacement(p: &mut Parser, delim: u8) -> Result<Template> {
    let mut parts = Vec::new();
    let mut lit: Vec<u8> = Vec::new();
    loop {
        let Some(c) = p.peek() else { break };
        if c == delim || c == b'\n' {
            if c == delim {
                p.pos += 1;
            }
            break;
        }
        p.pos += 1;
        match c {
            b'&' => {
                if !lit.is_empty() {
                    parts.push(Part::Lit(std::mem::take(&mut lit)));
                }
                parts.push(Part::Group(0));
            }
            b'\\' => match p.bump() {
                Some(d) if d.is_ascii_digit() => {
                    if !lit.is_empty() {
                        parts.push(Part::Lit(std::mem::take(&mut lit)));
                    }
                    parts.push(Part::Group((d - b'0') as usize));
                }
                Some(b'n') => lit.push(b'\n'),
                Some(b't') => lit.push(b'\t'),
                Some(b'&') => lit.push(b'&'),
                Some(b'\\') => lit.push(b'\\'),
                Some(other) if other == delim => lit.push(delim),
                Some(other) => {
                    lit.push(b'\\');
                    lit.push(other);
                }
                None => return Err(CommandError::Text),
            },
            other => lit.push(other),
        }
    }
    if !lit.is_empty() {
        parts.push(Part::Lit(lit));
    }
    Ok(Template { parts })
}

fn parse_address(p: &mut Parser) -> Result<Option<Address>> {
    let mut cur = parse_simple(p)?.map(Address::Simple);
    loop {
        p.skip_blanks();
        let op = match p.peek() {
            Some(c @ (b'+' | b'-' | b',' | b';')) => c,
            _ => break,
        };
        p.bump();
        p.skip_blanks();
        let rhs = parse_simple(p)?.map(|s| Box::new(Address::Simple(s)));
        cur = Some(Address::Compose {
            op: op as char,
            lhs: cur.map(Box::new),
            rhs,
        });
    }
    Ok(cur)
}

fn parse_simple(p: &mut Parser) -> Result<Option<Simple>> {
    match p.peek() {
        Some(c) if c.is_ascii_digit() => Ok(p.number().map(Simple::Line)),
        Some(b'#') => {
            p.bump();
            let n = p.number().ok_or(CommandError::Address)?;
            Ok(Some(Simple::Byte(n)))
        }
        Some(b'/') => {
            p.bump();
            Ok(Some(Simple::Regex {
                pattern: p.until_delim(b'/'),
                back: false,
            }))
        }
        Some(b'?') => {
            p.bump();
            Ok(Some(Simple::Regex {
                pattern: p.until_delim(b'?'),
                back: true,
            }))
        }
        Some(b'\'') => {
            p.bump();
            match p.bump() {
                Some(c) if c.is_ascii_lowercase() => Ok(Some(Simple::Mark(c as char))),
                _ => Err(CommandError::Address),
            }
        }
        Some(b'.') => {
            p.bump();
            Ok(Some(Simple::Dot))
        }
        Some(b'$') => {
            p.bump();
            Ok(Some(Simple::Last))
        }
        _ => Ok(None),
    }
}
