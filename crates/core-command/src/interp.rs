//! Command evaluation.
//!
//! Dot threads through the interpreter: every command receives a dot and
//! yields one or more new dots. At the top level the selection set supplies
//! one dot per selection; the whole batch runs inside a single sealed undo
//! action, applied in descending start order so earlier offsets stay valid
//! while later ones mutate. Loop iterations use the same descending commit.
//! On failure the sealed partial action is undone, leaving the buffer as it
//! was before the command.

use crate::parser::{Command, Part, Template, Verb, parse};
use crate::pattern::Pattern;
use crate::{CommandError, Result};
use core_selection::SelectionSet;
use core_text::{ByteRange, SaveOutcome, Text};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Default loop pattern: one line per iteration, trailing newline included.
const DEFAULT_LOOP_PATTERN: &str = "^[^\n]*\n?";

/// Everything a command batch operates on. Borrowed from the editor for the
/// duration of one `run`.
pub struct CommandContext<'a> {
    pub text: &'a mut Text,
    pub selections: &'a mut SelectionSet,
    /// The buffer's file name; `w` without argument writes here, `e`
    /// replaces it.
    pub path: &'a mut Option<PathBuf>,
    /// Sink for `p` output.
    pub out: &'a mut dyn Write,
    pub interrupt: &'a AtomicBool,
    /// Diagnostics for the status line (pipe stderr, save warnings).
    pub messages: Vec<String>,
    /// Pending `p` output. Batches execute in descending start order, so
    /// prints are buffered and flushed sorted by position.
    prints: Vec<(usize, Vec<u8>)>,
    quit: bool,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        text: &'a mut Text,
        selections: &'a mut SelectionSet,
        path: &'a mut Option<PathBuf>,
        out: &'a mut dyn Write,
        interrupt: &'a AtomicBool,
    ) -> Self {
        Self {
            text,
            selections,
            path,
            out,
            interrupt,
            messages: Vec::new(),
            prints: Vec::new(),
            quit: false,
        }
    }

    fn flush_prints(&mut self) -> Result<()> {
        let mut prints = std::mem::take(&mut self.prints);
        prints.sort_by_key(|(start, _)| *start);
        for (_, data) in prints {
            self.out
                .write_all(&data)
                .map_err(|e| CommandError::Execute(e.to_string()))?;
        }
        Ok(())
    }

    /// Replace `range` with `data`, keeping the selection set in step.
    /// Returns the range now covering the new bytes.
    fn apply(&mut self, range: ByteRange, data: &[u8]) -> Result<ByteRange> {
        self.text.replace(range.start, range.len(), data)?;
        self.selections
            .apply_edit(range.start, range.len(), data.len(), None);
        Ok(ByteRange::new(range.start, range.start + data.len()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    /// A `q` executed; the caller decides what closing means.
    pub quit: bool,
}

/// Parse and execute one command line against every selection.
pub fn run(ctx: &mut CommandContext, input: &str) -> Result<RunResult> {
    let cmd = parse(input)?;
    ctx.text.snapshot();
    let before_seq = ctx.text.current_seq();
    let ranges: Vec<ByteRange> = ctx.selections.iter().map(|s| s.range()).collect();
    match run_descending(ctx, ranges, |ctx, dot| exec(ctx, &cmd, dot)) {
        Ok(dots) => {
            if !dots.is_empty() {
                ctx.selections.set_ranges(dots);
            }
            ctx.selections.clamp(ctx.text.size());
            ctx.text.snapshot();
            ctx.flush_prints()?;
            debug!(target: "sam.exec", cmd = input, selections = ctx.selections.len(), "done");
            Ok(RunResult {
                quit: std::mem::take(&mut ctx.quit),
            })
        }
        Err(err) => {
            // Roll the partially applied batch back as one sealed action.
            ctx.text.snapshot();
            if ctx.text.current_seq() != before_seq {
                ctx.text.undo();
            }
            ctx.selections.clamp(ctx.text.size());
            Err(err)
        }
    }
}

/// Apply `f` to each range in descending start order, then rebase the
/// collected dots to the final buffer size. Ranges are pairwise disjoint and
/// processed high-to-low, so every edit lands strictly below the dots
/// already collected and a plain size delta rebases them exactly.
fn run_descending<F>(
    ctx: &mut CommandContext,
    ranges: Vec<ByteRange>,
    mut f: F,
) -> Result<Vec<ByteRange>>
where
    F: FnMut(&mut CommandContext, ByteRange) -> Result<Vec<ByteRange>>,
{
    let mut collected: Vec<(Vec<ByteRange>, usize)> = Vec::with_capacity(ranges.len());
    for r in ranges.iter().rev() {
        if ctx.interrupt.load(Ordering::Relaxed) {
            return Err(CommandError::Execute("interrupted".into()));
        }
        let dots = f(ctx, *r)?;
        collected.push((dots, ctx.text.size()));
    }
    let final_size = ctx.text.size() as isize;
    let mut out = Vec::new();
    for (dots, size_at) in collected.into_iter().rev() {
        let delta = final_size - size_at as isize;
        out.extend(dots.into_iter().map(|d| shift_range(d, delta)));
    }
    Ok(out)
}

fn shift_range(r: ByteRange, delta: isize) -> ByteRange {
    let start = (r.start as isize + delta).max(0) as usize;
    let end = (r.end as isize + delta).max(start as isize) as usize;
    ByteRange::new(start, end)
}

fn default_address(verb: &Verb, text: &Text, dot: ByteRange) -> ByteRange {
    match verb {
        // `w` without an address persists the whole file.
        Verb::Write { .. } => ByteRange::new(0, text.size()),
        _ => dot,
    }
}

fn exec(ctx: &mut CommandContext, cmd: &Command, dot: ByteRange) -> Result<Vec<ByteRange>> {
    let range = match &cmd.addr {
        Some(addr) => addr.eval(ctx.text, dot)?,
        None => default_address(&cmd.verb, ctx.text, dot),
    };
    match &cmd.verb {
        Verb::Select => Ok(vec![range]),
        Verb::Append(text) => {
            let r = ctx.apply(ByteRange::at(range.end), text)?;
            Ok(vec![r])
        }
        Verb::Insert(text) => {
            let r = ctx.apply(ByteRange::at(range.start), text)?;
            Ok(vec![r])
        }
        Verb::Change(text) => {
            let r = ctx.apply(range, text)?;
            Ok(vec![r])
        }
        Verb::Delete => {
            let r = ctx.apply(range, b"")?;
            Ok(vec![r])
        }
        Verb::Substitute {
            pattern,
            template,
            all,
            nth,
        } => substitute(ctx, range, pattern, template, *all, *nth),
        Verb::Print => {
            let data = ctx.text.content(range)?;
            ctx.prints.push((range.start, data));
            Ok(vec![range])
        }
        Verb::LoopMatch { pattern, body } => {
            let matches = loop_matches(ctx, range, pattern.as_deref())?;
            match body {
                Some(cmd) => run_descending(ctx, matches, |ctx, dot| exec(ctx, cmd, dot)),
                None => Ok(matches),
            }
        }
        Verb::LoopGap { pattern, body } => {
            let matches = loop_matches(ctx, range, pattern.as_deref())?;
            let mut gaps = Vec::with_capacity(matches.len() + 1);
            let mut at = range.start;
            for m in &matches {
                gaps.push(ByteRange::new(at, m.start));
                at = m.end;
            }
            gaps.push(ByteRange::new(at, range.end));
            gaps.retain(|g| !g.is_empty());
            match body {
                Some(cmd) => run_descending(ctx, gaps, |ctx, dot| exec(ctx, cmd, dot)),
                None => Ok(gaps),
            }
        }
        Verb::Guard {
            pattern,
            negate,
            body,
        } => {
            let pat = Pattern::compile(pattern)?;
            let content = ctx.text.content(range)?;
            if pat.is_match(&content) == *negate {
                // Filtered out: this dot drops from the result set.
                return Ok(Vec::new());
            }
            match body {
                Some(cmd) => exec(ctx, cmd, range),
                None => Ok(vec![range]),
            }
        }
        Verb::Pipe(sh) => {
            let input = ctx.text.content(range)?;
            let out = shell(ctx, sh, Some(&input))?;
            let r = ctx.apply(range, &out)?;
            Ok(vec![r])
        }
        Verb::ReadInto(sh) => {
            let out = shell(ctx, sh, None)?;
            let r = ctx.apply(range, &out)?;
            Ok(vec![r])
        }
        Verb::WriteOut(sh) => {
            let input = ctx.text.content(range)?;
            shell(ctx, sh, Some(&input))?;
            Ok(vec![range])
        }
        Verb::Write { path } => write_file(ctx, range, path.as_ref()),
        Verb::Edit { path, force } => edit_file(ctx, path, *force),
        Verb::Quit { force } => {
            if !force && ctx.text.modified() {
                return Err(CommandError::UnsavedChanges);
            }
            ctx.quit = true;
            Ok(vec![range])
        }
        Verb::Mark(name) => {
            ctx.text
                .mark_set(*name, range.start)
                .map_err(|_| CommandError::Address)?;
            Ok(vec![range])
        }
        Verb::Group(cmds) => {
            // Grouped execution with the enclosing dot, threading the dot
            // from command to command.
            let mut cur = range;
            for c in cmds {
                let dots = exec(ctx, c, cur)?;
                if let Some(last) = dots.last() {
                    cur = *last;
                }
            }
            Ok(vec![cur])
        }
    }
}

/// Collect loop match ranges inside `range` before anything mutates.
fn loop_matches(
    ctx: &CommandContext,
    range: ByteRange,
    pattern: Option<&str>,
) -> Result<Vec<ByteRange>> {
    let pat = Pattern::compile(pattern.unwrap_or(DEFAULT_LOOP_PATTERN))?;
    let content = ctx.text.content(range)?;
    let mut matches = pat.find_all(&content, range.start);
    // `^` also matches just past a final newline; an empty match flush at
    // the range end is an artifact, not a loop target.
    matches.retain(|m| !(m.is_empty() && m.end == range.end && !range.is_empty()));
    Ok(matches)
}

fn shell(ctx: &mut CommandContext, sh: &str, input: Option<&[u8]>) -> Result<Vec<u8>> {
    let out = core_pipe::run(sh, input, ctx.interrupt)
        .map_err(|e| CommandError::Shell(e.to_string()))?;
    if !out.stderr.is_empty() {
        ctx.messages
            .push(String::from_utf8_lossy(&out.stderr).trim_end().to_string());
    }
    if !out.success() {
        return Err(CommandError::Shell(format!(
            "`{sh}` exited with status {}",
            out.status
        )));
    }
    Ok(out.stdout)
}

fn substitute(
    ctx: &mut CommandContext,
    range: ByteRange,
    pattern: &str,
    template: &Template,
    all: bool,
    nth: Option<usize>,
) -> Result<Vec<ByteRange>> {
    let pat = Pattern::compile(pattern)?;
    let content = ctx.text.content(range)?;
    let mut out = Vec::with_capacity(content.len());
    let mut copied = 0usize;
    let mut seen = 0usize;
    let mut replaced = 0usize;
    for caps in pat.captures_iter(&content) {
        let m = caps.get(0).expect("whole match");
        seen += 1;
        let wanted = if all {
            true
        } else if let Some(k) = nth {
            seen == k
        } else {
            seen == 1
        };
        if !wanted {
            continue;
        }
        out.extend_from_slice(&content[copied..m.start()]);
        for part in template.parts() {
            match part {
                Part::Lit(bytes) => out.extend_from_slice(bytes),
                Part::Group(i) => {
                    if let Some(g) = caps.get(*i) {
                        out.extend_from_slice(g.as_bytes());
                    }
                }
            }
        }
        copied = m.end();
        replaced += 1;
    }
    if replaced == 0 {
        return Ok(vec![range]);
    }
    out.extend_from_slice(&content[copied..]);
    let r = ctx.apply(range, &out)?;
    Ok(vec![r])
}

fn write_file(
    ctx: &mut CommandContext,
    range: ByteRange,
    path: Option<&PathBuf>,
) -> Result<Vec<ByteRange>> {
    let target = path
        .cloned()
        .or_else(|| ctx.path.clone())
        .ok_or(CommandError::Filename)?;
    let whole = range.start == 0 && range.end == ctx.text.size();
    if whole {
        match ctx.text.save(&target) {
            Ok(SaveOutcome::Atomic) => {}
            Ok(SaveOutcome::InPlace) => ctx.messages.push(format!(
                "{}: written in place (not atomically)",
                target.display()
            )),
            Err(e) => return Err(CommandError::Execute(e.to_string())),
        }
        if ctx.path.is_none() {
            *ctx.path = Some(target);
        }
    } else {
        let data = ctx.text.content(range)?;
        std::fs::write(&target, data).map_err(|e| CommandError::Execute(e.to_string()))?;
    }
    Ok(vec![range])
}

fn edit_file(ctx: &mut CommandContext, path: &PathBuf, force: bool) -> Result<Vec<ByteRange>> {
    if !force && ctx.text.modified() {
        return Err(CommandError::UnsavedChanges);
    }
    *ctx.text = Text::load(path).map_err(|e| CommandError::Execute(e.to_string()))?;
    *ctx.path = Some(path.clone());
    *ctx.selections = SelectionSet::new(0);
    Ok(vec![ByteRange::at(0)])
}
