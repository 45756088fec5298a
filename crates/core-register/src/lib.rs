//! Register layer: named byte containers for cut/copy/paste.
//!
//! A normal register owns one buffer per *slot*; slots run parallel to the
//! active selections so a multi-cursor yank pastes back per cursor. The
//! blackhole register discards everything, and the clipboard register
//! bridges to the system clipboard through the external `vis-clipboard`
//! helper (the shim this editor family shells out to). Clipboard failures
//! surface as errors and never touch in-memory state.

use core_text::{ByteRange, Text};
use std::sync::atomic::AtomicBool;
use thiserror::Error;
use tracing::debug;

/// Default clipboard bridge; overridable for tests and exotic setups.
pub const CLIPBOARD_PROGRAM: &str = "vis-clipboard";

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error(transparent)]
    Text(#[from] core_text::TextError),
    #[error(transparent)]
    Pipe(#[from] core_pipe::PipeError),
    #[error("clipboard helper exited with status {status}: {stderr}")]
    Clipboard { status: i32, stderr: String },
}

pub type Result<T> = std::result::Result<T, RegisterError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    Normal,
    Blackhole,
    Clipboard,
}

#[derive(Debug, Clone)]
pub struct Register {
    kind: RegisterKind,
    slots: Vec<Vec<u8>>,
    /// Paste content on a fresh line.
    pub linewise: bool,
    /// Writes extend the existing content instead of replacing it.
    pub append: bool,
    clipboard_program: String,
}

impl Register {
    pub fn new(kind: RegisterKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            linewise: false,
            append: false,
            clipboard_program: CLIPBOARD_PROGRAM.to_string(),
        }
    }

    pub fn kind(&self) -> RegisterKind {
        self.kind
    }

    /// Override the clipboard helper program.
    pub fn set_clipboard_program(&mut self, program: impl Into<String>) {
        self.clipboard_program = program.into();
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Grow or shrink to `n` slots; new slots start empty.
    pub fn resize(&mut self, n: usize) {
        self.slots.resize_with(n, Vec::new);
    }

    /// Replace (or extend, with `append`) the whole register with one value.
    pub fn put(&mut self, data: &[u8], interrupt: &AtomicBool) -> Result<()> {
        match self.kind {
            RegisterKind::Blackhole => Ok(()),
            RegisterKind::Clipboard => self.clipboard_copy(data, interrupt),
            RegisterKind::Normal => {
                self.slots.truncate(1);
                self.slot_put(0, data);
                Ok(())
            }
        }
    }

    /// Write one slot, honoring the append flag. Normal registers only; the
    /// blackhole swallows the write and the clipboard has no slots.
    pub fn slot_put(&mut self, slot: usize, data: &[u8]) {
        if self.kind != RegisterKind::Normal {
            return;
        }
        if slot >= self.slots.len() {
            self.slots.resize_with(slot + 1, Vec::new);
        }
        if self.append {
            let existing = &mut self.slots[slot];
            if self.linewise && !existing.is_empty() && existing.last() != Some(&b'\n') {
                existing.push(b'\n');
            }
            existing.extend_from_slice(data);
        } else {
            self.slots[slot] = data.to_vec();
        }
    }

    /// Copy a buffer range into the register.
    pub fn put_range(&mut self, text: &Text, range: ByteRange, interrupt: &AtomicBool) -> Result<()> {
        let data = text.content(range)?;
        self.put(&data, interrupt)
    }

    pub fn slot_put_range(&mut self, slot: usize, text: &Text, range: ByteRange) -> Result<()> {
        let data = text.content(range)?;
        self.slot_put(slot, &data);
        Ok(())
    }

    /// Extend the register with a buffer range regardless of the append
    /// flag. The clipboard reads the current contents, concatenates, and
    /// writes back once.
    pub fn append_range(&mut self, text: &Text, range: ByteRange, interrupt: &AtomicBool) -> Result<()> {
        let data = text.content(range)?;
        match self.kind {
            RegisterKind::Blackhole => Ok(()),
            RegisterKind::Clipboard => {
                let mut current = self.clipboard_paste(interrupt)?;
                current.extend_from_slice(&data);
                self.clipboard_copy(&current, interrupt)
            }
            RegisterKind::Normal => {
                let was_append = self.append;
                self.append = true;
                self.slot_put(0, &data);
                self.append = was_append;
                Ok(())
            }
        }
    }

    /// Full register value: slot contents concatenated.
    pub fn get(&self, interrupt: &AtomicBool) -> Result<Vec<u8>> {
        match self.kind {
            RegisterKind::Blackhole => Ok(Vec::new()),
            RegisterKind::Clipboard => self.clipboard_paste(interrupt),
            RegisterKind::Normal => Ok(self.slots.concat()),
        }
    }

    /// One slot's value. Callers with more consumers than slots cycle.
    pub fn slot_get(&self, slot: usize) -> Option<&[u8]> {
        self.slots.get(slot).map(|v| v.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_empty())
    }

    fn clipboard_copy(&self, data: &[u8], interrupt: &AtomicBool) -> Result<()> {
        let out = core_pipe::run_argv(
            &[self.clipboard_program.as_str(), "--copy"],
            Some(data),
            interrupt,
        )?;
        if out.success() {
            debug!(target: "register.clipboard", bytes = data.len(), "copied");
            Ok(())
        } else {
            Err(RegisterError::Clipboard {
                status: out.status,
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            })
        }
    }

    fn clipboard_paste(&self, interrupt: &AtomicBool) -> Result<Vec<u8>> {
        let out = core_pipe::run_argv(
            &[self.clipboard_program.as_str(), "--paste"],
            None,
            interrupt,
        )?;
        if out.success() {
            Ok(out.stdout)
        } else {
            Err(RegisterError::Clipboard {
                status: out.status,
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            })
        }
    }
}

/// Which register a command addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegisterName {
    #[default]
    Default,
    Named(char),
    Blackhole,
    Clipboard,
}

impl RegisterName {
    /// Map a register designator to its name; uppercase letters select the
    /// same register as their lowercase twin but request append mode.
    pub fn parse(c: char) -> Option<(Self, bool)> {
        match c {
            '_' => Some((Self::Blackhole, false)),
            '+' | '*' => Some((Self::Clipboard, false)),
            'a'..='z' => Some((Self::Named(c), false)),
            'A'..='Z' => Some((Self::Named(c.to_ascii_lowercase()), true)),
            _ => None,
        }
    }
}

/// The full register table: 26 named registers, a default, a blackhole and
/// the clipboard.
pub struct RegisterTable {
    default_reg: Register,
    named: [Register; 26],
    blackhole: Register,
    clipboard: Register,
}

impl Default for RegisterTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterTable {
    pub fn new() -> Self {
        Self {
            default_reg: Register::new(RegisterKind::Normal),
            named: std::array::from_fn(|_| Register::new(RegisterKind::Normal)),
            blackhole: Register::new(RegisterKind::Blackhole),
            clipboard: Register::new(RegisterKind::Clipboard),
        }
    }

    pub fn get(&self, name: RegisterName) -> &Register {
        match name {
            RegisterName::Default => &self.default_reg,
            RegisterName::Named(c) => &self.named[(c as u8 - b'a') as usize],
            RegisterName::Blackhole => &self.blackhole,
            RegisterName::Clipboard => &self.clipboard,
        }
    }

    pub fn get_mut(&mut self, name: RegisterName) -> &mut Register {
        match name {
            RegisterName::Default => &mut self.default_reg,
            RegisterName::Named(c) => &mut self.named[(c as u8 - b'a') as usize],
            RegisterName::Blackhole => &mut self.blackhole,
            RegisterName::Clipboard => &mut self.clipboard,
        }
    }
}
