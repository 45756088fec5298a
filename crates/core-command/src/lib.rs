//! Structural command language.
//!
//! Commands in the `sam` tradition: composable addresses resolve to byte
//! ranges, verbs edit or inspect them, and loops (`x`, `y`) with filters
//! (`g`, `v`) apply sub-commands structurally across every match of a regex
//! instead of line by line. Multi-selection batches and loop iterations
//! collect their targets before mutating and commit in descending start
//! order so earlier offsets stay valid while later ones change.

mod address;
mod interp;
mod parser;
mod pattern;

pub use address::{Address, Simple};
pub use interp::{CommandContext, RunResult, run};
pub use parser::{Command, Template, Verb, parse};
pub use pattern::Pattern;

use thiserror::Error;

/// Everything a command can fail with. Failed commands leave the buffer in
/// the state it had before the command started.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("bad address")]
    Address,
    #[error("command requires an address")]
    NoAddress,
    #[error("unmatched brace")]
    UnmatchedBrace,
    #[error("bad regex: {0}")]
    Regex(String),
    #[error("bad text argument")]
    Text,
    #[error("shell: {0}")]
    Shell(String),
    #[error("bad or missing filename")]
    Filename,
    #[error("unknown command `{0}`")]
    Command(char),
    #[error("{0}")]
    Execute(String),
    #[error("position out of range")]
    OutOfRange,
    #[error("unsaved changes")]
    UnsavedChanges,
}

pub type Result<T> = std::result::Result<T, CommandError>;

impl From<core_text::TextError> for CommandError {
    fn from(err: core_text::TextError) -> Self {
        match err {
            core_text::TextError::OutOfRange => CommandError::OutOfRange,
            other => CommandError::Execute(other.to_string()),
        }
    }
}
