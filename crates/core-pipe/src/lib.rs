//! External-process pipe helper.
//!
//! Runs a shell command with piped stdio, feeding it an optional input while
//! draining stdout and stderr concurrently. Draining happens on two scoped
//! threads so a child that floods either stream can never deadlock against
//! our stdin writes; stdin is closed as soon as the input is exhausted. The
//! child is always reaped before returning.
//!
//! Cancellation: an interrupt flag (set by the event loop on Ctrl-C) is
//! checked between stdin write chunks; on interrupt the child is killed and
//! the run reports `Interrupted`.

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PipeError {
    #[error("failed to spawn `{cmd}`: {source}")]
    Spawn {
        cmd: String,
        source: std::io::Error,
    },
    #[error("io error talking to `{cmd}`: {source}")]
    Io {
        cmd: String,
        source: std::io::Error,
    },
    #[error("`{cmd}` interrupted")]
    Interrupted { cmd: String },
}

pub type Result<T> = std::result::Result<T, PipeError>;

/// Outcome of a completed (not interrupted) run.
#[derive(Debug)]
pub struct PipeOutput {
    /// Exit status; -1 when the child died to a signal.
    pub status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl PipeOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Size of one stdin write burst between interrupt checks.
const WRITE_CHUNK: usize = 8 * 1024;

/// Run `sh -c cmd`, feeding `input` (if any) to its stdin.
pub fn run(cmd: &str, input: Option<&[u8]>, interrupt: &AtomicBool) -> Result<PipeOutput> {
    run_argv(&["sh", "-c", cmd], input, interrupt)
}

/// Run an explicit argv, feeding `input` (if any) to its stdin.
pub fn run_argv(argv: &[&str], input: Option<&[u8]>, interrupt: &AtomicBool) -> Result<PipeOutput> {
    let cmd_display = argv.join(" ");
    let mut child = Command::new(argv[0])
        .args(&argv[1..])
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| PipeError::Spawn {
            cmd: cmd_display.clone(),
            source,
        })?;

    let io_err = |source| PipeError::Io {
        cmd: cmd_display.clone(),
        source,
    };

    let mut stdout_pipe = child.stdout.take().expect("stdout is piped");
    let mut stderr_pipe = child.stderr.take().expect("stderr is piped");
    let mut stdin_pipe = child.stdin.take();

    let mut interrupted = false;

    let drain_result = std::thread::scope(|scope| {
        let out_handle = scope.spawn(|| {
            let mut buf = Vec::new();
            stdout_pipe.read_to_end(&mut buf).map(|_| buf)
        });
        let err_handle = scope.spawn(|| {
            let mut buf = Vec::new();
            stderr_pipe.read_to_end(&mut buf).map(|_| buf)
        });

        // Feed stdin on this thread while the drains run; a full pipe blocks
        // us here, never the child.
        let mut write_result = Ok(());
        if let (Some(stdin), Some(data)) = (stdin_pipe.as_mut(), input) {
            for chunk in data.chunks(WRITE_CHUNK) {
                if interrupt.load(Ordering::Relaxed) {
                    interrupted = true;
                    break;
                }
                match stdin.write_all(chunk) {
                    Ok(()) => {}
                    // The child may legitimately stop reading early
                    // (e.g. `head`); that is not an error.
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => break,
                    Err(e) => {
                        write_result = Err(e);
                        break;
                    }
                }
            }
        }
        // Close stdin so the child sees EOF.
        drop(stdin_pipe.take());

        if interrupted {
            let _ = child.kill();
        }

        let stdout_res = out_handle.join().expect("stdout drain panicked");
        let stderr_res = err_handle.join().expect("stderr drain panicked");
        (write_result, stdout_res, stderr_res)
    });

    let (write_result, stdout_res, stderr_res) = drain_result;
    let stdout = match stdout_res {
        Ok(buf) => buf,
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(io_err(e));
        }
    };
    let stderr = stderr_res.unwrap_or_default();

    let status = child.wait().map_err(io_err)?;
    if interrupted {
        warn!(target: "pipe.spawn", cmd = %cmd_display, "interrupted");
        return Err(PipeError::Interrupted { cmd: cmd_display });
    }
    write_result.map_err(io_err)?;

    let code = status.code().unwrap_or(-1);
    debug!(target: "pipe.spawn", cmd = %cmd_display, status = code, out = stdout.len(), err = stderr.len(), "reaped");
    Ok(PipeOutput {
        status: code,
        stdout,
        stderr,
    })
}
