//! Tessera entrypoint: CLI parsing, config discovery, logging setup, and
//! the single-threaded event loop (draw, block on the next key, dispatch).

mod config;
mod editor;

use anyhow::{Context, Result};
use clap::Parser;
use core_terminal::{CrosstermBackend, InputEvent};
use core_text::Text;
use editor::Editor;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Exit codes of the wrapper.
const EXIT_OK: u8 = 0;
const EXIT_STARTUP: u8 = 1;
const EXIT_UNSAVED: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "tessera", disable_version_flag = true, disable_help_flag = true)]
struct Args {
    /// Print version and exit.
    #[arg(short = 'v', long = "version")]
    version: bool,
    #[arg(long = "help", action = clap::ArgAction::Help)]
    help: Option<bool>,
    /// `-` reads the initial buffer from stdin; `+N` moves to line N of the
    /// first file; everything else is a file name.
    #[arg(value_name = "file")]
    inputs: Vec<String>,
}

struct Startup {
    text: Text,
    path: Option<PathBuf>,
    lineno: Option<usize>,
}

fn load_startup(args: &Args) -> Result<Startup> {
    let mut lineno = None;
    let mut from_stdin = false;
    let mut files: Vec<&str> = Vec::new();
    for input in &args.inputs {
        if input == "-" {
            from_stdin = true;
        } else if let Some(n) = input.strip_prefix('+') {
            lineno = Some(n.parse::<usize>().context("bad +lineno argument")?);
        } else {
            files.push(input);
        }
    }
    // A single buffer for now; remaining file arguments wait for `e`.
    let (text, path) = if from_stdin {
        let stdin = std::io::stdin();
        (Text::from_reader(stdin.lock())?, None)
    } else if let Some(first) = files.first() {
        let path = PathBuf::from(first);
        let text =
            Text::load(&path).with_context(|| format!("cannot load {}", path.display()))?;
        (text, Some(path))
    } else {
        (Text::new(), None)
    };
    Ok(Startup { text, path, lineno })
}

/// Route tracing to a file when `TESSERA_LOG` asks for it; logging to the
/// terminal would scribble over the alternate screen.
fn init_logging() -> Option<WorkerGuard> {
    let filter = std::env::var("TESSERA_LOG").ok()?;
    let dir = dirs::cache_dir()?.join("tessera");
    std::fs::create_dir_all(&dir).ok()?;
    let appender = tracing_appender::rolling::never(dir, "tessera.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}

fn main() -> ExitCode {
    let args = Args::parse();
    if args.version {
        println!("tessera {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::from(EXIT_OK);
    }
    let _log_guard = init_logging();

    let startup = match load_startup(&args) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("tessera: {err:#}");
            return ExitCode::from(EXIT_STARTUP);
        }
    };
    match run(startup) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            error!(target: "runtime", error = %err, "fatal");
            eprintln!("tessera: {err:#}");
            ExitCode::from(EXIT_STARTUP)
        }
    }
}

fn run(startup: Startup) -> Result<u8> {
    let (config, config_err) = config::load();
    let (cols, rows) = core_terminal::size().unwrap_or((80, 24));
    let mut editor = Editor::new(startup.text, startup.path, cols, rows, &config);
    if let Some(n) = startup.lineno {
        editor.jump_to_line(n);
    }

    let mut backend = CrosstermBackend::new();
    let mut guard = backend.guard()?;
    info!(target: "runtime", cols, rows, "startup");
    if let Some(msg) = config_err {
        // Surfaced on the status line; a broken config is not fatal.
        editor.set_status(msg);
    }

    let poll = config.escdelay().as_millis().clamp(10, 1000) as u64;
    loop {
        editor.draw(guard.backend())?;
        match core_terminal::read_key(poll) {
            Ok(Some(InputEvent::Key(key))) => editor.handle(InputEvent::Key(key)),
            Ok(Some(InputEvent::Resize(c, r))) => editor.handle(InputEvent::Resize(c, r)),
            Ok(None) => {}
            Err(err) => {
                // Input stream gone (terminal died). Nothing more to do.
                error!(target: "runtime", error = %err, "input stream failed");
                return Ok(if editor.modified() {
                    EXIT_UNSAVED
                } else {
                    EXIT_OK
                });
            }
        }
        if let Some(code) = editor.quit_code() {
            info!(target: "runtime", code, "quit");
            return Ok(code as u8);
        }
    }
}
