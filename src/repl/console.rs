//! The interactive front-end: a raw-mode line editor wired to the `db > `
//! prompt, the meta-command handler (`.exit`, `.constants`, `.btree`) and the
//! `INSERT`/`SELECT` statement dispatcher. None of this carries invariants of
//! its own — it only has to produce the exact output spec'd for each case.
use super::{buffer, prompt, status};
use crate::errors::Error;
use crate::session::Session;
use crate::sql::{self, Statement};
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Once;
use tracing::{error, info};

static INIT: Once = Once::new();

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Starts the REPL against the database file at `path`, handling raw-mode
/// setup/teardown and making sure the database is flushed on the way out.
pub fn start(path: PathBuf) -> Result<(), Error> {
    let session = Session::open(path)?;
    info!(path = %session.path.display(), "opened database");

    terminal::enable_raw_mode()?;
    execute!(io::stdout(), cursor::EnableBlinking)?;
    INIT.call_once(|| {
        std::panic::set_hook(Box::new(|_| {
            let _ = terminal::disable_raw_mode();
        }));
    });

    let mut console = Console::new(session);
    let result = console.run();
    terminal::disable_raw_mode()?;

    match result {
        Ok(ExitReason::Exit) => {
            console.session.close()?;
            info!("closed database");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

enum ExitReason {
    Exit,
}

struct Console {
    session: Session,
    prompt: prompt::Prompt,
    status: status::StatusBar,
}

impl Console {
    fn new(session: Session) -> Self {
        Console {
            session,
            prompt: prompt::Prompt::new(),
            status: status::StatusBar::new(),
        }
    }

    fn run(&mut self) -> Result<ExitReason, Error> {
        echo_line(format!("mysqlite {} — type .exit to quit", VERSION))?;

        let mut buffer = buffer::Buffer::new();

        loop {
            buffer.clear();
            self.prompt.start_prompt()?;

            let db_name = self
                .session
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
            self.status.update(db_name, Some(self.prompt.x), Some(self.prompt.y), Some(0));
            self.status.draw()?;

            match self.prompt.readline(&mut buffer, &mut self.status) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(ExitReason::Exit),
                Err(e) => return Err(Error::Io(e)),
            }

            let line = buffer.build();
            self.prompt.append_line(&line);

            if line.trim().is_empty() {
                continue;
            }

            if line.starts_with('.') {
                match self.run_meta_command(&line) {
                    MetaOutcome::Exit => return Ok(ExitReason::Exit),
                    MetaOutcome::Continue => continue,
                }
            }

            self.run_statement(&line)?;
        }
    }

    /// Dispatches a `.`-prefixed `line` as typed. Only the recognized-command
    /// comparison is trimmed; an unrecognized command is echoed back with the
    /// untrimmed original line, matching `db.c`'s `do_meta_command`, which
    /// echoes `input_buffer->buffer` verbatim rather than a trimmed copy.
    fn run_meta_command(&mut self, line: &str) -> MetaOutcome {
        match line.strip_prefix('.').unwrap_or(line).trim() {
            "exit" => MetaOutcome::Exit,
            "constants" => {
                echo_lines(self.session.database.constants().to_string());
                MetaOutcome::Continue
            }
            "btree" => {
                match self.session.database.dump_tree() {
                    Ok(dump) => echo_lines(dump),
                    Err(e) => echo_error(format!("{}\n", e)),
                }
                MetaOutcome::Continue
            }
            _ => {
                echo(format!("Unrecognized command '{}'.\n", line));
                MetaOutcome::Continue
            }
        }
    }

    fn run_statement(&mut self, line: &str) -> Result<(), Error> {
        match sql::parse(line) {
            Ok(Statement::Insert(row)) => match self.session.database.insert(row) {
                Ok(()) => echo("Executed.\n".into()),
                Err(Error::Duplicate(_)) => echo("Failed to insert, key already exists.\n".into()),
                Err(e) => {
                    error!("{}", e);
                    return Err(e);
                }
            },
            Ok(Statement::Select) => {
                let rows = self.session.database.select_all()?;
                for row in rows {
                    echo(format!("{}\n", row));
                }
                echo("Executed.\n".into());
            }
            Err(Error::Syntax(msg)) => echo_error(format!("{}\n", msg)),
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

enum MetaOutcome {
    Continue,
    Exit,
}

pub fn echo(s: String) {
    let _ = scroll_maybe(2).and_then(|y| {
        execute!(
            io::stdout(),
            cursor::MoveTo(0, y + 1),
            terminal::Clear(terminal::ClearType::UntilNewLine),
            Print(s)
        )
    });
    let _ = io::stdout().flush();
}

pub fn echo_line(s: String) -> io::Result<()> {
    let y = scroll_maybe(2)?;
    execute!(
        io::stdout(),
        cursor::MoveTo(0, y + 1),
        terminal::Clear(terminal::ClearType::UntilNewLine),
        Print(s)
    )?;
    io::stdout().flush()
}

pub fn echo_error(s: String) {
    let _ = scroll_maybe(2).and_then(|y| {
        execute!(
            io::stdout(),
            cursor::MoveTo(0, y + 1),
            terminal::Clear(terminal::ClearType::UntilNewLine),
            SetForegroundColor(Color::Red),
            Print(s),
            ResetColor,
        )
    });
    let _ = io::stdout().flush();
}

pub fn echo_lines(s: String) {
    for l in s.lines() {
        echo(format!("{}\n", l));
    }
}

/// Scrolls the terminal up if printing `reserved_lines` more would run past
/// the bottom of the screen, returning the (possibly adjusted) current row.
pub fn scroll_maybe(reserved_lines: u16) -> io::Result<u16> {
    let (_, y) = cursor::position()?;
    let (_, height) = terminal::size()?;
    let dest = y + reserved_lines;
    if dest >= height {
        let to_scroll = (dest - height + 1).max(1);
        execute!(io::stdout(), terminal::ScrollUp(to_scroll))?;
        return Ok(y.saturating_sub(to_scroll));
    }
    Ok(y)
}
