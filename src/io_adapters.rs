//! Collaborators of the command loop: where lines come from and where
//! user-facing messages go.

use crate::error::Severity;
use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::rc::Rc;

/// Prompt shown by [`EditorSource`].
pub const SH_PROMPT: &str = "dsh> ";

/// Produces one line of input at a time.
pub trait LineSource {
    /// Return the next line without its line terminator, or `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>>;
}

/// Accepts user-facing warnings and errors.
pub trait MessageSink {
    fn report(&mut self, severity: Severity, message: &str);
}

/// Interactive terminal input with line editing and history.
pub struct EditorSource {
    editor: DefaultEditor,
    history: bool,
}

impl EditorSource {
    pub fn new(history: bool) -> Result<Self> {
        let editor = DefaultEditor::new().context("failed to initialize line editor")?;
        Ok(Self { editor, history })
    }
}

/// What one prompt produced.
#[derive(Debug, PartialEq, Eq)]
enum Prompted {
    Line(String),
    /// Ctrl-C: the partial line is dropped and the prompt shown again.
    Cancelled,
    Closed,
}

fn classify(result: rustyline::Result<String>) -> Result<Prompted> {
    match result {
        Ok(line) => Ok(Prompted::Line(line)),
        Err(ReadlineError::Interrupted) => Ok(Prompted::Cancelled),
        Err(ReadlineError::Eof) => Ok(Prompted::Closed),
        Err(err) => Err(err).context("failed to read line"),
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self) -> Result<Option<String>> {
        loop {
            match classify(self.editor.readline(SH_PROMPT))? {
                Prompted::Line(line) => {
                    if self.history && !line.trim().is_empty() {
                        self.editor.add_history_entry(line.as_str())?;
                    }
                    return Ok(Some(line));
                }
                Prompted::Cancelled => continue,
                Prompted::Closed => return Ok(None),
            }
        }
    }
}

/// Non-interactive input, e.g. a script piped into the shell.
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .context("failed to read line")?;
        if read == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

/// A fixed list of lines, used for `-c` and by tests.
#[derive(Debug, Default)]
pub struct ScriptSource {
    lines: VecDeque<String>,
}

impl ScriptSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl LineSource for ScriptSource {
    fn read_line(&mut self) -> Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

/// Warnings go to standard output and errors to standard error.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl MessageSink for ConsoleSink {
    fn report(&mut self, severity: Severity, message: &str) {
        // Nothing sensible is left to do if the terminal itself is gone.
        let _ = match severity {
            Severity::Warning => writeln!(std::io::stdout(), "{message}"),
            Severity::Error => writeln!(std::io::stderr(), "{message}"),
        };
    }
}

/// Memory-backed sink that records every message.
///
/// Cloning yields another handle to the same record, so a caller can hand one
/// clone to the interpreter and inspect the other afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemSink {
    messages: Rc<RefCell<Vec<(Severity, String)>>>,
}

impl MemSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far.
    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.messages.borrow().clone()
    }
}

impl MessageSink for MemSink {
    fn report(&mut self, severity: Severity, message: &str) {
        self.messages
            .borrow_mut()
            .push((severity, message.to_string()));
    }
}
