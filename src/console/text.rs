//! Text console
//!
//! A prompting read/eval/print driver over a [`Console`]. Lines come from a
//! [`LineSource`]; results and diagnostics go to the session's print handler.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rustyline::config::Config;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, warn};

use super::engine::{ScriptEngine, ScriptError};
use super::print::PrintHandler;
use super::Console;

/// Source of input lines
pub trait LineSource {
    /// Show `prompt` and read one line without its terminator.
    /// `None` means end of input.
    fn read_line(
        &mut self,
        prompt: &str,
    ) -> io::Result<Option<String>>;
}

/// Reads lines from any buffered reader, echoing prompts to a writer
#[derive(Debug)]
pub struct BufReadLineSource<R: BufRead, W: Write> {
    reader: R,
    prompt_out: W,
}

impl<R: BufRead, W: Write> BufReadLineSource<R, W> {
    pub fn new(
        reader: R,
        prompt_out: W,
    ) -> Self {
        Self { reader, prompt_out }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.prompt_out)
    }
}

impl<R: BufRead, W: Write> LineSource for BufReadLineSource<R, W> {
    fn read_line(
        &mut self,
        prompt: &str,
    ) -> io::Result<Option<String>> {
        self.prompt_out.write_all(prompt.as_bytes())?;
        self.prompt_out.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
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

/// Line editor with history, for interactive terminals
pub struct EditorLineSource {
    editor: DefaultEditor,
    history_file: Option<PathBuf>,
}

impl EditorLineSource {
    pub fn new(
        history_file: Option<PathBuf>,
        history_size: usize,
    ) -> Result<Self, ReadlineError> {
        let config = Config::builder()
            .max_history_size(history_size)?
            .history_ignore_space(true)
            .auto_add_history(false)
            .build();
        let mut editor = DefaultEditor::with_config(config)?;

        if let Some(path) = history_file.as_deref() {
            if path.exists() {
                if let Err(e) = editor.load_history(path) {
                    warn!("could not load history from {}: {}", path.display(), e);
                }
            }
        }

        Ok(Self {
            editor,
            history_file,
        })
    }

    pub fn history_file(&self) -> Option<&Path> {
        self.history_file.as_deref()
    }
}

impl LineSource for EditorLineSource {
    fn read_line(
        &mut self,
        prompt: &str,
    ) -> io::Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Eof) => Ok(None),
            // Ctrl-C behaves like an empty line
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Io(e)) => Err(e),
            Err(e) => Err(io::Error::other(e.to_string())),
        }
    }
}

impl Drop for EditorLineSource {
    fn drop(&mut self) {
        if let Some(path) = self.history_file.as_deref() {
            if let Some(dir) = path.parent() {
                let _ = std::fs::create_dir_all(dir);
            }
            if let Err(e) = self.editor.save_history(path) {
                warn!("could not save history to {}: {}", path.display(), e);
            }
        }
    }
}

/// How the prompt reflects the pending command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptStyle {
    /// Leading prompt text
    pub prompt: String,
    /// Repeated once per open brace block
    pub depth_marker: String,
    /// Appended while inside an unterminated string
    pub string_marker: String,
}

impl Default for PromptStyle {
    fn default() -> Self {
        Self {
            prompt: ">".to_string(),
            depth_marker: ">".to_string(),
            string_marker: "...".to_string(),
        }
    }
}

impl PromptStyle {
    pub fn render(
        &self,
        depth: i32,
        in_string: bool,
    ) -> String {
        let mut prompt = self.prompt.clone();
        for _ in 0..depth.max(0) {
            prompt.push_str(&self.depth_marker);
        }
        if in_string {
            prompt.push_str(&self.string_marker);
        }
        prompt.push(' ');
        prompt
    }
}

/// Read/eval/print driver
pub struct TextConsole<E: ScriptEngine, L: LineSource> {
    console: Console<E>,
    lines: L,
    handler: Rc<dyn PrintHandler>,
    style: PromptStyle,
}

impl<E: ScriptEngine, L: LineSource> TextConsole<E, L> {
    /// Bind `engine` to a new session printing through `handler`
    pub fn new(
        engine: E,
        lines: L,
        handler: Rc<dyn PrintHandler>,
    ) -> Self {
        let mut console = Console::new(engine);
        console.set_print_handler(Rc::clone(&handler));
        Self {
            console,
            lines,
            handler,
            style: PromptStyle::default(),
        }
    }

    pub fn with_prompt_style(
        mut self,
        style: PromptStyle,
    ) -> Self {
        self.style = style;
        self
    }

    /// Prompt for the next line, reflecting block depth and open strings
    pub fn prompt(&self) -> String {
        let acc = self.console.accumulator();
        self.style
            .render(acc.brace_depth(), acc.quote_mode().is_open())
    }

    /// Read one complete command, run it and report the outcome.
    ///
    /// Returns `Ok(false)` once input is exhausted.
    pub fn reps(&mut self) -> io::Result<bool> {
        loop {
            let prompt = self.prompt();
            match self.lines.read_line(&prompt)? {
                None => return Ok(false),
                Some(line) => {
                    if self.console.feed(&line) {
                        break;
                    }
                }
            }
        }

        let wants_value = self.console.accumulator().expects_value();
        match self.console.interpret_command() {
            Ok(result) => {
                // Statement commands print nothing, not even a blank line.
                if wants_value {
                    self.handler.on_print(&format!("{}\n", result));
                }
            }
            Err(ScriptError::Compile {
                desc,
                file,
                line,
                column,
            }) => {
                debug!(%desc, line, column, "console command failed to compile");
                self.handler.on_compile_error(&desc, &file, line, column);
            }
            Err(e) => {
                debug!(error = %e, "console command failed");
                self.handler.on_error(&e.to_string());
            }
        }
        Ok(true)
    }

    /// Run commands until end of input
    pub fn repl(&mut self) -> io::Result<()> {
        while self.reps()? {}
        Ok(())
    }

    pub fn console(&self) -> &Console<E> {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut Console<E> {
        &mut self.console
    }

    pub fn into_parts(self) -> (Console<E>, L) {
        (self.console, self.lines)
    }
}
