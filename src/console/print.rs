//! Print handlers
//!
//! Script output is routed through a [`PrintHandler`]: one channel for normal
//! output (`print`), one for error output and one for compiler diagnostics.
//! Implementations are picked at construction time.

use std::cell::RefCell;
use std::io::{self, Stderr, Stdout, Write};

use owo_colors::OwoColorize;

/// Receiver of everything a script prints
pub trait PrintHandler {
    /// Normal output. `message` is written as-is, without a trailing newline.
    fn on_print(
        &self,
        message: &str,
    );

    /// Error output, one message per line
    fn on_error(
        &self,
        message: &str,
    );

    /// Compiler diagnostic
    fn on_compile_error(
        &self,
        desc: &str,
        source: &str,
        line: usize,
        column: usize,
    );
}

/// Writes normal output and errors to two text streams
#[derive(Debug)]
pub struct TextPrintHandler<O: Write, E: Write> {
    out: RefCell<O>,
    err: RefCell<E>,
    colors: bool,
}

impl TextPrintHandler<Stdout, Stderr> {
    /// Handler bound to the process' stdout and stderr
    pub fn stdio(colors: bool) -> Self {
        Self::new(io::stdout(), io::stderr()).with_colors(colors)
    }
}

impl<O: Write, E: Write> TextPrintHandler<O, E> {
    pub fn new(
        out: O,
        err: E,
    ) -> Self {
        Self {
            out: RefCell::new(out),
            err: RefCell::new(err),
            colors: false,
        }
    }

    /// Highlight error output
    pub fn with_colors(
        mut self,
        colors: bool,
    ) -> Self {
        self.colors = colors;
        self
    }

    /// Give back the underlying streams
    pub fn into_inner(self) -> (O, E) {
        (self.out.into_inner(), self.err.into_inner())
    }

    fn write_err_line(
        &self,
        line: &str,
    ) {
        let mut err = self.err.borrow_mut();
        // Output failures have nowhere to be reported.
        let _ = if self.colors {
            writeln!(err, "{}", line.red())
        } else {
            writeln!(err, "{}", line)
        };
        let _ = err.flush();
    }
}

impl<O: Write, E: Write> PrintHandler for TextPrintHandler<O, E> {
    fn on_print(
        &self,
        message: &str,
    ) {
        let mut out = self.out.borrow_mut();
        let _ = out.write_all(message.as_bytes());
        let _ = out.flush();
    }

    fn on_error(
        &self,
        message: &str,
    ) {
        self.write_err_line(message);
    }

    fn on_compile_error(
        &self,
        desc: &str,
        source: &str,
        line: usize,
        column: usize,
    ) {
        self.write_err_line(&format!(
            "{} in {} on line {} column {}",
            desc, source, line, column
        ));
    }
}

/// Keeps everything in memory, for embedding hosts that render output
/// themselves (and for tests)
#[derive(Debug, Default)]
pub struct CapturePrintHandler {
    output: RefCell<String>,
    errors: RefCell<Vec<String>>,
}

impl CapturePrintHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normal output collected so far
    pub fn output(&self) -> String {
        self.output.borrow().clone()
    }

    /// Error lines collected so far, compiler diagnostics included
    pub fn errors(&self) -> Vec<String> {
        self.errors.borrow().clone()
    }

    /// Drain normal output
    pub fn take_output(&self) -> String {
        std::mem::take(&mut *self.output.borrow_mut())
    }

    /// Drain error lines
    pub fn take_errors(&self) -> Vec<String> {
        std::mem::take(&mut *self.errors.borrow_mut())
    }
}

impl PrintHandler for CapturePrintHandler {
    fn on_print(
        &self,
        message: &str,
    ) {
        self.output.borrow_mut().push_str(message);
    }

    fn on_error(
        &self,
        message: &str,
    ) {
        self.errors.borrow_mut().push(message.to_string());
    }

    fn on_compile_error(
        &self,
        desc: &str,
        source: &str,
        line: usize,
        column: usize,
    ) {
        self.errors.borrow_mut().push(format!(
            "{} in {} on line {} column {}",
            desc, source, line, column
        ));
    }
}
