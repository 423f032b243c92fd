//! Script engine boundary
//!
//! The console never evaluates script source itself. Everything it needs from
//! the interpreter is expressed by [`ScriptEngine`], a stack-oriented API in
//! the style of embeddable scripting VMs: values are pushed onto a working
//! stack, a compiled unit is invoked with its receiver on top, and the result
//! (if requested) is left on the stack for rendering.

use std::rc::Rc;

use thiserror::Error;

use super::print::PrintHandler;

/// Label used for diagnostics of commands typed at the console.
pub const REPL_SOURCE_LABEL: &str = "repl";

/// Script errors surfaced by an engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    /// Source is not syntactically valid
    #[error("{desc} in {file} on line {line} column {column}")]
    Compile {
        desc: String,
        file: String,
        line: usize,
        column: usize,
    },

    /// A valid command failed while running
    #[error("script error: {0}")]
    Runtime(String),
}

impl ScriptError {
    /// Build a runtime error from anything printable
    pub fn runtime(message: impl Into<String>) -> Self {
        ScriptError::Runtime(message.into())
    }

    /// Whether this error was raised by the compiler
    pub fn is_compile(&self) -> bool {
        matches!(self, ScriptError::Compile { .. })
    }
}

/// Capabilities the console consumes from the external interpreter.
pub trait ScriptEngine {
    /// Current depth of the working stack
    fn top(&self) -> usize;

    /// Truncate (or pad with nulls) the working stack to `top` entries
    fn set_top(
        &mut self,
        top: usize,
    );

    /// Push the global/root table, used as the receiver of console commands
    fn push_root_table(&mut self);

    /// Compile `source` and push the resulting invocable unit
    fn compile(
        &mut self,
        source: &str,
        label: &str,
    ) -> Result<(), ScriptError>;

    /// Invoke the unit below `params` arguments (receiver included).
    ///
    /// Pops the callee and its arguments; pushes exactly one result when
    /// `want_return` is set.
    fn call(
        &mut self,
        params: usize,
        want_return: bool,
    ) -> Result<(), ScriptError>;

    /// Render the value on top of the stack. Must not fail.
    fn render_top(&self) -> String;

    /// Install the handler receiving script output
    fn set_print_handler(
        &mut self,
        handler: Rc<dyn PrintHandler>,
    );
}
