//! Interactive console
//!
//! This module contains:
//! - [`accumulator::CommandAccumulator`] - Decides when typed lines form a complete command
//! - [`interpreter::prepare_source`] - Rewrites `= expr` commands into `return (expr)`
//! - [`guard::ExecutionScope`] - Stack and buffer hygiene around one command
//! - [`engine::ScriptEngine`] - What the console needs from a script engine
//! - [`print::PrintHandler`] - Output channels for script output and diagnostics
//! - [`text::TextConsole`] - Prompting read/eval/print driver

pub mod accumulator;
pub mod engine;
pub mod guard;
pub mod interpreter;
pub mod print;
pub mod text;

use std::rc::Rc;

use tracing::debug;

pub use accumulator::{CommandAccumulator, QuoteMode};
pub use engine::{ScriptEngine, ScriptError, REPL_SOURCE_LABEL};
pub use guard::{ExecutionFlag, ExecutionScope};
pub use interpreter::prepare_source;
pub use print::{CapturePrintHandler, PrintHandler, TextPrintHandler};
pub use text::{BufReadLineSource, EditorLineSource, LineSource, PromptStyle, TextConsole};

/// One console session: an accumulator bound to a script engine
#[derive(Debug)]
pub struct Console<E: ScriptEngine> {
    engine: E,
    accumulator: CommandAccumulator,
    executing: ExecutionFlag,
}

impl<E: ScriptEngine> Console<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            accumulator: CommandAccumulator::new(),
            executing: ExecutionFlag::new(),
        }
    }

    /// Route the engine's output to `handler`
    pub fn set_print_handler(
        &mut self,
        handler: Rc<dyn PrintHandler>,
    ) {
        self.engine.set_print_handler(handler);
    }

    /// Feed one typed line; `true` means a command is ready for
    /// [`interpret_command`](Self::interpret_command)
    pub fn feed(
        &mut self,
        line: &str,
    ) -> bool {
        self.accumulator.feed(line)
    }

    /// Run the accumulated command.
    ///
    /// Returns the rendered value for `= expr` commands and an empty string
    /// otherwise. The pending command is cleared whatever the outcome.
    pub fn interpret_command(&mut self) -> Result<String, ScriptError> {
        let expects_value = self.accumulator.expects_value();
        let source = prepare_source(self.accumulator.buffer(), expects_value);
        debug!(%source, expects_value, "interpreting console command");

        let mut scope = ExecutionScope::enter(
            &mut self.engine,
            &mut self.accumulator,
            &self.executing,
        );
        scope.push_root_table();
        scope.compile(&source, REPL_SOURCE_LABEL)?;
        scope.push_root_table();
        scope.call(1, expects_value)?;

        if expects_value {
            Ok(scope.render_top())
        } else {
            Ok(String::new())
        }
    }

    /// A command is currently running
    pub fn is_executing(&self) -> bool {
        self.executing.is_set()
    }

    /// Handle on the "currently executing" flag, for host callbacks
    pub fn execution_flag(&self) -> ExecutionFlag {
        self.executing.clone()
    }

    pub fn accumulator(&self) -> &CommandAccumulator {
        &self.accumulator
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }
}

#[cfg(test)]
mod tests;
