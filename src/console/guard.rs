//! Execution scope
//!
//! Every console command runs inside an [`ExecutionScope`]. Entering it raises
//! the session's [`ExecutionFlag`] and records the engine's stack depth;
//! dropping it, whether the command succeeded or failed, lowers the flag,
//! restores the stack depth and clears the pending command.

use std::cell::Cell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use tracing::debug;

use super::accumulator::CommandAccumulator;
use super::engine::ScriptEngine;

/// Shared "a command is running" marker.
///
/// Clones observe the same flag, so host callbacks invoked by a script can
/// detect that the console is already busy.
#[derive(Debug, Clone, Default)]
pub struct ExecutionFlag(Rc<Cell<bool>>);

impl ExecutionFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.get()
    }

    fn set(
        &self,
        value: bool,
    ) {
        self.0.set(value);
    }
}

/// Scoped access to the engine for the duration of one command
pub struct ExecutionScope<'a, E: ScriptEngine> {
    engine: &'a mut E,
    accumulator: &'a mut CommandAccumulator,
    flag: ExecutionFlag,
    top: usize,
}

impl<'a, E: ScriptEngine> ExecutionScope<'a, E> {
    pub fn enter(
        engine: &'a mut E,
        accumulator: &'a mut CommandAccumulator,
        flag: &ExecutionFlag,
    ) -> Self {
        flag.set(true);
        let top = engine.top();
        Self {
            engine,
            accumulator,
            flag: flag.clone(),
            top,
        }
    }

    /// Stack depth recorded on entry
    pub fn entry_top(&self) -> usize {
        self.top
    }
}

impl<E: ScriptEngine> Deref for ExecutionScope<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.engine
    }
}

impl<E: ScriptEngine> DerefMut for ExecutionScope<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        self.engine
    }
}

impl<E: ScriptEngine> Drop for ExecutionScope<'_, E> {
    fn drop(&mut self) {
        self.flag.set(false);
        let residue = self.engine.top().saturating_sub(self.top);
        self.engine.set_top(self.top);
        self.accumulator.clear();
        debug!(top = self.top, residue, "released execution scope");
    }
}
