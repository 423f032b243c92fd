//! Reference script engine
//!
//! A small Squirrel-flavoured language evaluated by walking the syntax tree
//! over an explicit working stack. It implements [`ScriptEngine`], so a
//! [`Console`](crate::console::Console) can drive it.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod value;

mod builtins;
mod errors;
mod executor;

use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::Context;
use indexmap::IndexMap;
use tracing::debug;

use crate::console::{PrintHandler, ScriptEngine, ScriptError};

pub use ast::FunctionDef;
pub use errors::{CompileError, RuntimeError, VMResult};
pub use value::{format_float, Closure, NativeFn, NativeFunction, Table, TableKey, Value};

/// VM configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Working stack capacity reserved up front
    pub initial_stack_size: usize,
    /// Nested script calls allowed before `stack overflow`
    pub max_call_depth: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            initial_stack_size: 1024,
            max_call_depth: 256,
        }
    }
}

/// Script engine instance: working stack, root table and output handler
pub struct Vm {
    stack: Vec<Value>,
    root: Table,
    print_handler: Option<Rc<dyn PrintHandler>>,
    config: VmConfig,
    /// Script functions currently executing
    depth: usize,
}

impl fmt::Debug for Vm {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Vm")
            .field("top", &self.stack.len())
            .field("globals", &self.root.borrow().len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        let mut vm = Self {
            stack: Vec::with_capacity(config.initial_stack_size),
            root: Rc::new(RefCell::new(IndexMap::new())),
            print_handler: None,
            config,
            depth: 0,
        };
        for &(name, func) in builtins::BUILTINS {
            vm.register_function(name, func);
        }
        vm
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn print_handler(&self) -> Option<Rc<dyn PrintHandler>> {
        self.print_handler.clone()
    }

    /// Expose a host function to scripts as a global
    pub fn register_function(
        &mut self,
        name: &'static str,
        func: NativeFn,
    ) {
        self.set_global(name, Value::Native(NativeFunction { name, func }));
    }

    pub fn set_global(
        &mut self,
        name: &str,
        value: Value,
    ) {
        self.root.borrow_mut().insert(TableKey::from(name), value);
    }

    pub fn global(
        &self,
        name: &str,
    ) -> Option<Value> {
        self.root.borrow().get(&TableKey::from(name)).cloned()
    }

    pub fn root_table(&self) -> Table {
        Rc::clone(&self.root)
    }

    pub fn push(
        &mut self,
        value: Value,
    ) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> VMResult<Value> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Stack slot by index: non-negative from the bottom, negative from the
    /// top (`-1` is the top)
    pub fn get(
        &self,
        idx: isize,
    ) -> Option<&Value> {
        let index = if idx < 0 {
            self.stack.len().checked_sub(idx.unsigned_abs())?
        } else {
            idx as usize
        };
        self.stack.get(index)
    }

    /// Compile and run `source` against the root table, returning its value
    /// and leaving the stack as it was
    pub fn eval(
        &mut self,
        source: &str,
        label: &str,
    ) -> Result<Value, ScriptError> {
        let top = self.top();
        let result = self.run_chunk(source, label, true);
        let value = match result {
            Ok(()) => self.pop().map_err(ScriptError::from),
            Err(e) => Err(e),
        };
        self.set_top(top);
        value
    }

    /// Compile and run `source` for its effects, leaving the stack as it was
    pub fn exec(
        &mut self,
        source: &str,
        label: &str,
    ) -> Result<(), ScriptError> {
        let top = self.top();
        let result = self.run_chunk(source, label, false);
        self.set_top(top);
        result
    }

    /// Run a script file
    pub fn do_file(
        &mut self,
        path: &Path,
    ) -> anyhow::Result<()> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read script: {}", path.display()))?;
        self.exec(&source, &path.display().to_string())?;
        Ok(())
    }

    fn run_chunk(
        &mut self,
        source: &str,
        label: &str,
        want_return: bool,
    ) -> Result<(), ScriptError> {
        self.compile(source, label)?;
        self.push_root_table();
        self.call(1, want_return)
    }
}

impl ScriptEngine for Vm {
    fn top(&self) -> usize {
        self.stack.len()
    }

    fn set_top(
        &mut self,
        top: usize,
    ) {
        self.stack.resize(top, Value::Null);
    }

    fn push_root_table(&mut self) {
        self.stack.push(Value::Table(Rc::clone(&self.root)));
    }

    fn compile(
        &mut self,
        source: &str,
        label: &str,
    ) -> Result<(), ScriptError> {
        let body = parser::parse(source).map_err(|e| {
            debug!(label, line = e.line, column = e.column, "compile error: {}", e);
            e.into_script_error(label)
        })?;
        let def = FunctionDef {
            name: Some(Rc::from("main")),
            params: Vec::new(),
            variadic: true,
            body,
        };
        self.stack.push(Value::Closure(Rc::new(Closure {
            def: Rc::new(def),
            source: Rc::from(label),
        })));
        Ok(())
    }

    fn call(
        &mut self,
        params: usize,
        want_return: bool,
    ) -> Result<(), ScriptError> {
        self.call_on_stack(params, want_return).map_err(|e| {
            debug!("runtime error: {}", e);
            ScriptError::from(e)
        })
    }

    fn render_top(&self) -> String {
        self.stack.last().map_or_else(|| "null".to_string(), Value::to_string)
    }

    fn set_print_handler(
        &mut self,
        handler: Rc<dyn PrintHandler>,
    ) {
        self.print_handler = Some(handler);
    }
}

#[cfg(test)]
mod tests;
