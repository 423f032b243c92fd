//! sqconsole
//!
//! An embeddable interactive console for a Squirrel-flavoured scripting
//! engine. Lines are accumulated until they form a complete command, commands
//! typed as `= expr` are rewritten to return their value, and every command
//! runs inside a scope that restores the engine's stack afterwards.
//!
//! # Example
//!
//! ```no_run
//! use std::rc::Rc;
//!
//! use sqconsole::console::{CapturePrintHandler, Console};
//! use sqconsole::vm::Vm;
//!
//! let mut console = Console::new(Vm::new());
//! console.set_print_handler(Rc::new(CapturePrintHandler::new()));
//! if console.feed("= 1 + 1") {
//!     assert_eq!(console.interpret_command().unwrap(), "2");
//! }
//! ```

#![warn(rust_2018_idioms)]

// Public modules
pub mod console;
pub mod vm;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use thiserror::Error;

use std::path::Path;
use std::rc::Rc;

use tracing::debug;

use crate::console::TextPrintHandler;
use crate::vm::{Vm, VmConfig};

/// Package version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Program name
pub const NAME: &str = "sqconsole";

/// Run a chunk of script source with output on stdout/stderr
///
/// # Example
///
/// ```no_run
/// use sqconsole::{run, Result};
///
/// fn main() -> Result<()> {
///     run("print(\"Hello, World!\\n\")")?;
///     Ok(())
/// }
/// ```
pub fn run(source: &str) -> Result<()> {
    debug!("run called");
    let mut vm = Vm::new();
    install_stdio_handler(&mut vm);
    vm.exec(source, "main")?;
    Ok(())
}

/// Run a script file with output on stdout/stderr
pub fn run_file(
    path: &Path,
    config: VmConfig,
) -> Result<()> {
    debug!("running file {}", path.display());
    let mut vm = Vm::with_config(config);
    install_stdio_handler(&mut vm);
    vm.do_file(path)
        .with_context(|| format!("Failed to run: {}", path.display()))
}

fn install_stdio_handler(vm: &mut Vm) {
    use crate::console::ScriptEngine;

    vm.set_print_handler(Rc::new(TextPrintHandler::stdio(false)));
}
