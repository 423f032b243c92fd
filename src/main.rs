//! sqconsole - CLI

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqconsole::console::{
    BufReadLineSource, EditorLineSource, LineSource, PrintHandler, TextConsole, TextPrintHandler,
};
use sqconsole::util::config::{load_config, load_config_from, ConsoleConfig};
use sqconsole::util::logger::{self, LogLevel};
use sqconsole::vm::Vm;
use sqconsole::{run_file, NAME, VERSION};
use tracing::debug;

/// Interactive console for a Squirrel-flavoured scripting engine
#[derive(Parser, Debug)]
#[command(name = "sqconsole")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the user config)
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Neither load nor save line history
    #[arg(long, global = true)]
    no_history: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the interactive console (default)
    Repl,

    /// Run a script file
    Run {
        /// Script file to run
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Feed code through the console line by line, printing each result
    Eval {
        /// Code to evaluate
        #[arg(value_name = "CODE")]
        code: String,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_with_level(LogLevel::for_verbosity(args.verbose));
    debug!(version = VERSION, host = std::env::consts::OS, "starting");

    let config = match &args.config {
        Some(path) => load_config_from(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => load_config().context("Failed to load user config")?,
    };

    match args.command.unwrap_or(Commands::Repl) {
        Commands::Repl => repl(&config, args.no_history)?,
        Commands::Run { file } => run_file(&file, config.vm.to_vm_config())?,
        Commands::Eval { code } => {
            let lines = BufReadLineSource::new(code.as_bytes(), io::sink());
            drive(&config, lines, false)?;
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}

fn repl(
    config: &ConsoleConfig,
    no_history: bool,
) -> Result<()> {
    if !io::stdin().is_terminal() {
        let lines = BufReadLineSource::new(io::stdin().lock(), io::sink());
        return drive(config, lines, false);
    }

    let history = if no_history {
        None
    } else {
        config.repl.resolved_history_file()
    };
    let lines = EditorLineSource::new(history, config.repl.history_size)
        .context("Failed to start line editor")?;
    let colors = config.repl.colors && io::stderr().is_terminal();
    println!("{} {}", NAME, VERSION);
    drive(config, lines, colors)
}

/// Run console commands from `lines` until input ends
fn drive<L: LineSource>(
    config: &ConsoleConfig,
    lines: L,
    colors: bool,
) -> Result<()> {
    let handler: Rc<dyn PrintHandler> = Rc::new(TextPrintHandler::stdio(colors));
    let vm = Vm::with_config(config.vm.to_vm_config());
    let mut console =
        TextConsole::new(vm, lines, handler).with_prompt_style(config.repl.prompt_style());

    console.repl().context("Console input failed")?;
    if console.console().accumulator().is_pending() {
        debug!("input ended inside an unfinished command");
    }
    Ok(())
}
