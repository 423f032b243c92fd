//! Console session integration tests
//!
//! Drives the public console API against the reference VM, one typed line at
//! a time.

use std::rc::Rc;

use sqconsole::console::{CapturePrintHandler, Console, ScriptEngine, ScriptError};
use sqconsole::vm::Vm;

struct Session {
    console: Console<Vm>,
    handler: Rc<CapturePrintHandler>,
}

impl Session {
    fn new() -> Self {
        let handler = Rc::new(CapturePrintHandler::new());
        let mut console = Console::new(Vm::new());
        console.set_print_handler(handler.clone());
        Self { console, handler }
    }

    /// Type `input` line by line; collect the outcome of every completed command
    fn type_lines(
        &mut self,
        input: &str,
    ) -> Vec<Result<String, ScriptError>> {
        let mut outcomes = Vec::new();
        for line in input.lines() {
            if self.console.feed(line) {
                outcomes.push(self.console.interpret_command());
            }
        }
        outcomes
    }

    fn value(
        &mut self,
        input: &str,
    ) -> String {
        match self.type_lines(input).pop() {
            Some(Ok(value)) => value,
            other => panic!("{:?} did not produce a value: {:?}", input, other),
        }
    }
}

#[test]
fn test_definitions_persist_across_commands() {
    let mut session = Session::new();
    let outcomes = session.type_lines(
        "counter <- 0
function bump(by) {
    counter += by
    return counter
}
bump(2)
bump(3)",
    );
    assert_eq!(outcomes.len(), 4);
    assert!(outcomes.iter().all(Result::is_ok));
    assert_eq!(session.value("= counter"), "5");
}

#[test]
fn test_table_object_with_methods() {
    let mut session = Session::new();
    session.type_lines(
        "account <- {
    balance = 10,
    function deposit(n) { this.balance += n; return this.balance }
}",
    );
    assert_eq!(session.value("= account.deposit(5)"), "15");
    assert_eq!(session.value("= account"), "{balance=15, deposit=(function : deposit)}");
}

#[test]
fn test_error_isolation_between_commands() {
    let mut session = Session::new();
    let outcomes = session.type_lines("= 1 / 0\n= { a = 1,\nb = 2 }\n= 40 + 2");
    assert_eq!(outcomes.len(), 3);
    assert_eq!(
        outcomes[0],
        Err(ScriptError::Runtime("division by zero".to_string()))
    );
    assert_eq!(outcomes[1].as_deref(), Ok("{a=1, b=2}"));
    assert_eq!(outcomes[2].as_deref(), Ok("42"));
    assert_eq!(session.console.engine().top(), 0);
}

#[test]
fn test_compile_error_position_spans_lines() {
    let mut session = Session::new();
    let outcomes = session.type_lines("if (1) {\nlocal = 3\n}");
    match &outcomes[..] {
        [Err(ScriptError::Compile {
            desc, file, line, ..
        })] => {
            assert_eq!(desc, "expected identifier, found =");
            assert_eq!(file, "repl");
            assert_eq!(*line, 2);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_print_and_error_builtins() {
    let mut session = Session::new();
    session.type_lines("for (local i = 0; i < 3; i += 1) print(i, \" \")\nerror(\"careful\")");
    assert_eq!(session.handler.take_output(), "0 1 2 ");
    assert_eq!(session.handler.take_errors(), vec!["careful".to_string()]);
}

#[test]
fn test_value_command_ignores_trailing_semicolons() {
    let mut session = Session::new();
    assert_eq!(session.value("= \"a\" + \"b\";;;"), "ab");
}

#[test]
fn test_stack_is_clean_after_every_command() {
    let mut session = Session::new();
    for line in ["= 1", "x <- [1, 2, 3]", "= x[7]", "= len(x)", "}"] {
        session.type_lines(line);
        assert_eq!(session.console.engine().top(), 0, "after {:?}", line);
        assert!(!session.console.is_executing());
        assert!(!session.console.accumulator().is_pending());
    }
}

#[test]
fn test_self_referencing_table_renders() {
    let mut session = Session::new();
    session.type_lines("t <- {}\nt.me <- t");
    assert_eq!(session.value("= t"), "{me=(cycle)}");
    assert_eq!(session.value("= tostring([t])"), "[{me=(cycle)}]");

    session.type_lines("print(t)");
    assert_eq!(session.handler.take_output(), "{me=(cycle)}");
    assert_eq!(session.value("= 1"), "1");
}

#[test]
fn test_deeply_nested_command_is_a_compile_error() {
    let mut session = Session::new();
    let depth = 100_000;
    let line = format!("= {}1{}", "(".repeat(depth), ")".repeat(depth));
    match session.type_lines(&line).as_slice() {
        [Err(ScriptError::Compile { desc, .. })] => {
            assert_eq!(desc, "expression too deeply nested")
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(session.value("= 2"), "2");
}

#[test]
fn test_library_run_entry_points() {
    sqconsole::run("local x = 1 + 1; assert(x == 2)").unwrap();

    let err = sqconsole::run("assert(false)").unwrap_err();
    assert!(err.to_string().contains("assertion failed"), "{:#}", err);

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("script.nut");
    std::fs::write(&path, "function f(n) { return n * 2 }\nassert(f(21) == 42)\n").unwrap();
    sqconsole::run_file(&path, sqconsole::vm::VmConfig::default()).unwrap();

    let missing = dir.path().join("missing.nut");
    let err = sqconsole::run_file(&missing, sqconsole::vm::VmConfig::default()).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to run"), "{:#}", err);
}
