//! Error type tests

use crate::console::ScriptError;
use crate::vm::{CompileError, RuntimeError};

#[cfg(test)]
mod runtime_error_tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            RuntimeError::IndexNotFound("x".to_string()).to_string(),
            "the index 'x' does not exist"
        );
        assert_eq!(
            RuntimeError::Arithmetic {
                op: "+",
                lhs: "null",
                rhs: "table",
            }
            .to_string(),
            "arith op + on between 'null' and 'table'"
        );
        assert_eq!(RuntimeError::StackOverflow.to_string(), "stack overflow");
    }

    #[test]
    fn test_runtime_error_becomes_script_error() {
        let err: ScriptError = RuntimeError::DivisionByZero.into();
        assert_eq!(err, ScriptError::Runtime("division by zero".to_string()));
        assert!(!err.is_compile());
        assert_eq!(err.to_string(), "script error: division by zero");
    }
}

#[cfg(test)]
mod compile_error_tests {
    use super::*;

    #[test]
    fn test_label_is_attached() {
        let err = CompileError::new("expected ')'", 2, 7).into_script_error("repl");
        assert!(err.is_compile());
        assert_eq!(err.to_string(), "expected ')' in repl on line 2 column 7");
    }
}
