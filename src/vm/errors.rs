//! VM errors

use thiserror::Error;

use crate::console::ScriptError;

/// VM result
pub type VMResult<T> = Result<T, RuntimeError>;

/// Lexing or parsing failure, positioned 1-based
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{desc}")]
pub struct CompileError {
    pub desc: String,
    pub line: usize,
    pub column: usize,
}

impl CompileError {
    pub fn new(
        desc: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            desc: desc.into(),
            line,
            column,
        }
    }

    /// Attach the diagnostic label of the compiled source
    pub fn into_script_error(
        self,
        label: &str,
    ) -> ScriptError {
        ScriptError::Compile {
            desc: self.desc,
            file: label.to_string(),
            line: self.line,
            column: self.column,
        }
    }
}

/// Errors raised while running compiled code
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("the index '{0}' does not exist")]
    IndexNotFound(String),

    #[error("arith op {op} on between '{lhs}' and '{rhs}'")]
    Arithmetic {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("unary op {op} on '{operand}'")]
    Unary {
        op: &'static str,
        operand: &'static str,
    },

    #[error("comparison between '{0}' and '{1}'")]
    Comparison(&'static str, &'static str),

    #[error("division by zero")]
    DivisionByZero,

    #[error("attempt to call '{0}'")]
    NotCallable(&'static str),

    #[error("wrong number of parameters")]
    WrongParameterCount,

    #[error("trying to index '{0}'")]
    NotIndexable(&'static str),

    #[error("invalid key type '{0}'")]
    InvalidKey(&'static str),

    #[error("stack overflow")]
    StackOverflow,

    #[error("not enough values on the stack")]
    StackUnderflow,

    /// Raised by script or host code
    #[error("{0}")]
    Custom(String),
}

impl From<RuntimeError> for ScriptError {
    fn from(e: RuntimeError) -> Self {
        ScriptError::Runtime(e.to_string())
    }
}
