use core::{fmt, str::FromStr};

use thiserror::Error;

use crate::cursor::Pos;

/// Every way lexing, parsing or evaluating a program can fail. None of
/// them are recoverable: the unit of work in progress is abandoned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LambError {
    #[error("{message} ({pos})")]
    Syntax { message: String, pos: Pos },

    #[error("Unknown operator: {operator} ({pos})")]
    UnknownOperator { operator: String, pos: Pos },

    #[error("Undefined variable {0}")]
    UndefinedVariable(String),

    #[error("Expected number but got {0}")]
    TypeError(String),

    #[error("Divide by zero")]
    DivideByZero,

    #[error("Cannot assign to {0}")]
    InvalidAssignTarget(String),

    #[error("{0} is not callable")]
    NotCallable(String),

    #[error("Maximum call depth of {0} exceeded")]
    StackOverflow(usize),

    #[error("Failed to write output: {0}")]
    Output(String),
}

impl LambError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax { .. } => ErrorKind::SyntaxError,
            Self::UnknownOperator { .. } => ErrorKind::UnknownOperator,
            Self::UndefinedVariable(_) => ErrorKind::UndefinedVariable,
            Self::TypeError(_) => ErrorKind::TypeError,
            Self::DivideByZero => ErrorKind::DivideByZero,
            Self::InvalidAssignTarget(_) => ErrorKind::InvalidAssignTarget,
            Self::NotCallable(_) => ErrorKind::NotCallable,
            Self::StackOverflow(_) => ErrorKind::StackOverflow,
            Self::Output(_) => ErrorKind::Output,
        }
    }

    /// Location in the source, for lex and parse failures.
    pub fn pos(&self) -> Option<Pos> {
        match self {
            Self::Syntax { pos, .. } | Self::UnknownOperator { pos, .. } => Some(*pos),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LambError {
    fn from(error: std::io::Error) -> Self {
        Self::Output(error.to_string())
    }
}

/// Payload-free classification of a [LambError]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SyntaxError,
    UnknownOperator,
    UndefinedVariable,
    TypeError,
    DivideByZero,
    InvalidAssignTarget,
    NotCallable,
    StackOverflow,
    Output,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for ErrorKind {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Ok(match name {
            "SyntaxError" => Self::SyntaxError,
            "UnknownOperator" => Self::UnknownOperator,
            "UndefinedVariable" => Self::UndefinedVariable,
            "TypeError" => Self::TypeError,
            "DivideByZero" => Self::DivideByZero,
            "InvalidAssignTarget" => Self::InvalidAssignTarget,
            "NotCallable" => Self::NotCallable,
            "StackOverflow" => Self::StackOverflow,
            "Output" => Self::Output,
            other => return Err(format!("Unrecognized error kind: {}", other)),
        })
    }
}
