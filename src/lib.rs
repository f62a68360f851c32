mod builtin;
mod config;
mod context;
mod cursor;
mod environment;
mod error;
mod interpreter;
mod parser;
mod stack;
mod tokenizer;

#[cfg(test)]
mod test_utils;

pub use builtin::Output;
pub use config::{Config, ConfigError};
pub use context::EvaluationContext;
pub use cursor::{CharacterCursor, Pos};
pub use environment::{Environment, ScopeId};
pub use error::{ErrorKind, LambError};
pub use interpreter::{evaluate, Builtin, BuiltinFn, CallStack, Closure, EvaluationResult, Function, LambValue};
pub use parser::{parse, BinaryOperator, LambdaNode, Node, Parser};
pub use tokenizer::{Keyword, Token, TokenKind, Tokenizer};
