#![no_main]

use core::fmt;
use std::{cell::RefCell, rc::Rc};

use itertools::Itertools;
use libfuzzer_sys::{arbitrary::Arbitrary, fuzz_target};

// Builtins and loads from variables
#[derive(Arbitrary, Debug)]
enum LambAtom {
    True, False,
    Print, Println, Log,
    Variable(u8),
    Number(u16),
    String(String),
}

impl fmt::Display for LambAtom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LambAtom::True => write!(f, "true"),
            LambAtom::False => write!(f, "false"),
            LambAtom::Print => write!(f, "print"),
            LambAtom::Println => write!(f, "println"),
            LambAtom::Log => write!(f, "log"),
            // A small pool of names so that programs actually share bindings
            LambAtom::Variable(index) => write!(f, "v{}", index % 4),
            LambAtom::Number(value) => write!(f, "{}", value),
            LambAtom::String(value) => write!(f, "\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\"")),
        }
    }
}

#[derive(Arbitrary, Debug)]
enum LambOperator {
    Assign, Or, And,
    Less, Greater, LessEq, GreaterEq, Eq, NotEq,
    Add, Sub, Mul, Div, Mod,
}

impl fmt::Display for LambOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            LambOperator::Assign => "=",
            LambOperator::Or => "||",
            LambOperator::And => "&&",
            LambOperator::Less => "<",
            LambOperator::Greater => ">",
            LambOperator::LessEq => "<=",
            LambOperator::GreaterEq => ">=",
            LambOperator::Eq => "==",
            LambOperator::NotEq => "!=",
            LambOperator::Add => "+",
            LambOperator::Sub => "-",
            LambOperator::Mul => "*",
            LambOperator::Div => "/",
            LambOperator::Mod => "%",
        })
    }
}

#[derive(Arbitrary, Debug)]
enum LambExpression {
    Binary(Box<LambExpression>, LambOperator, Box<LambExpression>),
    If(Box<LambExpression>, Box<LambExpression>, Option<Box<LambExpression>>),
    Lambda(Vec<u8>, Box<LambExpression>),
    Call(Box<LambExpression>, Vec<LambExpression>),
    Block(Vec<LambExpression>),

    Atom(LambAtom),
}

fn stringify_list(values: &[LambExpression], separator: &str) -> String {
    values.iter()
        .map(LambExpression::to_string)
        .join(separator)
}

impl fmt::Display for LambExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LambExpression::Atom(atom) => atom.fmt(f),
            LambExpression::Binary(left, operator, right) => write!(f, "({} {} {})", left, operator, right),
            LambExpression::If(condition, then, None) => write!(f, "if {} then {}", condition, then),
            LambExpression::If(condition, then, Some(otherwise)) =>
                write!(f, "if {} then {} else {}", condition, then, otherwise),
            LambExpression::Lambda(parameters, body) => {
                let parameters = parameters.iter().map(|index| format!("v{}", index % 4)).join(", ");
                write!(f, "lambda({}) {}", parameters, body)
            }
            LambExpression::Call(callee, arguments) => write!(f, "({})({})", callee, stringify_list(arguments, ", ")),
            LambExpression::Block(expressions) => write!(f, "{{ {} }}", stringify_list(expressions, "; ")),
        }
    }
}

fuzz_target!(|program: Vec<LambExpression>| {
    let source = stringify_list(&program, ";\n");

    let buffer = Rc::new(RefCell::new(Vec::new()));
    let config = lamb::Config { max_call_depth: 64, ..lamb::Config::default() };
    let mut context = lamb::EvaluationContext::with_output(lamb::Output::new(buffer), config);

    // Generated programs always parse; evaluation may fail but must not panic
    if let Err(lamb::LambError::Syntax { message, pos }) = context.evaluate_str(&source) {
        panic!("{} at {} in:\n{}", message, pos, source);
    }
});
