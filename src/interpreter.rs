use core::fmt;
use std::rc::Rc;

use itertools::Itertools;

use crate::{
    environment::{Environment, ScopeId},
    error::LambError,
    parser::{BinaryOperator, LambdaNode, Node},
    stack::ensure_sufficient_stack,
};

pub type EvaluationResult = Result<LambValue, LambError>;

/// Signature shared by every host provided function: evaluated arguments
/// in, one value out.
pub type BuiltinFn = dyn Fn(Vec<LambValue>) -> EvaluationResult;

/// A runtime value
#[derive(Clone)]
pub enum LambValue {
    Number(f64),
    String(Rc<str>),
    Boolean(bool),
    Function(Function),
}

impl LambValue {
    /// Only `false` is falsy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Boolean(false))
    }

    pub fn builtin(name: &str, function: impl Fn(Vec<LambValue>) -> EvaluationResult + 'static) -> Self {
        Self::Function(Function::Builtin(Rc::new(Builtin {
            name: name.to_owned(),
            function: Box::new(function),
        })))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Boolean(_) => "boolean",
            Self::Function(_) => "function",
        }
    }
}

impl From<f64> for LambValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for LambValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for LambValue {
    fn from(value: &str) -> Self {
        Self::String(Rc::from(value))
    }
}

// No coercion across kinds, functions compare by identity
impl PartialEq for LambValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for LambValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{}", number),
            Self::String(string) => f.write_str(string),
            Self::Boolean(boolean) => write!(f, "{}", boolean),
            Self::Function(function) => write!(f, "{}", function),
        }
    }
}

impl fmt::Debug for LambValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(string) => write!(f, "{:?}", string),
            other => fmt::Display::fmt(other, f),
        }
    }
}

pub struct Builtin {
    name: String,
    function: Box<BuiltinFn>,
}

impl Builtin {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A lambda together with the scope it was created in
pub struct Closure {
    lambda: Rc<LambdaNode>,
    scope: ScopeId,
}

impl Closure {
    pub fn parameters(&self) -> &[String] {
        &self.lambda.parameters
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    fn evaluate(&self, mut arguments: Vec<LambValue>, environment: &mut Environment, stack: &mut CallStack) -> EvaluationResult {
        stack.enter()?;

        // Missing arguments are bound to false, surplus ones are dropped
        arguments.resize(self.lambda.parameters.len(), LambValue::Boolean(false));

        let scope = environment.extend(self.scope);
        for (parameter, value) in self.lambda.parameters.iter().zip(arguments) {
            environment.def(scope, parameter, value);
        }

        tracing::trace!(depth = stack.depth(), parameters = %self.parameters().iter().join(", "), "calling closure");
        let result = evaluate(&self.lambda.body, scope, environment, stack);
        environment.release(scope);
        stack.leave();

        result
    }
}

#[derive(Clone)]
pub enum Function {
    Builtin(Rc<Builtin>),
    Lambda(Rc<Closure>),
}

impl Function {
    pub fn call(&self, arguments: Vec<LambValue>, environment: &mut Environment, stack: &mut CallStack) -> EvaluationResult {
        match self {
            Self::Builtin(builtin) => {
                tracing::trace!(name = %builtin.name, arguments = arguments.len(), "calling builtin");
                (builtin.function)(arguments)
            }
            Self::Lambda(closure) => closure.evaluate(arguments, environment, stack),
        }
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        match (self, other) {
            (Self::Builtin(a), Self::Builtin(b)) => Rc::ptr_eq(a, b),
            (Self::Lambda(a), Self::Lambda(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(builtin) => write!(f, "builtin({})", builtin.name),
            Self::Lambda(closure) => write!(f, "lambda({})", closure.parameters().iter().join(", ")),
        }
    }
}

/// Tracks how deeply closure calls are nested.
#[derive(Debug)]
pub struct CallStack {
    depth: usize,
    max_depth: usize,
}

impl CallStack {
    pub fn new(max_depth: usize) -> Self {
        Self { depth: 0, max_depth }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn enter(&mut self) -> Result<(), LambError> {
        if self.depth >= self.max_depth {
            return Err(LambError::StackOverflow(self.max_depth));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }
}

fn expect_number(value: &LambValue) -> Result<f64, LambError> {
    match value {
        LambValue::Number(number) => Ok(*number),
        other => Err(LambError::TypeError(format!("{} {:?}", other.type_name(), other))),
    }
}

fn expect_divisor(value: &LambValue) -> Result<f64, LambError> {
    match expect_number(value)? {
        divisor if divisor == 0.0 => Err(LambError::DivideByZero),
        divisor => Ok(divisor),
    }
}

fn apply_operator(operator: BinaryOperator, left: LambValue, right: LambValue) -> EvaluationResult {
    use BinaryOperator::*;

    Ok(match operator {
        Add => LambValue::Number(expect_number(&left)? + expect_number(&right)?),
        Subtract => LambValue::Number(expect_number(&left)? - expect_number(&right)?),
        Multiply => LambValue::Number(expect_number(&left)? * expect_number(&right)?),
        Divide => LambValue::Number(expect_number(&left)? / expect_divisor(&right)?),
        Modulo => LambValue::Number(expect_number(&left)? % expect_divisor(&right)?),
        And => if left.is_truthy() { right } else { left },
        Or => if left.is_truthy() { left } else { right },
        Less => LambValue::Boolean(expect_number(&left)? < expect_number(&right)?),
        Greater => LambValue::Boolean(expect_number(&left)? > expect_number(&right)?),
        LessEqual => LambValue::Boolean(expect_number(&left)? <= expect_number(&right)?),
        GreaterEqual => LambValue::Boolean(expect_number(&left)? >= expect_number(&right)?),
        Equal => LambValue::Boolean(left == right),
        NotEqual => LambValue::Boolean(left != right),
    })
}

fn evaluate_call(
    callee: &Node,
    arguments: &[Node],
    scope: ScopeId,
    environment: &mut Environment,
    stack: &mut CallStack,
) -> EvaluationResult {
    let callee = evaluate(callee, scope, environment, stack)?;
    let arguments = arguments.iter()
        .map(|argument| evaluate(argument, scope, environment, stack))
        .collect::<Result<Vec<_>, _>>()?;

    match callee {
        LambValue::Function(function) => function.call(arguments, environment, stack),
        other => Err(LambError::NotCallable(format!("{} {:?}", other.type_name(), other))),
    }
}

fn evaluate_node(node: &Node, scope: ScopeId, environment: &mut Environment, stack: &mut CallStack) -> EvaluationResult {
    match node {
        Node::Number(number) => Ok(LambValue::Number(*number)),
        Node::String(string) => Ok(LambValue::from(string.as_str())),
        Node::Boolean(boolean) => Ok(LambValue::Boolean(*boolean)),
        Node::Variable(name) => environment.get(scope, name),
        Node::Assign { target, value } => match target.as_ref() {
            Node::Variable(name) => {
                let value = evaluate(value, scope, environment, stack)?;
                environment.set(scope, name, value)
            }
            other => Err(LambError::InvalidAssignTarget(other.to_string())),
        },
        // Both operands are evaluated before the operator applies, `&&` and
        // `||` included
        Node::Binary { operator, left, right } => {
            let left = evaluate(left, scope, environment, stack)?;
            let right = evaluate(right, scope, environment, stack)?;
            apply_operator(*operator, left, right)
        }
        Node::If { condition, then_branch, else_branch } => {
            if evaluate(condition, scope, environment, stack)?.is_truthy() {
                evaluate(then_branch, scope, environment, stack)
            } else {
                match else_branch {
                    Some(else_branch) => evaluate(else_branch, scope, environment, stack),
                    None => Ok(LambValue::Boolean(false)),
                }
            }
        }
        Node::Lambda(lambda) => {
            environment.capture(scope);
            Ok(LambValue::Function(Function::Lambda(Rc::new(Closure {
                lambda: lambda.clone(),
                scope,
            }))))
        }
        Node::Call { callee, arguments } => evaluate_call(callee, arguments, scope, environment, stack),
        Node::Sequence(nodes) => nodes.iter()
            .try_fold(LambValue::Boolean(false), |_, node| evaluate(node, scope, environment, stack)),
    }
}

/// Evaluates `node` in `scope` of `environment`.
pub fn evaluate(node: &Node, scope: ScopeId, environment: &mut Environment, stack: &mut CallStack) -> EvaluationResult {
    ensure_sufficient_stack(|| evaluate_node(node, scope, environment, stack))
}
