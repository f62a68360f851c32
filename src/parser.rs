use core::fmt;
use std::{mem, rc::Rc};

use itertools::Itertools;

use crate::{
    error::LambError,
    stack::ensure_sufficient_stack,
    tokenizer::{Keyword, Token, TokenKind, Tokenizer},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    And,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

const BINARY_OPERATORS: [(&str, BinaryOperator); 13] = [
    ("||", BinaryOperator::Or),
    ("&&", BinaryOperator::And),
    ("<", BinaryOperator::Less),
    (">", BinaryOperator::Greater),
    ("<=", BinaryOperator::LessEqual),
    (">=", BinaryOperator::GreaterEqual),
    ("==", BinaryOperator::Equal),
    ("!=", BinaryOperator::NotEqual),
    ("+", BinaryOperator::Add),
    ("-", BinaryOperator::Subtract),
    ("*", BinaryOperator::Multiply),
    ("/", BinaryOperator::Divide),
    ("%", BinaryOperator::Modulo),
];

impl BinaryOperator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        BINARY_OPERATORS.iter()
            .find(|(text, _)| *text == symbol)
            .map(|(_, operator)| *operator)
    }

    pub fn symbol(&self) -> &'static str {
        BINARY_OPERATORS.iter()
            .find(|(_, operator)| operator == self)
            .map(|(text, _)| *text)
            .unwrap_or_default()
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Binding power of every infix operator, assignment included. Operators
/// missing from this table cannot appear between two operands.
fn precedence(operator: &str) -> Option<u8> {
    Some(match operator {
        "=" => 1,
        "||" => 2,
        "&&" => 3,
        "<" | ">" | "<=" | ">=" | "==" | "!=" => 7,
        "+" | "-" => 10,
        "*" | "/" | "%" => 20,
        _ => return None,
    })
}

#[derive(Debug, PartialEq)]
pub struct LambdaNode {
    pub parameters: Vec<String>,
    pub body: Node,
}

// Lambda nodes are shared with the closures created from them
#[derive(Debug, PartialEq)]
pub enum Node {
    Number(f64),
    String(String),
    Boolean(bool),
    Variable(String),
    Assign { target: Box<Node>, value: Box<Node> },
    Binary { operator: BinaryOperator, left: Box<Node>, right: Box<Node> },
    If { condition: Box<Node>, then_branch: Box<Node>, else_branch: Option<Box<Node>> },
    Lambda(Rc<LambdaNode>),
    Call { callee: Box<Node>, arguments: Vec<Node> },
    Sequence(Vec<Node>),
}

impl Node {
    fn is_leaf(&self) -> bool {
        matches!(self, Self::Number(_) | Self::String(_) | Self::Boolean(_) | Self::Variable(_))
    }

    // Moves every child that has children of its own into `pending`
    fn take_children(&mut self, pending: &mut Vec<Node>) {
        let mut take = |child: &mut Node| {
            if !child.is_leaf() {
                pending.push(mem::replace(child, Node::Boolean(false)));
            }
        };

        match self {
            Self::Number(_) | Self::String(_) | Self::Boolean(_) | Self::Variable(_) => {}
            Self::Assign { target, value } => {
                take(target.as_mut());
                take(value.as_mut());
            }
            Self::Binary { left, right, .. } => {
                take(left.as_mut());
                take(right.as_mut());
            }
            Self::If { condition, then_branch, else_branch } => {
                take(condition.as_mut());
                take(then_branch.as_mut());
                if let Some(else_branch) = else_branch {
                    take(else_branch.as_mut());
                }
            }
            Self::Lambda(lambda) => {
                if let Some(lambda) = Rc::get_mut(lambda) {
                    take(&mut lambda.body);
                }
            }
            Self::Call { callee, arguments } => {
                take(callee.as_mut());
                arguments.iter_mut().for_each(take);
            }
            Self::Sequence(nodes) => nodes.iter_mut().for_each(take),
        }
    }
}

// Trees as deep as the input is long are torn down without recursion
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = vec![];
        self.take_children(&mut pending);
        while let Some(mut node) = pending.pop() {
            node.take_children(&mut pending);
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ensure_sufficient_stack(|| match self {
            Self::Number(number) => write!(f, "{}", number),
            Self::String(string) => write!(f, "{:?}", string),
            Self::Boolean(boolean) => write!(f, "{}", boolean),
            Self::Variable(name) => f.write_str(name),
            Self::Assign { target, value } => write!(f, "{} = {}", target, value),
            Self::Binary { operator, left, right } => write!(f, "({} {} {})", left, operator, right),
            Self::If { condition, then_branch, else_branch } => {
                write!(f, "if {} then {}", condition, then_branch)?;
                match else_branch {
                    Some(else_branch) => write!(f, " else {}", else_branch),
                    None => Ok(()),
                }
            }
            Self::Lambda(lambda) => write!(f, "lambda({}) {}", lambda.parameters.iter().join(", "), lambda.body),
            Self::Call { callee, arguments } => write!(f, "{}({})", callee, arguments.iter().join(", ")),
            Self::Sequence(nodes) => write!(f, "{{{}}}", nodes.iter().join("; ")),
        })
    }
}

type ParseResult<O> = Result<O, LambError>;

pub struct Parser<'a> {
    tokens: Tokenizer<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Tokenizer<'a>) -> Self {
        Self { tokens }
    }

    /// Parses the whole input into a [Node::Sequence] of top level expressions
    pub fn parse(&mut self) -> ParseResult<Node> {
        let mut program = vec![];

        while !self.tokens.eof()? {
            program.push(self.parse_expression()?);
            if !self.tokens.eof()? {
                self.skip_punctuation(';')?;
            }
        }

        Ok(Node::Sequence(program))
    }

    fn is_punctuation(&mut self, expected: char) -> ParseResult<bool> {
        Ok(matches!(
            self.tokens.peek()?,
            Some(Token { kind: TokenKind::Punctuation(ch), .. }) if *ch == expected
        ))
    }

    fn is_keyword(&mut self, expected: Keyword) -> ParseResult<bool> {
        Ok(matches!(
            self.tokens.peek()?,
            Some(Token { kind: TokenKind::Keyword(keyword), .. }) if *keyword == expected
        ))
    }

    fn expected(&mut self, what: String) -> LambError {
        let found = match self.tokens.peek() {
            Ok(Some(token)) => token.kind.to_string(),
            Ok(None) => "end of input".to_owned(),
            Err(error) => return error,
        };
        self.tokens.fail(format!("Expecting {} but found {}", what, found))
    }

    fn skip_punctuation(&mut self, expected: char) -> ParseResult<()> {
        if !self.is_punctuation(expected)? {
            return Err(self.expected(format!("punctuation {}", expected)));
        }
        self.tokens.next()?;
        Ok(())
    }

    fn skip_keyword(&mut self, expected: Keyword) -> ParseResult<()> {
        if !self.is_keyword(expected)? {
            return Err(self.expected(format!("keyword {}", expected.as_str())));
        }
        self.tokens.next()?;
        Ok(())
    }

    fn unexpected(&self, token: Option<Token>) -> LambError {
        match token {
            Some(token) => LambError::Syntax {
                message: format!("Unexpected token: {}", token.kind),
                pos: token.pos,
            },
            None => self.tokens.fail("Unexpected end of input"),
        }
    }

    /// Parses `start item (separator item)* stop`. A separator directly
    /// before `stop` is tolerated.
    fn delimited<O>(
        &mut self,
        start: char,
        stop: char,
        separator: char,
        mut parser: impl FnMut(&mut Self) -> ParseResult<O>,
    ) -> ParseResult<Vec<O>> {
        let mut result = vec![];
        let mut first = true;

        self.skip_punctuation(start)?;
        while !self.tokens.eof()? {
            if self.is_punctuation(stop)? {
                break;
            }

            if first {
                first = false;
            } else {
                self.skip_punctuation(separator)?;
            }

            if self.is_punctuation(stop)? {
                break;
            }

            result.push(parser(self)?);
        }
        self.skip_punctuation(stop)?;

        Ok(result)
    }

    fn parse_expression(&mut self) -> ParseResult<Node> {
        ensure_sufficient_stack(|| {
            let atom = self.parse_atom()?;
            let expression = self.maybe_binary(atom, 0)?;
            self.maybe_call(expression)
        })
    }

    /// Precedence climbing: fold operators binding tighter than
    /// `min_precedence` into `left`.
    fn maybe_binary(&mut self, mut left: Node, min_precedence: u8) -> ParseResult<Node> {
        loop {
            let (operator, pos) = match self.tokens.peek()? {
                Some(Token { kind: TokenKind::Operator(operator), pos }) => (operator.clone(), *pos),
                _ => return Ok(left),
            };
            let Some(precedence) = precedence(&operator) else {
                return Err(LambError::UnknownOperator { operator, pos });
            };
            if precedence <= min_precedence {
                return Ok(left);
            }
            self.tokens.next()?;

            let atom = self.parse_atom()?;
            left = match BinaryOperator::from_symbol(&operator) {
                Some(binary_operator) => Node::Binary {
                    operator: binary_operator,
                    left: Box::new(left),
                    right: Box::new(ensure_sufficient_stack(|| self.maybe_binary(atom, precedence))?),
                },
                // Assignment is the only non-binary entry and associates to the right
                None => Node::Assign {
                    target: Box::new(left),
                    value: Box::new(ensure_sufficient_stack(|| self.maybe_binary(atom, precedence - 1))?),
                },
            };
        }
    }

    fn maybe_call(&mut self, mut callee: Node) -> ParseResult<Node> {
        while self.is_punctuation('(')? {
            let arguments = self.delimited('(', ')', ',', Self::parse_expression)?;
            callee = Node::Call { callee: Box::new(callee), arguments };
        }
        Ok(callee)
    }

    fn parse_atom(&mut self) -> ParseResult<Node> {
        let atom = if self.is_punctuation('(')? {
            self.tokens.next()?;
            let expression = self.parse_expression()?;
            self.skip_punctuation(')')?;
            expression
        } else if self.is_punctuation('{')? {
            self.parse_block()?
        } else if self.is_keyword(Keyword::If)? {
            self.parse_if()?
        } else if self.is_keyword(Keyword::Lambda)? {
            self.tokens.next()?;
            self.parse_lambda()?
        } else {
            let token = self.tokens.next()?;
            match token {
                Some(Token { kind: TokenKind::Keyword(Keyword::True), .. }) => Node::Boolean(true),
                Some(Token { kind: TokenKind::Keyword(Keyword::False), .. }) => Node::Boolean(false),
                Some(Token { kind: TokenKind::Number(number), .. }) => Node::Number(number),
                Some(Token { kind: TokenKind::String(string), .. }) => Node::String(string),
                Some(Token { kind: TokenKind::Identifier(name), .. }) => Node::Variable(name),
                token => return Err(self.unexpected(token)),
            }
        };

        self.maybe_call(atom)
    }

    fn parse_block(&mut self) -> ParseResult<Node> {
        let mut program = self.delimited('{', '}', ';', Self::parse_expression)?;
        Ok(match program.len() {
            0 => Node::Boolean(false),
            1 => program.remove(0),
            _ => Node::Sequence(program),
        })
    }

    fn parse_if(&mut self) -> ParseResult<Node> {
        self.skip_keyword(Keyword::If)?;
        let condition = self.parse_expression()?;

        if !self.is_punctuation('{')? {
            self.skip_keyword(Keyword::Then)?;
        }
        let then_branch = self.parse_expression()?;

        let else_branch = if self.is_keyword(Keyword::Else)? {
            self.tokens.next()?;
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        Ok(Node::If {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch,
        })
    }

    fn parse_lambda(&mut self) -> ParseResult<Node> {
        let parameters = self.delimited('(', ')', ',', Self::parse_variable_name)?;
        let body = self.parse_expression()?;
        Ok(Node::Lambda(Rc::new(LambdaNode { parameters, body })))
    }

    fn parse_variable_name(&mut self) -> ParseResult<String> {
        match self.tokens.next()? {
            Some(Token { kind: TokenKind::Identifier(name), .. }) => Ok(name),
            Some(token) => Err(LambError::Syntax {
                message: format!("Expecting variable name but found {}", token.kind),
                pos: token.pos,
            }),
            None => Err(self.tokens.fail("Expecting variable name but found end of input")),
        }
    }
}

/// Lexes and parses `source` in one go.
pub fn parse(source: &str) -> ParseResult<Node> {
    Parser::new(Tokenizer::from_source(source)).parse()
}
