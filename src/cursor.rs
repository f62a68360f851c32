use core::fmt;
use std::{iter::Peekable, str::Chars};

use crate::error::LambError;

/// A location in the source text. Lines start at 1, the column is the
/// number of characters already consumed on the current line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Hands out the source one character at a time while keeping track of
/// where it is, so that lexing and parsing failures can be located.
pub struct CharacterCursor<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> CharacterCursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 0,
        }
    }

    pub fn next(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// `None` once the input is exhausted
    pub fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    pub fn eof(&mut self) -> bool {
        self.peek().is_none()
    }

    pub fn pos(&self) -> Pos {
        Pos {
            line: self.line,
            column: self.column,
        }
    }

    /// Consumes characters for as long as `predicate` holds and returns them.
    pub fn read_while(&mut self, mut predicate: impl FnMut(char) -> bool) -> String {
        let mut result = String::new();
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            result.push(ch);
            self.next();
        }
        result
    }

    /// Builds a syntax error located at the current position.
    pub fn fail(&self, message: impl Into<String>) -> LambError {
        LambError::Syntax {
            message: message.into(),
            pos: self.pos(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_lines_and_columns() {
        let mut cursor = CharacterCursor::new("ab\ncd");
        assert_eq!(cursor.pos(), Pos { line: 1, column: 0 });

        assert_eq!(cursor.next(), Some('a'));
        assert_eq!(cursor.next(), Some('b'));
        assert_eq!(cursor.pos(), Pos { line: 1, column: 2 });

        assert_eq!(cursor.next(), Some('\n'));
        assert_eq!(cursor.pos(), Pos { line: 2, column: 0 });

        assert_eq!(cursor.next(), Some('c'));
        assert_eq!(cursor.pos(), Pos { line: 2, column: 1 });
    }

    #[test]
    fn peek_does_not_advance() {
        let mut cursor = CharacterCursor::new("x");
        assert_eq!(cursor.peek(), Some('x'));
        assert_eq!(cursor.peek(), Some('x'));
        assert_eq!(cursor.pos().column, 0);
        assert!(!cursor.eof());

        cursor.next();
        assert!(cursor.eof());
        assert_eq!(cursor.peek(), None);
        assert_eq!(cursor.next(), None);
        assert_eq!(cursor.pos().column, 1);
    }

    #[test]
    fn read_while_stops_at_first_mismatch() {
        let mut cursor = CharacterCursor::new("123abc");
        assert_eq!(cursor.read_while(|ch| ch.is_ascii_digit()), "123");
        assert_eq!(cursor.peek(), Some('a'));
    }

    #[test]
    fn fail_reports_current_position() {
        let mut cursor = CharacterCursor::new("a\nbc");
        cursor.next();
        cursor.next();
        cursor.next();

        let error = cursor.fail("boom");
        assert_eq!(error.pos(), Some(Pos { line: 2, column: 1 }));
        assert_eq!(error.to_string(), "boom (2:1)");
    }
}
