use core::fmt;

use crate::{cursor::{CharacterCursor, Pos}, error::LambError};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If,
    Then,
    Else,
    Lambda,
    True,
    False,
}

const KEYWORDS: [(&str, Keyword); 6] = [
    ("if", Keyword::If),
    ("then", Keyword::Then),
    ("else", Keyword::Else),
    ("lambda", Keyword::Lambda),
    ("true", Keyword::True),
    ("false", Keyword::False),
];

impl Keyword {
    fn from_identifier(identifier: &str) -> Option<Self> {
        KEYWORDS.iter()
            .find(|(text, _)| *text == identifier)
            .map(|(_, keyword)| *keyword)
    }

    pub fn as_str(&self) -> &'static str {
        KEYWORDS.iter()
            .find(|(_, keyword)| keyword == self)
            .map(|(text, _)| *text)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    String(String),
    Identifier(String),
    Keyword(Keyword),
    Punctuation(char),
    Operator(String),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "number {}", number),
            Self::String(string) => write!(f, "string {:?}", string),
            Self::Identifier(identifier) => write!(f, "identifier {}", identifier),
            Self::Keyword(keyword) => write!(f, "keyword {}", keyword.as_str()),
            Self::Punctuation(punctuation) => write!(f, "punctuation {}", punctuation),
            Self::Operator(operator) => write!(f, "operator {}", operator),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Pos,
}

fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r')
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_lowercase() || ch == '_'
}

fn is_identifier(ch: char) -> bool {
    is_identifier_start(ch) || ch.is_ascii_digit() || "?!-<>=".contains(ch)
}

fn is_punctuation(ch: char) -> bool {
    ",;(){}[]".contains(ch)
}

fn is_operator(ch: char) -> bool {
    "+-*/%=&|<>!".contains(ch)
}

/// Turns a [CharacterCursor] into a lazy stream of tokens with a single
/// token of lookahead.
pub struct Tokenizer<'a> {
    input: CharacterCursor<'a>,
    current: Option<Token>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: CharacterCursor<'a>) -> Self {
        Self { input, current: None }
    }

    pub fn from_source(source: &'a str) -> Self {
        Self::new(CharacterCursor::new(source))
    }

    pub fn next(&mut self) -> Result<Option<Token>, LambError> {
        match self.current.take() {
            Some(token) => Ok(Some(token)),
            None => self.read_next(),
        }
    }

    pub fn peek(&mut self) -> Result<Option<&Token>, LambError> {
        if self.current.is_none() {
            self.current = self.read_next()?;
        }
        Ok(self.current.as_ref())
    }

    pub fn eof(&mut self) -> Result<bool, LambError> {
        Ok(self.peek()?.is_none())
    }

    /// Position of the buffered token if there is one, otherwise of the cursor
    pub fn pos(&self) -> Pos {
        self.current.as_ref()
            .map(|token| token.pos)
            .unwrap_or_else(|| self.input.pos())
    }

    pub fn fail(&self, message: impl Into<String>) -> LambError {
        LambError::Syntax { message: message.into(), pos: self.pos() }
    }

    fn read_next(&mut self) -> Result<Option<Token>, LambError> {
        let ch = loop {
            self.input.read_while(is_whitespace);
            match self.input.peek() {
                None => return Ok(None),
                Some('#') => self.skip_comment(),
                Some(ch) => break ch,
            }
        };
        let pos = self.input.pos();

        let kind = if ch == '"' {
            self.read_string()?
        } else if ch.is_ascii_digit() {
            self.read_number()
        } else if is_identifier_start(ch) {
            self.read_identifier()
        } else if is_punctuation(ch) {
            self.input.next();
            TokenKind::Punctuation(ch)
        } else if is_operator(ch) {
            TokenKind::Operator(self.input.read_while(is_operator))
        } else {
            return Err(self.input.fail(format!("Can't handle character: {}", ch)));
        };

        Ok(Some(Token { kind, pos }))
    }

    fn skip_comment(&mut self) {
        self.input.read_while(|ch| ch != '\n');
        self.input.next();
    }

    fn read_number(&mut self) -> TokenKind {
        let mut has_dot = false;
        let number = self.input.read_while(|ch| {
            if ch == '.' {
                if has_dot { return false; }
                has_dot = true;
                return true;
            }
            ch.is_ascii_digit()
        });

        // Digits with at most one dot always form a valid float literal
        TokenKind::Number(number.parse().unwrap_or_default())
    }

    fn read_identifier(&mut self) -> TokenKind {
        let identifier = self.input.read_while(is_identifier);
        match Keyword::from_identifier(&identifier) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier(identifier),
        }
    }

    fn read_string(&mut self) -> Result<TokenKind, LambError> {
        self.input.next();

        let mut escaped = false;
        let mut string = String::new();
        while let Some(ch) = self.input.next() {
            if escaped {
                string.push(ch);
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                return Ok(TokenKind::String(string));
            } else {
                string.push(ch);
            }
        }

        Err(self.input.fail("Unterminated string literal"))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token, LambError>;

    fn next(&mut self) -> Option<Self::Item> {
        Tokenizer::next(self).transpose()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::error::ErrorKind;

    use super::*;

    fn kinds(source: &str) -> Result<Vec<TokenKind>, LambError> {
        Tokenizer::from_source(source)
            .map(|token| token.map(|token| token.kind))
            .collect()
    }

    fn identifier(name: &str) -> TokenKind {
        TokenKind::Identifier(name.to_owned())
    }

    fn operator(op: &str) -> TokenKind {
        TokenKind::Operator(op.to_owned())
    }

    #[test]
    fn tokenizes_an_assignment() -> anyhow::Result<()> {
        assert_eq!(kinds("x = 5;")?, vec![
            identifier("x"),
            operator("="),
            TokenKind::Number(5.0),
            TokenKind::Punctuation(';'),
        ]);
        Ok(())
    }

    #[test]
    fn classifies_keywords() -> anyhow::Result<()> {
        assert_eq!(kinds("if then else lambda true false iffy")?, vec![
            TokenKind::Keyword(Keyword::If),
            TokenKind::Keyword(Keyword::Then),
            TokenKind::Keyword(Keyword::Else),
            TokenKind::Keyword(Keyword::Lambda),
            TokenKind::Keyword(Keyword::True),
            TokenKind::Keyword(Keyword::False),
            identifier("iffy"),
        ]);
        Ok(())
    }

    #[test]
    fn identifiers_may_contain_operator_characters() -> anyhow::Result<()> {
        assert_eq!(kinds("empty? set! a-b x2 _w <=")?, vec![
            identifier("empty?"),
            identifier("set!"),
            identifier("a-b"),
            identifier("x2"),
            identifier("_w"),
            operator("<="),
        ]);
        Ok(())
    }

    #[test]
    fn operators_are_greedy() -> anyhow::Result<()> {
        assert_eq!(kinds("a<=b && c!=d")?, vec![
            identifier("a<=b"),
            operator("&&"),
            identifier("c!=d"),
        ]);
        assert_eq!(kinds("1 <= 2 == 3 ||4")?, vec![
            TokenKind::Number(1.0),
            operator("<="),
            TokenKind::Number(2.0),
            operator("=="),
            TokenKind::Number(3.0),
            operator("||"),
            TokenKind::Number(4.0),
        ]);
        Ok(())
    }

    #[test]
    fn numbers_take_at_most_one_dot() -> anyhow::Result<()> {
        assert_eq!(kinds("3.25 7 1.")?, vec![
            TokenKind::Number(3.25),
            TokenKind::Number(7.0),
            TokenKind::Number(1.0),
        ]);

        // The second dot ends the number and is not a valid token on its own
        let error = kinds("1.2.3").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::SyntaxError);
        assert_eq!(error.pos(), Some(Pos { line: 1, column: 3 }));
        Ok(())
    }

    #[test]
    fn strings_take_escaped_characters_literally() -> anyhow::Result<()> {
        assert_eq!(kinds(r#""a \"quoted\" \n \\ word""#)?, vec![
            TokenKind::String(r#"a "quoted" n \ word"#.to_owned()),
        ]);
        assert_eq!(kinds(r#""""#)?, vec![TokenKind::String(String::new())]);
        Ok(())
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let error = kinds("\"abc").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::SyntaxError);
        assert!(error.to_string().contains("Unterminated"));
    }

    #[test]
    fn comments_and_whitespace_are_skipped() -> anyhow::Result<()> {
        let source = "# leading comment\n  a # trailing\n\t# another\r\nb # at end";
        assert_eq!(kinds(source)?, vec![identifier("a"), identifier("b")]);
        assert_eq!(kinds("# only a comment")?, vec![]);
        assert_eq!(kinds("")?, vec![]);
        Ok(())
    }

    #[test]
    fn punctuation_is_single_character() -> anyhow::Result<()> {
        assert_eq!(
            kinds("(){}[],;")?,
            "(){}[],;".chars().map(TokenKind::Punctuation).collect::<Vec<_>>()
        );
        Ok(())
    }

    #[test]
    fn unknown_character_is_located() {
        let error = kinds("a\n  @").unwrap_err();
        assert_eq!(error.to_string(), "Can't handle character: @ (2:2)");

        // Identifiers start lowercase
        assert_eq!(kinds("Abc").unwrap_err().kind(), ErrorKind::SyntaxError);
    }

    #[test]
    fn tokens_record_their_start() -> anyhow::Result<()> {
        let tokens = Tokenizer::from_source("foo\n  bar").collect::<Result<Vec<_>, _>>()?;
        assert_eq!(tokens[0].pos, Pos { line: 1, column: 0 });
        assert_eq!(tokens[1].pos, Pos { line: 2, column: 2 });
        Ok(())
    }

    #[test]
    fn peek_buffers_one_token() -> anyhow::Result<()> {
        let mut tokens = Tokenizer::from_source("a b");
        assert_eq!(tokens.peek()?.map(|t| t.kind.clone()), Some(identifier("a")));
        assert_eq!(tokens.peek()?.map(|t| t.kind.clone()), Some(identifier("a")));
        assert_eq!(tokens.next()?.map(|t| t.kind), Some(identifier("a")));
        assert_eq!(tokens.next()?.map(|t| t.kind), Some(identifier("b")));
        assert!(tokens.eof()?);
        assert_eq!(tokens.next()?, None);
        Ok(())
    }
}
