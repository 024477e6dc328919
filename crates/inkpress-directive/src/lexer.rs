//! Tokenizer for directive text.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::{ParseError, ParseErrorKind};

/// A single word of directive text with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token text, with quotes and escapes removed
    pub text: String,
    /// 1-based line
    pub line: usize,
    /// 1-based column of the first character
    pub column: usize,
    /// Whether the token was written as a quoted string
    pub quoted: bool,
}

impl Token {
    /// A bare `{`.
    pub fn is_open(&self) -> bool {
        !self.quoted && self.text == "{"
    }

    /// A bare `}`.
    pub fn is_close(&self) -> bool {
        !self.quoted && self.text == "}"
    }
}

/// Split directive text into tokens.
///
/// Whitespace separates tokens, `#` at the start of a token comments out the
/// rest of the line, and double quotes group text containing whitespace.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    match tokenize_prefix(source) {
        (tokens, None) => Ok(tokens),
        (_, Some(error)) => Err(error),
    }
}

/// Tokens read before the first lexical error, and that error.
pub(crate) fn tokenize_prefix(source: &str) -> (Vec<Token>, Option<ParseError>) {
    let mut lexer = Lexer {
        chars: source.chars().peekable(),
        line: 1,
        column: 1,
    };

    let mut tokens = Vec::new();
    loop {
        match lexer.next_token() {
            Ok(Some(token)) => tokens.push(token),
            Ok(None) => return (tokens, None),
            Err(error) => return (tokens, Some(error)),
        }
    }
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl Lexer<'_> {
    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_blank(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch == '#' {
                while self.chars.peek().is_some_and(|c| *c != '\n') {
                    self.bump();
                }
            } else if ch.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        self.skip_blank();

        let (line, column) = (self.line, self.column);
        let Some(&first) = self.chars.peek() else {
            return Ok(None);
        };

        let mut text = String::new();

        if first == '"' {
            self.bump();
            loop {
                match self.bump() {
                    None => {
                        return Err(ParseError::new(
                            ParseErrorKind::UnterminatedQuote,
                            line,
                            column,
                        ))
                    }
                    Some('\\') if self.chars.peek() == Some(&'"') => {
                        self.bump();
                        text.push('"');
                    }
                    Some('"') => break,
                    Some(ch) => text.push(ch),
                }
            }

            return Ok(Some(Token {
                text,
                line,
                column,
                quoted: true,
            }));
        }

        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() {
                break;
            }
            text.push(ch);
            self.bump();
        }

        Ok(Some(Token {
            text,
            line,
            column,
            quoted: false,
        }))
    }
}
