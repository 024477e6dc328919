//! Positioned errors produced while reading directive text.

use crate::config::Configuration;
use crate::lexer::Token;

/// What went wrong at a given position.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("wrong argument count or unexpected line ending after '{0}'")]
    ArgumentCount(String),

    #[error("unknown {directive} option '{option}'")]
    UnknownOption { directive: String, option: String },

    #[error("only one default template is allowed, use an alias")]
    DuplicateDefaultTemplate,

    #[error("unexpected '{found}', expected directive '{expected}'")]
    UnexpectedToken { found: String, expected: String },

    #[error("expected directive '{0}', found end of input")]
    MissingDirective(String),

    #[error("unexpected '{{' inside a block")]
    NestedBlock,

    #[error("block is never closed, expected '}}'")]
    UnclosedBlock,

    #[error("unterminated quoted string")]
    UnterminatedQuote,
}

/// A parse failure located at a token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}:{}:{}: {}", .file.as_deref().unwrap_or("<directives>"), .line, .column, .kind)]
pub struct ParseError {
    /// Name of the file being parsed, if known
    pub file: Option<String>,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, line: usize, column: usize) -> Self {
        Self {
            file: None,
            line,
            column,
            kind,
        }
    }

    /// Error positioned at `token`.
    pub fn at(token: &Token, kind: ParseErrorKind) -> Self {
        Self::new(kind, token.line, token.column)
    }

    /// Attach the name of the source file.
    pub fn in_file(mut self, file: Option<&str>) -> Self {
        self.file = file.map(str::to_string);
        self
    }
}

/// A parse failure together with every configuration completed before it.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct PartialParse {
    /// Configurations parsed successfully before the failing directive
    pub parsed: Vec<Configuration>,
    pub error: ParseError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_position_and_file() {
        let err =
            ParseError::new(ParseErrorKind::UnterminatedQuote, 3, 7).in_file(Some("Inkpressfile"));

        assert_eq!(err.to_string(), "Inkpressfile:3:7: unterminated quoted string");
    }

    #[test]
    fn displays_placeholder_without_file() {
        let err = ParseError::new(ParseErrorKind::ArgumentCount("css".to_string()), 1, 1);

        assert_eq!(
            err.to_string(),
            "<directives>:1:1: wrong argument count or unexpected line ending after 'css'"
        );
    }
}
