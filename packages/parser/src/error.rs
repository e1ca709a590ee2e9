use crate::ast::Span;
use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {}: expected {expected}, found {found}", .span.start)]
    UnexpectedToken {
        span: Span,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of file: expected {expected}")]
    UnexpectedEof { span: Span, expected: String },

    #[error("Invalid syntax at {}: {message}", .span.start)]
    InvalidSyntax { span: Span, message: String },

    #[error("Unrecognized character at {}", .span.start)]
    LexerError { span: Span },

    #[error("Nesting depth {depth} exceeds maximum {max}")]
    NestingTooDeep { span: Span, depth: usize, max: usize },
}

impl ParseError {
    pub fn unexpected_token(span: Span, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            span,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(span: Span, expected: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            span,
            expected: expected.into(),
        }
    }

    pub fn invalid_syntax(span: Span, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            span,
            message: message.into(),
        }
    }

    pub fn lexer_error(span: Span) -> Self {
        Self::LexerError { span }
    }

    pub fn nesting_too_deep(span: Span, depth: usize, max: usize) -> Self {
        Self::NestingTooDeep { span, depth, max }
    }

    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::UnexpectedEof { span, .. }
            | ParseError::InvalidSyntax { span, .. }
            | ParseError::LexerError { span }
            | ParseError::NestingTooDeep { span, .. } => *span,
        }
    }

    #[cfg_attr(not(feature = "pretty-errors"), allow(dead_code))]
    fn label(&self) -> String {
        match self {
            ParseError::UnexpectedToken { expected, .. } | ParseError::UnexpectedEof { expected, .. } => {
                format!("expected {}", expected)
            }
            ParseError::InvalidSyntax { message, .. } => message.clone(),
            ParseError::LexerError { .. } => "not part of the language".to_string(),
            ParseError::NestingTooDeep { .. } => "nested too deeply".to_string(),
        }
    }

    /// Pretty-print with source context using ariadne
    #[cfg(feature = "pretty-errors")]
    pub fn report(&self, filename: &str, source: &str) -> String {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        let span = self.span();
        let start = span.start.min(source.len());
        let end = span.end.clamp(start, source.len());

        let mut output = Vec::new();
        let written = Report::build(ReportKind::Error, filename, start)
            .with_message(self.to_string())
            .with_label(
                Label::new((filename, start..end))
                    .with_color(Color::Red)
                    .with_message(self.label()),
            )
            .finish()
            .write((filename, Source::from(source)), &mut output);

        match written {
            Ok(()) => String::from_utf8_lossy(&output).into_owned(),
            Err(_) => format!("{}: {}", filename, self),
        }
    }
}
