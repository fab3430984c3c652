//! Parse error types.

use std::fmt;

use vela_diagnostic::{Diagnostic, ErrorCode};
use vela_ir::Span;

/// A structured parse error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    code: ErrorCode,
    message: String,
    span: Span,
    context: Option<String>,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        ParseError {
            code,
            message: message.into(),
            span,
            context: None,
        }
    }

    /// Attach "while parsing X" context.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// The stable error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The primary source span.
    pub fn span(&self) -> Span {
        self.span
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Convert into a driver-facing diagnostic.
    pub fn into_diagnostic(self) -> Diagnostic {
        let message = match self.context {
            Some(context) => format!("{} ({})", self.message, context),
            None => self.message,
        };
        Diagnostic::error(self.code, message, self.span)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(context) = &self.context {
            write!(f, " ({context})")?;
        }
        write!(f, " at {}", self.span)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_context() {
        let err = ParseError::new(ErrorCode::E1001, "unexpected token", Span::new(4, 5))
            .with_context("while parsing a member list");
        assert_eq!(
            err.to_string(),
            "E1001: unexpected token (while parsing a member list) at 4..5"
        );
    }

    #[test]
    fn test_into_diagnostic_keeps_code_and_span() {
        let err = ParseError::new(ErrorCode::E1004, "expected identifier", Span::new(1, 2));
        let diag = err.into_diagnostic();
        assert_eq!(diag.code, ErrorCode::E1004);
        assert_eq!(diag.span, Span::new(1, 2));
        assert!(diag.is_error());
    }
}
