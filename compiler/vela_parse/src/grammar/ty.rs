//! Type annotation parsing.

use vela_diagnostic::ErrorCode;
use vela_ir::{TokenKind, TypeExpr, TypeExprKind};

use crate::{ParseError, Parser};

impl Parser<'_, '_> {
    /// Parse a type annotation.
    pub(crate) fn parse_type(&mut self) -> Result<TypeExpr, ParseError> {
        let span = self.current_span();
        if let TokenKind::Ident(name) = *self.current_kind() {
            self.advance();
            Ok(TypeExpr {
                kind: TypeExprKind::Named(name),
                span,
            })
        } else {
            Err(ParseError::new(
                ErrorCode::E1005,
                format!("expected type, found {}", self.current_kind().display_name()),
                span,
            ))
        }
    }
}
