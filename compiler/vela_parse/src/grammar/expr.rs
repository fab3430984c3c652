//! Expression parsing.
//!
//! Pratt-style binding powers for binary operators; postfix loop for
//! calls and field access.

use vela_diagnostic::ErrorCode;
use vela_ir::{BinOp, ClosureParam, Expr, ExprKind, Span, TokenKind, UnaryOp};

use crate::scope::ScopeKind;
use crate::{ParseError, Parser};

/// Left/right binding power and operator for a binary-operator token.
fn binary_op(kind: &TokenKind) -> Option<(u8, u8, BinOp)> {
    let (lbp, rbp, op) = match kind {
        TokenKind::Or => (1, 2, BinOp::Or),
        TokenKind::And => (3, 4, BinOp::And),
        TokenKind::EqEq => (5, 6, BinOp::Eq),
        TokenKind::NotEq => (5, 6, BinOp::NotEq),
        TokenKind::Lt => (7, 8, BinOp::Lt),
        TokenKind::Gt => (7, 8, BinOp::Gt),
        TokenKind::Plus => (9, 10, BinOp::Add),
        TokenKind::Minus => (9, 10, BinOp::Sub),
        TokenKind::Star => (11, 12, BinOp::Mul),
        TokenKind::Slash => (11, 12, BinOp::Div),
        _ => return None,
    };
    Some((lbp, rbp, op))
}

impl Parser<'_, '_> {
    /// Parse an expression.
    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let Some((lbp, rbp, op)) = binary_op(self.current_kind()) else {
                break;
            };
            if lbp < min_bp {
                break;
            }
            self.advance();
            self.skip_newlines(); // operators may end a line
            let rhs = self.parse_expr_bp(rbp)?;
            let span = lhs.span.merge(rhs.span);
            lhs = Expr {
                span,
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.current_kind() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let start_span = self.current_span();
            self.advance();
            let operand = self.parse_unary()?;
            let span = start_span.merge(operand.span);
            return Ok(Expr {
                span,
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.check(&TokenKind::LParen) {
                self.advance();
                self.skip_newlines();
                let mut args = Vec::new();
                while !self.check(&TokenKind::RParen) && !self.is_at_end() {
                    args.push(self.parse_expr()?);
                    self.skip_newlines();
                    if self.check(&TokenKind::Comma) {
                        self.advance();
                        self.skip_newlines();
                    } else {
                        break;
                    }
                }
                let end_span = self.expect(&TokenKind::RParen)?.span;
                let span = expr.span.merge(end_span);
                expr = Expr {
                    span,
                    kind: ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                };
            } else if self.check(&TokenKind::Dot) {
                self.advance();
                let field = self.expect_ident()?;
                let span = expr.span.merge(self.previous_span());
                expr = Expr {
                    span,
                    kind: ExprKind::Field {
                        receiver: Box::new(expr),
                        field,
                    },
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let span = self.current_span();
        let kind = self.current_kind().clone();
        match kind {
            TokenKind::Int(value) => {
                self.advance();
                Ok(Expr {
                    span,
                    kind: ExprKind::Int(value),
                })
            }
            TokenKind::Str(name) => {
                self.advance();
                Ok(Expr {
                    span,
                    kind: ExprKind::Str(name),
                })
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr {
                    span,
                    kind: ExprKind::Bool(true),
                })
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr {
                    span,
                    kind: ExprKind::Bool(false),
                })
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr {
                    span,
                    kind: ExprKind::Ident(name),
                })
            }
            TokenKind::LParen => {
                self.advance();
                self.skip_newlines();
                let inner = self.parse_expr()?;
                self.skip_newlines();
                let end_span = self.expect(&TokenKind::RParen)?.span;
                Ok(Expr {
                    span: span.merge(end_span),
                    kind: ExprKind::Paren(Box::new(inner)),
                })
            }
            TokenKind::Pipe => self.parse_closure(),
            TokenKind::If => self.parse_if_expr(),
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                let span = block.span;
                Ok(Expr {
                    span,
                    kind: ExprKind::Block(block),
                })
            }
            TokenKind::Unknown => Err(ParseError::new(
                ErrorCode::E0002,
                "unrecognized character in source",
                span,
            )),
            other => Err(ParseError::new(
                ErrorCode::E1002,
                format!("expected expression, found {}", other.display_name()),
                span,
            )),
        }
    }

    fn parse_closure(&mut self) -> Result<Expr, ParseError> {
        let start_span = self.current_span();
        self.expect(&TokenKind::Pipe)?;
        self.state.scope_info_mut().push_scope(ScopeKind::Closure);
        let closure = self.parse_closure_rest(start_span);
        self.state.scope_info_mut().pop_scope();
        closure
    }

    fn parse_closure_rest(&mut self, start_span: Span) -> Result<Expr, ParseError> {
        let mut params = Vec::new();
        while !self.check(&TokenKind::Pipe) && !self.is_at_end() {
            let param_span = self.current_span();
            let name = self.expect_ident()?;
            self.state.scope_info_mut().declare(name, param_span);
            params.push(ClosureParam {
                name,
                span: param_span,
            });
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&TokenKind::Pipe)?;
        // Claimed before the body parses, so an outer closure always
        // numbers below the closures nested inside it.
        let discriminator = self.claim_closure_discriminator();
        let body = self.parse_expr()?;
        let span = start_span.merge(body.span);
        Ok(Expr {
            span,
            kind: ExprKind::Closure {
                params,
                body: Box::new(body),
                discriminator,
            },
        })
    }

    fn parse_if_expr(&mut self) -> Result<Expr, ParseError> {
        let start_span = self.current_span();
        self.expect(&TokenKind::If)?;
        let cond = self.parse_expr()?;
        let then_block = self.parse_block()?;
        let else_block = if self.check(&TokenKind::Else) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };
        let span = start_span.merge(self.previous_span());
        Ok(Expr {
            span,
            kind: ExprKind::If {
                cond: Box::new(cond),
                then_block,
                else_block,
            },
        })
    }
}
