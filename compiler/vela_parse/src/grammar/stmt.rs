//! Statement and block parsing.

use vela_ir::{Block, Stmt, StmtKind, TokenKind};

use crate::scope::ScopeKind;
use crate::{ParseError, Parser};

impl Parser<'_, '_> {
    /// Parse a braced statement block.
    pub(crate) fn parse_block(&mut self) -> Result<Block, ParseError> {
        let start_span = self.current_span();
        self.expect(&TokenKind::LBrace)?;
        self.state.scope_info_mut().push_scope(ScopeKind::Block);
        let stmts = self.parse_block_stmts();
        self.state.scope_info_mut().pop_scope();
        let stmts = stmts?;
        let end_span = self.expect(&TokenKind::RBrace)?.span;
        Ok(Block {
            stmts,
            span: start_span.merge(end_span),
        })
    }

    fn parse_block_stmts(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        loop {
            self.skip_newlines();
            if self.check(&TokenKind::RBrace) || self.is_at_end() {
                return Ok(stmts);
            }
            stmts.push(self.parse_stmt()?);
        }
    }

    /// Parse a single statement.
    pub(crate) fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.current_kind() {
            TokenKind::Let => self.parse_let_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            _ => {
                let expr = self.parse_expr()?;
                Ok(Stmt {
                    span: expr.span,
                    kind: StmtKind::Expr(expr),
                })
            }
        }
    }

    fn parse_let_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start_span = self.current_span();
        self.expect(&TokenKind::Let)?;
        let mutable = if self.check(&TokenKind::Mut) {
            self.advance();
            true
        } else {
            false
        };
        let name_span = self.current_span();
        let name = self.expect_ident()?;
        let ty = if self.check(&TokenKind::Colon) {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(&TokenKind::Eq)?;
        let init = self.parse_expr()?;
        // The binding becomes visible after its initializer.
        self.state.scope_info_mut().declare(name, name_span);
        let span = start_span.merge(self.previous_span());
        Ok(Stmt {
            span,
            kind: StmtKind::Let {
                name,
                mutable,
                ty,
                init,
            },
        })
    }

    fn parse_return_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start_span = self.current_span();
        self.expect(&TokenKind::Return)?;
        let value = if self.check(&TokenKind::Newline)
            || self.check(&TokenKind::RBrace)
            || self.is_at_end()
        {
            None
        } else {
            Some(self.parse_expr()?)
        };
        let span = start_span.merge(self.previous_span());
        Ok(Stmt {
            span,
            kind: StmtKind::Return(value),
        })
    }
}
