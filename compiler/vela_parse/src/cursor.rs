//! Token cursor for navigating the token stream.
//!
//! Provides low-level token access, lookahead, and consumption methods.

use tracing::trace;
use vela_diagnostic::ErrorCode;
use vela_ir::{Name, Span, StringInterner, Token, TokenIdx, TokenKind, TokenList};

use crate::persistent::ParserPos;
use crate::ParseError;

/// Cursor for navigating tokens.
///
/// Tracks the current position in the token stream and can be re-created
/// at any recorded position, which is what makes deferred parses resume
/// exactly where the original parse stopped.
pub struct Cursor<'t> {
    tokens: &'t TokenList,
    interner: &'t StringInterner,
    pos: usize,
}

impl<'t> Cursor<'t> {
    /// Create a new cursor at the start of the token stream.
    pub fn new(tokens: &'t TokenList, interner: &'t StringInterner) -> Self {
        Cursor {
            tokens,
            interner,
            pos: 0,
        }
    }

    /// Get a reference to the string interner.
    pub fn interner(&self) -> &'t StringInterner {
        self.interner
    }

    /// Get the current position in the token stream.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Set the cursor position directly.
    ///
    /// Used when redeeming a checkpoint or restoring a marked position.
    pub fn set_position(&mut self, pos: usize) {
        debug_assert!(
            pos < self.tokens.len(),
            "cursor position {pos} out of bounds (max {})",
            self.tokens.len()
        );
        trace!(from = self.pos, to = pos, "cursor repositioned");
        self.pos = pos;
    }

    /// The current position as a checkpoint-ready pair of positions.
    pub fn parser_pos(&self) -> ParserPos {
        ParserPos::new(TokenIdx::new(self.pos), self.previous_span())
    }

    /// Get the current token.
    ///
    /// Invariant: cursor position is always valid (`0..tokens.len()`).
    /// The last token is always EOF.
    #[inline]
    pub fn current(&self) -> &Token {
        debug_assert!(self.pos < self.tokens.len(), "cursor position out of bounds");
        &self.tokens[self.pos]
    }

    /// Get the current token's kind.
    #[inline]
    pub fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    /// Get the current token's span.
    #[inline]
    pub fn current_span(&self) -> Span {
        self.current().span
    }

    /// Get the previous token's span.
    #[inline]
    pub fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            Span::DUMMY
        }
    }

    /// Check if at end of token stream.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    /// Check if the current token matches the given kind (payloads ignored).
    #[inline]
    pub fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    /// Check if the current token is an identifier.
    #[inline]
    pub fn check_ident(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Ident(_))
    }

    /// Peek at the next token's kind (one-token lookahead).
    /// Returns `TokenKind::Eof` at the end of the stream.
    #[inline]
    pub fn peek_next_kind(&self) -> &TokenKind {
        static EOF: TokenKind = TokenKind::Eof;
        if self.pos + 1 < self.tokens.len() {
            &self.tokens[self.pos + 1].kind
        } else {
            &EOF
        }
    }

    /// Advance to the next token and return the consumed token.
    ///
    /// The lexer always appends an EOF token and grammar rules check the
    /// current token before advancing, so the cursor can never move past
    /// the last token.
    #[inline]
    pub fn advance(&mut self) -> &Token {
        let current = self.pos;
        debug_assert!(self.pos + 1 < self.tokens.len(), "advance past end of token stream");
        self.pos += 1;
        &self.tokens[current]
    }

    /// Skip all newline tokens.
    #[inline]
    pub fn skip_newlines(&mut self) {
        while matches!(self.current_kind(), TokenKind::Newline) {
            self.advance();
        }
    }

    /// Expect the current token to be of the given kind, advance and return it.
    /// Returns an error if the token kind doesn't match.
    ///
    /// Split into inline happy path + `#[cold]` error path so that
    /// `format!()` allocations don't prevent inlining the fast case.
    #[inline]
    pub fn expect(&mut self, kind: &TokenKind) -> Result<&Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.make_expect_error(kind))
        }
    }

    /// Build the error for a failed `expect()` call.
    #[cold]
    #[inline(never)]
    fn make_expect_error(&self, kind: &TokenKind) -> ParseError {
        ParseError::new(
            ErrorCode::E1001,
            format!(
                "expected {}, found {}",
                kind.display_name(),
                self.current_kind().display_name()
            ),
            self.current_span(),
        )
    }

    /// Expect and consume an identifier, returning its interned name.
    #[inline]
    pub fn expect_ident(&mut self) -> Result<Name, ParseError> {
        if let TokenKind::Ident(name) = *self.current_kind() {
            self.advance();
            Ok(name)
        } else {
            Err(self.make_expect_ident_error())
        }
    }

    /// Build the error for a failed `expect_ident()` call.
    #[cold]
    #[inline(never)]
    fn make_expect_ident_error(&self) -> ParseError {
        ParseError::new(
            ErrorCode::E1004,
            format!(
                "expected identifier, found {}",
                self.current_kind().display_name()
            ),
            self.current_span(),
        )
    }
}
