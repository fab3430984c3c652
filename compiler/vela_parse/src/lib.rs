//! Recursive descent parser for Vela with checkpoint-and-resume support.
//!
//! The parser can stop at well-defined boundaries — a function body, a
//! type's member list, a run of top-level statements — and park a
//! checkpoint in [`PersistentParserState`]: the exact cursor position plus
//! a restorable snapshot of the lexical scope chain. Downstream consumers
//! (a type checker, interactive tooling) redeem checkpoints on demand and
//! get byte-for-byte the parse they would have gotten eagerly.
//!
//! What to defer is driver policy, expressed as a [`ParseMode`]; the
//! checkpoint layer only records and replays.

mod cursor;
mod error;
mod grammar;
mod local_context;
mod mode;
mod persistent;
mod recovery;
mod scope;

pub use cursor::Cursor;
pub use error::ParseError;
pub use local_context::LocalContext;
pub use mode::ParseMode;
pub use persistent::{
    DelayedDeclKind, DelayedDeclState, DelayedMembersState, FunctionBodyState, ParserPos,
    PersistentParserState,
};
pub use scope::{SavedScope, ScopeInfo, ScopeKind};

use vela_ir::{Name, Span, Token, TokenKind};

/// Parser state for one parse or resumed parse.
///
/// Construction borrows the session's [`PersistentParserState`]; every
/// deferral the grammar performs registers through it, and every resume
/// entry point reads back from it.
pub struct Parser<'s, 't> {
    cursor: Cursor<'t>,
    state: &'s mut PersistentParserState<'t>,
    mode: ParseMode,
    /// Byte offset a driver is interested in (an interactive request);
    /// the top-level construct containing it is skipped whole.
    interest_offset: Option<u32>,
    in_line_directive_region: bool,
    /// Innermost-last stack of function-local naming contexts. Empty
    /// while parsing top-level code, which shares the persistent state's
    /// file-wide context instead.
    local_contexts: Vec<LocalContext>,
    errors: Vec<ParseError>,
}

impl<'s, 't> Parser<'s, 't> {
    /// Create a parser positioned at the start of the token stream.
    pub fn new(state: &'s mut PersistentParserState<'t>, mode: ParseMode) -> Self {
        let cursor = Cursor::new(state.tokens(), state.interner());
        let in_line_directive_region = state.in_line_directive_region();
        Parser {
            cursor,
            state,
            mode,
            interest_offset: None,
            in_line_directive_region,
            local_contexts: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Set the byte offset of an interactive request. The first top-level
    /// construct containing it is skipped and registered as the singular
    /// deferred declaration, and the parse stops there.
    #[must_use]
    pub fn with_interest_offset(mut self, offset: u32) -> Self {
        self.interest_offset = Some(offset);
        self
    }

    /// Create a parser positioned at a redeemed checkpoint.
    pub(crate) fn resume_at(
        state: &'s mut PersistentParserState<'t>,
        mode: ParseMode,
        pos: ParserPos,
    ) -> Self {
        assert!(pos.is_valid(), "resume from an invalid parser position");
        let mut parser = Parser::new(state, mode);
        parser.cursor.set_position(pos.index.index());
        parser
    }

    // Cursor delegation - token navigation forwards to the underlying Cursor.

    #[inline]
    fn current_kind(&self) -> &TokenKind {
        self.cursor.current_kind()
    }

    #[inline]
    fn current_span(&self) -> Span {
        self.cursor.current_span()
    }

    #[inline]
    fn previous_span(&self) -> Span {
        self.cursor.previous_span()
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.cursor.is_at_end()
    }

    #[inline]
    fn check(&self, kind: &TokenKind) -> bool {
        self.cursor.check(kind)
    }

    #[inline]
    fn advance(&mut self) -> &Token {
        self.cursor.advance()
    }

    #[inline]
    fn expect(&mut self, kind: &TokenKind) -> Result<&Token, ParseError> {
        self.cursor.expect(kind)
    }

    #[inline]
    fn expect_ident(&mut self) -> Result<Name, ParseError> {
        self.cursor.expect_ident()
    }

    #[inline]
    fn skip_newlines(&mut self) {
        self.cursor.skip_newlines();
    }

    /// Enter a function-local naming context.
    pub(crate) fn push_local_context(&mut self) {
        self.local_contexts.push(LocalContext::new());
    }

    /// Leave the innermost function-local naming context.
    pub(crate) fn pop_local_context(&mut self) {
        assert!(
            self.local_contexts.pop().is_some(),
            "local context stack underflow"
        );
    }

    /// Claim a closure discriminator from the innermost naming context;
    /// top-level code draws from the file-wide context so that
    /// independently-resumed chunks never collide.
    pub(crate) fn claim_closure_discriminator(&mut self) -> u32 {
        match self.local_contexts.last_mut() {
            Some(ctx) => ctx.claim_closure_discriminator(),
            None => self
                .state
                .top_level_context_mut()
                .claim_closure_discriminator(),
        }
    }

    /// Errors collected by recovery paths.
    pub(crate) fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }
}
