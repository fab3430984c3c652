//! Declaration and source-unit parsing.
//!
//! This is where the grammar meets the checkpoint layer: every deferral
//! (function body, member list, whole declaration) and every resume entry
//! point lives here.

use tracing::debug;
use vela_diagnostic::ErrorCode;
use vela_ir::{
    Block, Decl, DeclId, DeclKind, FieldDecl, FunctionBody, FunctionDecl, Members, Param,
    SourceUnit, Span, TokenIdx, TokenKind, TopLevelCodeDecl, TypeDecl, TypeExpr,
};

use crate::persistent::{DelayedDeclKind, DelayedMembersState, PersistentParserState};
use crate::scope::ScopeKind;
use crate::{ParseError, ParseMode, Parser};

impl<'s, 't> Parser<'s, 't> {
    /// Parse a whole source unit.
    ///
    /// If an interest offset was set and a top-level construct contains
    /// it, that construct is skipped whole, registered as the singular
    /// deferred declaration, and the parse stops there with the stop
    /// point marked in the persistent state; see
    /// [`Parser::resume_remainder`].
    pub fn parse_source_unit(mut self) -> (SourceUnit, Vec<ParseError>) {
        // The source-unit scope persists across parses of this session;
        // deferred chunks resumed later still see it through their
        // snapshots.
        if self.state.scope_info().is_empty() {
            self.state
                .scope_info_mut()
                .push_scope(ScopeKind::SourceUnit);
        }
        let mut unit = SourceUnit::default();
        let stopped = self.parse_top_level_into(&mut unit.decls, None);
        if stopped {
            debug!("parse stopped before end of token stream");
        }
        (unit, self.errors)
    }

    /// Parse top-level constructs until `end` (or EOF). Returns `true` if
    /// the parse stopped early at the construct containing the interest
    /// offset.
    fn parse_top_level_into(&mut self, decls: &mut Vec<Decl>, end: Option<TokenIdx>) -> bool {
        loop {
            self.skip_newlines_bounded(end);
            if self.at_bound(end) || self.is_at_end() {
                return false;
            }
            if self.check(&TokenKind::LineDirective) {
                if let Err(err) = self.parse_line_directive() {
                    self.errors.push(err);
                    self.recover_within(end);
                }
                continue;
            }
            if self.maybe_delay_interesting() {
                return true;
            }
            let unit_id = self.state.unit_decl_id();
            match self.current_kind() {
                TokenKind::Fn => match self.parse_fn_decl() {
                    Ok(decl) => decls.push(decl),
                    Err(err) => {
                        self.errors.push(err);
                        self.synchronize_top_level();
                    }
                },
                TokenKind::Type => match self.parse_type_decl(unit_id) {
                    Ok(decl) => decls.push(decl),
                    Err(err) => {
                        self.errors.push(err);
                        self.synchronize_top_level();
                    }
                },
                _ => {
                    let decl = self.parse_top_level_code(end);
                    decls.push(decl);
                }
            }
        }
    }

    // ─── Interest-driven whole-declaration deferral ──────────────────────

    /// If the upcoming top-level construct contains the interest offset,
    /// register it as the singular deferred declaration, skip it, mark
    /// where parsing stopped, and return `true`.
    fn maybe_delay_interesting(&mut self) -> bool {
        let Some(offset) = self.interest_offset else {
            return false;
        };
        let start_span = self.current_span();
        if offset < start_span.start {
            return false;
        }

        // Excursion: scan ahead for the construct's end, then come back.
        self.state
            .mark_parser_position(self.cursor.parser_pos(), self.in_line_directive_region);
        let scan = self.scan_construct_end();
        let mark = self.state.take_parser_position();
        self.cursor.set_position(mark.index.index());
        self.in_line_directive_region = self.state.in_line_directive_region();

        let Ok((span, end)) = scan else {
            // Malformed construct ahead; parse it normally so the error
            // surfaces with full context.
            return false;
        };
        if !span.contains(offset) {
            return false;
        }

        debug!(?span, "delaying the declaration containing the interest offset");
        let pos = self.cursor.parser_pos();
        let snapshot = self.state.scope_info().capture();
        let parent = self.state.unit_decl_id();
        match self.current_kind() {
            TokenKind::Fn | TokenKind::Type => {
                self.state
                    .delay_decl(DelayedDeclKind::Decl, self.mode, parent, pos, end, snapshot);
            }
            _ => {
                self.state
                    .delay_top_level(self.mode, parent, pos, end, snapshot);
            }
        }

        // Skip the construct and remember where parsing stopped.
        self.cursor.set_position(end.index());
        self.state
            .mark_parser_position(self.cursor.parser_pos(), self.in_line_directive_region);
        true
    }

    /// Find the exclusive end bound of the construct at the cursor.
    ///
    /// Moves the cursor; callers restore it from the marked position.
    fn scan_construct_end(&mut self) -> Result<(Span, TokenIdx), ParseError> {
        let start_span = self.current_span();
        match self.current_kind() {
            TokenKind::Fn | TokenKind::Type => {
                while !self.is_at_end() && !self.check(&TokenKind::LBrace) {
                    self.advance();
                }
                if self.is_at_end() {
                    return Err(ParseError::new(
                        ErrorCode::E1003,
                        "declaration has no body to skip",
                        start_span,
                    ));
                }
                self.advance(); // '{'
                let rbrace = self.skip_balanced_braces(1)?;
                let end_span = self.state.token_span(rbrace);
                Ok((
                    start_span.merge(end_span),
                    TokenIdx::new(self.cursor.position()),
                ))
            }
            _ => {
                // A top-level code run extends to the next declaration
                // keyword or directive at brace depth zero.
                let mut depth = 0u32;
                while !self.is_at_end() {
                    match self.current_kind() {
                        TokenKind::LBrace => depth += 1,
                        TokenKind::RBrace => depth = depth.saturating_sub(1),
                        TokenKind::Fn | TokenKind::Type | TokenKind::LineDirective
                            if depth == 0 =>
                        {
                            break;
                        }
                        _ => {}
                    }
                    self.advance();
                }
                Ok((
                    start_span.merge(self.previous_span()),
                    TokenIdx::new(self.cursor.position()),
                ))
            }
        }
    }

    // ─── Function declarations ───────────────────────────────────────────

    pub(crate) fn parse_fn_decl(&mut self) -> Result<Decl, ParseError> {
        let start_span = self.current_span();
        self.expect(&TokenKind::Fn)?;
        let name_span = self.current_span();
        let name = self.expect_ident()?;
        let id = self.state.alloc_decl_id();
        // The function's name binds in the enclosing scope; its params
        // bind in the body scope captured by any deferred-body snapshot.
        self.state.scope_info_mut().declare(name, name_span);

        self.state
            .scope_info_mut()
            .push_scope(ScopeKind::FunctionBody);
        let signature = self.parse_fn_rest(id);
        self.state.scope_info_mut().pop_scope();
        let (params, return_ty, body) = signature?;

        Ok(Decl {
            id,
            span: start_span.merge(self.previous_span()),
            kind: DeclKind::Function(FunctionDecl {
                name,
                params,
                return_ty,
                body,
            }),
        })
    }

    fn parse_fn_rest(
        &mut self,
        id: DeclId,
    ) -> Result<(Vec<Param>, Option<TypeExpr>, FunctionBody), ParseError> {
        self.expect(&TokenKind::LParen)?;
        let params = self.parse_params()?;
        let return_ty = if self.check(&TokenKind::Arrow) {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };
        if !self.check(&TokenKind::LBrace) {
            return Err(ParseError::new(
                ErrorCode::E1007,
                format!(
                    "missing function body, found {}",
                    self.current_kind().display_name()
                ),
                self.current_span(),
            ));
        }
        let body = if self.mode.contains(ParseMode::DELAY_FUNCTION_BODIES) {
            let pos = self.cursor.parser_pos(); // at '{'
            let snapshot = self.state.scope_info().capture();
            let lbrace_span = self.current_span();
            self.advance();
            let rbrace = self.skip_balanced_braces(1)?;
            self.state.delay_function_body(id, pos, snapshot);
            FunctionBody::Unparsed(lbrace_span.merge(self.state.token_span(rbrace)))
        } else {
            self.push_local_context();
            let block = self.parse_block();
            self.pop_local_context();
            FunctionBody::Parsed(block?)
        };
        Ok((params, return_ty, body))
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            let param_span = self.current_span();
            let name = self.expect_ident()?;
            self.expect(&TokenKind::Colon)?;
            let ty = self.parse_type()?;
            self.state.scope_info_mut().declare(name, param_span);
            params.push(Param {
                name,
                ty,
                span: param_span.merge(self.previous_span()),
            });
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(params)
    }

    // ─── Type declarations and member lists ──────────────────────────────

    pub(crate) fn parse_type_decl(&mut self, parent: DeclId) -> Result<Decl, ParseError> {
        let start_span = self.current_span();
        self.expect(&TokenKind::Type)?;
        let name_span = self.current_span();
        let name = self.expect_ident()?;
        let id = self.state.alloc_decl_id();
        self.state.scope_info_mut().declare(name, name_span);

        self.expect(&TokenKind::LBrace)?;
        let lbrace_span = self.previous_span();
        self.state
            .scope_info_mut()
            .push_scope(ScopeKind::TypeMembers);
        let members = self.parse_type_members(id, parent, lbrace_span);
        self.state.scope_info_mut().pop_scope();
        let members = members?;

        Ok(Decl {
            id,
            span: start_span.merge(self.previous_span()),
            kind: DeclKind::Type(TypeDecl { name, members }),
        })
    }

    /// Parse (or skip) the member list of the type `id`. The cursor is
    /// just past the opening brace.
    fn parse_type_members(
        &mut self,
        id: DeclId,
        parent: DeclId,
        lbrace_span: Span,
    ) -> Result<Members, ParseError> {
        if self.mode.contains(ParseMode::DELAY_MEMBER_LISTS) {
            let pos = self.cursor.parser_pos(); // first member token
            let snapshot = self.state.scope_info().capture();
            let rbrace = self.skip_balanced_braces(1)?;
            self.state
                .delay_members(id, self.mode, parent, pos, rbrace, snapshot);
            return Ok(Members::Unparsed(
                lbrace_span.merge(self.state.token_span(rbrace)),
            ));
        }

        let mut members = Vec::new();
        while let Some(member) = self.parse_member(id, None)? {
            members.push(member);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Members::Parsed(members))
    }

    /// Parse one member of the context `parent`, or `None` at the end of
    /// the list.
    fn parse_member(
        &mut self,
        parent: DeclId,
        end: Option<TokenIdx>,
    ) -> Result<Option<Decl>, ParseError> {
        // Member separators: newlines or commas.
        while !self.at_bound(end)
            && (self.check(&TokenKind::Newline) || self.check(&TokenKind::Comma))
        {
            self.advance();
        }
        if self.at_bound(end) || self.check(&TokenKind::RBrace) || self.is_at_end() {
            return Ok(None);
        }

        match self.current_kind() {
            TokenKind::Fn => self.parse_fn_decl().map(Some),
            TokenKind::Type => self.parse_type_decl(parent).map(Some),
            TokenKind::Ident(_) => {
                let field_span = self.current_span();
                let name = self.expect_ident()?;
                self.expect(&TokenKind::Colon)?;
                let ty = self.parse_type()?;
                let id = self.state.alloc_decl_id();
                self.state.scope_info_mut().declare(name, field_span);
                Ok(Some(Decl {
                    id,
                    span: field_span.merge(self.previous_span()),
                    kind: DeclKind::Field(FieldDecl { name, ty }),
                }))
            }
            other => Err(ParseError::new(
                ErrorCode::E1001,
                format!("expected member, found {}", other.display_name()),
                self.current_span(),
            )
            .with_context("while parsing a member list")),
        }
    }

    /// Parse members up to the exclusive bound `end`, recovering inside
    /// the list on errors. Used when materializing a deferred list.
    pub(crate) fn parse_member_list_bounded(&mut self, parent: DeclId, end: TokenIdx) -> Vec<Decl> {
        let mut members = Vec::new();
        while self.cursor.position() < end.index() {
            match self.parse_member(parent, Some(end)) {
                Ok(Some(member)) => members.push(member),
                Ok(None) => break,
                Err(err) => {
                    self.errors.push(err);
                    self.recover_within(Some(end));
                }
            }
        }
        members
    }

    // ─── Top-level code ──────────────────────────────────────────────────

    /// Parse a maximal run of top-level statements. Statement errors are
    /// collected and recovered, so this always produces a declaration.
    pub(crate) fn parse_top_level_code(&mut self, end: Option<TokenIdx>) -> Decl {
        let id = self.state.alloc_decl_id();
        let start_span = self.current_span();
        let mut stmts = Vec::new();
        loop {
            self.skip_newlines_bounded(end);
            if self.at_bound(end) || self.is_at_end() {
                break;
            }
            if matches!(
                self.current_kind(),
                TokenKind::Fn | TokenKind::Type | TokenKind::LineDirective
            ) {
                break;
            }
            match self.parse_stmt() {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.recover_within(end);
                }
            }
        }
        let span = if stmts.is_empty() {
            start_span
        } else {
            start_span.merge(self.previous_span())
        };
        Decl {
            id,
            span,
            kind: DeclKind::TopLevelCode(TopLevelCodeDecl {
                body: Block { stmts, span },
            }),
        }
    }

    // ─── Line directives ─────────────────────────────────────────────────

    fn parse_line_directive(&mut self) -> Result<(), ParseError> {
        let directive_span = self.current_span();
        self.expect(&TokenKind::LineDirective)?;
        let kind = self.current_kind().clone();
        match kind {
            TokenKind::Int(line) if line >= 1 => {
                self.advance();
                self.in_line_directive_region = true;
                Ok(())
            }
            TokenKind::Ident(name) if self.cursor.interner().resolve(name) == "default" => {
                self.advance();
                self.in_line_directive_region = false;
                Ok(())
            }
            other => Err(ParseError::new(
                ErrorCode::E1006,
                format!(
                    "expected line number or `default` after `#line`, found {}",
                    other.display_name()
                ),
                directive_span.merge(self.current_span()),
            )),
        }
    }

    // ─── Skipping helpers ────────────────────────────────────────────────

    /// Skip tokens until the brace depth returns to zero; `depth` counts
    /// the braces already consumed. Returns the index of the matching
    /// closing brace and leaves the cursor after it.
    fn skip_balanced_braces(&mut self, mut depth: u32) -> Result<TokenIdx, ParseError> {
        debug_assert!(depth > 0, "nothing to balance");
        let open_span = self.previous_span();
        loop {
            if self.is_at_end() {
                return Err(ParseError::new(
                    ErrorCode::E1003,
                    "unclosed `{`",
                    open_span,
                ));
            }
            match self.current_kind() {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        let rbrace = TokenIdx::new(self.cursor.position());
                        self.advance();
                        return Ok(rbrace);
                    }
                }
                TokenKind::LineDirective => self.note_skipped_directive(),
                _ => {}
            }
            self.advance();
        }
    }

    /// Keep the line-directive flag accurate while skipping over a region
    /// that contains `#line` directives.
    fn note_skipped_directive(&mut self) {
        match self.cursor.peek_next_kind() {
            TokenKind::Int(_) => self.in_line_directive_region = true,
            TokenKind::Ident(name) => {
                if self.cursor.interner().resolve(*name) == "default" {
                    self.in_line_directive_region = false;
                }
            }
            _ => {}
        }
    }

    pub(crate) fn at_bound(&self, end: Option<TokenIdx>) -> bool {
        end.is_some_and(|bound| self.cursor.position() >= bound.index())
    }

    fn skip_newlines_bounded(&mut self, end: Option<TokenIdx>) {
        while !self.at_bound(end) && self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    // ─── Resume entry points ─────────────────────────────────────────────

    /// Redeem the deferred body checkpoint for `decl` and parse the body.
    ///
    /// # Panics
    /// Panics if no deferred body record is held for `decl`; callers
    /// check [`PersistentParserState::has_function_body`] first.
    pub fn resume_function_body(
        state: &mut PersistentParserState<'t>,
        decl: DeclId,
    ) -> Result<Block, ParseError> {
        debug!(?decl, "resuming delayed function body");
        let Some(mut record) = state.take_function_body(decl) else {
            panic!("no deferred function body for {decl:?}");
        };
        let snapshot = record.take_scope();
        let displaced = state.scope_info_mut().install(snapshot);
        let result = {
            let mut parser = Parser::resume_at(state, ParseMode::empty(), record.pos());
            parser.push_local_context();
            let block = parser.parse_block();
            parser.pop_local_context();
            block
        };
        let spent = state.scope_info_mut().install(displaced);
        drop(spent);
        result
    }

    /// Redeem the singular deferred declaration and parse it fully.
    ///
    /// # Panics
    /// Panics if no deferred declaration record is installed.
    pub fn resume_delayed_decl(state: &mut PersistentParserState<'t>) -> Result<Decl, ParseError> {
        let mut record = state.take_delayed_decl();
        debug!(kind = ?record.kind(), "resuming delayed declaration");
        let snapshot = record.take_scope();
        let displaced = state.scope_info_mut().install(snapshot);
        let parent = record.parent();
        let (result, errors) = {
            let mut parser = Parser::resume_at(state, record.mode(), record.pos());
            let result = match record.kind() {
                DelayedDeclKind::Decl => {
                    let kind = parser.current_kind().clone();
                    match kind {
                        TokenKind::Fn => parser.parse_fn_decl(),
                        TokenKind::Type => parser.parse_type_decl(parent),
                        other => Err(ParseError::new(
                            ErrorCode::E1001,
                            format!("expected declaration, found {}", other.display_name()),
                            parser.current_span(),
                        )),
                    }
                }
                DelayedDeclKind::TopLevelCode => {
                    Ok(parser.parse_top_level_code(Some(record.end())))
                }
            };
            (result, parser.take_errors())
        };
        let spent = state.scope_info_mut().install(displaced);
        drop(spent);
        for err in errors {
            state.push_diagnostic(err.into_diagnostic());
        }
        result
    }

    /// Continue a parse that stopped early, from the marked position.
    ///
    /// Returns nothing when no position is marked, so drivers can call it
    /// unconditionally after an interactive pass.
    pub fn resume_remainder(
        state: &mut PersistentParserState<'t>,
        mode: ParseMode,
    ) -> (Vec<Decl>, Vec<ParseError>) {
        let pos = state.take_parser_position();
        if !pos.is_valid() {
            return (Vec::new(), Vec::new());
        }
        debug!(index = pos.index.index(), "resuming remainder of source unit");
        let mut parser = Parser::resume_at(state, mode, pos);
        let mut decls = Vec::new();
        let stopped = parser.parse_top_level_into(&mut decls, None);
        debug_assert!(!stopped, "remainder parse has no interest offset");
        let errors = parser.take_errors();
        (decls, errors)
    }
}

/// Materialize a deferred member list: restore its scope snapshot, parse
/// the recorded region, and put the live scope chain back.
///
/// Errors from the resumed parse go to the persistent state's diagnostic
/// queue; the member list itself is always produced.
pub(crate) fn resume_member_list<'t>(
    state: &mut PersistentParserState<'t>,
    ctx: DeclId,
    mut record: DelayedMembersState,
) -> Vec<Decl> {
    debug!(?ctx, "resuming delayed member list");
    let snapshot = record.take_scope();
    let displaced = state.scope_info_mut().install(snapshot);
    let (members, errors) = {
        let mut parser = Parser::resume_at(state, record.mode(), record.pos());
        let members = parser.parse_member_list_bounded(ctx, record.end());
        (members, parser.take_errors())
    };
    let spent = state.scope_info_mut().install(displaced);
    drop(spent);
    for err in errors {
        state.push_diagnostic(err.into_diagnostic());
    }
    members
}
