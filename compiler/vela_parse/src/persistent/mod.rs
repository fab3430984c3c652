//! Parser state persistent across multiple parses of one compilation
//! session.
//!
//! When the grammar decides to skip a construct — a function body, a
//! type's member list, or a whole declaration — it parks a checkpoint
//! here: the exact cursor position plus a restorable snapshot of the
//! lexical scope chain. Consumers redeem a checkpoint exactly once; the
//! registry hands over the snapshot and forgets the record, so a resumed
//! parse picks up precisely where the original stopped.
//!
//! Sequencing faults (redeeming a record that was never registered, or
//! redeeming one twice) are defects in the calling parser's bookkeeping,
//! not recoverable conditions, and panic immediately.

use rustc_hash::FxHashMap;
use tracing::{debug, trace};
use vela_diagnostic::{Diagnostic, DiagnosticQueue};
use vela_ir::{
    Decl, DeclId, LazyMemberParser, Span, StringInterner, TokenIdx, TokenList,
};

use crate::local_context::LocalContext;
use crate::scope::{SavedScope, ScopeInfo};
use crate::ParseMode;

/// Where a parse stopped: the token the parser was looking at, plus the
/// span of the token before it.
///
/// The default value is invalid and means "no checkpoint held".
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ParserPos {
    /// Index of the next token to parse.
    pub index: TokenIdx,
    /// Span of the token immediately before the stop point.
    pub prev_span: Span,
}

impl ParserPos {
    /// Create a position.
    pub fn new(index: TokenIdx, prev_span: Span) -> Self {
        ParserPos { index, prev_span }
    }

    /// Whether this names a real position.
    pub fn is_valid(&self) -> bool {
        self.index.is_valid()
    }
}

/// Checkpoint for a skipped function body.
#[derive(Debug)]
pub struct FunctionBodyState {
    pos: ParserPos,
    scope: Option<SavedScope>,
}

impl FunctionBodyState {
    fn new(pos: ParserPos, scope: SavedScope) -> Self {
        FunctionBodyState {
            pos,
            scope: Some(scope),
        }
    }

    /// The resume position: the body's opening brace.
    pub fn pos(&self) -> ParserPos {
        self.pos
    }

    /// Take exclusive ownership of the scope snapshot.
    ///
    /// # Panics
    /// Panics if the snapshot was already taken; a snapshot restores once.
    pub fn take_scope(&mut self) -> SavedScope {
        let Some(scope) = self.scope.take() else {
            panic!("scope snapshot already taken from deferred body record");
        };
        scope
    }
}

/// What kind of declaration the singular deferred-declaration record holds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DelayedDeclKind {
    /// A run of executable top-level statements.
    TopLevelCode,
    /// A named declaration (function or type).
    Decl,
}

/// Checkpoint for one whole skipped declaration.
///
/// Singular: the registry keeps at most one, for the declaration a driver
/// is currently interested in (typically the one containing an
/// interactive request's position).
#[derive(Debug)]
pub struct DelayedDeclState {
    kind: DelayedDeclKind,
    mode: ParseMode,
    parent: DeclId,
    pos: ParserPos,
    end: TokenIdx,
    scope: Option<SavedScope>,
}

impl DelayedDeclState {
    /// The kind of skipped declaration.
    pub fn kind(&self) -> DelayedDeclKind {
        self.kind
    }

    /// Parsing-mode hints the original parse ran with.
    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    /// The enclosing declaration context.
    pub fn parent(&self) -> DeclId {
        self.parent
    }

    /// The resume position: the declaration's first token.
    pub fn pos(&self) -> ParserPos {
        self.pos
    }

    /// Exclusive bound: index of the first token after the declaration.
    pub fn end(&self) -> TokenIdx {
        self.end
    }

    /// Take exclusive ownership of the scope snapshot.
    ///
    /// # Panics
    /// Panics if the snapshot was already taken.
    pub fn take_scope(&mut self) -> SavedScope {
        let Some(scope) = self.scope.take() else {
            panic!("scope snapshot already taken from deferred declaration record");
        };
        scope
    }
}

/// Checkpoint for a skipped type member list.
#[derive(Debug)]
pub struct DelayedMembersState {
    mode: ParseMode,
    parent: DeclId,
    pos: ParserPos,
    end: TokenIdx,
    scope: Option<SavedScope>,
}

impl DelayedMembersState {
    /// Parsing-mode hints the original parse ran with.
    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    /// The declaration context enclosing the owning type.
    pub fn parent(&self) -> DeclId {
        self.parent
    }

    /// The resume position: the first token after the opening brace.
    pub fn pos(&self) -> ParserPos {
        self.pos
    }

    /// Exclusive bound: index of the member list's closing brace.
    pub fn end(&self) -> TokenIdx {
        self.end
    }

    /// Take exclusive ownership of the scope snapshot.
    ///
    /// # Panics
    /// Panics if the snapshot was already taken.
    pub fn take_scope(&mut self) -> SavedScope {
        let Some(scope) = self.scope.take() else {
            panic!("scope snapshot already taken from deferred member-list record");
        };
        scope
    }
}

/// Parser state persistent across multiple parses.
///
/// Owns every live checkpoint record, the scope stack, the file-wide
/// top-level naming context, and the declaration-id allocator. Everything
/// it needs from the compilation session is injected at construction; it
/// never reaches into ambient state.
pub struct PersistentParserState<'t> {
    tokens: &'t TokenList,
    interner: &'t StringInterner,
    scopes: ScopeInfo,
    delayed_function_bodies: FxHashMap<DeclId, FunctionBodyState>,
    delayed_decl: Option<DelayedDeclState>,
    delayed_member_lists: FxHashMap<DeclId, DelayedMembersState>,
    /// The local context for all top-level code of the file.
    top_level: LocalContext,
    /// Set by the parser when it stopped before the token stream ended.
    marked_pos: ParserPos,
    in_line_directive_region: bool,
    next_decl_id: u32,
    diagnostics: DiagnosticQueue,
}

impl<'t> PersistentParserState<'t> {
    /// Create the state for one compilation session.
    pub fn new(tokens: &'t TokenList, interner: &'t StringInterner) -> Self {
        PersistentParserState {
            tokens,
            interner,
            scopes: ScopeInfo::new(),
            delayed_function_bodies: FxHashMap::default(),
            delayed_decl: None,
            delayed_member_lists: FxHashMap::default(),
            top_level: LocalContext::new(),
            marked_pos: ParserPos::default(),
            in_line_directive_region: false,
            next_decl_id: 1,
            diagnostics: DiagnosticQueue::new(),
        }
    }

    /// The session's token stream.
    pub fn tokens(&self) -> &'t TokenList {
        self.tokens
    }

    /// The session's string interner.
    pub fn interner(&self) -> &'t StringInterner {
        self.interner
    }

    /// The live scope stack.
    pub fn scope_info(&self) -> &ScopeInfo {
        &self.scopes
    }

    /// The live scope stack, mutably.
    pub fn scope_info_mut(&mut self) -> &mut ScopeInfo {
        &mut self.scopes
    }

    /// The reserved id of the source unit itself, parent of all top-level
    /// declarations.
    pub fn unit_decl_id(&self) -> DeclId {
        DeclId::from_raw(0)
    }

    /// Allocate a fresh declaration id. Ids are monotonic and never
    /// reused, so records keyed by them cannot alias across resumed
    /// chunks.
    pub fn alloc_decl_id(&mut self) -> DeclId {
        let id = DeclId::from_raw(self.next_decl_id);
        self.next_decl_id += 1;
        id
    }

    /// Span of the token at `idx`.
    pub fn token_span(&self, idx: TokenIdx) -> Span {
        self.tokens[idx.index()].span
    }

    // ─── Deferred function bodies ────────────────────────────────────────

    /// Register a checkpoint for a skipped function body.
    ///
    /// The caller registers at most once per declaration; a second
    /// registration is a bookkeeping defect and trips a debug assertion.
    pub fn delay_function_body(&mut self, decl: DeclId, pos: ParserPos, scope: SavedScope) {
        trace!(?decl, index = pos.index.index(), "delaying function body");
        debug_assert!(
            !self.delayed_function_bodies.contains_key(&decl),
            "function body delayed twice for {decl:?}"
        );
        self.delayed_function_bodies
            .insert(decl, FunctionBodyState::new(pos, scope));
    }

    /// Redeem the checkpoint for `decl`, if one is held.
    ///
    /// Removes the record; a second call returns `None`.
    pub fn take_function_body(&mut self, decl: DeclId) -> Option<FunctionBodyState> {
        trace!(?decl, "taking function body state");
        self.delayed_function_bodies.remove(&decl)
    }

    /// Whether a deferred body record is held for `decl`.
    pub fn has_function_body(&self, decl: DeclId) -> bool {
        self.delayed_function_bodies.contains_key(&decl)
    }

    // ─── The singular deferred declaration ───────────────────────────────

    /// Install the singular deferred-declaration record.
    ///
    /// An outstanding record is silently replaced; callers that might race
    /// a pending record must check [`has_delayed_decl`] first. The
    /// replacement is logged so the sharp edge at least leaves a trace.
    ///
    /// [`has_delayed_decl`]: PersistentParserState::has_delayed_decl
    pub fn delay_decl(
        &mut self,
        kind: DelayedDeclKind,
        mode: ParseMode,
        parent: DeclId,
        pos: ParserPos,
        end: TokenIdx,
        scope: SavedScope,
    ) {
        if self.delayed_decl.is_some() {
            debug!(?kind, "overwriting an outstanding deferred declaration record");
        }
        trace!(?kind, index = pos.index.index(), "delaying declaration");
        self.delayed_decl = Some(DelayedDeclState {
            kind,
            mode,
            parent,
            pos,
            end,
            scope: Some(scope),
        });
    }

    /// Install the singular record for a skipped run of top-level code.
    pub fn delay_top_level(
        &mut self,
        mode: ParseMode,
        parent: DeclId,
        pos: ParserPos,
        end: TokenIdx,
        scope: SavedScope,
    ) {
        self.delay_decl(DelayedDeclKind::TopLevelCode, mode, parent, pos, end, scope);
    }

    /// Whether the singular deferred-declaration record is installed.
    pub fn has_delayed_decl(&self) -> bool {
        self.delayed_decl.is_some()
    }

    /// Kind of the installed record.
    ///
    /// # Panics
    /// Panics if no record is installed.
    pub fn delayed_decl_kind(&self) -> DelayedDeclKind {
        self.delayed_decl_ref().kind
    }

    /// Source span at the installed record's resume position.
    ///
    /// # Panics
    /// Panics if no record is installed.
    pub fn delayed_decl_loc(&self) -> Span {
        self.token_span(self.delayed_decl_ref().pos.index)
    }

    /// Enclosing context of the installed record.
    ///
    /// # Panics
    /// Panics if no record is installed.
    pub fn delayed_decl_parent(&self) -> DeclId {
        self.delayed_decl_ref().parent
    }

    fn delayed_decl_ref(&self) -> &DelayedDeclState {
        let Some(state) = self.delayed_decl.as_ref() else {
            panic!("no deferred declaration record installed");
        };
        state
    }

    /// Redeem the singular record, clearing the slot.
    ///
    /// # Panics
    /// Panics if no record is installed.
    pub fn take_delayed_decl(&mut self) -> DelayedDeclState {
        trace!("taking deferred declaration record");
        let Some(state) = self.delayed_decl.take() else {
            panic!("no deferred declaration record installed");
        };
        state
    }

    // ─── Deferred member lists ───────────────────────────────────────────

    /// Register a checkpoint for a skipped member list, keyed by the
    /// owning type-like context.
    pub fn delay_members(
        &mut self,
        ctx: DeclId,
        mode: ParseMode,
        parent: DeclId,
        pos: ParserPos,
        end: TokenIdx,
        scope: SavedScope,
    ) {
        trace!(?ctx, index = pos.index.index(), "delaying member list");
        self.delayed_member_lists.insert(
            ctx,
            DelayedMembersState {
                mode,
                parent,
                pos,
                end,
                scope: Some(scope),
            },
        );
    }

    /// Redeem the member-list checkpoint for `ctx`, if one is held.
    pub fn take_members(&mut self, ctx: DeclId) -> Option<DelayedMembersState> {
        trace!(?ctx, "taking member-list state");
        self.delayed_member_lists.remove(&ctx)
    }

    // ─── Marked position ─────────────────────────────────────────────────

    /// Remember where the parser stopped, and whether it stopped inside a
    /// line-directive-renumbered region.
    pub fn mark_parser_position(&mut self, pos: ParserPos, in_line_directive_region: bool) {
        self.marked_pos = pos;
        self.in_line_directive_region = in_line_directive_region;
    }

    /// Return the marked position and clear it.
    ///
    /// Always resets the slot, so a second take harmlessly returns the
    /// invalid default position.
    pub fn take_parser_position(&mut self) -> ParserPos {
        std::mem::take(&mut self.marked_pos)
    }

    /// Whether the last marked position was inside a line-directive region.
    pub fn in_line_directive_region(&self) -> bool {
        self.in_line_directive_region
    }

    // ─── Top-level naming context ────────────────────────────────────────

    /// The local context shared by all top-level code of the file.
    pub fn top_level_context(&self) -> &LocalContext {
        &self.top_level
    }

    /// The shared top-level context, mutably. Ownership stays here.
    pub fn top_level_context_mut(&mut self) -> &mut LocalContext {
        &mut self.top_level
    }

    // ─── Diagnostics from resumed parses ─────────────────────────────────

    /// Queue a diagnostic produced by a resumed parse.
    pub fn push_diagnostic(&mut self, diag: Diagnostic) {
        self.diagnostics.push(diag);
    }

    /// Diagnostics queued so far.
    pub fn diagnostics(&self) -> &DiagnosticQueue {
        &self.diagnostics
    }

    /// Drain queued diagnostics.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.drain()
    }
}

impl LazyMemberParser for PersistentParserState<'_> {
    fn has_unparsed_members(&self, ctx: DeclId) -> bool {
        self.delayed_member_lists.contains_key(&ctx)
    }

    fn parse_members(&mut self, ctx: DeclId) -> Vec<Decl> {
        debug!(?ctx, "materializing deferred member list");
        let Some(state) = self.take_members(ctx) else {
            panic!("no deferred member list for {ctx:?}");
        };
        crate::grammar::resume_member_list(self, ctx, state)
    }

    fn parse_all_delayed_member_lists(&mut self) -> Vec<(DeclId, Vec<Decl>)> {
        let mut drained = Vec::new();
        // Materializing one list may register lists for nested contexts;
        // iterate until no records remain.
        while !self.delayed_member_lists.is_empty() {
            let contexts: Vec<DeclId> = self.delayed_member_lists.keys().copied().collect();
            for ctx in contexts {
                if self.has_unparsed_members(ctx) {
                    let members = self.parse_members(ctx);
                    drained.push((ctx, members));
                }
            }
        }
        drained
    }
}
