//! Lazy member parsing capability.

use crate::{Decl, DeclId};

/// Capability for materializing lazily-parsed member lists.
///
/// Implemented by the parser's persistent state; held by the AST and
/// type-checking layers as an abstract reference so they never depend on
/// the parser directly. A context whose member list was skipped reports
/// `has_unparsed_members(ctx) == true` until the list is materialized;
/// consumers must poll it before trusting a member list as complete.
pub trait LazyMemberParser {
    /// Whether `ctx` still has a skipped, unmaterialized member list.
    fn has_unparsed_members(&self, ctx: DeclId) -> bool;

    /// Materialize the member list for `ctx`, in parse order.
    ///
    /// Consumes the deferred record: afterwards
    /// `has_unparsed_members(ctx)` is `false`.
    ///
    /// # Panics
    /// Panics if no member list is pending for `ctx`; requesting members
    /// that were never deferred is a sequencing fault in the caller.
    fn parse_members(&mut self, ctx: DeclId) -> Vec<Decl>;

    /// Materialize every outstanding member list, draining to a fixed
    /// point when materialization registers lists for nested contexts.
    ///
    /// Each context is processed exactly once; order across contexts is
    /// unspecified. Idempotent: a second call returns an empty batch.
    fn parse_all_delayed_member_lists(&mut self) -> Vec<(DeclId, Vec<Decl>)>;
}
