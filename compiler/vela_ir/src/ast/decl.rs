//! Declarations and source units.

use std::fmt;

use super::{Block, TypeExpr};
use crate::{Name, Span};

/// Stable identity of a declaration within one compilation session.
///
/// Allocated monotonically by the parser's persistent state and never
/// reused, so it can key registries of deferred parsing work. The
/// registries hold ids, never cloned declaration values.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct DeclId(u32);

impl DeclId {
    /// Create from a raw counter value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        DeclId(raw)
    }

    /// Raw counter value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeclId({})", self.0)
    }
}

/// A declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct Decl {
    pub id: DeclId,
    pub kind: DeclKind,
    pub span: Span,
}

/// Kind of declaration.
#[derive(Clone, Debug, PartialEq)]
pub enum DeclKind {
    Function(FunctionDecl),
    Type(TypeDecl),
    Field(FieldDecl),
    TopLevelCode(TopLevelCodeDecl),
}

/// A function declaration: `fn name(params) -> Type { body }`.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDecl {
    pub name: Name,
    pub params: Vec<Param>,
    pub return_ty: Option<TypeExpr>,
    pub body: FunctionBody,
}

/// State of a function body.
#[derive(Clone, Debug, PartialEq)]
pub enum FunctionBody {
    /// The body was parsed.
    Parsed(Block),
    /// The body was skipped; the span covers the braced region. A
    /// deferred-body record for this declaration holds the resume state.
    Unparsed(Span),
}

/// A function parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Name,
    pub ty: TypeExpr,
    pub span: Span,
}

/// A nominal type declaration: `type Name { members }`.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeDecl {
    pub name: Name,
    pub members: Members,
}

/// State of a type's member list.
///
/// Consumers must treat `Parsed` as authoritative only after checking
/// [`LazyMemberParser::has_unparsed_members`](crate::LazyMemberParser):
/// while a deferred record exists, the list here is a placeholder.
#[derive(Clone, Debug, PartialEq)]
pub enum Members {
    /// Member declarations in parse order.
    Parsed(Vec<Decl>),
    /// The member list was skipped; the span covers the braced region.
    Unparsed(Span),
}

/// A field member: `name: Type`.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDecl {
    pub name: Name,
    pub ty: TypeExpr,
}

/// A maximal run of executable statements at the top level of a file.
#[derive(Clone, Debug, PartialEq)]
pub struct TopLevelCodeDecl {
    pub body: Block,
}

/// A parsed source file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceUnit {
    pub decls: Vec<Decl>,
}

impl SourceUnit {
    /// Find a declaration by id, searching parsed member lists recursively.
    pub fn decl(&self, id: DeclId) -> Option<&Decl> {
        fn search(decls: &[Decl], id: DeclId) -> Option<&Decl> {
            for decl in decls {
                if decl.id == id {
                    return Some(decl);
                }
                if let DeclKind::Type(TypeDecl {
                    members: Members::Parsed(members),
                    ..
                }) = &decl.kind
                {
                    if let Some(found) = search(members, id) {
                        return Some(found);
                    }
                }
            }
            None
        }
        search(&self.decls, id)
    }

    /// Install a materialized member list into the type declaration `ctx`.
    ///
    /// On failure the list is handed back: `ctx` is not (yet) reachable in
    /// this unit, which happens when its enclosing type's own members have
    /// not been installed; see [`SourceUnit::install_all_members`].
    pub fn install_members(&mut self, ctx: DeclId, members: Vec<Decl>) -> Result<(), Vec<Decl>> {
        fn install(decls: &mut [Decl], ctx: DeclId, members: Vec<Decl>) -> Result<(), Vec<Decl>> {
            let mut members = members;
            for decl in decls {
                if let DeclKind::Type(type_decl) = &mut decl.kind {
                    if decl.id == ctx {
                        type_decl.members = Members::Parsed(members);
                        return Ok(());
                    }
                    if let Members::Parsed(inner) = &mut type_decl.members {
                        match install(inner, ctx, members) {
                            Ok(()) => return Ok(()),
                            Err(returned) => members = returned,
                        }
                    }
                }
            }
            Err(members)
        }
        install(&mut self.decls, ctx, members)
    }

    /// Install a batch of materialized member lists.
    ///
    /// The batch may contain a nested context before its parent (drain
    /// order across contexts is unspecified), so installation retries
    /// until a fixed point.
    ///
    /// # Panics
    /// Panics if some context in the batch never becomes reachable, which
    /// means the lists were drained from a different compilation session.
    pub fn install_all_members(&mut self, lists: Vec<(DeclId, Vec<Decl>)>) {
        let mut pending = lists;
        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for (ctx, members) in pending {
                if let Err(returned) = self.install_members(ctx, members) {
                    deferred.push((ctx, returned));
                }
            }
            assert!(
                deferred.len() < before,
                "member lists reference contexts outside this source unit"
            );
            pending = deferred;
        }
    }
}
