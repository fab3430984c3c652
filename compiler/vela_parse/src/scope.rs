//! Lexical scope tracking and restorable scope snapshots.
//!
//! The parser maintains a stack of named-binding scopes while it walks a
//! source unit. When it skips a construct for later parsing it captures
//! the chain as a [`SavedScope`]; redeeming the checkpoint reinstalls the
//! chain so name lookup inside the deferred region resolves exactly as it
//! would have during an uninterrupted parse.
//!
//! Frames are reference-counted and copy-on-write: capturing clones one
//! `Rc` handle per frame (O(depth), no mutation of the live stack), and a
//! binding added after the capture forces the mutated frame to diverge
//! from the snapshot's copy.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use vela_ir::{Name, Span};

/// Kind of lexical scope.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    /// The top level of a source file.
    SourceUnit,
    /// A function body, including its parameters.
    FunctionBody,
    /// The member list of a type declaration.
    TypeMembers,
    /// A braced statement block.
    Block,
    /// A closure body, including its parameters.
    Closure,
}

/// One frame of the scope stack.
#[derive(Clone, Debug)]
struct ScopeFrame {
    kind: ScopeKind,
    /// Names introduced in this scope, with the span that introduced them.
    bindings: FxHashMap<Name, Span>,
}

impl ScopeFrame {
    fn new(kind: ScopeKind) -> Self {
        ScopeFrame {
            kind,
            bindings: FxHashMap::default(),
        }
    }
}

/// An owned, restorable capture of the scope chain.
///
/// Move-only by design: a snapshot parked in a deferred record is spent
/// when the record is redeemed and cannot be restored twice.
#[derive(Debug)]
pub struct SavedScope {
    frames: Vec<Rc<ScopeFrame>>,
}

impl SavedScope {
    /// Depth of the captured chain.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// The live scope stack.
#[derive(Debug, Default)]
pub struct ScopeInfo {
    stack: Vec<Rc<ScopeFrame>>,
}

impl ScopeInfo {
    /// Create an empty scope stack.
    pub fn new() -> Self {
        ScopeInfo::default()
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Whether no scope is active.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Kind of the innermost scope, if any.
    pub fn current_kind(&self) -> Option<ScopeKind> {
        self.stack.last().map(|frame| frame.kind)
    }

    /// Enter a new scope.
    pub fn push_scope(&mut self, kind: ScopeKind) {
        self.stack.push(Rc::new(ScopeFrame::new(kind)));
    }

    /// Leave the innermost scope.
    ///
    /// # Panics
    /// Panics on underflow; the grammar keeps push/pop balanced.
    pub fn pop_scope(&mut self) {
        assert!(self.stack.pop().is_some(), "scope stack underflow");
    }

    /// Introduce a binding in the innermost scope.
    ///
    /// # Panics
    /// Panics if no scope is active.
    pub fn declare(&mut self, name: Name, span: Span) {
        let Some(top) = self.stack.last_mut() else {
            panic!("declared a binding with no active scope");
        };
        Rc::make_mut(top).bindings.insert(name, span);
    }

    /// Look a name up through the chain, innermost scope first.
    pub fn lookup(&self, name: Name) -> Option<Span> {
        self.stack
            .iter()
            .rev()
            .find_map(|frame| frame.bindings.get(&name).copied())
    }

    /// Capture the current chain without disturbing it.
    ///
    /// O(depth): one `Rc` clone per frame.
    pub fn capture(&self) -> SavedScope {
        SavedScope {
            frames: self.stack.clone(),
        }
    }

    /// Install a captured chain as the active stack, handing back the
    /// displaced chain.
    ///
    /// Redeeming a checkpoint installs its snapshot, runs the deferred
    /// parse (which pushes and pops scopes above the restored chain as
    /// usual), then installs the displaced chain again, leaving the live
    /// stack exactly as it was before the excursion.
    #[must_use]
    pub fn install(&mut self, saved: SavedScope) -> SavedScope {
        SavedScope {
            frames: std::mem::replace(&mut self.stack, saved.frames),
        }
    }
}
