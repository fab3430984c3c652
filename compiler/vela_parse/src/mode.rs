//! Parsing-mode hints.

use bitflags::bitflags;

bitflags! {
    /// Hints controlling which constructs the parser defers.
    ///
    /// The checkpoint layer never decides what to defer; drivers pick the
    /// mode and the grammar consults it at each deferral boundary. The
    /// mode travels with deferred-declaration records so resumed parses
    /// behave like the parse they were cut out of.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct ParseMode: u32 {
        /// Skip function bodies, registering a deferred body record.
        const DELAY_FUNCTION_BODIES = 1 << 0;
        /// Skip type member lists, registering a deferred member-list record.
        const DELAY_MEMBER_LISTS = 1 << 1;
    }
}
