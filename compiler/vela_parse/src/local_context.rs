//! Discriminator allocation for anonymous and name-colliding constructs.

use rustc_hash::FxHashMap;
use vela_ir::Name;

/// Per-declaration-context naming state.
///
/// Anonymous constructs (closures today, local functions when they land)
/// need stable, collision-free numbering no matter which deferred chunk
/// materializes them first. Each function body gets a fresh context; all
/// top-level code of a file shares the one owned by the parser's
/// persistent state, which is never reset mid-file.
#[derive(Debug, Default)]
pub struct LocalContext {
    next_closure_discriminator: u32,
    named_discriminators: FxHashMap<Name, u32>,
}

impl LocalContext {
    /// Create a fresh context; counters start at zero.
    pub fn new() -> Self {
        LocalContext::default()
    }

    /// Claim the next closure discriminator.
    pub fn claim_closure_discriminator(&mut self) -> u32 {
        let discriminator = self.next_closure_discriminator;
        self.next_closure_discriminator += 1;
        discriminator
    }

    /// Claim the next discriminator for a named construct.
    ///
    /// Counters are independent per name: the second `helper` gets 1
    /// regardless of how many other names were numbered in between.
    pub fn claim_named_discriminator(&mut self, name: Name) -> u32 {
        let counter = self.named_discriminators.entry(name).or_insert(0);
        let discriminator = *counter;
        *counter += 1;
        discriminator
    }

    /// Number of closure discriminators claimed so far.
    pub fn closure_discriminators_claimed(&self) -> u32 {
        self.next_closure_discriminator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_discriminators_monotonic_from_zero() {
        let mut ctx = LocalContext::new();
        assert_eq!(ctx.closure_discriminators_claimed(), 0);
        assert_eq!(ctx.claim_closure_discriminator(), 0);
        assert_eq!(ctx.claim_closure_discriminator(), 1);
        assert_eq!(ctx.claim_closure_discriminator(), 2);
        assert_eq!(ctx.closure_discriminators_claimed(), 3);
    }

    #[test]
    fn test_named_discriminators_independent_per_name() {
        let mut ctx = LocalContext::new();
        let a = Name::from_raw(1);
        let b = Name::from_raw(2);
        assert_eq!(ctx.claim_named_discriminator(a), 0);
        assert_eq!(ctx.claim_named_discriminator(b), 0);
        assert_eq!(ctx.claim_named_discriminator(a), 1);
        assert_eq!(ctx.claim_named_discriminator(b), 1);
    }
}
