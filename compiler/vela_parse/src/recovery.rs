//! Error recovery.
//!
//! Failed productions surface an error and resynchronize so one mistake
//! doesn't cascade through the rest of the file.

use vela_ir::{TokenIdx, TokenKind};

use crate::Parser;

impl Parser<'_, '_> {
    /// Skip to the next top-level declaration boundary (`fn`, `type`, or
    /// a directive) at brace depth zero.
    pub(crate) fn synchronize_top_level(&mut self) {
        let mut depth = 0u32;
        while !self.is_at_end() {
            match self.current_kind() {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => depth = depth.saturating_sub(1),
                TokenKind::Fn | TokenKind::Type | TokenKind::LineDirective if depth == 0 => {
                    return;
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip past the next newline, staying inside the `end` bound.
    /// Guarantees progress: at least one token is consumed unless the
    /// cursor already sits at the bound or EOF.
    pub(crate) fn recover_within(&mut self, end: Option<TokenIdx>) {
        while !self.is_at_end() && !self.at_bound(end) {
            if self.check(&TokenKind::Newline) {
                self.advance();
                return;
            }
            self.advance();
        }
    }
}
