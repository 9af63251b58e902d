//! Declarative macro expansion: pattern matching and substitution for
//! `macro_rules!`-style macros, implemented as an interpreter on top of syn.
//!
//! ## Expansion algorithm
//! Rust's macro expansion is actually quite subtle; it handles a lot of
//! not-immediately-obvious edge cases. The high-level flow:
//!
//! 1. parse the definition into [`ast::MacroDef`] (matchers + transcribers);
//! 2. try each rule's matcher against the call body in definition order
//!    ([`expand::Muncher`]), producing a
//!    [`marrow_api::substitution::MacroSubstitution`] for the first rule that
//!    consumes the whole input;
//! 3. walk the winning transcriber, re-emitting text and recording a
//!    [`marrow_api::ranges::RangeMap`] from expansion offsets back to call
//!    body offsets ([`expand::DeclMacroExpander`]).
//!
//! Matching is text-based: fragments are bound to exact slices of the call
//! body, so the range map is byte-for-byte accurate by construction (and
//! checked in debug builds).
//!
//! [`graph`] compiles a definition's matchers into an explicit state graph
//! once, so interactive queries ("what fragment is expected at this cursor
//! position?") can walk all alternatives without re-running the full matcher.
//!
//! Everything here is synchronous and shares no mutable state between calls;
//! a [`CancelToken`] lets a host abort pathological matches cooperatively.

// from the rust reference, https://doc.rust-lang.org/stable/reference/macros-by-example.html:

// > When forwarding a matched fragment to another macro-by-example, matchers in the second macro will
// > see an opaque AST of the fragment type. The second macro can't use literal tokens to match the fragments
// > in the matcher, only a fragment specifier of the same type. The ident, lifetime, and tt fragment types
// > are an exception, and can be matched by literal tokens.

#[macro_use]
extern crate quick_error;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod ast;
pub mod expand;
pub mod graph;

/// Fast maps.
pub type Map<K, V> = hashbrown::HashMap<K, V, fxhash::FxBuildHasher>;
/// Fast sets.
pub type Set<K> = hashbrown::HashSet<K, fxhash::FxBuildHasher>;

/// A cooperative cancellation flag shared between a host and a running match.
///
/// The matcher checks the flag at the start of every pattern-match attempt
/// and bails out with a cancellation outcome when it is set; no partial
/// results are produced. Clone the token and hand one half to the engine.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_canceled());
        token.cancel();
        assert!(clone.is_canceled());
    }
}
