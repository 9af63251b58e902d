//! Data structures shared between the `marrow` crates: token text, byte-range
//! maps between macro call bodies and their expansions, the metavariable
//! substitution tree produced by pattern matching, and the MIR schema used to
//! model match-expression lowering.
//!
//! ### Why not just use syn?
//! Syn's syntax trees include everything needed to reconstruct the textual
//! program input; consumers of this crate only need the *results* of matching
//! and lowering. In addition, syn's types aren't Send or Serialize, and hosts
//! want to cache expansions and render them off-thread. So everything in this
//! crate is plain owned data with serde derives; the engine crate
//! (`marrow-expand`) is the only place syn types appear.
//!
//! N.B.: there are a couple of places where we store strings designed to be
//! re-parsed by syn (see [`tokens::Tokens`]).

/// Fast single-thread-writeable maps.
pub type Map<K, V> = hashbrown::HashMap<K, V, fxhash::FxBuildHasher>;
/// Fast single-thread-writeable sets.
pub type Set<K> = hashbrown::HashSet<K, fxhash::FxBuildHasher>;

pub mod mir;
pub mod ranges;
pub mod substitution;
pub mod tokens;
