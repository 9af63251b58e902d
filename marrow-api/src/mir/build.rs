//! Decision structures for lowering a `match` expression into a body.
//!
//! One [`MirCandidate`] is created per match arm from the scrutinee place and
//! the arm's pattern. The lowering driver repeatedly picks a still-unsatisfied
//! [`MirMatchPair`] and either strips it (irrefutable pairs: wildcards,
//! bindings, structural destructures; see [`MirCandidate::simplify`]) or
//! emits a runtime test for it. Patterns with alternatives fork the candidate
//! into `subcandidates`; [`MirCandidate::visit_leaves`] then yields one leaf
//! per concrete outcome so the driver can emit one code path each.
//!
//! The driver itself (test selection, block creation) is owned by the
//! lowering engine, not this crate; these types only carry its state.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::trace;

use super::*;

/// A pattern, in the reduced shape match lowering works on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirPat {
    pub span: MirSpan,
    pub kind: MirPatKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MirPatKind {
    /// `_`
    Wild,
    /// `x`, `ref mut x @ sub`
    Binding {
        name: SmolStr,
        mode: MirBindingMode,
        var: MirLocal,
        subpattern: Option<Box<MirPat>>,
    },
    /// A literal the place must equal.
    Constant(MirConstValue),
    /// Positional destructure of a tuple or single-variant struct: field i of
    /// the place must match subpattern i.
    Tuple(Vec<MirPat>),
    /// `Enum::Variant(sub, ...)`: downcast then destructure.
    Variant {
        variant_index: u32,
        subpatterns: Vec<MirPat>,
    },
    /// `&sub`
    Deref(Box<MirPat>),
    /// `a | b | c`
    Or(Vec<MirPat>),
}

impl MirPat {
    pub fn new(span: MirSpan, kind: MirPatKind) -> Self {
        MirPat { span, kind }
    }

    pub fn wild(span: MirSpan) -> Self {
        MirPat::new(span, MirPatKind::Wild)
    }
}

/// By-value or by-reference, mutable or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirBindingMode {
    BindByValue(Mutability),
    BindByReference(Mutability),
}

/// A place that still has to be tested against a sub-pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirMatchPair {
    pub place: MirPlace,
    pub pattern: MirPat,
}

impl MirMatchPair {
    pub fn new(place: MirPlace, pattern: MirPat) -> Self {
        MirMatchPair { place, pattern }
    }
}

/// A pattern variable bound to a place, recorded while stripping match pairs;
/// materialized as assignments once the candidate is fully matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirBinding {
    pub span: MirSpan,
    pub name: SmolStr,
    pub var: MirLocal,
    pub source: MirPlace,
    pub mode: MirBindingMode,
}

/// A partially-resolved match arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirCandidate {
    pub span: MirSpan,
    pub has_guard: bool,
    /// Places still to be tested. Empty once the candidate is fully matched.
    pub match_pairs: Vec<MirMatchPair>,
    /// Bindings accumulated while stripping irrefutable pairs.
    pub bindings: Vec<MirBinding>,
    /// Alternatives produced by or-patterns. A candidate with subcandidates
    /// is matched iff any subcandidate is.
    pub subcandidates: Vec<MirCandidate>,
    /// Filled in by the lowering driver: where to go before binding, and
    /// where to go if this candidate ultimately fails.
    pub pre_binding_block: Option<MirBasicBlockId>,
    pub otherwise_block: Option<MirBasicBlockId>,
}

impl MirCandidate {
    pub fn new(place: MirPlace, pattern: &MirPat, has_guard: bool) -> Self {
        MirCandidate {
            span: pattern.span,
            has_guard,
            match_pairs: vec![MirMatchPair::new(place, pattern.clone())],
            bindings: Vec::new(),
            subcandidates: Vec::new(),
            pre_binding_block: None,
            otherwise_block: None,
        }
    }

    /// Visit every fully-forked leaf candidate, in match order.
    pub fn visit_leaves<'a>(&'a mut self, visit: &mut impl FnMut(&'a mut MirCandidate)) {
        if self.subcandidates.is_empty() {
            visit(self);
        } else {
            for subcandidate in &mut self.subcandidates {
                subcandidate.visit_leaves(visit);
            }
        }
    }

    /// Strip irrefutable match pairs until only pairs that need a runtime
    /// test remain, accumulating bindings and destructuring as we go.
    /// Or-patterns are kept and sorted last, so the driver tests cheap
    /// refutable pairs first.
    pub fn simplify(&mut self) {
        loop {
            let pairs = std::mem::replace(&mut self.match_pairs, Vec::new());
            let mut changed = false;
            for pair in pairs {
                changed |= self.simplify_match_pair(pair);
            }
            if !changed {
                break;
            }
        }
        self.match_pairs
            .sort_by_key(|pair| matches!(pair.pattern.kind, MirPatKind::Or(_)));
        trace!(
            "simplified candidate: {} pairs, {} bindings",
            self.match_pairs.len(),
            self.bindings.len()
        );
    }

    /// Strip one pair if it is irrefutable; push it back otherwise. Returns
    /// true if the pair was simplified.
    fn simplify_match_pair(&mut self, pair: MirMatchPair) -> bool {
        match pair.pattern.kind {
            MirPatKind::Wild => {}
            MirPatKind::Binding {
                ref name,
                mode,
                var,
                ref subpattern,
            } => {
                self.bindings.push(MirBinding {
                    span: pair.pattern.span,
                    name: name.clone(),
                    var,
                    source: pair.place.clone(),
                    mode,
                });
                if let Some(subpattern) = subpattern {
                    self.match_pairs
                        .push(MirMatchPair::new(pair.place, (**subpattern).clone()));
                }
            }
            MirPatKind::Tuple(ref subpatterns) => {
                for (index, subpattern) in subpatterns.iter().enumerate() {
                    let place = pair
                        .place
                        .clone()
                        .project_deeper(MirProjectionElem::Field(index as u32));
                    self.match_pairs
                        .push(MirMatchPair::new(place, subpattern.clone()));
                }
            }
            MirPatKind::Deref(ref subpattern) => {
                let place = pair.place.clone().project_deeper(MirProjectionElem::Deref);
                self.match_pairs
                    .push(MirMatchPair::new(place, (**subpattern).clone()));
            }
            // these need a runtime test (or a fork); keep them
            MirPatKind::Constant(_) | MirPatKind::Variant { .. } | MirPatKind::Or(_) => {
                self.match_pairs.push(pair);
                return false;
            }
        }
        true
    }

    /// Fork the first or-pattern pair into one subcandidate per alternative.
    /// Each subcandidate inherits the remaining pairs plus the alternative's
    /// own pair. Returns false if there is no or-pattern pair to expand.
    pub fn expand_or_pattern(&mut self) -> bool {
        let index = match self
            .match_pairs
            .iter()
            .position(|pair| matches!(pair.pattern.kind, MirPatKind::Or(_)))
        {
            Some(index) => index,
            None => return false,
        };
        let pair = self.match_pairs.remove(index);
        let place = pair.place;
        let alternatives = match pair.pattern.kind {
            MirPatKind::Or(alternatives) => alternatives,
            _ => unreachable!("position() found an or-pattern"),
        };

        let remaining = std::mem::replace(&mut self.match_pairs, Vec::new());
        self.subcandidates = alternatives
            .into_iter()
            .map(|alternative| {
                let mut pairs = vec![MirMatchPair::new(place.clone(), alternative)];
                pairs.extend(remaining.iter().cloned());
                MirCandidate {
                    span: self.span,
                    has_guard: self.has_guard,
                    match_pairs: pairs,
                    bindings: self.bindings.clone(),
                    subcandidates: Vec::new(),
                    pre_binding_block: None,
                    otherwise_block: None,
                }
            })
            .collect();
        true
    }
}
