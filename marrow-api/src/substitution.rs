//! The result of matching one macro arm: a mapping from metavariable names to
//! the bits of syntax they were matched with.
//!
//! On the high level, a [`MacroSubstitution`] stores a mapping from meta
//! variables to the text they should be substituted with. For example, if
//! `$e:expr` is matched with `1 + 1`, the substitution will store
//! `e -> 1 + 1`.
//!
//! The tricky bit is dealing with repetitions (`$()*`). Consider:
//!
//! ```text
//! macro_rules! foo {
//!     ($($i:ident $($e:expr),*);*) => {
//!         $(fn $i() { $($e);*; })*
//!     }
//! }
//! foo! { foo 1,2,3; bar 4,5,6 }
//! ```
//!
//! Here `$i` is matched first with `foo` and then with `bar`, and `$e` is
//! matched in turn with `1`, `2`, `3`, `4`, `5`, `6`. To represent such
//! "multi-mappings" we map variables not to values but to *trees* of values:
//!
//! ```text
//! i -> [foo, bar]
//! e -> [[1, 2, 3], [4, 5, 6]]
//! ```

use crate::Map;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::str::FromStr;

/// A fragment specifier: the syntactic category a metavariable binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FragmentKind {
    Ident,
    Path,
    Expr,
    Ty,
    Pat,
    PatParam,
    Stmt,
    Block,
    Item,
    Meta,
    Tt,
    Vis,
    Literal,
    Lifetime,
}

impl FragmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FragmentKind::Ident => "ident",
            FragmentKind::Path => "path",
            FragmentKind::Expr => "expr",
            FragmentKind::Ty => "ty",
            FragmentKind::Pat => "pat",
            FragmentKind::PatParam => "pat_param",
            FragmentKind::Stmt => "stmt",
            FragmentKind::Block => "block",
            FragmentKind::Item => "item",
            FragmentKind::Meta => "meta",
            FragmentKind::Tt => "tt",
            FragmentKind::Vis => "vis",
            FragmentKind::Literal => "literal",
            FragmentKind::Lifetime => "lifetime",
        }
    }
}

impl FromStr for FragmentKind {
    type Err = ();

    fn from_str(s: &str) -> Result<FragmentKind, ()> {
        Ok(match s {
            "ident" => FragmentKind::Ident,
            "path" => FragmentKind::Path,
            "expr" => FragmentKind::Expr,
            "ty" => FragmentKind::Ty,
            "pat" => FragmentKind::Pat,
            "pat_param" => FragmentKind::PatParam,
            "stmt" => FragmentKind::Stmt,
            "block" => FragmentKind::Block,
            "item" => FragmentKind::Item,
            "meta" => FragmentKind::Meta,
            "tt" => FragmentKind::Tt,
            "vis" => FragmentKind::Vis,
            "literal" => FragmentKind::Literal,
            "lifetime" => FragmentKind::Lifetime,
            _ => return Err(()),
        })
    }
}

/// The syntactic shape of a matched expression fragment.
///
/// Used to decide whether the fragment must be parenthesized when spliced
/// into a new syntactic context: everything except [`ExprClass::Other`]
/// already binds tighter than any operator, so wrapping it again would only
/// add noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExprClass {
    Literal,
    Path,
    Paren,
    Tuple,
    Unit,
    Array,
    MacroCall,
    Other,
}

/// The value bound to one metavariable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaVarValue {
    /// A leaf binding: the matched text and where it came from.
    Fragment {
        /// The raw matched text, sliced out of the call body.
        text: String,
        /// The syntactic kind it was parsed as. `None` for synthetic
        /// fragments such as `$crate`.
        kind: Option<FragmentKind>,
        /// For `expr` fragments, the shape of the parsed expression.
        class: Option<ExprClass>,
        /// Byte offset in the call body where the text was found. `None` if
        /// the fragment is synthetic and has no source location.
        offset_in_call_body: Option<usize>,
    },
    /// One level of repetition: the i-th entry is the value (or nested group)
    /// produced by the i-th repetition.
    Group(Vec<MetaVarValue>),
    /// A repetition that matched zero times. Distinguished from
    /// `Group(vec![])` so that downstream code can tell "the group never
    /// matched" apart from "the group matched but this variable was padded".
    EmptyGroup,
}

impl MetaVarValue {
    pub fn fragment(
        text: impl Into<String>,
        kind: FragmentKind,
        class: Option<ExprClass>,
        offset_in_call_body: usize,
    ) -> MetaVarValue {
        MetaVarValue::Fragment {
            text: text.into(),
            kind: Some(kind),
            class,
            offset_in_call_body: Some(offset_in_call_body),
        }
    }

    /// A fragment with no source location, e.g. the `$crate` identifier.
    pub fn synthetic(text: impl Into<String>) -> MetaVarValue {
        MetaVarValue::Fragment {
            text: text.into(),
            kind: None,
            class: None,
            offset_in_call_body: None,
        }
    }
}

/// The complete metavariable mapping produced by successfully matching one
/// macro arm. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroSubstitution {
    pub variables: Map<SmolStr, MetaVarValue>,
}

impl MacroSubstitution {
    pub fn new(variables: Map<SmolStr, MetaVarValue>) -> Self {
        MacroSubstitution { variables }
    }

    pub fn get(&self, name: &str) -> Option<&MetaVarValue> {
        self.variables.get(name)
    }

    /// The nesting depth of `name`: how many repetition levels enclose its
    /// values, i.e. how many indices a lookup must supply.
    pub fn nesting_depth(&self, name: &str) -> Option<usize> {
        fn depth(value: &MetaVarValue) -> usize {
            match value {
                MetaVarValue::Fragment { .. } => 0,
                MetaVarValue::EmptyGroup => 1,
                MetaVarValue::Group(nested) => {
                    1 + nested.iter().map(depth).max().unwrap_or(0)
                }
            }
        }
        self.variables.get(name).map(depth)
    }
}
