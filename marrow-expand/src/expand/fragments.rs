//! Fragment parser dispatch: consume one fragment of a given syntactic
//! category from a parse stream.
//!
//! Each [`FragmentKind`] maps to one of syn's nonterminal parsers, at the
//! lowest precedence level so the widest possible construct is accepted. On
//! success the routine reports the byte offset just past the last consumed
//! token, so the caller can slice the exact matched text out of the call
//! body. On failure the stream is left in an unspecified state; callers
//! fork before attempting and roll back by dropping the fork.
//!
//! Two kinds deviate from plain delegation, per `macro_rules` semantics:
//! `vis` always succeeds (an absent visibility is valid, and the only legal
//! zero-length match), and `literal` accepts a leading `-` for negative
//! numbers, rolling it back if no literal follows.

use marrow_api::substitution::{ExprClass, FragmentKind};
use proc_macro2 as pm2;
use quote::ToTokens;
use syn::{
    ext::IdentExt,
    parse::{discouraged::Speculative, ParseStream},
    Token,
};

pub(crate) struct ParsedFragment {
    /// Byte offset in the call body just past the last consumed token.
    /// `None` when the parse legitimately consumed nothing (`vis`).
    pub end: Option<usize>,
    /// For `expr` fragments, the shape of the parsed expression.
    pub class: Option<ExprClass>,
}

impl ParsedFragment {
    fn plain(node: &impl ToTokens) -> Self {
        ParsedFragment {
            end: end_offset(node),
            class: None,
        }
    }
}

pub(crate) fn parse_fragment(
    kind: FragmentKind,
    input: ParseStream,
) -> syn::Result<ParsedFragment> {
    let parsed = match kind {
        FragmentKind::Ident => ParsedFragment::plain(&input.call(pm2::Ident::parse_any)?),
        FragmentKind::Path => ParsedFragment::plain(&input.parse::<syn::Path>()?),
        FragmentKind::Expr => {
            let expr = input.parse::<syn::Expr>()?;
            ParsedFragment {
                end: end_offset(&expr),
                class: Some(classify_expr(&expr)),
            }
        }
        FragmentKind::Ty => ParsedFragment::plain(&input.parse::<syn::Type>()?),
        // both pattern kinds delegate to syn's single-pattern parser:
        // no or-patterns at the top level of a fragment
        FragmentKind::Pat | FragmentKind::PatParam => {
            ParsedFragment::plain(&input.parse::<syn::Pat>()?)
        }
        FragmentKind::Stmt => ParsedFragment::plain(&input.parse::<syn::Stmt>()?),
        FragmentKind::Block => ParsedFragment::plain(&input.parse::<syn::Block>()?),
        FragmentKind::Item => ParsedFragment::plain(&input.parse::<syn::Item>()?),
        FragmentKind::Meta => ParsedFragment::plain(&input.parse::<syn::Meta>()?),
        FragmentKind::Tt => ParsedFragment::plain(&input.parse::<pm2::TokenTree>()?),
        FragmentKind::Vis => {
            let vis = input.parse::<syn::Visibility>()?;
            match vis {
                syn::Visibility::Inherited => ParsedFragment {
                    end: None,
                    class: None,
                },
                _ => ParsedFragment::plain(&vis),
            }
        }
        FragmentKind::Literal => parse_literal(input)?,
        FragmentKind::Lifetime => ParsedFragment::plain(&input.parse::<syn::Lifetime>()?),
    };
    Ok(parsed)
}

/// `literal` accepts an optional leading `-`; if what follows the minus isn't
/// a literal, the minus is rolled back and the plain parse reports the error.
fn parse_literal(input: ParseStream) -> syn::Result<ParsedFragment> {
    let fork = input.fork();
    if fork.parse::<Token![-]>().is_ok() {
        if let Ok(lit) = fork.parse::<syn::Lit>() {
            input.advance_to(&fork);
            return Ok(ParsedFragment::plain(&lit));
        }
    }
    Ok(ParsedFragment::plain(&input.parse::<syn::Lit>()?))
}

fn classify_expr(expr: &syn::Expr) -> ExprClass {
    match expr {
        syn::Expr::Lit(_) => ExprClass::Literal,
        syn::Expr::Path(_) => ExprClass::Path,
        syn::Expr::Paren(_) => ExprClass::Paren,
        syn::Expr::Tuple(tuple) if tuple.elems.is_empty() => ExprClass::Unit,
        syn::Expr::Tuple(_) => ExprClass::Tuple,
        syn::Expr::Array(_) => ExprClass::Array,
        syn::Expr::Macro(_) => ExprClass::MacroCall,
        _ => ExprClass::Other,
    }
}

/// The largest end offset of any token produced by `node`. `None` for nodes
/// that produce no tokens. Only meaningful for nodes parsed out of a
/// `parse_str` stream, where spans carry byte ranges into the source text.
fn end_offset(node: &impl ToTokens) -> Option<usize> {
    let mut end = None;
    for tt in node.to_token_stream() {
        let tt_end = tt.span().byte_range().end;
        end = Some(match end {
            Some(current) if current > tt_end => current,
            _ => tt_end,
        });
    }
    end
}
