//! Algorithm to consume a macro call body, saving matched fragments into a
//! [`MacroSubstitution`] as we go.
//!
//! The group-matching rules follow rustc's `macro_rules` matcher behavior:
//! first-failure (no backtracking across top-level pattern nodes), separators
//! required between repetitions but never after the last one, and a hard
//! error on repetitions that match without consuming anything, which would
//! otherwise loop forever.
//!
//! Matching is driven by a live `ParseStream` over the call body tokens.
//! Speculation (group attempts, separator lookahead) works by forking the
//! stream and committing with `advance_to` only on success; a dropped fork is
//! a rollback.

use marrow_api::substitution::{FragmentKind, MacroSubstitution, MetaVarValue};
use proc_macro2 as pm2;
use smol_str::SmolStr;
use syn::ext::IdentExt;
use syn::parse::discouraged::Speculative;
use syn::parse::{ParseStream, Parser};
use tracing::trace;

use crate::ast::{self, Matcher, MatcherSeq, RepeatKind};
use crate::expand::fragments::parse_fragment;
use crate::expand::{delim_close, delim_open, MacroMatchingError};
use crate::{CancelToken, Map};

type Bindings = Map<SmolStr, MetaVarValue>;
type MatchResult<T> = Result<T, MacroMatchingError>;

/// Matches macro call bodies against one definition's matchers.
///
/// `body` must be the exact text the input tokens were parsed from
/// (`syn::parse_str`), since matched fragments are sliced out of it by the
/// byte offsets the token spans carry.
pub struct Muncher<'a> {
    body: &'a str,
    cancel: CancelToken,
}

impl<'a> Muncher<'a> {
    pub fn new(body: &'a str, cancel: CancelToken) -> Self {
        Muncher { body, cancel }
    }

    /// Match one rule's pattern against the whole input. Trailing unconsumed
    /// input fails the match with `ExtraInput`.
    pub fn match_rule(
        &self,
        pattern: &MatcherSeq,
        input: pm2::TokenStream,
    ) -> MatchResult<MacroSubstitution> {
        let scope_end = self.body.len();
        let result = (|stream: ParseStream| -> syn::Result<MatchResult<Bindings>> {
            let result = self
                .match_partial(pattern, stream, scope_end)
                .and_then(|bindings| {
                    if stream.is_empty() {
                        Ok(bindings)
                    } else {
                        trace!("match failed: extra input");
                        Err(MacroMatchingError::ExtraInput(stream_offset(
                            stream, scope_end,
                        )))
                    }
                });
            drain(stream);
            Ok(result)
        })
        .parse2(input);
        match result {
            Ok(result) => result.map(MacroSubstitution::new),
            Err(_) => unreachable!("matcher closure drains its input"),
        }
    }

    /// Match a prefix of the input: trailing unconsumed input is permitted.
    /// Used when testing one alternative among several call-site candidates;
    /// full expansion goes through [`Muncher::match_rule`] instead.
    pub fn match_prefix(
        &self,
        pattern: &MatcherSeq,
        input: pm2::TokenStream,
    ) -> MatchResult<MacroSubstitution> {
        let scope_end = self.body.len();
        let result = (|stream: ParseStream| -> syn::Result<MatchResult<Bindings>> {
            let result = self.match_partial(pattern, stream, scope_end);
            drain(stream);
            Ok(result)
        })
        .parse2(input);
        match result {
            Ok(result) => result.map(MacroSubstitution::new),
            Err(_) => unreachable!("matcher closure drains its input"),
        }
    }

    /// Match the pattern starting at the stream's current position, leaving
    /// any remaining input unconsumed.
    fn match_partial(
        &self,
        pattern: &MatcherSeq,
        stream: ParseStream,
        scope_end: usize,
    ) -> MatchResult<Bindings> {
        self.check_canceled()?;
        let mut bindings = Bindings::default();
        for matcher in &pattern.0 {
            self.match_one(matcher, stream, scope_end, &mut bindings)?;
        }
        Ok(bindings)
    }

    fn match_one(
        &self,
        matcher: &Matcher,
        stream: ParseStream,
        scope_end: usize,
        bindings: &mut Bindings,
    ) -> MatchResult<()> {
        match matcher {
            Matcher::Fragment(fragment) => {
                self.match_fragment(fragment, stream, scope_end, bindings)
            }
            Matcher::Repetition(repetition) => {
                self.match_group(repetition, stream, scope_end, bindings)
            }
            Matcher::Group(group) => self.match_delimited(group, stream, scope_end, bindings),
            Matcher::Ident(_) | Matcher::Lifetime(_) | Matcher::Literal(_) | Matcher::Punct(_) => {
                if stream.is_empty() {
                    trace!("match failed: input ended at a required token");
                    return Err(MacroMatchingError::EndOfInput(scope_end));
                }
                if eat_matcher_token(stream, matcher) {
                    Ok(())
                } else {
                    let offset = stream_offset(stream, scope_end);
                    trace!("match failed: token mismatch at {}", offset);
                    Err(MacroMatchingError::UnmatchedToken(
                        offset,
                        matcher_token_text(matcher),
                        next_token_text(stream),
                    ))
                }
            }
        }
    }

    /// Bind one fragment. Zero-length parses are rejected for every kind but
    /// `vis`; without this, a repetition over an always-empty fragment would
    /// never make progress.
    fn match_fragment(
        &self,
        fragment: &ast::Fragment,
        stream: ParseStream,
        scope_end: usize,
        bindings: &mut Bindings,
    ) -> MatchResult<()> {
        let start = stream_offset(stream, scope_end);
        let fork = stream.fork();
        let parsed = match parse_fragment(fragment.spec, &fork) {
            Ok(parsed) => parsed,
            Err(_) => {
                trace!("match failed: ${}:{} did not parse", fragment.name, fragment.spec.as_str());
                return Err(MacroMatchingError::FragmentNotParsed(
                    start,
                    fragment.name.to_string(),
                    fragment.spec,
                ));
            }
        };
        stream.advance_to(&fork);

        let end = parsed.end.unwrap_or(start);
        if end <= start && fragment.spec != FragmentKind::Vis {
            trace!("match failed: zero-length ${}:{}", fragment.name, fragment.spec.as_str());
            return Err(MacroMatchingError::FragmentNotParsed(
                start,
                fragment.name.to_string(),
                fragment.spec,
            ));
        }
        let text = if end > start { &self.body[start..end] } else { "" };
        bindings.insert(
            fragment.name.clone(),
            MetaVarValue::Fragment {
                text: text.to_string(),
                kind: Some(fragment.spec),
                class: parsed.class,
                offset_in_call_body: Some(start),
            },
        );
        Ok(())
    }

    /// Match a delimited group: same delimiter, and the inner pattern must
    /// consume the delimited contents completely.
    fn match_delimited(
        &self,
        group: &ast::Group,
        stream: ParseStream,
        scope_end: usize,
        bindings: &mut Bindings,
    ) -> MatchResult<()> {
        if stream.is_empty() {
            return Err(MacroMatchingError::EndOfInput(scope_end));
        }
        let fork = stream.fork();
        let input_group = match fork.parse::<pm2::Group>() {
            Ok(input_group) if input_group.delimiter() == group.delimiter => input_group,
            _ => {
                let offset = stream_offset(stream, scope_end);
                return Err(MacroMatchingError::UnmatchedToken(
                    offset,
                    delim_open(group.delimiter).to_string(),
                    next_token_text(stream),
                ));
            }
        };
        stream.advance_to(&fork);

        let inner_scope_end = input_group.span_close().byte_range().start;
        let inner = self.match_stream(
            &group.inner,
            input_group.stream(),
            inner_scope_end,
            delim_close(group.delimiter),
        )?;
        // a delimited group is not a repetition: its bindings stay at the
        // current nesting level
        for (name, value) in inner {
            bindings.insert(name, value);
        }
        Ok(())
    }

    /// Match a pattern against a detached token stream (the contents of a
    /// delimited group), requiring full consumption.
    fn match_stream(
        &self,
        pattern: &MatcherSeq,
        tokens: pm2::TokenStream,
        scope_end: usize,
        close: &'static str,
    ) -> MatchResult<Bindings> {
        let result = (|stream: ParseStream| -> syn::Result<MatchResult<Bindings>> {
            let result = self
                .match_partial(pattern, stream, scope_end)
                .and_then(|bindings| {
                    if stream.is_empty() {
                        Ok(bindings)
                    } else {
                        Err(MacroMatchingError::UnmatchedToken(
                            stream_offset(stream, scope_end),
                            close.to_string(),
                            next_token_text(stream),
                        ))
                    }
                });
            drain(stream);
            Ok(result)
        })
        .parse2(tokens);
        match result {
            Ok(result) => result,
            Err(_) => unreachable!("matcher closure drains its input"),
        }
    }

    /// Match a repetition group: attempt the inner pattern repeatedly,
    /// separated by the declared separator, then merge each repetition's
    /// bindings into the outer map one nesting level down.
    fn match_group(
        &self,
        repetition: &ast::Repetition,
        stream: ParseStream,
        scope_end: usize,
        bindings: &mut Bindings,
    ) -> MatchResult<()> {
        if repetition.inner.0.is_empty() {
            return Err(MacroMatchingError::PatternSyntax(stream_offset(
                stream, scope_end,
            )));
        }
        let separator = match repetition.sep.single_token() {
            Ok(separator) => separator,
            Err(()) => {
                return Err(MacroMatchingError::PatternSyntax(stream_offset(
                    stream, scope_end,
                )))
            }
        };

        let mut groups: Vec<Bindings> = Vec::new();
        loop {
            self.check_canceled()?;
            if stream.is_empty() {
                trace!("group: out of input after {} repetitions", groups.len());
                break;
            }

            let attempt = stream.fork();
            if !groups.is_empty() {
                if let Some(separator) = separator {
                    if !eat_token_tree(&attempt, separator) {
                        trace!("group: separator mismatch ends repetition");
                        break;
                    }
                }
            }

            let last_offset = stream_offset(&attempt, scope_end);
            match self.match_partial(&repetition.inner, &attempt, scope_end) {
                Ok(nested) => {
                    if stream_offset(&attempt, scope_end) == last_offset {
                        trace!("group matched an empty token tree");
                        return Err(MacroMatchingError::EmptyGroup(last_offset));
                    }
                    stream.advance_to(&attempt);
                    groups.push(nested);
                }
                Err(MacroMatchingError::Canceled) => return Err(MacroMatchingError::Canceled),
                Err(error) => {
                    // rollback is just dropping the fork
                    trace!("group: attempt failed ({}), ending repetition", error);
                    break;
                }
            }

            if stream.is_empty() {
                break;
            }
            if repetition.kind == RepeatKind::Question {
                // `$(...)?` means "0 or 1 occurrences"
                break;
            }
        }

        if repetition.kind == RepeatKind::Plus && groups.is_empty() {
            return Err(MacroMatchingError::TooFewGroupElements(stream_offset(
                stream, scope_end,
            )));
        }

        let matched_any = !groups.is_empty();
        for (index, nested) in groups.into_iter().enumerate() {
            for (name, value) in nested {
                let entry = bindings
                    .entry(name.clone())
                    .or_insert_with(|| MetaVarValue::Group(Vec::new()));
                let nested_values = match entry {
                    MetaVarValue::Group(nested_values) => nested_values,
                    _ => {
                        // the same name is bound both inside and outside a
                        // repetition: the definition is inconsistent
                        return Err(MacroMatchingError::Nesting(
                            stream_offset(stream, scope_end),
                            name.to_string(),
                        ));
                    }
                };
                // pad for repetitions this variable didn't appear in
                while nested_values.len() < index {
                    nested_values.push(MetaVarValue::Group(Vec::new()));
                }
                nested_values.push(value);
            }
        }
        if !matched_any {
            // register every variable of the group so lookups can tell "the
            // group never matched" apart from "unknown variable"
            for name in ast::collect_metavar_names(&repetition.inner) {
                bindings.insert(name, MetaVarValue::EmptyGroup);
            }
        }
        Ok(())
    }

    fn check_canceled(&self) -> MatchResult<()> {
        if self.cancel.is_canceled() {
            Err(MacroMatchingError::Canceled)
        } else {
            Ok(())
        }
    }
}

/// The byte offset of the next token, or the end of the enclosing scope if
/// the stream is exhausted.
pub(crate) fn stream_offset(stream: ParseStream, scope_end: usize) -> usize {
    if stream.is_empty() {
        scope_end
    } else {
        stream.span().byte_range().start
    }
}

fn next_token_text(stream: ParseStream) -> String {
    stream
        .fork()
        .parse::<pm2::TokenTree>()
        .map(|tt| tt.to_string())
        .unwrap_or_default()
}

fn drain(stream: ParseStream) {
    while !stream.is_empty() {
        if stream.parse::<pm2::TokenTree>().is_err() {
            break;
        }
    }
}

fn matcher_token_text(matcher: &Matcher) -> String {
    match matcher {
        Matcher::Ident(ident) => ident.to_string(),
        Matcher::Lifetime(lifetime) => format!("'{}", lifetime.ident),
        Matcher::Literal(literal) => literal.to_string(),
        Matcher::Punct(punct) => punct.as_char().to_string(),
        _ => String::new(),
    }
}

/// Consume one concrete token if it matches the expectation. Identifier- and
/// literal-class tokens compare by text; puncts compare by character only,
/// since spacing differences don't change what was written.
fn eat_matcher_token(stream: ParseStream, matcher: &Matcher) -> bool {
    let fork = stream.fork();
    let matched = match matcher {
        Matcher::Ident(expected) => fork
            .call(pm2::Ident::parse_any)
            .map(|actual| actual == *expected)
            .unwrap_or(false),
        Matcher::Lifetime(expected) => fork
            .parse::<syn::Lifetime>()
            .map(|actual| actual == *expected)
            .unwrap_or(false),
        Matcher::Literal(expected) => fork
            .parse::<pm2::Literal>()
            .map(|actual| actual.to_string() == expected.to_string())
            .unwrap_or(false),
        Matcher::Punct(expected) => fork
            .parse::<pm2::Punct>()
            .map(|actual| actual.as_char() == expected.as_char())
            .unwrap_or(false),
        Matcher::Fragment(_) | Matcher::Repetition(_) | Matcher::Group(_) => false,
    };
    if matched {
        stream.advance_to(&fork);
    }
    matched
}

/// Like [`eat_matcher_token`] for a raw separator token.
pub(crate) fn eat_token_tree(stream: ParseStream, expected: &pm2::TokenTree) -> bool {
    let fork = stream.fork();
    let matched = match expected {
        pm2::TokenTree::Ident(expected) => fork
            .call(pm2::Ident::parse_any)
            .map(|actual| actual == *expected)
            .unwrap_or(false),
        pm2::TokenTree::Literal(expected) => fork
            .parse::<pm2::Literal>()
            .map(|actual| actual.to_string() == expected.to_string())
            .unwrap_or(false),
        pm2::TokenTree::Punct(expected) => fork
            .parse::<pm2::Punct>()
            .map(|actual| actual.as_char() == expected.as_char())
            .unwrap_or(false),
        pm2::TokenTree::Group(_) => false,
    };
    if matched {
        stream.advance_to(&fork);
    }
    matched
}
