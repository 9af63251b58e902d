//! A syn parser for `macro_rules!` definitions.
//!
//!>    MacroRulesDefinition :
//!>       macro_rules ! IDENTIFIER MacroRulesDef
//!>    MacroRule :
//!>       MacroMatcher => MacroTranscriber
//!>    MacroMatch :
//!>          Token[except $ and delimiters]
//!>       , MacroMatcher
//!>       , $ IDENTIFIER : MacroFragSpec
//!>       , $ ( MacroMatch\+ ) MacroRepSep\? MacroRepOp
//!>    MacroRepOp :
//!>       * , + , ?
//!
//! The matcher side and the transcriber side are separate trees: a matcher
//! binds metavariables (`$x:expr`), a transcriber references them (`$x`).
//! Repetition separators are collected permissively as a token list here and
//! validated to a single token where they are actually used, by the matcher
//! and the graph builder.

use marrow_api::substitution::FragmentKind;
use proc_macro2 as pm2;
use smol_str::SmolStr;
use syn::{
    self, parenthesized,
    parse::{Parse, ParseStream},
    spanned::Spanned,
    token, Token,
};

use crate::Set;

/// A full `macro_rules!` definition.
#[derive(Debug)]
pub struct MacroDef {
    pub name: SmolStr,
    pub rules: Vec<MacroRule>,
}

/// An individual rule, consisting of a matcher and a transcriber.
#[derive(Debug)]
pub struct MacroRule {
    pub matcher: MatcherSeq,
    pub transcriber: TranscribeSeq,
}

/// A sequence of matchers.
#[derive(Debug)]
pub struct MatcherSeq(pub Vec<Matcher>);

/// A sequence of transcribers.
#[derive(Debug)]
pub struct TranscribeSeq(pub Vec<Transcribe>);

/// All of the possible elements that can be matched in a macro.
#[derive(Debug)]
pub enum Matcher {
    Repetition(Repetition),
    Fragment(Fragment),
    Group(Group),
    Ident(pm2::Ident),
    Lifetime(syn::Lifetime),
    Literal(pm2::Literal),
    Punct(pm2::Punct),
}

/// A macro repetition, `$(...),+`.
#[derive(Debug)]
pub struct Repetition {
    pub inner: MatcherSeq,
    pub sep: Sep,
    pub kind: RepeatKind,
}

/// Kind of macro repetition: `+`, `*`, or `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatKind {
    /// One or more.
    Plus,
    /// Zero or more.
    Star,
    /// Zero or one.
    Question,
}

/// A macro repetition separator.
///
/// Strictly speaking this must be a single rust token, but there's no easy
/// way to represent "one token" with syn / pm2 (`=>` lexes as two puncts), so
/// we collect token trees and let users of the separator enforce arity.
#[derive(Debug)]
pub struct Sep(pub Vec<pm2::TokenTree>);

impl Sep {
    /// The single separator token, `None` if no separator was written, or
    /// `Err(())` if the separator spans more than one lexer token.
    pub fn single_token(&self) -> Result<Option<&pm2::TokenTree>, ()> {
        match self.0.len() {
            0 => Ok(None),
            1 => Ok(Some(&self.0[0])),
            // e.g. `=>`, which lexes as two puncts
            _ => Err(()),
        }
    }

    /// The separator's text, as it should appear in emitted output.
    pub fn text(&self) -> String {
        self.0.iter().map(|tt| tt.to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A binding fragment: `$x:ident`, `$ty:ty`, `$next:tt`, etc.
#[derive(Debug)]
pub struct Fragment {
    pub name: SmolStr,
    pub spec: FragmentKind,
}

/// A group delimited by some delimiter: `(...)`, `{...}`, `[...]`.
/// Note: NOT a `Repetition`!
#[derive(Debug)]
pub struct Group {
    pub delimiter: pm2::Delimiter,
    pub inner: MatcherSeq,
}

/// Everything that a macro can transcribe.
#[derive(Debug)]
pub enum Transcribe {
    Fragment(TranscribeFragment),
    Repetition(TranscribeRepetition),
    Group(TranscribeGroup),
    Ident(pm2::Ident),
    Lifetime(syn::Lifetime),
    Literal(pm2::Literal),
    Punct(pm2::Punct),
}

/// A metavariable reference, `$thing`. Also how `$crate` parses: a reference
/// named `crate`, satisfied by the synthetic substitution entry the expander
/// injects.
#[derive(Debug)]
pub struct TranscribeFragment(pub SmolStr);

/// A repeated transcription, `$(...)+`.
#[derive(Debug)]
pub struct TranscribeRepetition {
    pub sep: Sep,
    pub kind: RepeatKind,
    pub inner: TranscribeSeq,
}

/// A transcription of a delimited token tree.
#[derive(Debug)]
pub struct TranscribeGroup {
    pub delimiter: pm2::Delimiter,
    pub inner: TranscribeSeq,
}

/// Every metavariable name bound anywhere under `seq`, including inside
/// nested groups and repetitions. Used to register `EmptyGroup` values for
/// repetitions that matched zero times.
pub fn collect_metavar_names(seq: &MatcherSeq) -> Set<SmolStr> {
    fn collect(seq: &MatcherSeq, names: &mut Set<SmolStr>) {
        for matcher in &seq.0 {
            match matcher {
                Matcher::Fragment(fragment) => {
                    names.insert(fragment.name.clone());
                }
                Matcher::Group(group) => collect(&group.inner, names),
                Matcher::Repetition(repetition) => collect(&repetition.inner, names),
                Matcher::Ident(_)
                | Matcher::Lifetime(_)
                | Matcher::Literal(_)
                | Matcher::Punct(_) => {}
            }
        }
    }
    let mut names = Set::default();
    collect(seq, &mut names);
    names
}

impl Parse for MacroDef {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let item = syn::ItemMacro::parse(input)?;
        if !item.mac.path.is_ident("macro_rules") {
            return Err(syn::Error::new(item.mac.span(), "not macro_rules"));
        }
        let name = item
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new(item.mac.span(), "no macro name in macro_rules!"))?;
        let name = SmolStr::new(name.to_string());

        let rules = syn::parse2::<MacroRules>(item.mac.tokens)?.0;

        Ok(MacroDef { name, rules })
    }
}

struct MacroRules(Vec<MacroRule>);

impl Parse for MacroRules {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut result = MacroRules(vec![]);
        while !input.is_empty() {
            result.0.push(input.parse::<MacroRule>()?);
        }
        Ok(result)
    }
}

impl Parse for MacroRule {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let matcher = input.parse::<pm2::Group>()?;
        let matcher = syn::parse2::<MatcherSeq>(matcher.stream())?;
        input.parse::<Token![=>]>()?;

        let transcriber = input.parse::<pm2::Group>()?;
        let transcriber = syn::parse2::<TranscribeSeq>(transcriber.stream())?;

        if input.lookahead1().peek(Token![;]) {
            input.parse::<Token![;]>()?;
        }

        Ok(MacroRule {
            matcher,
            transcriber,
        })
    }
}

impl Parse for MatcherSeq {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut result = MatcherSeq(vec![]);
        while !input.is_empty() {
            result.0.push(input.parse::<Matcher>()?);
        }
        Ok(result)
    }
}

impl Parse for Matcher {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(token::Dollar) {
            if input.peek2(token::Paren) {
                Ok(Matcher::Repetition(input.parse::<Repetition>()?))
            } else {
                Ok(Matcher::Fragment(input.parse::<Fragment>()?))
            }
        } else if input.peek(syn::Lifetime) {
            Ok(Matcher::Lifetime(input.parse::<syn::Lifetime>()?))
        } else {
            let tt = input.parse::<pm2::TokenTree>()?;
            match tt {
                pm2::TokenTree::Ident(ident) => Ok(Matcher::Ident(ident)),
                pm2::TokenTree::Literal(literal) => Ok(Matcher::Literal(literal)),
                pm2::TokenTree::Punct(punct) => Ok(Matcher::Punct(punct)),
                pm2::TokenTree::Group(group) => Ok(Matcher::Group(Group {
                    delimiter: group.delimiter(),
                    inner: syn::parse2::<MatcherSeq>(group.stream())?,
                })),
            }
        }
    }
}

impl Parse for Repetition {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        input.parse::<token::Dollar>()?; // $
        let inner;
        parenthesized!(inner in input);
        let inner = inner.parse::<MatcherSeq>()?;
        let sep = input.parse::<Sep>()?;
        let kind = input.parse::<RepeatKind>()?;

        Ok(Repetition { inner, sep, kind })
    }
}

impl Parse for RepeatKind {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let lookahead = input.lookahead1();
        if lookahead.peek(Token![?]) {
            input.parse::<Token![?]>()?;
            Ok(RepeatKind::Question)
        } else if lookahead.peek(Token![*]) {
            input.parse::<Token![*]>()?;
            Ok(RepeatKind::Star)
        } else if lookahead.peek(Token![+]) {
            input.parse::<Token![+]>()?;
            Ok(RepeatKind::Plus)
        } else {
            Err(lookahead.error())
        }
    }
}

impl Parse for Sep {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        // there's no easy way to parse "one token" (pm2 is too low-level)
        // so we just accept more than we should; the single-token rule is
        // enforced by `Sep::single_token` at match time
        let mut sep = vec![];
        while !input.peek(Token![*]) && !input.peek(Token![+]) && !input.peek(Token![?]) {
            let tt = input.parse::<pm2::TokenTree>()?;
            if let pm2::TokenTree::Group(ref group) = tt {
                return Err(syn::Error::new(group.span(), "group in repetition sep"));
            }
            sep.push(tt);
        }

        Ok(Sep(sep))
    }
}

impl Parse for Fragment {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        use syn::ext::IdentExt;

        input.parse::<token::Dollar>()?; // $
        let name = input.call(pm2::Ident::parse_any)?;
        input.parse::<Token![:]>()?;

        let spec = input.call(pm2::Ident::parse_any)?;
        let kind = spec
            .to_string()
            .parse::<FragmentKind>()
            .map_err(|()| {
                syn::Error::new(spec.span(), format!("unknown fragment specifier: {}", spec))
            })?;

        Ok(Fragment {
            name: SmolStr::new(name.to_string()),
            spec: kind,
        })
    }
}

impl Parse for TranscribeSeq {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut result = TranscribeSeq(vec![]);
        while !input.is_empty() {
            result.0.push(input.parse::<Transcribe>()?);
        }
        Ok(result)
    }
}

impl Parse for Transcribe {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        use syn::ext::IdentExt;

        if input.peek(token::Dollar) && input.peek2(token::Paren) {
            Ok(Transcribe::Repetition(
                input.parse::<TranscribeRepetition>()?,
            ))
        } else if input.peek(token::Dollar) && input.peek2(pm2::Ident::peek_any) {
            input.parse::<token::Dollar>()?;
            let name = input.call(pm2::Ident::parse_any)?;
            Ok(Transcribe::Fragment(TranscribeFragment(SmolStr::new(
                name.to_string(),
            ))))
        } else if input.peek(syn::Lifetime) {
            Ok(Transcribe::Lifetime(input.parse::<syn::Lifetime>()?))
        } else {
            let tt = input.parse::<pm2::TokenTree>()?;
            match tt {
                pm2::TokenTree::Ident(ident) => Ok(Transcribe::Ident(ident)),
                pm2::TokenTree::Literal(literal) => Ok(Transcribe::Literal(literal)),
                pm2::TokenTree::Punct(punct) => Ok(Transcribe::Punct(punct)),
                pm2::TokenTree::Group(group) => Ok(Transcribe::Group(TranscribeGroup {
                    delimiter: group.delimiter(),
                    inner: syn::parse2::<TranscribeSeq>(group.stream())?,
                })),
            }
        }
    }
}

impl Parse for TranscribeRepetition {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        input.parse::<token::Dollar>()?; // $
        let inner;
        parenthesized!(inner in input);
        let inner = inner.parse::<TranscribeSeq>()?;
        let sep = input.parse::<Sep>()?;
        let kind = input.parse::<RepeatKind>()?;
        Ok(TranscribeRepetition { sep, kind, inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm2::{Delimiter, Spacing, TokenTree};

    macro_rules! assert_match {
        ($(($input:expr) $binding:pat => $then:expr),+ $(,)?) => {{
            $(match &$input {
                $binding => $then,
                ref other => panic!("unexpected: {:?}", other),
            })+
        }};
    }

    #[test]
    fn frag() -> syn::Result<()> {
        marrow_trace::init();

        let frag = syn::parse_str::<Fragment>("$elem:block")?;
        assert_eq!(frag.spec, FragmentKind::Block);
        assert_eq!(frag.name, "elem");

        // keywords are valid metavariable names
        let frag = syn::parse_str::<Fragment>("$type:ty")?;
        assert_eq!(frag.spec, FragmentKind::Ty);
        assert_eq!(frag.name, "type");

        assert!(syn::parse_str::<Fragment>("$elem:bees").is_err());
        Ok(())
    }

    #[test]
    fn matcher() -> syn::Result<()> {
        marrow_trace::init();

        let seq = syn::parse_str::<MatcherSeq>(
            "ocelot + => $bees:ty { frog [] } 'f $(tapir *),+ $(*)coati*",
        )?;

        assert_match! {
            (seq.0[0]) Matcher::Ident(ident) => assert_eq!(ident, "ocelot"),
            (seq.0[1]) Matcher::Punct(punct) => {
                assert_eq!(punct.as_char(), '+');
                assert_eq!(punct.spacing(), Spacing::Alone);
            },
            (seq.0[2]) Matcher::Punct(punct) => {
                assert_eq!(punct.as_char(), '=');
                assert_eq!(punct.spacing(), Spacing::Joint);
            },
            (seq.0[3]) Matcher::Punct(punct) => assert_eq!(punct.as_char(), '>'),
            (seq.0[4]) Matcher::Fragment(frag) => {
                assert_eq!(frag.name, "bees");
                assert_eq!(frag.spec, FragmentKind::Ty);
            },
            (seq.0[5]) Matcher::Group(group) => {
                assert_eq!(group.delimiter, Delimiter::Brace);
                assert_match!(
                    (group.inner.0[0]) Matcher::Ident(ident) => assert_eq!(ident, "frog"),
                    (group.inner.0[1]) Matcher::Group(group) => {
                        assert_eq!(group.delimiter, Delimiter::Bracket);
                        assert_eq!(group.inner.0.len(), 0);
                    },
                );
            },
            (seq.0[6]) Matcher::Lifetime(lifetime) => assert_eq!(lifetime.ident, "f"),
            (seq.0[7]) Matcher::Repetition(rep) => {
                assert_eq!(rep.kind, RepeatKind::Plus);
                assert_match!(
                    (rep.inner.0[0]) Matcher::Ident(ident) => assert_eq!(ident, "tapir"),
                    (rep.inner.0[1]) Matcher::Punct(punct) => assert_eq!(punct.as_char(), '*'),
                    (rep.sep.0[0]) TokenTree::Punct(punct) => assert_eq!(punct.as_char(), ','),
                );
            },
            (seq.0[8]) Matcher::Repetition(rep) => {
                assert_eq!(rep.kind, RepeatKind::Star);
                assert_match!(
                    (rep.inner.0[0]) Matcher::Punct(punct) => assert_eq!(punct.as_char(), '*'),
                    (rep.sep.0[0]) TokenTree::Ident(ident) => assert_eq!(ident, "coati"),
                );
            },
        }

        Ok(())
    }

    #[test]
    fn transcriber() -> syn::Result<()> {
        marrow_trace::init();

        let seq = syn::parse_str::<TranscribeSeq>("$bees { frog } $crate $(tapir),+")?;

        assert_match! {
            (seq.0[0]) Transcribe::Fragment(frag) => assert_eq!(frag.0, "bees"),
            (seq.0[1]) Transcribe::Group(group) => {
                assert_eq!(group.delimiter, Delimiter::Brace);
                assert_match!(
                    (group.inner.0[0]) Transcribe::Ident(ident) => assert_eq!(ident, "frog"),
                );
            },
            (seq.0[2]) Transcribe::Fragment(frag) => assert_eq!(frag.0, "crate"),
            (seq.0[3]) Transcribe::Repetition(rep) => {
                assert_eq!(rep.kind, RepeatKind::Plus);
                assert_match!(
                    (rep.inner.0[0]) Transcribe::Ident(ident) => assert_eq!(ident, "tapir"),
                    (rep.sep.0[0]) TokenTree::Punct(punct) => assert_eq!(punct.as_char(), ','),
                );
            },
        }

        Ok(())
    }

    #[test]
    fn full() -> syn::Result<()> {
        marrow_trace::init();

        // let's get meta
        let mac = syn::parse_str::<MacroDef>(
            r#"
            macro_rules! assert_match {
                ($(($input:expr) $binding:pat => $then:expr),+) => {{
                    $(match &$input {
                        $binding => $then,
                        ref other => panic!("unexpected: {:?}", other),
                    })+
                }};
            }
        "#,
        )?;
        assert_eq!(mac.name, "assert_match");
        assert_eq!(mac.rules.len(), 1);
        assert_match!((mac.rules[0].matcher.0[0]) Matcher::Repetition(rep) => {
            assert_match!(
                (rep.sep.0[0]) TokenTree::Punct(punct) => assert_eq!(punct.as_char(), ','),
                (rep.inner.0[0]) Matcher::Group(group) => {
                    assert_eq!(group.delimiter, Delimiter::Parenthesis);
                    assert_match!((group.inner.0[0]) Matcher::Fragment(frag) => {
                        assert_eq!(frag.name, "input");
                        assert_eq!(frag.spec, FragmentKind::Expr);
                    });
                },
            );
        });
        Ok(())
    }

    #[test]
    fn separators() {
        marrow_trace::init();

        let seq = syn::parse_str::<MatcherSeq>("$($x:expr),*").unwrap();
        assert_match!((seq.0[0]) Matcher::Repetition(rep) => {
            assert!(rep.sep.single_token().unwrap().is_some());
        });

        let seq = syn::parse_str::<MatcherSeq>("$($x:expr)*").unwrap();
        assert_match!((seq.0[0]) Matcher::Repetition(rep) => {
            assert!(rep.sep.single_token().unwrap().is_none());
            assert!(rep.sep.is_empty());
        });

        // `=>` spans two lexer tokens: parsed, but not a valid single-token sep
        let seq = syn::parse_str::<MatcherSeq>("$($x:expr)=>*").unwrap();
        assert_match!((seq.0[0]) Matcher::Repetition(rep) => {
            assert!(rep.sep.single_token().is_err());
            assert_eq!(rep.sep.text(), "=>");
        });
    }

    #[test]
    fn collects_metavar_names() {
        marrow_trace::init();

        let seq =
            syn::parse_str::<MatcherSeq>("$a:ident ($b:ty) $( $c:expr , [$d:pat] )*").unwrap();
        let names = collect_metavar_names(&seq);
        assert_eq!(names.len(), 4);
        for name in ["a", "b", "c", "d"].iter() {
            assert!(names.contains(&SmolStr::new(*name)), "missing {}", name);
        }
    }
}
