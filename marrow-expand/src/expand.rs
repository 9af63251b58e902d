//! Declarative macro expansion: arm selection, template substitution, and
//! range-map production.
//!
//! [`DeclMacroExpander::expand`] tries each rule of a parsed
//! [`MacroDef`] against the call body in definition order; the first rule
//! whose matcher consumes the entire input wins. The winning rule's
//! transcriber is then walked node by node, re-emitting text into an output
//! buffer while recording a [`RangeMap`] entry for every fragment that is
//! copied verbatim out of the call body.
//!
//! The tricky bit is repetitions. The emitter keeps a stack of
//! [`NestingState`]s, one per `$(...)` group it is currently inside, each
//! tracking the current repetition index, whether any lookup hit a real
//! binding this iteration, and whether the bound values ran out. A repetition
//! re-emits its body until a lookup inside reports either of the latter two,
//! at which point the partially-emitted last iteration (and its range-map
//! entries, and the trailing separator) is rolled back.

use marrow_api::ranges::{MappedTextRange, RangeMap};
use marrow_api::substitution::{ExprClass, FragmentKind, MacroSubstitution, MetaVarValue};
use proc_macro2 as pm2;
use smol_str::SmolStr;
use tracing::{trace, warn};

use crate::ast::{MacroDef, Transcribe, TranscribeFragment, TranscribeRepetition, TranscribeSeq};
use crate::{CancelToken, Set};

pub mod consume;
pub(crate) mod fragments;

pub use consume::Muncher;

quick_error! {
    #[derive(Debug, Clone, PartialEq)]
    pub enum MacroMatchingError {
        UnmatchedToken(offset: usize, expected: String, actual: String) {
            display("expected `{}`, got `{}` at offset {}", expected, actual, offset)
        }
        FragmentNotParsed(offset: usize, name: String, kind: FragmentKind) {
            display("couldn't parse ${}:{} at offset {}", name, kind.as_str(), offset)
        }
        ExtraInput(offset: usize) {
            display("extra input after the pattern at offset {}", offset)
        }
        EndOfInput(offset: usize) {
            display("input ended where a token was required, at offset {}", offset)
        }
        EmptyGroup(offset: usize) {
            display("repetition matched without consuming anything at offset {}", offset)
        }
        TooFewGroupElements(offset: usize) {
            display("`+` repetition matched zero times, at offset {}", offset)
        }
        PatternSyntax(offset: usize) {
            display("malformed macro pattern, at offset {}", offset)
        }
        Nesting(offset: usize, name: String) {
            display("inconsistent nesting for `${}`, at offset {}", name, offset)
        }
        Canceled {
            display("matching canceled")
        }
    }
}

quick_error! {
    #[derive(Debug, Clone, PartialEq)]
    pub enum DeclMacroExpansionError {
        /// The macro definition itself is malformed; no call to it can expand.
        DefSyntax {
            display("malformed macro definition")
        }
        /// The call body isn't a lexable token stream.
        CallSyntax(message: String) {
            display("macro call body is not lexable: {}", message)
        }
        TooLargeExpansion {
            display("macro expansion is too large")
        }
        /// No rule matched; carries one matching error per tried rule.
        Matching(errors: Vec<MacroMatchingError>) {
            display("no rule matched the macro call ({} tried)", errors.len())
        }
        Canceled {
            display("expansion canceled")
        }
    }
}

/// A synthetic identifier produced from `$crate` metavar expansion.
///
/// We can't just expand `$crate` to something like `::crate_name`, because
/// the result of `$crate` expansion can be passed to another macro as a
/// *single* identifier token. Rustc handles this with a synthetic token that
/// has no text representation; our expansion is text-based, so we must emit
/// something textual that still parses as one identifier. Hosts are expected
/// to resolve this identifier specially during name resolution.
pub const MACRO_DOLLAR_CRATE_IDENTIFIER: &str = "MarrowDollarCrate";

/// Bounds one repetition group's emission, so malformed substitutions can't
/// loop forever.
const REPETITION_LIMIT: usize = 65536;

/// Bounds the total expansion size.
const EXPANSION_SIZE_LIMIT: usize = 20 * 1024 * 1024;

lazy_static::lazy_static! {
    /// Expression shapes that never need parenthesization when spliced into
    /// a new syntactic context.
    static ref USELESS_PARENS_EXPRS: Set<ExprClass> = {
        let mut set = Set::default();
        set.insert(ExprClass::Literal);
        set.insert(ExprClass::MacroCall);
        set.insert(ExprClass::Path);
        set.insert(ExprClass::Paren);
        set.insert(ExprClass::Tuple);
        set.insert(ExprClass::Unit);
        set.insert(ExprClass::Array);
        set
    };
}

/// A successful expansion: the text, the offset map back into the call body,
/// which rule matched, and the substitution it produced (without the
/// injected `$crate` entry), so hosts can render per-metavariable info.
#[derive(Debug, Clone)]
pub struct MacroExpansion {
    pub text: String,
    pub ranges: RangeMap,
    pub rule_index: usize,
    pub substitution: MacroSubstitution,
}

/// Expands calls to one declarative macro definition.
pub struct DeclMacroExpander {
    cancel: CancelToken,
}

impl DeclMacroExpander {
    pub fn new() -> Self {
        DeclMacroExpander {
            cancel: CancelToken::new(),
        }
    }

    /// An expander whose matching can be aborted through `cancel`.
    pub fn with_cancel_token(cancel: CancelToken) -> Self {
        DeclMacroExpander { cancel }
    }

    pub fn expand(
        &self,
        def: &MacroDef,
        call_body: &str,
    ) -> Result<MacroExpansion, DeclMacroExpansionError> {
        let (rule_index, substitution) = self.find_matching_rule(def, call_body)?;
        let rule = &def.rules[rule_index];

        let mut variables = substitution.variables.clone();
        variables.insert(
            SmolStr::new("crate"),
            MetaVarValue::synthetic(MACRO_DOLLAR_CRATE_IDENTIFIER),
        );
        let with_globals = MacroSubstitution::new(variables);

        let (text, ranges) = substitute_macro(&rule.transcriber, &with_globals)?;
        check_ranges(call_body, &text, &ranges);

        Ok(MacroExpansion {
            text,
            ranges,
            rule_index,
            substitution,
        })
    }

    fn find_matching_rule(
        &self,
        def: &MacroDef,
        call_body: &str,
    ) -> Result<(usize, MacroSubstitution), DeclMacroExpansionError> {
        if def.rules.is_empty() {
            return Err(DeclMacroExpansionError::DefSyntax);
        }
        let tokens = syn::parse_str::<pm2::TokenStream>(call_body)
            .map_err(|error| DeclMacroExpansionError::CallSyntax(error.to_string()))?;
        let muncher = Muncher::new(call_body, self.cancel.clone());

        let mut errors = Vec::new();
        for (index, rule) in def.rules.iter().enumerate() {
            match muncher.match_rule(&rule.matcher, tokens.clone()) {
                Ok(substitution) => {
                    trace!("macro {}: rule {} matched", def.name, index);
                    return Ok((index, substitution));
                }
                Err(MacroMatchingError::Canceled) => return Err(DeclMacroExpansionError::Canceled),
                Err(error) => {
                    trace!("macro {}: rule {} failed: {}", def.name, index, error);
                    errors.push(error);
                }
            }
        }
        Err(DeclMacroExpansionError::Matching(errors))
    }
}

impl Default for DeclMacroExpander {
    fn default() -> Self {
        DeclMacroExpander::new()
    }
}

/// Convenience wrapper over [`DeclMacroExpander::expand`] for callers that
/// only want the expansion text and its range map.
pub fn expand_macro(
    def: &MacroDef,
    call_body: &str,
) -> Result<(String, RangeMap), DeclMacroExpansionError> {
    DeclMacroExpander::new()
        .expand(def, call_body)
        .map(|expansion| (expansion.text, expansion.ranges))
}

pub(crate) fn delim_open(delimiter: pm2::Delimiter) -> &'static str {
    match delimiter {
        pm2::Delimiter::Parenthesis => "(",
        pm2::Delimiter::Brace => "{",
        pm2::Delimiter::Bracket => "[",
        pm2::Delimiter::None => "",
    }
}

pub(crate) fn delim_close(delimiter: pm2::Delimiter) -> &'static str {
    match delimiter {
        pm2::Delimiter::Parenthesis => ")",
        pm2::Delimiter::Brace => "}",
        pm2::Delimiter::Bracket => "]",
        pm2::Delimiter::None => "",
    }
}

/// Per-repetition-level lookup state during template substitution.
#[derive(Debug, Default)]
struct NestingState {
    /// Index of the current repetition at this level.
    idx: usize,
    /// Whether a lookup passed through this level since the last iteration
    /// started. A repetition whose body never hits a binding must stop, or
    /// it would emit its literal tokens forever.
    hit: bool,
    /// Whether a lookup ran past the end of this level's values.
    at_the_end: bool,
}

enum VarLookup<'a> {
    Found {
        text: &'a str,
        kind: Option<FragmentKind>,
        class: Option<ExprClass>,
        offset: Option<usize>,
    },
    None,
    Error,
}

fn get_var<'a>(
    subst: &'a MacroSubstitution,
    name: &str,
    nesting: &mut [NestingState],
) -> VarLookup<'a> {
    let mut value = match subst.variables.get(name) {
        Some(value) => value,
        None => return VarLookup::None,
    };
    for state in nesting.iter_mut() {
        state.hit = true;
        match value {
            MetaVarValue::Fragment { .. } => break,
            MetaVarValue::Group(nested) => match nested.get(state.idx) {
                Some(next) => value = next,
                None => {
                    state.at_the_end = true;
                    return VarLookup::Error;
                }
            },
            MetaVarValue::EmptyGroup => {
                state.at_the_end = true;
                return VarLookup::Error;
            }
        }
    }
    match value {
        MetaVarValue::Fragment {
            text,
            kind,
            class,
            offset_in_call_body,
        } => VarLookup::Found {
            text,
            kind: *kind,
            class: *class,
            offset: *offset_in_call_body,
        },
        // template/pattern nesting depths disagree; degrade instead of
        // failing the whole expansion
        MetaVarValue::Group(_) | MetaVarValue::EmptyGroup => VarLookup::Error,
    }
}

/// Output buffer that never glues two tokens together by accident.
#[derive(Debug, Default)]
struct MacroStringBuilder {
    inner: String,
}

impl MacroStringBuilder {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn append(&mut self, text: &str) {
        self.inner.push_str(text);
    }

    /// Ensures the buffer ends (or `text` starts) with whitespace before
    /// appending, so `foo` + `bar` can never become `foobar`.
    fn safe_append(&mut self, text: &str) {
        if !self.inner.is_empty()
            && !self.inner.ends_with(|c: char| c.is_whitespace())
            && !text.is_empty()
            && !text.starts_with(|c: char| c.is_whitespace())
        {
            self.inner.push(' ');
        }
        self.inner.push_str(text);
    }

    fn truncate(&mut self, len: usize) {
        self.inner.truncate(len);
    }

    fn into_string(self) -> String {
        self.inner
    }
}

struct TooLarge;

/// Outcome of walking one template level: either the walk completed, or a
/// metavariable lookup error stopped emission of the remaining siblings at
/// this level (the enclosing repetition, if any, rolls the iteration back).
enum Walk {
    Done,
    Stop,
}

fn substitute_macro(
    transcriber: &TranscribeSeq,
    subst: &MacroSubstitution,
) -> Result<(String, RangeMap), DeclMacroExpansionError> {
    let mut emitter = Emitter {
        subst,
        sb: MacroStringBuilder::default(),
        ranges: RangeMap::new(),
        pending_joint: false,
    };
    let mut nesting = Vec::new();
    match emitter.emit_seq(transcriber, &mut nesting) {
        Ok(_) => Ok((emitter.sb.into_string(), emitter.ranges)),
        Err(TooLarge) => Err(DeclMacroExpansionError::TooLargeExpansion),
    }
}

struct Emitter<'a> {
    subst: &'a MacroSubstitution,
    sb: MacroStringBuilder,
    ranges: RangeMap,
    /// The last emitted token was a joint punct; glue the next punct to it
    /// so `=>` and friends survive re-emission.
    pending_joint: bool,
}

impl<'a> Emitter<'a> {
    fn emit_seq(
        &mut self,
        seq: &TranscribeSeq,
        nesting: &mut Vec<NestingState>,
    ) -> Result<Walk, TooLarge> {
        if self.sb.len() > EXPANSION_SIZE_LIMIT {
            return Err(TooLarge);
        }
        for node in &seq.0 {
            match node {
                Transcribe::Ident(ident) => self.emit_plain(&ident.to_string()),
                Transcribe::Lifetime(lifetime) => {
                    self.emit_plain(&format!("'{}", lifetime.ident))
                }
                Transcribe::Literal(literal) => self.emit_plain(&literal.to_string()),
                Transcribe::Punct(punct) => self.emit_punct(punct),
                Transcribe::Group(group) => {
                    self.emit_plain(delim_open(group.delimiter));
                    if let Walk::Stop = self.emit_seq(&group.inner, nesting)? {
                        return Ok(Walk::Stop);
                    }
                    self.emit_plain(delim_close(group.delimiter));
                }
                Transcribe::Fragment(reference) => {
                    if let Walk::Stop = self.emit_reference(reference, nesting) {
                        return Ok(Walk::Stop);
                    }
                }
                Transcribe::Repetition(repetition) => {
                    self.emit_repetition(repetition, nesting)?;
                }
            }
        }
        Ok(Walk::Done)
    }

    fn emit_reference(
        &mut self,
        reference: &TranscribeFragment,
        nesting: &mut [NestingState],
    ) -> Walk {
        match get_var(self.subst, &reference.0, nesting) {
            VarLookup::Found {
                text,
                kind,
                class,
                offset,
            } => {
                let parens_needed = kind == Some(FragmentKind::Expr)
                    && !matches!(class, Some(class) if USELESS_PARENS_EXPRS.contains(&class));
                if parens_needed {
                    self.sb.safe_append("(");
                    self.sb.append(text);
                    self.sb.append(")");
                } else {
                    self.sb.safe_append(text);
                }
                self.pending_joint = false;
                if let Some(offset) = offset {
                    if !text.is_empty() {
                        let dst =
                            self.sb.len() - text.len() - if parens_needed { 1 } else { 0 };
                        self.ranges
                            .merge_add(MappedTextRange::new(offset, dst, text.len()));
                    }
                }
                Walk::Done
            }
            VarLookup::None => {
                // emit the reference itself; degraded output beats failing
                // the whole expansion
                warn!("metavariable ${} is unbound", reference.0);
                self.emit_plain(&format!("${}", reference.0));
                Walk::Done
            }
            VarLookup::Error => Walk::Stop,
        }
    }

    fn emit_repetition(
        &mut self,
        repetition: &TranscribeRepetition,
        nesting: &mut Vec<NestingState>,
    ) -> Result<(), TooLarge> {
        nesting.push(NestingState::default());
        let separator = repetition.sep.text();

        for i in 0..REPETITION_LIMIT {
            let last_position = self.sb.len();
            match self.emit_seq(&repetition.inner, nesting) {
                Ok(_) => {}
                Err(too_large) => {
                    nesting.pop();
                    return Err(too_large);
                }
            }
            let state = nesting.last_mut().expect("nesting stack can't be empty");
            if state.at_the_end || !state.hit {
                self.sb.truncate(last_position);
                if i != 0 {
                    let without_separator = self.sb.len() - separator.len();
                    self.sb.truncate(without_separator);
                }
                while self
                    .ranges
                    .ranges
                    .last()
                    .map(|range| range.dst_offset >= self.sb.len())
                    .unwrap_or(false)
                {
                    self.ranges.ranges.pop();
                }
                break;
            }
            state.idx += 1;
            state.hit = false;
            self.sb.append(&separator);
            self.pending_joint = false;
        }

        nesting.pop();
        Ok(())
    }

    fn emit_plain(&mut self, text: &str) {
        self.sb.safe_append(text);
        self.pending_joint = false;
    }

    fn emit_punct(&mut self, punct: &pm2::Punct) {
        let text = punct.as_char().to_string();
        if self.pending_joint {
            self.sb.append(&text);
        } else {
            self.sb.safe_append(&text);
        }
        self.pending_joint = punct.spacing() == pm2::Spacing::Joint;
    }
}

/// Every range-map entry must be byte-for-byte exact; a mismatch is a bug in
/// the emitter, not a user error, so it's fatal in debug builds and skipped
/// in release builds.
fn check_ranges(call_body: &str, expanded: &str, ranges: &RangeMap) {
    if !cfg!(debug_assertions) {
        return;
    }
    for range in &ranges.ranges {
        let call_fragment = &call_body[range.src_offset..range.src_end_offset()];
        let expanded_fragment = &expanded[range.dst_offset..range.dst_end_offset()];
        if call_fragment != expanded_fragment {
            panic!("`{}` != `{}`", call_fragment, expanded_fragment);
        }
    }
}
