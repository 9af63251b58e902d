//! Macro pattern graph: an explicit state graph compiled once per macro
//! definition, for interactive queries against partial call bodies.
//!
//! The full matcher (`expand::consume`) commits to one greedy parse; an IDE
//! asking "what fragment kind is expected at the cursor?" needs *all* the
//! ways a prefix could match. The graph makes that cheap: nodes are matcher
//! states, fan-out edges are alternatives (macro arms, repetition
//! skip/repeat), and a walk explores every branch with its own forked
//! cursor.
//!
//! The graph is an arena: nodes addressed by index, adjacency lists stored
//! separately. Repetition back edges make it cyclic, which is why there are
//! no owned parent/child links. Tokens are stored as plain text rather than
//! `proc_macro2` values, so a built graph is `Send + Sync`: construct it
//! once per definition and share it read-only across concurrent walks.

use proc_macro2 as pm2;
use smol_str::SmolStr;
use syn::buffer::{Cursor, TokenBuffer};
use syn::parse::{ParseStream, Parser};
use tracing::trace;

use marrow_api::substitution::FragmentKind;

use crate::ast::{MacroDef, Matcher, MatcherSeq, RepeatKind};
use crate::expand::fragments::parse_fragment;

pub type NodeIndex = usize;

/// One concrete token a graph node expects, compared the same way the
/// matcher compares tokens: identifier- and literal-class by text, puncts by
/// character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphToken {
    Ident(SmolStr),
    Literal(SmolStr),
    Punct(char),
    Lifetime(SmolStr),
}

impl GraphToken {
    fn from_token_tree(tt: &pm2::TokenTree) -> Option<GraphToken> {
        match tt {
            pm2::TokenTree::Ident(ident) => Some(GraphToken::Ident(SmolStr::new(ident.to_string()))),
            pm2::TokenTree::Literal(literal) => {
                Some(GraphToken::Literal(SmolStr::new(literal.to_string())))
            }
            pm2::TokenTree::Punct(punct) => Some(GraphToken::Punct(punct.as_char())),
            pm2::TokenTree::Group(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum MacroGraphNode {
    Start,
    End,
    /// One concrete token to match.
    Literal(GraphToken),
    /// Descend into a delimited group.
    OpenDelim(pm2::Delimiter),
    /// The delimited group must be exhausted here; ascend.
    CloseDelim(pm2::Delimiter),
    /// Parse one fragment of the given kind.
    Fragment(FragmentKind),
    /// Fan-out point: alternatives begin here.
    BranchStart,
    /// Join point: alternatives reconverge here.
    BranchEnd,
}

#[derive(Debug, Clone)]
pub struct MacroGraph {
    nodes: Vec<MacroGraphNode>,
    edges: Vec<Vec<NodeIndex>>,
    start: NodeIndex,
}

impl MacroGraph {
    /// Compile a definition's matchers. `None` if the definition can't be
    /// compiled (no rules, an empty repetition, or a multi-token separator).
    pub fn build(def: &MacroDef) -> Option<MacroGraph> {
        if def.rules.is_empty() {
            return None;
        }
        let mut graph = MacroGraph {
            nodes: Vec::new(),
            edges: Vec::new(),
            start: 0,
        };
        let start = graph.add(MacroGraphNode::Start);
        graph.start = start;

        let branch_start = graph.add(MacroGraphNode::BranchStart);
        let branch_end = graph.add(MacroGraphNode::BranchEnd);
        graph.edge(start, branch_start);
        for rule in &def.rules {
            let (entry, exit) = graph.build_seq(&rule.matcher)?;
            graph.edge(branch_start, entry);
            graph.edge(exit, branch_end);
        }

        let end = graph.add(MacroGraphNode::End);
        graph.edge(branch_end, end);
        Some(graph)
    }

    pub fn node(&self, index: NodeIndex) -> &MacroGraphNode {
        &self.nodes[index]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn add(&mut self, node: MacroGraphNode) -> NodeIndex {
        self.nodes.push(node);
        self.edges.push(Vec::new());
        self.nodes.len() - 1
    }

    fn edge(&mut self, from: NodeIndex, to: NodeIndex) {
        self.edges[from].push(to);
    }

    fn build_seq(&mut self, seq: &MatcherSeq) -> Option<(NodeIndex, NodeIndex)> {
        if seq.0.is_empty() {
            // a passthrough joint for empty matchers, e.g. `() => { ... }`
            let node = self.add(MacroGraphNode::BranchEnd);
            return Some((node, node));
        }
        let mut entry = None;
        let mut previous_exit: Option<NodeIndex> = None;
        for matcher in &seq.0 {
            let (node_entry, node_exit) = self.build_matcher(matcher)?;
            match previous_exit {
                Some(previous) => self.edge(previous, node_entry),
                None => entry = Some(node_entry),
            }
            previous_exit = Some(node_exit);
        }
        Some((entry?, previous_exit?))
    }

    fn build_matcher(&mut self, matcher: &Matcher) -> Option<(NodeIndex, NodeIndex)> {
        match matcher {
            Matcher::Ident(ident) => {
                let node = self.add(MacroGraphNode::Literal(GraphToken::Ident(SmolStr::new(
                    ident.to_string(),
                ))));
                Some((node, node))
            }
            Matcher::Literal(literal) => {
                let node = self.add(MacroGraphNode::Literal(GraphToken::Literal(SmolStr::new(
                    literal.to_string(),
                ))));
                Some((node, node))
            }
            Matcher::Punct(punct) => {
                let node = self.add(MacroGraphNode::Literal(GraphToken::Punct(punct.as_char())));
                Some((node, node))
            }
            Matcher::Lifetime(lifetime) => {
                let node = self.add(MacroGraphNode::Literal(GraphToken::Lifetime(SmolStr::new(
                    lifetime.ident.to_string(),
                ))));
                Some((node, node))
            }
            Matcher::Fragment(fragment) => {
                let node = self.add(MacroGraphNode::Fragment(fragment.spec));
                Some((node, node))
            }
            Matcher::Group(group) => {
                let open = self.add(MacroGraphNode::OpenDelim(group.delimiter));
                let close = self.add(MacroGraphNode::CloseDelim(group.delimiter));
                let (entry, exit) = self.build_seq(&group.inner)?;
                self.edge(open, entry);
                self.edge(exit, close);
                Some((open, close))
            }
            Matcher::Repetition(repetition) => {
                if repetition.inner.0.is_empty() {
                    return None;
                }
                let separator = match repetition.sep.single_token() {
                    Ok(Some(separator)) => Some(GraphToken::from_token_tree(separator)?),
                    Ok(None) => None,
                    Err(()) => return None,
                };
                let branch_start = self.add(MacroGraphNode::BranchStart);
                let branch_end = self.add(MacroGraphNode::BranchEnd);
                let (entry, exit) = self.build_seq(&repetition.inner)?;
                self.edge(branch_start, entry);
                self.edge(exit, branch_end);
                if repetition.kind != RepeatKind::Plus {
                    // zero repetitions allowed: skip edge
                    self.edge(branch_start, branch_end);
                }
                if repetition.kind != RepeatKind::Question {
                    // repeat: back edge, guarded by the separator if present
                    match separator {
                        Some(separator) => {
                            let sep_node = self.add(MacroGraphNode::Literal(separator));
                            self.edge(branch_end, sep_node);
                            self.edge(sep_node, entry);
                        }
                        None => self.edge(branch_end, entry),
                    }
                }
                Some((branch_start, branch_end))
            }
        }
    }
}

/// One fragment a valid overall match would place under the caret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentDescriptor {
    /// The matched text of this specific fragment.
    pub text: String,
    /// The caret's offset relative to the fragment's start.
    pub caret_offset_in_fragment: usize,
    pub kind: FragmentKind,
}

/// Bounds the total number of processed graph nodes per walk, against
/// zero-progress cycles (a `vis` fragment in a repetition consumes nothing).
const WALK_STEP_BUDGET: usize = 100_000;

#[derive(Clone)]
struct WalkerState<'b> {
    node: NodeIndex,
    cursor: Cursor<'b>,
    /// Continuations for the delimited groups we're inside.
    stack: Vec<Cursor<'b>>,
    descriptor: Option<FragmentDescriptor>,
}

/// Walks a [`MacroGraph`] against a (possibly incomplete) call body,
/// collecting the fragments that contain `caret_offset` in every branch that
/// reaches the end of the graph with the input exhausted.
///
/// The result may legitimately contain several descriptors: the grammar can
/// be ambiguous at the caret position, and callers must present all
/// candidates.
pub struct MacroGraphWalker<'a> {
    graph: &'a MacroGraph,
    body: &'a str,
    caret_offset: usize,
}

impl<'a> MacroGraphWalker<'a> {
    pub fn new(graph: &'a MacroGraph, body: &'a str, caret_offset: usize) -> Self {
        MacroGraphWalker {
            graph,
            body,
            caret_offset,
        }
    }

    pub fn run(&self) -> Vec<FragmentDescriptor> {
        let tokens = match syn::parse_str::<pm2::TokenStream>(self.body) {
            Ok(tokens) => tokens,
            Err(_) => return Vec::new(),
        };
        let buffer = TokenBuffer::new2(tokens);

        let mut results = Vec::new();
        let mut states = vec![WalkerState {
            node: self.graph.start,
            cursor: buffer.begin(),
            stack: Vec::new(),
            descriptor: None,
        }];
        let mut steps = 0usize;

        while let Some(mut state) = states.pop() {
            loop {
                steps += 1;
                if steps > WALK_STEP_BUDGET {
                    trace!("graph walk step budget exhausted");
                    return results;
                }

                if !self.process(&mut state) {
                    // dead branch
                    break;
                }

                if let MacroGraphNode::End = self.graph.nodes[state.node] {
                    if state.cursor.eof() && state.stack.is_empty() {
                        if let Some(descriptor) = state.descriptor.take() {
                            results.push(descriptor);
                        }
                    }
                    break;
                }

                let out = &self.graph.edges[state.node];
                match out.len() {
                    0 => break,
                    // a single outgoing edge: continue in place, no fork
                    1 => state.node = out[0],
                    _ => {
                        for &next in out.iter() {
                            let mut fork = state.clone();
                            fork.node = next;
                            states.push(fork);
                        }
                        break;
                    }
                }
            }
        }
        results
    }

    /// Process one node against the state's cursor. False kills the branch.
    fn process(&self, state: &mut WalkerState<'_>) -> bool {
        match &self.graph.nodes[state.node] {
            MacroGraphNode::Start
            | MacroGraphNode::End
            | MacroGraphNode::BranchStart
            | MacroGraphNode::BranchEnd => true,
            MacroGraphNode::Literal(expected) => eat_cursor_token(&mut state.cursor, expected),
            MacroGraphNode::OpenDelim(delimiter) => match state.cursor.group(*delimiter) {
                Some((inside, _span, after)) => {
                    state.stack.push(after);
                    state.cursor = inside;
                    true
                }
                None => false,
            },
            MacroGraphNode::CloseDelim(_) => {
                if !state.cursor.eof() {
                    return false;
                }
                match state.stack.pop() {
                    Some(after) => {
                        state.cursor = after;
                        true
                    }
                    None => false,
                }
            }
            MacroGraphNode::Fragment(kind) => self.process_fragment(*kind, state),
        }
    }

    fn process_fragment(&self, kind: FragmentKind, state: &mut WalkerState<'_>) -> bool {
        let start = if state.cursor.eof() {
            self.body.len()
        } else {
            state.cursor.span().byte_range().start
        };

        // re-materialize the remaining tokens of this scope so syn's
        // nonterminal parsers can run; spans still point into `self.body`
        let remaining = state.cursor.token_stream();
        let total = remaining.clone().into_iter().count();
        let parsed = (|input: ParseStream| -> syn::Result<Option<(Option<usize>, usize)>> {
            let result = parse_fragment(kind, input).ok().map(|parsed| parsed.end);
            let mut rest = 0usize;
            while !input.is_empty() {
                input.parse::<pm2::TokenTree>()?;
                rest += 1;
            }
            Ok(result.map(|end| (end, rest)))
        })
        .parse2(remaining);

        let (end, rest) = match parsed {
            Ok(Some((end, rest))) => (end, rest),
            _ => return false,
        };
        let consumed = total - rest;
        if consumed == 0 && kind != FragmentKind::Vis {
            return false;
        }
        for _ in 0..consumed {
            match state.cursor.token_tree() {
                Some((_, next)) => state.cursor = next,
                None => return false,
            }
        }

        let end = end.unwrap_or(start);
        if state.descriptor.is_none() {
            let exhausted = state.cursor.eof() && state.stack.is_empty();
            if (start <= self.caret_offset && self.caret_offset <= end) || exhausted {
                state.descriptor = Some(FragmentDescriptor {
                    text: self.body[start..end].to_string(),
                    caret_offset_in_fragment: self.caret_offset.saturating_sub(start),
                    kind,
                });
            }
        }
        true
    }
}

fn eat_cursor_token(cursor: &mut Cursor<'_>, expected: &GraphToken) -> bool {
    match expected {
        GraphToken::Ident(expected) => match cursor.ident() {
            Some((actual, next)) if actual == expected.as_str() => {
                *cursor = next;
                true
            }
            _ => false,
        },
        GraphToken::Literal(expected) => match cursor.literal() {
            Some((actual, next)) if actual.to_string() == expected.as_str() => {
                *cursor = next;
                true
            }
            _ => false,
        },
        GraphToken::Punct(expected) => match cursor.punct() {
            Some((actual, next)) if actual.as_char() == *expected => {
                *cursor = next;
                true
            }
            _ => false,
        },
        GraphToken::Lifetime(expected) => match cursor.lifetime() {
            Some((actual, next)) if actual.ident == expected.as_str() => {
                *cursor = next;
                true
            }
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::MacroDef;

    fn graph(def_text: &str) -> MacroGraph {
        let def = syn::parse_str::<MacroDef>(def_text).unwrap();
        MacroGraph::build(&def).expect("graph should compile")
    }

    fn walk(def_text: &str, body: &str, caret: usize) -> Vec<FragmentDescriptor> {
        let graph = graph(def_text);
        MacroGraphWalker::new(&graph, body, caret).run()
    }

    fn kinds(descriptors: &[FragmentDescriptor]) -> Vec<FragmentKind> {
        let mut kinds: Vec<FragmentKind> = Vec::new();
        for descriptor in descriptors {
            if !kinds.contains(&descriptor.kind) {
                kinds.push(descriptor.kind);
            }
        }
        kinds
    }

    #[test]
    fn ambiguous_arms_report_all_kinds() {
        marrow_trace::init();

        // `x` is both a valid expression and a valid identifier; the caret
        // after it belongs to either arm's fragment
        let descriptors = walk(
            r#"
            macro_rules! my_macro {
                ($e:expr) => { 1 };
                ($i:ident) => { 1 };
            }
            "#,
            "x",
            1,
        );
        let kinds = kinds(&descriptors);
        assert_eq!(kinds.len(), 2);
        assert!(kinds.contains(&FragmentKind::Expr));
        assert!(kinds.contains(&FragmentKind::Ident));
    }

    #[test]
    fn complex_expr_fragment() {
        marrow_trace::init();

        let body = "x * (y.a - y.b) * z";
        let caret = body.find("y.a").unwrap() + 2;
        let descriptors = walk(
            "macro_rules! my_macro { ($e:expr) => { 1 }; }",
            body,
            caret,
        );
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].kind, FragmentKind::Expr);
        assert_eq!(descriptors[0].text, body);
        assert_eq!(descriptors[0].caret_offset_in_fragment, caret);
    }

    #[test]
    fn repetition_caret_in_the_middle() {
        marrow_trace::init();

        let def = "macro_rules! my_macro { ($($id:ident)* $t:ty) => { 1 }; }";

        // caret at the end of `y`: only the branch that matched `y` as an
        // `ident` and `z` as the type survives
        let descriptors = walk(def, "x y z", 3);
        assert_eq!(kinds(&descriptors), vec![FragmentKind::Ident]);
        assert_eq!(descriptors[0].text, "y");
        assert_eq!(descriptors[0].caret_offset_in_fragment, 1);

        // caret at the end of input: `z` can only have been the type; the
        // branch that puts it in the repetition dies needing a type at EOF
        let descriptors = walk(def, "x y z", 5);
        assert_eq!(kinds(&descriptors), vec![FragmentKind::Ty]);
        assert_eq!(descriptors[0].text, "z");
    }

    #[test]
    fn fragment_inside_delimiters() {
        marrow_trace::init();

        let descriptors = walk(
            "macro_rules! my_macro { (($e:expr)) => { 1 }; }",
            "(1 + 2)",
            3,
        );
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].text, "1 + 2");
        assert_eq!(descriptors[0].caret_offset_in_fragment, 2);
    }

    #[test]
    fn literal_only_arms_yield_no_descriptors() {
        marrow_trace::init();

        let descriptors = walk(
            r#"
            macro_rules! my_macro {
                (on) => { 1 };
                (off) => { 2 };
            }
            "#,
            "on",
            2,
        );
        assert!(descriptors.is_empty());
    }

    #[test]
    fn separator_guards_the_back_edge() {
        marrow_trace::init();

        let def = "macro_rules! my_macro { ($($e:expr),*) => { 1 }; }";
        let body = "1, 2, 3";
        let descriptors = walk(def, body, body.len());
        assert_eq!(kinds(&descriptors), vec![FragmentKind::Expr]);
        assert_eq!(descriptors[0].text, "3");

        // unmatchable trailing separator: no branch finishes
        assert!(walk(def, "1, 2,", 5).is_empty());
    }

    #[test]
    fn uncompilable_definitions() {
        marrow_trace::init();

        // multi-token separator
        let def = syn::parse_str::<MacroDef>("macro_rules! bad { ($($x:expr)=>*) => { 1 }; }")
            .unwrap();
        assert!(MacroGraph::build(&def).is_none());

        // empty repetition body
        let def = syn::parse_str::<MacroDef>("macro_rules! bad { ($()*) => { 1 }; }").unwrap();
        assert!(MacroGraph::build(&def).is_none());
    }

    #[test]
    fn graph_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        // built once per definition, then read concurrently
        assert_send_sync::<MacroGraph>();
    }

    #[test]
    fn graph_is_reusable_across_walks() {
        marrow_trace::init();

        let compiled = graph("macro_rules! my_macro { ($e:expr) => { 1 }; }");
        for caret in 0..=3 {
            let descriptors = MacroGraphWalker::new(&compiled, "1+2", caret).run();
            assert_eq!(descriptors.len(), 1, "caret {}", caret);
        }
    }
}
