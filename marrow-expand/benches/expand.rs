use criterion::{black_box, criterion_group, criterion_main, Criterion};

use marrow_expand::ast::MacroDef;
use marrow_expand::expand::DeclMacroExpander;
use marrow_expand::graph::{MacroGraph, MacroGraphWalker};

fn getters_def() -> MacroDef {
    syn::parse_str::<MacroDef>(
        r#"
        macro_rules! getters {
            ($($name:ident : $ty:ty),+) => {
                $(fn $name (&self) -> $ty { self.$name })+
            };
        }
        "#,
    )
    .unwrap()
}

fn bench_expand(c: &mut Criterion) {
    let def = getters_def();
    let expander = DeclMacroExpander::new();
    let call_body = "alpha: u32, beta: String, gamma: Vec<u8>, delta: bool";

    c.bench_function("match_and_expand_getters", |b| {
        b.iter(|| {
            expander
                .expand(black_box(&def), black_box(call_body))
                .unwrap()
        })
    });
}

fn bench_graph_walk(c: &mut Criterion) {
    let def = getters_def();
    let graph = MacroGraph::build(&def).unwrap();
    let call_body = "alpha: u32, beta: String";

    c.bench_function("graph_walk_getters", |b| {
        b.iter(|| MacroGraphWalker::new(black_box(&graph), black_box(call_body), 7).run())
    });
}

criterion_group!(benches, bench_expand, bench_graph_walk);
criterion_main!(benches);
