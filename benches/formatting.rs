//! Benchmarks for the formatting pipeline.
//!
//! Run with: cargo bench

use criterion::{Criterion, criterion_group, criterion_main};

use markspan::markdown::{parse, render};
use markspan::template::{Context, FilterRegistry, Value, compile, evaluate};

/// A post-sized markdown document exercising every construct.
fn sample_markdown() -> String {
    let mut doc = String::new();
    for n in 0..40 {
        doc.push_str(&format!(
            "**Item {n}** with *emphasis*, __underline__, ~~strike~~, \
             `inline code`, a [link](https://example.com/{n}), and 😀.\n\
             > quoted wisdom line {n}\n\n\
             ```rust\nlet x = {n};\n```\n\n"
        ));
    }
    doc
}

fn sample_template() -> &'static str {
    "**{title|upper}**\n\n{?lede}_{lede|truncate:80}_\n\n{/lede}\
     {#items}- {name|escape_md} ({price}){?!last}\n{/last}{/items}\n\n\
     {#tags}#{.|lower} {/tags}"
}

fn sample_context() -> Context {
    let mut context = Context::new();
    context.insert("title".into(), Value::from("Benchmark Digest"));
    context.insert(
        "lede".into(),
        Value::from("All the items that are fit to list, and then some more."),
    );
    let items: Vec<Value> = (0..20)
        .map(|n| {
            let mut item = std::collections::BTreeMap::new();
            item.insert("name".into(), Value::from(format!("item *{n}*")));
            item.insert("price".into(), Value::Int(n * 10));
            Value::Map(item)
        })
        .collect();
    context.insert("items".into(), Value::List(items));
    context.insert("tags".into(), Value::from(vec!["Rust", "Bench", "Text"]));
    context
}

fn bench_parse(c: &mut Criterion) {
    let doc = sample_markdown();
    c.bench_function("parse_markdown", |b| {
        b.iter(|| parse(&doc));
    });
}

fn bench_render(c: &mut Criterion) {
    let ft = parse(&sample_markdown());
    c.bench_function("render_markdown", |b| {
        b.iter(|| render(&ft).unwrap());
    });
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_template", |b| {
        b.iter(|| compile(sample_template()).unwrap());
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let template = compile(sample_template()).unwrap();
    let context = sample_context();
    let filters = FilterRegistry::default();
    c.bench_function("evaluate_template", |b| {
        b.iter(|| evaluate(&template, &context, &filters));
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let context = sample_context();
    c.bench_function("format_message", |b| {
        b.iter(|| markspan::format_message(sample_template(), &context).unwrap());
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_render,
    bench_compile,
    bench_evaluate,
    bench_full_pipeline
);
criterion_main!(benches);
