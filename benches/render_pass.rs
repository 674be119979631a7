use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gooey_gui::{GuiConfig, Props, RenderRequest, Renderer, ScopeHost};
use serde_json::json;

/// Benchmark a full render invocation building a list of `rows` nodes
fn bench_render_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let renderer = Renderer::with_memory_store(GuiConfig::default());

    for rows in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("list", rows), &rows, |b, &rows| {
            b.iter(|| {
                let outcome = renderer.render(RenderRequest::new(), |s| {
                    let list = s.mount("ul", Props::new());
                    let mut scope = s.enter(list)?;
                    for i in 0..rows {
                        let mut props = Props::new();
                        props.insert("body".to_string(), json!(i));
                        scope.mount("li", props);
                    }
                    Ok(())
                });
                black_box(outcome)
            });
        });
    }

    // one restart: the cost of throwing a pass away
    group.bench_function("rerun_once", |b| {
        b.iter(|| {
            let outcome = renderer.render(RenderRequest::new(), |s| {
                s.mount("pre", Props::new());
                if !s.state().contains_key("seen") {
                    s.state_mut().set("seen", true);
                    return gooey_gui::rerun();
                }
                Ok(())
            });
            black_box(outcome)
        });
    });

    group.finish();
}

/// Benchmark key derivation
fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("key");

    group.bench_function("fingerprint_small", |b| {
        b.iter(|| gooey_gui::key::fingerprint(black_box("button"), &[json!("Submit"), json!(1)]));
    });

    let large = json!({"rows": (0..500).collect::<Vec<_>>(), "label": "table"});
    group.bench_function("fingerprint_large", |b| {
        b.iter(|| gooey_gui::key::fingerprint(black_box("table"), std::slice::from_ref(&large)));
    });

    group.finish();
}

criterion_group!(benches, bench_render_pass, bench_fingerprint);
criterion_main!(benches);
