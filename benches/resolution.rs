use criterion::{black_box, criterion_group, criterion_main, Criterion};
use quiver::{Definition, Resolver, ResolverConfig, Value};

fn chain_link(index: usize) -> Definition {
    if index == 0 {
        Definition::named("m00").value(Value::Int(1))
    } else {
        Definition::named(format!("m{:02}", index))
            .dependency(&format!("m{:02}", index - 1))
            .factory(|_, deps| Some(Value::Int(deps[0].as_int().unwrap_or(0) + 1)))
    }
}

fn benchmark_forward_chain(c: &mut Criterion) {
    c.bench_function("forward_chain_100", |b| {
        b.iter(|| {
            let resolver = Resolver::new(ResolverConfig::immediate());
            for index in 0..100 {
                if index == 0 {
                    resolver.define(Definition::named("n000").value(Value::Int(1)));
                } else {
                    resolver.define(
                        Definition::named(format!("n{:03}", index))
                            .dependency(&format!("n{:03}", index - 1))
                            .factory(|_, deps| {
                                Some(Value::Int(deps[0].as_int().unwrap_or(0) + 1))
                            }),
                    );
                }
            }
            black_box(resolver.status().completed)
        })
    });
}

fn benchmark_reverse_chain(c: &mut Criterion) {
    // Reverse order forces the final tick to reach the fixed point through
    // repeated passes, one link per pass.
    c.bench_function("reverse_chain_24", |b| {
        b.iter(|| {
            let resolver = Resolver::new(ResolverConfig::immediate());
            for index in (0..24).rev() {
                resolver.define(chain_link(index));
            }
            black_box(resolver.status().completed)
        })
    });
}

fn benchmark_fan_out(c: &mut Criterion) {
    c.bench_function("fan_out_64", |b| {
        b.iter(|| {
            let resolver = Resolver::new(ResolverConfig::immediate());
            resolver.define(Definition::named("base").value(Value::Int(7)));
            for index in 0..64 {
                resolver.define(
                    Definition::named(format!("leaf{:02}", index))
                        .dependency("base")
                        .factory(|_, deps| Some(deps[0].clone())),
                );
            }
            black_box(resolver.status().completed)
        })
    });
}

fn benchmark_loaded_lookup(c: &mut Criterion) {
    let resolver = Resolver::new(ResolverConfig::immediate());
    resolver.define(Definition::named("app/deep/value").value(Value::Int(42)));

    c.bench_function("loaded_lookup", |b| {
        b.iter(|| black_box(resolver.lookup(black_box("app/deep/value"))))
    });
}

criterion_group!(
    benches,
    benchmark_forward_chain,
    benchmark_reverse_chain,
    benchmark_fan_out,
    benchmark_loaded_lookup
);
criterion_main!(benches);
