use boss_codec::{
    BiAdapter, Binder, Deserializer, FnAdapter, Mapper, Result, Serializer, Value,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::any::TypeId;
use std::sync::Arc;

#[derive(Clone)]
struct Point {
    x: i64,
    y: i64,
}

struct PointAdapter;

impl BiAdapter<Point> for PointAdapter {
    fn type_name(&self) -> &str {
        "point"
    }

    fn encode(&self, p: &Point, _: &mut Serializer) -> Result<Binder> {
        Ok(Binder::of([("x", p.x), ("y", p.y)]))
    }

    fn decode(&self, b: &Binder, _: &mut Deserializer) -> Result<Point> {
        Ok(Point {
            x: b.get_i64_or_err("x")?,
            y: b.get_i64_or_err("y")?,
        })
    }
}

fn bench_typed_objects(c: &mut Criterion) {
    let mut group = c.benchmark_group("typed_objects");
    let mapper = Mapper::new();
    mapper.register(PointAdapter).unwrap();

    let points = Value::list(
        (0..128)
            .map(|i| Value::object(Point { x: i, y: -i }))
            .collect::<Vec<_>>(),
    );
    let encoded = mapper.serialize(&points).unwrap();

    group.bench_function("serialize", |b| b.iter(|| mapper.serialize(&points).unwrap()));
    group.bench_function("deserialize", |b| {
        b.iter(|| mapper.deserialize(&encoded).unwrap())
    });

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    let source = Arc::new(Mapper::new());
    source.register(PointAdapter).unwrap();
    let derived = Mapper::derive(&source, [TypeId::of::<u8>()]);

    group.bench_function("root_by_name", |b| {
        b.iter(|| source.resolve_name("point").is_some())
    });
    group.bench_function("derived_by_name", |b| {
        b.iter(|| derived.resolve_name("point").is_some())
    });

    // Every registration on the source forces the derived view to rebuild once.
    let mut n = 0u64;
    group.bench_function("derived_after_source_change", |b| {
        b.iter(|| {
            n += 1;
            source
                .register(FnAdapter::new(
                    format!("counter-{}", n % 8),
                    |v: &u32, _: &mut Serializer| Ok(Binder::of([("v", *v)])),
                    |b: &Binder, _: &mut Deserializer| Ok(b.get_i64_or_err("v")? as u32),
                ))
                .unwrap();
            derived.resolve_name("point").is_some()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_typed_objects, bench_resolution);
criterion_main!(benches);
