//! Benchmarks for the dispatch path.
//!
//! - Dispatch to an already bound substitute (the steady state)
//! - First dispatch on a fresh object (lazy binding)
//! - Direct call through the gate

extern crate shadowhost;

use criterion::{criterion_group, criterion_main, Criterion};
use shadowhost::{args, dispatch::*};
use std::{
    hint::black_box,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

const CLASS: &str = "android.widget.TextView";

#[derive(Debug)]
struct TextView;

impl PlatformObject for TextView {
    fn class_id(&self) -> ClassId {
        ClassId::new(CLASS)
    }
}

#[derive(Default)]
struct ShadowTextView {
    length: AtomicU64,
}

fn dispatcher() -> Dispatcher {
    let mut table = ShadowTable::new();
    table.register(
        ShadowClass::<ShadowTextView>::new(CLASS).method(
            "append",
            &["java.lang.CharSequence"],
            |shadow, call| {
                let added = call.arg(0)?.as_str().map_or(0, str::len) as u64;
                let total = shadow.length.fetch_add(added, Ordering::Relaxed) + added;
                Ok(ShadowValue::I64(total as i64))
            },
        ),
    );
    Dispatcher::new(
        Arc::new(table),
        Arc::new(IdentityRegistry::new()),
        Arc::new(DirectCallGate::new()),
    )
}

/// Steady state: the substitute already exists.
fn bench_dispatch_bound(c: &mut Criterion) {
    let dispatcher = dispatcher();
    let view: ObjectRef = Arc::new(TextView);
    let params = ["java.lang.CharSequence"];
    let site = CallSite::new(CLASS, "append", &params);
    let arguments = args!["x"];

    c.bench_function("dispatch_bound", |b| {
        b.iter(|| {
            let result = dispatcher
                .dispatch(&site, Some(&view), black_box(&arguments), |_| {
                    Ok(ShadowValue::Void)
                })
                .unwrap();
            black_box(result)
        });
    });
}

/// First interception of a fresh object binds a new substitute.
fn bench_dispatch_first_bind(c: &mut Criterion) {
    let dispatcher = dispatcher();
    let params = ["java.lang.CharSequence"];
    let site = CallSite::new(CLASS, "append", &params);
    let arguments = args!["x"];

    c.bench_function("dispatch_first_bind", |b| {
        b.iter(|| {
            let view: ObjectRef = Arc::new(TextView);
            let result = dispatcher
                .dispatch(&site, Some(&view), &arguments, |_| Ok(ShadowValue::Void))
                .unwrap();
            dispatcher.registry().unbind(&view);
            black_box(result)
        });
    });
}

/// Mark, then dispatch straight to the original body.
fn bench_direct_call(c: &mut Criterion) {
    let dispatcher = dispatcher();
    let view: ObjectRef = Arc::new(TextView);
    let params = ["java.lang.CharSequence"];
    let site = CallSite::new(CLASS, "append", &params);
    let arguments = args!["x"];

    c.bench_function("dispatch_direct", |b| {
        b.iter(|| {
            let target = dispatcher.direct_on(&view).unwrap();
            let result = dispatcher
                .dispatch(&site, Some(target), &arguments, |_| Ok(ShadowValue::I32(1)))
                .unwrap();
            black_box(result)
        });
    });
}

criterion_group!(
    benches,
    bench_dispatch_bound,
    bench_dispatch_first_bind,
    bench_direct_call
);
criterion_main!(benches);
