use criterion::BenchmarkId;
use criterion::Throughput;
use criterion::{criterion_group, criterion_main, Criterion};
use guestcall_host::prelude::*;
use test::wasms::TestWasm;

/// compile a module
pub fn wasm_module_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("wasm_module_compile");

    for wasm in [TestWasm::Io, TestWasm::Validation] {
        group.bench_function(BenchmarkId::new("wasm_module_compile", wasm.name()), |b| {
            b.iter(|| {
                ModuleBuilder::new(&InvokeConfig::default())
                    .from_binary(wasm.bytes())
                    .unwrap();
            })
        });
    }

    group.finish()
}

/// open a session from an already compiled module
pub fn wasm_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("wasm_session");

    let module = TestWasm::Io.module().unwrap();
    group.bench_function("wasm_session", |b| {
        b.iter(|| {
            module.instantiate("echo_bytes").unwrap();
        })
    });

    group.finish()
}

/// round trip bytes of various sizes through a long lived session
pub fn wasm_echo(c: &mut Criterion) {
    let mut group = c.benchmark_group("wasm_echo");

    let mut session = TestWasm::Io.session("echo_bytes").unwrap();
    for n in [0, 1, 1_000, 1_000_000] {
        let input = vec![0_u8; n];
        group.throughput(Throughput::Bytes(n as u64));
        group.bench_with_input(BenchmarkId::new("wasm_echo", n), &input, |b, input| {
            b.iter(|| {
                session.invoke_target(input).unwrap();
            })
        });
    }

    group.finish()
}

/// a fresh session per call against a pool of warm sessions
pub fn wasm_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("wasm_validate");
    let input = br#"{"hostname":"example.com","ipv4":"10.0.0.1"}"#;

    let module = TestWasm::Validation.module().unwrap();
    group.bench_function(BenchmarkId::new("wasm_validate", "fresh"), |b| {
        b.iter(|| {
            let mut session = module.instantiate("validate_create_host_params").unwrap();
            session.invoke_target(input).unwrap();
        })
    });

    let pool = SessionPool::new(
        module.clone(),
        "validate_create_host_params",
        &InvokeConfig::default(),
    );
    pool.warm(1).unwrap();
    group.bench_function(BenchmarkId::new("wasm_validate", "pooled"), |b| {
        b.iter(|| {
            pool.invoke(input).unwrap();
        })
    });

    group.finish()
}

criterion_group!(
    benches,
    wasm_module_compile,
    wasm_session,
    wasm_echo,
    wasm_validate,
);

criterion_main!(benches);
