//! Allocation path benchmarks: tracked vs. raw.

use std::ffi::c_char;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use fencepost_abi::alloc_abi::{fencepost_free, fencepost_malloc, fencepost_reset};
use fencepost_core::{DebuggerConfig, MemoryDebugger, Site, SystemRaw};

const SITE: Site = Site::new("debugger_bench.rs", 1);
const FILE: *const c_char = c"debugger_bench.rs".as_ptr();

fn bench_alloc_free_cycle(c: &mut Criterion) {
    let sizes: &[usize] = &[16, 64, 256, 1024, 4096, 32768];
    let mut group = c.benchmark_group("alloc_free_cycle");

    for &size in sizes {
        group.bench_with_input(BenchmarkId::new("libc", size), &size, |b, &sz| {
            b.iter(|| {
                // SAFETY: plain libc allocation, released immediately.
                unsafe {
                    let p = libc::malloc(sz);
                    criterion::black_box(p);
                    libc::free(p);
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("debugger", size), &size, |b, &sz| {
            let mut dbg = MemoryDebugger::with_config(SystemRaw, DebuggerConfig::silent());
            b.iter(|| {
                let p = dbg.malloc(sz, SITE).map(|p| p.as_ptr());
                if let Some(p) = criterion::black_box(p) {
                    dbg.free(p, SITE);
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("abi", size), &size, |b, &sz| {
            fencepost_reset();
            b.iter(|| {
                // SAFETY: FILE is NUL-terminated; the block is released at once.
                unsafe {
                    let p = fencepost_malloc(sz, FILE, 1);
                    criterion::black_box(p);
                    fencepost_free(p, FILE, 2);
                }
            });
        });
    }
    group.finish();
}

fn bench_alloc_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_burst");

    group.bench_function("1000x64B", |b| {
        let mut dbg = MemoryDebugger::with_config(SystemRaw, DebuggerConfig::silent());
        b.iter(|| {
            let ptrs: Vec<_> = (0..1000).filter_map(|_| dbg.malloc(64, SITE)).collect();
            for p in criterion::black_box(ptrs) {
                dbg.free(p.as_ptr(), SITE);
            }
        });
    });

    group.bench_function("1000x64B_leak_report", |b| {
        let mut dbg = MemoryDebugger::with_config(SystemRaw, DebuggerConfig::silent());
        for _ in 0..1000 {
            dbg.malloc(64, SITE);
        }
        b.iter(|| criterion::black_box(dbg.leak_report()));
        dbg.reset();
    });

    group.finish();
}

criterion_group!(benches, bench_alloc_free_cycle, bench_alloc_burst);
criterion_main!(benches);
