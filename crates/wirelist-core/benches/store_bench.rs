//! # Store Benchmarks
//!
//! Performance benchmarks for wirelist-core bulk operations.
//!
//! Run with: `cargo bench -p wirelist-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use wirelist_core::{
    Dataset, EntityStore, PinRef, RenumberEngine, ReorientEngine, ReportBuilder, ReportWidths,
    ViewFilter,
};

/// Create a harness of `size` two-ended links spread over a few units.
fn create_harness(size: usize) -> Dataset {
    let mut ds = Dataset::new();
    let units = ["PSU", "CTRL", "IO1", "IO2", "DISP"];

    for i in 0..size {
        let a = PinRef::new(units[i % units.len()], format!("J{}", i % 7), (size - i).to_string());
        let b = PinRef::new(
            units[(i + 1) % units.len()],
            format!("P{}", i % 5),
            i.to_string(),
        );
        let cable = (i % 3 == 0).then_some(1);
        EntityStore::add_link(&mut ds, &a, &b, cable).expect("link");
    }

    ds
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_renumber(c: &mut Criterion) {
    let mut group = c.benchmark_group("renumber_nets");

    for size in [100, 1000] {
        let ds = create_harness(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &ds, |b, ds| {
            b.iter(|| {
                let mut work = ds.clone();
                black_box(RenumberEngine::renumber_nets(&mut work, "PSU").expect("renumber"))
            });
        });
    }

    group.finish();
}

fn bench_reorient(c: &mut Criterion) {
    let mut group = c.benchmark_group("reorient_conductors");

    for size in [100, 1000] {
        let ds = create_harness(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &ds, |b, ds| {
            b.iter(|| {
                let mut work = ds.clone();
                black_box(ReorientEngine::reorient_conductors(&mut work).expect("reorient"))
            });
        });
    }

    group.finish();
}

fn bench_reports(c: &mut Criterion) {
    let mut group = c.benchmark_group("reports");
    let widths = ReportWidths::default();
    let filter = ViewFilter::new();

    for size in [100, 1000] {
        let ds = create_harness(size);
        group.bench_with_input(BenchmarkId::new("pin_report", size), &ds, |b, ds| {
            b.iter(|| black_box(ReportBuilder::pin_report(ds, &filter, &widths, true).expect("report")));
        });
        group.bench_with_input(BenchmarkId::new("conductor_report", size), &ds, |b, ds| {
            b.iter(|| black_box(ReportBuilder::conductor_report(ds, &filter, &widths).expect("report")));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_renumber, bench_reorient, bench_reports);
criterion_main!(benches);
