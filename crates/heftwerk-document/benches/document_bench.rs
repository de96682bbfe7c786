// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the heftwerk-document crate: merging a handful of
// synthetic PDFs and converting a PNG to PDF along both conversion paths.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use heftwerk_core::AppConfig;
use heftwerk_document::{DocumentConverter, MergeEngine, fixtures};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Merge eight 5-page documents. The inputs are written once; each iteration
/// loads, copies and materialises all forty pages.
fn bench_merge(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("bench temp dir");
    let paths: Vec<_> = (0..8u32)
        .map(|i| {
            let path = dir.path().join(format!("input-{i}.pdf"));
            let widths: Vec<u32> = (0..5).map(|p| 300 + i * 10 + p).collect();
            std::fs::write(&path, fixtures::pdf_with_widths(&widths)).expect("write input");
            path
        })
        .collect();
    let engine = MergeEngine::new(dir.path());

    c.bench_function("merge (8 x 5 pages)", |b| {
        b.iter(|| {
            let bytes = engine.merge(black_box(&paths), |_| {}).expect("merge");
            black_box(bytes);
        });
    });
}

/// Convert a 400x300 PNG with alpha, lossless and rasterised.
fn bench_image_to_pdf(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("bench temp dir");
    let png = fixtures::png_bytes(400, 300, true);
    let config = AppConfig::default();

    for preserve in [true, false] {
        let label = if preserve {
            "image_to_pdf lossless (400x300)"
        } else {
            "image_to_pdf rasterised (400x300)"
        };
        c.bench_function(label, |b| {
            b.iter(|| {
                let path =
                    DocumentConverter::image_to_pdf(black_box(&png), preserve, dir.path(), &config)
                        .expect("convert");
                std::fs::remove_file(path).expect("remove output");
            });
        });
    }
}

criterion_group!(benches, bench_merge, bench_image_to_pdf);
criterion_main!(benches);
