use std::hint::black_box;

use core_text::cell::Cell;
use core_text::wrap::{WrapMode, compute_segments};
use criterion::{Criterion, criterion_group, criterion_main};

fn bench_wrap(c: &mut Criterion) {
    let prose: String = std::iter::repeat("lorem ipsum dolor sit amet ")
        .take(40)
        .collect();
    let cells: Vec<Cell> = prose.chars().map(Cell::new).collect();
    c.bench_function("word_wrap_1k_cells_80_cols", |b| {
        b.iter(|| compute_segments(black_box(&cells), 80, WrapMode::Word, 8))
    });
    c.bench_function("char_wrap_1k_cells_80_cols", |b| {
        b.iter(|| compute_segments(black_box(&cells), 80, WrapMode::Character, 8))
    });
}

criterion_group!(benches, bench_wrap);
criterion_main!(benches);
