use criterion::{black_box, Criterion};
use pothos_core::dtype::DType;
use pothos_core::{BufferAccumulator, BufferChunk, SharedBuffer};
use std::env;
use std::time::Duration;

/// Two chunks sliced from the same backing container, pushed back to back: `push`
/// should take the abutting-merge branch and never touch `require`'s copy path.
fn bench_push_abutting_chunks(c: &mut Criterion) {
    c.bench_function("push_abutting_chunks", |b| {
        b.iter(|| {
            let shared = SharedBuffer::allocate(8192);
            let whole = BufferChunk::from_shared(shared, DType::uint8());
            let first = whole.slice_elements(0, 4096);
            let second = whole.slice_elements(4096, 4096);

            let mut accumulator = BufferAccumulator::new();
            accumulator.push(first);
            accumulator.push(second);
            black_box(accumulator.front().unwrap().len());
        });
    });
}

/// Chunks from distinct containers, each too small alone to satisfy a `require()` call
/// spanning both: this is the one path that actually copies, measured against the
/// abutting case above to show what the merge-in-`push` optimization is buying.
fn bench_require_across_chunk_boundary(c: &mut Criterion) {
    c.bench_function("require_across_chunk_boundary", |b| {
        b.iter(|| {
            let mut accumulator = BufferAccumulator::new();
            for _ in 0..4 {
                let shared = SharedBuffer::allocate(1024);
                accumulator.push(BufferChunk::from_shared(shared, DType::uint8()));
            }
            accumulator.require(3500).unwrap();
            black_box(accumulator.front().unwrap().len());
        });
    });
}

fn main() {
    let mut quick_mode = false;
    for arg in env::args().skip(1) {
        if arg == "--quick" {
            quick_mode = true;
        }
    }

    let mut criterion = Criterion::default();
    if quick_mode {
        criterion = criterion
            .sample_size(10)
            .warm_up_time(Duration::from_millis(100))
            .measurement_time(Duration::from_millis(250));
    }

    bench_push_abutting_chunks(&mut criterion);
    bench_require_across_chunk_boundary(&mut criterion);
    criterion.final_summary();
}
