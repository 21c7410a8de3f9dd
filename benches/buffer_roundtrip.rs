use criterion::{black_box, Criterion};
use pothos_core::buffer::manager::GenericBufferManager;
use pothos_core::buffer::BufferManager as _;
use pothos_core::BufferManagerArgs;
use std::env;
use std::time::Duration;

/// Issue/fill/return churn through `GenericBufferManager`'s ring: pop the front buffer,
/// write into it, hand it back via `push` the way an actor's output port would once the
/// downstream side drops its `ManagedBuffer`.
fn bench_slab_issue_and_return(c: &mut Criterion) {
    let manager = GenericBufferManager::new(BufferManagerArgs { buffer_size: 4096, num_buffers: 8, node_affinity: None });

    c.bench_function("slab_issue_and_return", |b| {
        b.iter(|| {
            let chunk = manager.front();
            chunk.as_bytes_mut()[..64].copy_from_slice(&[0xABu8; 64]);
            manager.pop(64);
            black_box(&chunk);
        });
    });
}

/// Forces the ring to rotate every iteration (consume more than half the buffer each
/// time) rather than reusing the head in place, exercising the `pop_front`/slab-index
/// hand-back path instead of the cheap in-place branch.
fn bench_slab_rotation(c: &mut Criterion) {
    let manager = GenericBufferManager::new(BufferManagerArgs { buffer_size: 256, num_buffers: 8, node_affinity: None });

    c.bench_function("slab_rotation", |b| {
        b.iter(|| {
            let chunk = manager.front();
            chunk.as_bytes_mut()[..200].copy_from_slice(&[0x11u8; 200]);
            manager.pop(200);
            black_box(&chunk);
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

    bench_slab_issue_and_return(&mut criterion);
    bench_slab_rotation(&mut criterion);
    criterion.final_summary();
}
