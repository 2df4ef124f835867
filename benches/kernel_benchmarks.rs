use bgmodel::{
    update_group, update_pixel, BackgroundEngine, EngineConfig, KernelStrategy, ModelParameters,
    ParameterStore, PixelMixture,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const RESOLUTIONS: [(u32, u32, &str); 2] = [(320, 240, "qvga"), (1280, 720, "hd720")];

/// Gradient background with a little per-frame flicker so some pixels miss their match
fn synthetic_frame(width: u32, height: u32, t: u32) -> Vec<u8> {
    let mut frame = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let flicker = ((x * 7 + y * 13 + t * 31) % 23) as u8;
            frame.push((x % 256) as u8);
            frame.push((y % 256) as u8);
            frame.push(128u8.wrapping_add(flicker));
        }
    }
    frame
}

fn benchmark_frame_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_update");
    group.sample_size(20);

    for (width, height, label) in RESOLUTIONS {
        let frames: Vec<Vec<u8>> = (0..8).map(|t| synthetic_frame(width, height, t)).collect();
        group.throughput(Throughput::Elements(u64::from(width * height)));

        for strategy in [KernelStrategy::Scalar, KernelStrategy::Vectorized] {
            for workers in [1, 4] {
                let mut engine = BackgroundEngine::new(
                    width,
                    height,
                    ParameterStore::default(),
                    EngineConfig::new(workers, strategy),
                )
                .unwrap();
                engine.process_frame(&frames[0]).unwrap();

                let id = BenchmarkId::new(format!("{}_{}w", strategy, workers), label);
                group.bench_function(id, |b| {
                    let mut t = 0;
                    b.iter(|| {
                        t = (t + 1) % frames.len();
                        black_box(engine.process_frame(&frames[t]).unwrap().len())
                    });
                });
            }
        }
    }

    group.finish();
}

fn benchmark_pixel_kernels(c: &mut Criterion) {
    let params = ModelParameters::default();
    let frame: [u8; 12] = [10, 20, 30, 200, 40, 60, 12, 22, 28, 90, 90, 90];
    let seed = [
        PixelMixture::seeded([10.0, 20.0, 30.0], &params),
        PixelMixture::seeded([60.0, 40.0, 200.0], &params),
        PixelMixture::seeded([12.0, 22.0, 28.0], &params),
        PixelMixture::seeded([90.0, 90.0, 90.0], &params),
    ];

    let mut group = c.benchmark_group("pixel_kernels");
    group.throughput(Throughput::Elements(4));

    group.bench_function("scalar_x4", |b| {
        let mut mixtures = seed;
        b.iter(|| {
            for (i, mixture) in mixtures.iter_mut().enumerate() {
                let px = [frame[i * 3], frame[i * 3 + 1], frame[i * 3 + 2]];
                black_box(update_pixel(black_box(px), mixture, &params).unwrap());
            }
        });
    });

    group.bench_function("vectorized_group", |b| {
        let mut mixtures = seed;
        let mut background = [0u8; 12];
        let mut deviation = [0f32; 4];
        b.iter(|| {
            black_box(
                update_group(
                    black_box(&frame),
                    &mut mixtures,
                    &mut background,
                    &mut deviation,
                    &params,
                )
                .unwrap(),
            )
        });
    });

    group.finish();
}

criterion_group!(kernel_benches, benchmark_frame_update, benchmark_pixel_kernels);
criterion_main!(kernel_benches);
