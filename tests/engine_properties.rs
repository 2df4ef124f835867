//! Whole-engine behaviour over frame sequences
//!
//! These tests drive `BackgroundEngine` through synthetic sequences and check the
//! model-level guarantees: normalised weights, kernel and worker-count
//! independence, convergence on static scenes and absorption of new objects.

mod common;

use bgmodel::{BgModelError, KernelStrategy, ModelParameters};
use common::{
    engine, moving_square_sequence, noisy_frame, paint_rect, params, rect_indices, uniform_frame,
};

#[test]
fn test_weights_stay_normalised_and_variances_positive() {
    let (width, height) = (37, 11);
    let mut engine = engine(width, height, 3, KernelStrategy::Vectorized, params(0.05));

    for frame in moving_square_sequence(width, height, 40) {
        engine.process_frame(&frame).unwrap();
        for (i, mixture) in engine.mixtures().iter().enumerate() {
            assert!(
                (mixture.weight_sum() - 1.0).abs() < 1e-4,
                "pixel {} weight sum {}",
                i,
                mixture.weight_sum()
            );
            assert!(mixture.components.iter().all(|c| c.variance > 0.0));
        }
    }
}

#[test]
fn test_scalar_and_vectorized_engines_are_identical() {
    let (width, height) = (23, 9);
    let mut scalar = engine(width, height, 2, KernelStrategy::Scalar, params(0.08));
    let mut vector = engine(width, height, 2, KernelStrategy::Vectorized, params(0.08));

    for (t, frame) in moving_square_sequence(width, height, 50).iter().enumerate() {
        let a = scalar.process_frame(frame).unwrap().to_vec();
        let b = vector.process_frame(frame).unwrap().to_vec();
        assert_eq!(a, b, "mask differs at frame {}", t);
        assert_eq!(scalar.background_snapshot(), vector.background_snapshot());
        assert_eq!(scalar.deviation_snapshot(), vector.deviation_snapshot());
        assert_eq!(scalar.mixtures(), vector.mixtures(), "model differs at frame {}", t);
    }
}

#[test]
fn test_worker_count_does_not_change_results() {
    let (width, height) = (31, 13);
    let mut single = engine(width, height, 1, KernelStrategy::Vectorized, params(0.05));
    let mut many = engine(width, height, 8, KernelStrategy::Vectorized, params(0.05));
    assert_eq!(many.worker_count(), 8);

    for frame in moving_square_sequence(width, height, 30) {
        let a = single.process_frame(&frame).unwrap().to_vec();
        let b = many.process_frame(&frame).unwrap().to_vec();
        assert_eq!(a, b);
        assert_eq!(single.mixtures(), many.mixtures());
        assert_eq!(single.background_snapshot(), many.background_snapshot());
    }
}

#[test]
fn test_constant_scene_stays_background() {
    let (width, height) = (16, 8);
    let colour = [12, 128, 250];
    let frame = uniform_frame(width, height, colour);

    for learning_rate in [0.001, 0.01, 0.3, 0.9] {
        for strategy in [KernelStrategy::Scalar, KernelStrategy::Vectorized] {
            let mut engine = engine(width, height, 2, strategy, params(learning_rate));
            for _ in 0..120 {
                let mask = engine.process_frame(&frame).unwrap();
                assert!(mask.iter().all(|&m| m == 0));
            }
            assert!(engine
                .background_snapshot()
                .chunks_exact(3)
                .all(|px| px == colour));
        }
    }
}

#[test]
fn test_changed_scene_converges_to_new_colour() {
    let (width, height) = (12, 6);
    let mut engine = engine(width, height, 4, KernelStrategy::Vectorized, params(0.05));

    for t in 0..20 {
        engine
            .process_frame(&noisy_frame(width, height, [50, 50, 50], 2, t))
            .unwrap();
    }

    let new_scene = uniform_frame(width, height, [200, 180, 160]);
    let first = engine.process_frame(&new_scene).unwrap().to_vec();
    assert!(first.iter().all(|&m| m == 1), "a new colour starts as foreground");

    for _ in 0..100 {
        engine.process_frame(&new_scene).unwrap();
    }
    assert!(engine.mask().iter().all(|&m| m == 0));
    assert!(engine
        .background_snapshot()
        .chunks_exact(3)
        .all(|px| px == [200, 180, 160]));
}

#[test]
fn test_converged_static_frame_is_idempotent() {
    let (width, height) = (10, 10);
    let frame = noisy_frame(width, height, [90, 100, 110], 3, 7);
    let mut engine = engine(width, height, 2, KernelStrategy::Scalar, params(0.02));

    for _ in 0..200 {
        engine.process_frame(&frame).unwrap();
    }
    let before = engine.mixtures().to_vec();
    let background = engine.background_snapshot().to_vec();

    let mask = engine.process_frame(&frame).unwrap();
    assert!(mask.iter().all(|&m| m == 0));
    assert_eq!(engine.background_snapshot(), background.as_slice());
    for (old, new) in before.iter().zip(engine.mixtures()) {
        for (a, b) in old.components.iter().zip(&new.components) {
            assert!((a.weight - b.weight).abs() < 1e-3);
            assert!((a.mean_g - b.mean_g).abs() < 1e-2);
        }
    }
}

#[test]
fn test_new_object_is_foreground_then_absorbed() {
    let (width, height) = (20, 12);
    let (top_left, bottom_right) = ((6, 3), (12, 9));
    let patch = rect_indices(width, top_left, bottom_right);
    let background = uniform_frame(width, height, [50, 60, 70]);
    let mut with_object = background.clone();
    paint_rect(&mut with_object, width, top_left, bottom_right, [210, 200, 190]);

    let mut engine = engine(width, height, 3, KernelStrategy::Vectorized, params(0.1));
    for _ in 0..20 {
        engine.process_frame(&background).unwrap();
    }

    let mask = engine.process_frame(&with_object).unwrap();
    assert!(patch.iter().all(|&i| mask[i] == 1));
    assert_eq!(mask.iter().filter(|&&m| m == 1).count(), patch.len());

    for _ in 0..60 {
        engine.process_frame(&with_object).unwrap();
    }
    assert!(engine.mask().iter().all(|&m| m == 0), "object absorbed into background");
    let snapshot = engine.background_snapshot();
    assert_eq!(snapshot[patch[0] * 3..patch[0] * 3 + 3], [210, 200, 190]);
}

#[test]
fn test_departed_object_reconverges_to_old_scene() {
    let (width, height) = (8, 4);
    let scene = [40, 40, 40];
    let original = uniform_frame(width, height, scene);
    let occluder = uniform_frame(width, height, [200, 200, 200]);

    for (learning_rate, occluded_frames) in [(0.3, 400), (0.9, 80)] {
        for strategy in [KernelStrategy::Scalar, KernelStrategy::Vectorized] {
            let mut engine = engine(width, height, 2, strategy, params(learning_rate));
            for _ in 0..5 {
                engine.process_frame(&original).unwrap();
            }
            for _ in 0..occluded_frames {
                engine.process_frame(&occluder).unwrap();
            }
            assert!(engine.mask().iter().all(|&m| m == 0), "occluder absorbed");

            for _ in 0..200 {
                engine.process_frame(&original).unwrap();
            }
            assert!(
                engine.mask().iter().all(|&m| m == 0),
                "{} at rate {} still flags the old scene",
                strategy,
                learning_rate
            );
            assert!(engine
                .background_snapshot()
                .chunks_exact(3)
                .all(|px| px == scene));
            for mixture in engine.mixtures() {
                assert!((mixture.weight_sum() - 1.0).abs() < 1e-4);
            }
        }
    }
}

#[test]
fn test_pixel_counts_not_divisible_by_workers_or_lanes() {
    for (width, height, workers) in [(7, 3, 4), (1, 1, 8), (5, 1, 3), (9, 7, 16)] {
        let frame = noisy_frame(width, height, [30, 60, 90], 5, u64::from(width));
        let mut engine = engine(width, height, workers, KernelStrategy::Vectorized, params(0.01));
        let mask = engine.process_frame(&frame).unwrap();
        assert_eq!(mask.len(), (width * height) as usize);
        assert!(mask.iter().all(|&m| m == 0));
        assert_eq!(engine.background_snapshot(), frame.as_slice());
        assert!(engine.deviation_snapshot().iter().all(|&d| d > 0.0));
    }
}

#[test]
fn test_wrong_frame_length_is_rejected_without_halting() {
    let mut engine = engine(4, 4, 2, KernelStrategy::Scalar, ModelParameters::default());
    let err = engine.process_frame(&[0; 47]).unwrap_err();
    assert!(matches!(err, BgModelError::DimensionMismatch(_)));
    assert!(!engine.is_halted());
    assert!(engine.process_frame(&[0; 48]).is_ok());
    assert_eq!(engine.frames_processed(), 1);
}

#[test]
fn test_reset_reseeds_from_next_frame() {
    let (width, height) = (6, 4);
    let mut engine = engine(width, height, 2, KernelStrategy::Scalar, params(0.01));
    engine
        .process_frame(&uniform_frame(width, height, [10, 10, 10]))
        .unwrap();

    engine.reset();
    assert_eq!(engine.frames_processed(), 0);
    let mask = engine
        .process_frame(&uniform_frame(width, height, [240, 240, 240]))
        .unwrap();
    assert!(mask.iter().all(|&m| m == 0));
    assert!(engine.background_snapshot().iter().all(|&b| b == 240));
}
