//! Synthetic frame helpers shared by the integration tests
#![allow(dead_code)]

use bgmodel::{BackgroundEngine, EngineConfig, KernelStrategy, ModelParameters, ParameterStore};

/// Packed frame where every pixel has the same colour
pub fn uniform_frame(width: u32, height: u32, colour: [u8; 3]) -> Vec<u8> {
    colour.repeat((width * height) as usize)
}

/// Uniform frame perturbed by deterministic noise in `[-amplitude, amplitude]`
pub fn noisy_frame(width: u32, height: u32, base: [u8; 3], amplitude: u8, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    let span = 2 * i32::from(amplitude) + 1;
    let mut frame = uniform_frame(width, height, base);
    for byte in &mut frame {
        // xorshift64
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let offset = (state % span as u64) as i32 - i32::from(amplitude);
        *byte = (i32::from(*byte) + offset).clamp(0, 255) as u8;
    }
    frame
}

/// Paint the rectangle `[x0, x1) × [y0, y1)` in `colour`
pub fn paint_rect(frame: &mut [u8], width: u32, (x0, y0): (u32, u32), (x1, y1): (u32, u32), colour: [u8; 3]) {
    for y in y0..y1 {
        for x in x0..x1 {
            let i = ((y * width + x) * 3) as usize;
            frame[i..i + 3].copy_from_slice(&colour);
        }
    }
}

/// Pixel indices inside the rectangle `[x0, x1) × [y0, y1)`
pub fn rect_indices(width: u32, (x0, y0): (u32, u32), (x1, y1): (u32, u32)) -> Vec<usize> {
    (y0..y1)
        .flat_map(|y| (x0..x1).map(move |x| (y * width + x) as usize))
        .collect()
}

pub fn params(learning_rate: f32) -> ModelParameters {
    ModelParameters::builder()
        .learning_rate(learning_rate)
        .build()
        .unwrap()
}

pub fn engine(
    width: u32,
    height: u32,
    workers: usize,
    strategy: KernelStrategy,
    params: ModelParameters,
) -> BackgroundEngine {
    let store = ParameterStore::new(params).unwrap();
    BackgroundEngine::new(width, height, store, EngineConfig::new(workers, strategy)).unwrap()
}

/// A short sequence with sensor noise and a square moving left to right
pub fn moving_square_sequence(width: u32, height: u32, frames: usize) -> Vec<Vec<u8>> {
    (0..frames)
        .map(|t| {
            let mut frame = noisy_frame(width, height, [40, 90, 140], 4, t as u64 + 1);
            let x0 = (t as u32 * 2) % (width - 4);
            paint_rect(&mut frame, width, (x0, 1), (x0 + 4, 5.min(height)), [220, 30, 30]);
            frame
        })
        .collect()
}
