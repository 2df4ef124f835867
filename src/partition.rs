//! Splitting a frame into disjoint per-worker pixel ranges

use crate::error::Result;
use crate::kernel::{PixelSpan, LANES};
use crate::model::PixelMixture;
use std::ops::Range;

/// Pixel count every range except the last is aligned to, so no vectorized group straddles two workers
pub const GROUP_WIDTH: usize = LANES;

/// Fixed partition of `[0, total)` into one contiguous range per worker.
///
/// The first `workers - 1` ranges all have length `floor(total / workers)` rounded
/// down to a multiple of [`GROUP_WIDTH`]; the last range takes whatever is left,
/// so every pixel belongs to exactly one range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePartitioner {
    workers: usize,
}

impl FramePartitioner {
    /// Partitioner for `workers` ranges; 0 is treated as 1
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Exactly `workers` ranges covering `[0, total)`; leading ranges may be empty for tiny frames
    #[must_use]
    pub fn ranges(&self, total: usize) -> Vec<Range<usize>> {
        let stride = total / self.workers / GROUP_WIDTH * GROUP_WIDTH;
        (0..self.workers)
            .map(|i| {
                let start = i * stride;
                let end = if i + 1 == self.workers {
                    total
                } else {
                    start + stride
                };
                start..end
            })
            .collect()
    }

    /// Cut the frame buffers into one [`PixelSpan`] per range.
    ///
    /// The spans borrow disjoint sub-slices, so they can be handed to different
    /// threads without locking.
    ///
    /// # Errors
    ///
    /// Returns `BgModelError::DimensionMismatch` when the buffers disagree on the pixel count.
    pub fn split<'a>(
        &self,
        frame: &'a [u8],
        mixtures: &'a mut [PixelMixture],
        mask: &'a mut [u8],
        background: &'a mut [u8],
        deviation: &'a mut [f32],
    ) -> Result<Vec<PixelSpan<'a>>> {
        let total = mixtures.len();
        let mut rest = PixelSpan::new(0, frame, mixtures, mask, background, deviation)?;
        let mut spans = Vec::with_capacity(self.workers);
        for range in self.ranges(total) {
            let (head, tail) = rest.split_at(range.len());
            spans.push(head);
            rest = tail;
        }
        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_even_split() {
        let p = FramePartitioner::new(4);
        assert_eq!(p.ranges(64), vec![0..16, 16..32, 32..48, 48..64]);
    }

    #[test]
    fn test_remainder_goes_to_last_range() {
        let p = FramePartitioner::new(3);
        // 100 / 3 = 33, aligned down to 32
        assert_eq!(p.ranges(100), vec![0..32, 32..64, 64..100]);
    }

    #[test]
    fn test_tiny_frame_leaves_leading_ranges_empty() {
        let p = FramePartitioner::new(8);
        let ranges = p.ranges(10);
        assert_eq!(ranges.len(), 8);
        assert!(ranges[..7].iter().all(|r| r.is_empty()));
        assert_eq!(ranges[7], 0..10);
    }

    #[test]
    fn test_zero_workers_treated_as_one() {
        let p = FramePartitioner::new(0);
        assert_eq!(p.workers(), 1);
        assert_eq!(p.ranges(7), vec![0..7]);
    }

    #[test]
    fn test_split_offsets_follow_ranges() {
        let pixels = 13;
        let frame = vec![0u8; pixels * 3];
        let mut mixtures = vec![PixelMixture::default(); pixels];
        let mut mask = vec![0u8; pixels];
        let mut background = vec![0u8; pixels * 3];
        let mut deviation = vec![0f32; pixels];

        let p = FramePartitioner::new(2);
        let spans = p
            .split(
                &frame,
                &mut mixtures,
                &mut mask,
                &mut background,
                &mut deviation,
            )
            .unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].start, spans[0].len()), (0, 4));
        assert_eq!((spans[1].start, spans[1].len()), (4, 9));
        assert_eq!(spans[1].background.len(), 27);
    }

    #[test]
    fn test_split_rejects_mismatched_buffers() {
        let frame = vec![0u8; 5];
        let mut mixtures = vec![PixelMixture::default(); 2];
        let mut mask = vec![0u8; 2];
        let mut background = vec![0u8; 6];
        let mut deviation = vec![0f32; 2];
        assert!(FramePartitioner::new(2)
            .split(
                &frame,
                &mut mixtures,
                &mut mask,
                &mut background,
                &mut deviation
            )
            .is_err());
    }

    proptest! {
        #[test]
        fn prop_ranges_cover_every_pixel_once(total in 0usize..5000, workers in 1usize..64) {
            let ranges = FramePartitioner::new(workers).ranges(total);
            prop_assert_eq!(ranges.len(), workers);

            let mut next = 0;
            for (i, r) in ranges.iter().enumerate() {
                prop_assert_eq!(r.start, next);
                prop_assert!(r.end >= r.start);
                if i + 1 < workers {
                    prop_assert_eq!(r.len() % GROUP_WIDTH, 0);
                }
                next = r.end;
            }
            prop_assert_eq!(next, total);
        }
    }
}
