//! Precomputed roots of unity
//!
//! Every butterfly reads three twiddle factors, and a point update replays a
//! butterfly per tree level. Precomputing the full table at construction
//! hoists all trigonometry out of the update path.

use crate::types::Complex;
use std::f64::consts::PI;

/// Flat table of `W_n^k = exp(-2*pi*i * k/n)` for `k` in `[0, N)` and
/// `n` in `[0, N]`, laid out at index `k + N*n`.
///
/// The `n = 0` row is never addressed by any butterfly (a transform of order
/// zero does not exist) and is left at zero rather than materialized through
/// a division by zero.
#[derive(Debug, Clone)]
pub(crate) struct TwiddleTable {
    frame_size: usize,
    factors: Vec<Complex>,
}

impl TwiddleTable {
    pub(crate) fn new(frame_size: usize) -> Self {
        let mut factors = vec![Complex::new(0.0, 0.0); frame_size * (frame_size + 1)];
        for order in 1..=frame_size {
            for k in 0..frame_size {
                let angle = -2.0 * PI * k as f64 / order as f64;
                factors[k + frame_size * order] = Complex::new(angle.cos() as f32, angle.sin() as f32);
            }
        }
        Self { frame_size, factors }
    }

    /// `W_order^k`. `order` must be in `[1, N]` and `k` in `[0, N)`.
    #[inline]
    pub(crate) fn w(&self, k: usize, order: usize) -> Complex {
        self.factors[k + self.frame_size * order]
    }
}
