//! Dense shadow transform
//!
//! Ground-truth path for the incremental engine: a mirror of the frame kept
//! as a plain input buffer, transformed from scratch with a dense 2D FFT on
//! every update. The 2D transform is a length-N pass over every row followed
//! by a length-N pass over every column, both through one shared rustfft
//! plan.
//!
//! The shadow path runs in double precision and casts to single precision
//! only when read, so comparison error is dominated by the incremental
//! path under test.

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::stimulus::Stimulus;
use crate::types::{Complex, ComplexMatrix};

pub(crate) struct DenseSpectrum {
    size: usize,
    fft: Arc<dyn Fft<f64>>,
    /// Frame mirror, row-major.
    input: Vec<Complex64>,
    /// Dense transform of `input`, row-major.
    output: Vec<Complex64>,
    scratch: Vec<Complex64>,
    column: Vec<Complex64>,
}

impl fmt::Debug for DenseSpectrum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DenseSpectrum").field("size", &self.size).finish()
    }
}

impl Clone for DenseSpectrum {
    fn clone(&self) -> Self {
        Self {
            size: self.size,
            fft: Arc::clone(&self.fft),
            input: self.input.clone(),
            output: self.output.clone(),
            scratch: self.scratch.clone(),
            column: self.column.clone(),
        }
    }
}

impl DenseSpectrum {
    pub(crate) fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex64::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self {
            size,
            fft,
            input: vec![Complex64::new(0.0, 0.0); size * size],
            output: vec![Complex64::new(0.0, 0.0); size * size],
            scratch,
            column: vec![Complex64::new(0.0, 0.0); size],
        }
    }

    /// Replace the frame mirror with `image`.
    pub(crate) fn load(&mut self, image: &ComplexMatrix) {
        debug_assert_eq!(image.side(), self.size);
        for row in 0..self.size {
            for col in 0..self.size {
                let x = image[(row, col)];
                self.input[row * self.size + col] = Complex64::new(x.re as f64, x.im as f64);
            }
        }
    }

    /// Write one pixel of the frame mirror.
    pub(crate) fn set(&mut self, row: usize, col: usize, state: bool) {
        let value = if state { 1.0 } else { 0.0 };
        self.input[row * self.size + col] = Complex64::new(value, 0.0);
    }

    /// Write a batch of events into the frame mirror.
    ///
    /// Once a coordinate has been written `on` by this batch, later `off`
    /// events for the same coordinate are ignored, matching the leaf
    /// collapse of the incremental batch update.
    pub(crate) fn apply(&mut self, batch: &[Stimulus]) {
        let mut activated: HashSet<(u32, u32)> = HashSet::new();
        for stimulus in batch {
            if stimulus.state {
                activated.insert((stimulus.row, stimulus.col));
            } else if activated.contains(&(stimulus.row, stimulus.col)) {
                continue;
            }
            self.set(stimulus.row as usize, stimulus.col as usize, stimulus.state);
        }
    }

    /// Recompute the dense transform of the current frame mirror.
    pub(crate) fn execute(&mut self) {
        let n = self.size;
        self.output.copy_from_slice(&self.input);

        for row in 0..n {
            self.fft
                .process_with_scratch(&mut self.output[row * n..(row + 1) * n], &mut self.scratch);
        }

        for col in 0..n {
            for row in 0..n {
                self.column[row] = self.output[row * n + col];
            }
            self.fft.process_with_scratch(&mut self.column, &mut self.scratch);
            for row in 0..n {
                self.output[row * n + col] = self.column[row];
            }
        }
    }

    /// The current dense transform, cast to single precision.
    pub(crate) fn spectrum(&self) -> ComplexMatrix {
        ComplexMatrix::from_fn(self.size, |row, col| {
            let x = self.output[row * self.size + col];
            Complex::new(x.re as f32, x.im as f32)
        })
    }
}
