//! Core types for the incremental FFT engine
//!
//! Defines the complex scalar used for all spectrum storage, a small square
//! complex matrix, and the error type shared by every public operation.
//!
//! Spectra are stored in single precision: the engine holds log2(N)+1 full
//! copies of the frame at different resolutions, so halving the scalar width
//! halves the resident footprint of the whole tree.

use num_complex::Complex32;
use std::ops::{Index, IndexMut};

/// Complex scalar used for all stored spectra.
pub type Complex = Complex32;

/// Result type for engine operations.
pub type FftResult<T> = Result<T, FftError>;

/// Errors reported by the engine's public operations.
///
/// All of these indicate caller mistakes; none of them can occur once the
/// engine is driven correctly, and none leave the engine in a partially
/// mutated state (arguments are validated before any spectrum is touched).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FftError {
    #[error("frame size mismatch: expected {expected}x{expected}, got {actual}x{actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("stimulus out of range: ({row}, {col}) outside a {frame}x{frame} frame")]
    StimulusOutOfRange { row: u32, col: u32, frame: usize },

    #[error("engine not initialized")]
    NotInitialized,

    #[error("engine already initialized; call reset() first")]
    AlreadyInitialized,
}

/// Square matrix of complex samples, stored row-major.
///
/// This is the unit of storage for every node of the spectrum tree: a 1x1
/// matrix at the leaves, up to the full NxN spectrum at the root. Indexing is
/// `(row, col)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexMatrix {
    side: usize,
    data: Vec<Complex>,
}

impl ComplexMatrix {
    /// All-zero matrix of the given side.
    pub fn zeros(side: usize) -> Self {
        Self {
            side,
            data: vec![Complex::new(0.0, 0.0); side * side],
        }
    }

    /// Build a matrix by evaluating `f(row, col)` for every entry.
    pub fn from_fn(side: usize, mut f: impl FnMut(usize, usize) -> Complex) -> Self {
        let mut data = Vec::with_capacity(side * side);
        for row in 0..side {
            for col in 0..side {
                data.push(f(row, col));
            }
        }
        Self { side, data }
    }

    /// Side length of the matrix.
    pub fn side(&self) -> usize {
        self.side
    }

    /// Row-major view of the entries.
    pub fn as_slice(&self) -> &[Complex] {
        &self.data
    }

    /// Extract the subgrid taken with stride 2 from the given parity origin.
    ///
    /// `(0, 0)` yields the even-row/even-col entries, `(0, 1)` the
    /// even-row/odd-col entries, and so on. The result has half the side.
    pub(crate) fn parity_subgrid(&self, row_origin: usize, col_origin: usize) -> Self {
        debug_assert!(row_origin < 2 && col_origin < 2);
        let half = self.side / 2;
        Self::from_fn(half, |row, col| self[(2 * row + row_origin, 2 * col + col_origin)])
    }

    /// Frobenius norm of the element-wise difference with `other`.
    ///
    /// Accumulated in double precision so the result stays meaningful even
    /// when the entries themselves are large single-precision values.
    pub fn distance(&self, other: &Self) -> f64 {
        debug_assert_eq!(self.side, other.side);
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| {
                let dr = (a.re - b.re) as f64;
                let di = (a.im - b.im) as f64;
                dr * dr + di * di
            })
            .sum::<f64>()
            .sqrt()
    }
}

impl Index<(usize, usize)> for ComplexMatrix {
    type Output = Complex;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &Complex {
        &self.data[row * self.side + col]
    }
}

impl IndexMut<(usize, usize)> for ComplexMatrix {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Complex {
        &mut self.data[row * self.side + col]
    }
}
