//! Spectrum tree store
//!
//! The engine keeps the radix-2 decimation-in-frequency recursion *persistent*:
//! every intermediate sub-spectrum of the recursion is cached, so a point
//! update only has to recompute the nodes between one leaf and the root.
//!
//! Level `l` holds the 2D spectra of all `2^l x 2^l` parity subgrids of the
//! frame, as a flat sequence of matrices. The four children of the level-`l+1`
//! node at position `q` sit at level-`l` positions `4q .. 4q+3`, ordered
//! (even-row/even-col, even-row/odd-col, odd-row/even-col, odd-row/odd-col).
//! Navigation is pure index arithmetic; no node owns pointers to another.

use crate::twiddle::TwiddleTable;
use crate::types::ComplexMatrix;

#[derive(Debug, Clone)]
pub(crate) struct SpectrumTree {
    /// `levels[l]` holds `4^(L-l)` matrices of side `2^l` once built.
    levels: Vec<Vec<ComplexMatrix>>,
}

impl SpectrumTree {
    /// An empty tree with `depth` levels (`depth = log2(N) + 1`).
    pub(crate) fn new(depth: usize) -> Self {
        let levels = (0..depth)
            .map(|level| Vec::with_capacity(1 << (2 * (depth - 1 - level))))
            .collect();
        Self { levels }
    }

    /// True until the root spectrum has been built.
    ///
    /// The root is the last matrix appended by the bottom-up build, so its
    /// presence doubles as the "initialized" flag.
    pub(crate) fn is_empty(&self) -> bool {
        self.levels.last().map_or(true, Vec::is_empty)
    }

    /// Drop every stored spectrum, returning the tree to its empty state.
    pub(crate) fn clear(&mut self) {
        for level in &mut self.levels {
            level.clear();
        }
    }

    pub(crate) fn level_len(&self, level: usize) -> usize {
        self.levels[level].len()
    }

    /// Append a spectrum at the end of `level`. The bottom-up build visits
    /// positions strictly left to right, so appending lands each matrix at
    /// its home position.
    pub(crate) fn push(&mut self, level: usize, spectrum: ComplexMatrix) {
        self.levels[level].push(spectrum);
    }

    /// The full-frame spectrum.
    pub(crate) fn root(&self) -> &ComplexMatrix {
        &self.levels[self.levels.len() - 1][0]
    }

    /// Overwrite the leaf at `pos` with a binary sample.
    ///
    /// Returns whether the stored value actually changed; the update
    /// recursions use this to skip every ancestor of an unchanged leaf.
    pub(crate) fn set_leaf(&mut self, pos: usize, state: bool) -> bool {
        let leaf = &mut self.levels[0][pos];
        let next = if state { 1.0 } else { 0.0 };
        let prev = leaf[(0, 0)].re;
        leaf[(0, 0)] = crate::types::Complex::new(next, 0.0);
        prev != next
    }

    /// Combine the four children of `(level, pos)` into `parent`, which is
    /// not yet stored in the tree. Used by the bottom-up build.
    pub(crate) fn combine_into(
        &self,
        level: usize,
        pos: usize,
        parent: &mut ComplexMatrix,
        twiddle: &TwiddleTable,
    ) {
        let children = &self.levels[level - 1][4 * pos..4 * pos + 4];
        butterfly(parent, &children[0], &children[1], &children[2], &children[3], twiddle);
    }

    /// Recompute the stored spectrum at `(level, pos)` from its children.
    pub(crate) fn rebuild(&mut self, level: usize, pos: usize, twiddle: &TwiddleTable) {
        let (lower, upper) = self.levels.split_at_mut(level);
        let children = &lower[level - 1][4 * pos..4 * pos + 4];
        let parent = &mut upper[0][pos];
        butterfly(parent, &children[0], &children[1], &children[2], &children[3], twiddle);
    }
}

/// Radix-2 decimation-in-frequency merge of four half-size sub-spectra.
///
/// With `n` the parent side and `h = n/2`, every output quadrant entry is a
/// four-term combination of one entry from each child, weighted by twiddles
/// of order `n`:
///
/// ```text
/// tu = W(j)  * x01[i,j]        a = x00[i,j] + tu    X[i,   j  ] = a + c
/// ts = W(i)  * x10[i,j]        b = x00[i,j] - tu    X[i,   j+h] = b + d
/// td = W(i+j)* x11[i,j]        c = ts + td          X[i+h, j  ] = a - c
///                              d = ts - td          X[i+h, j+h] = b - d
/// ```
fn butterfly(
    x: &mut ComplexMatrix,
    x00: &ComplexMatrix,
    x01: &ComplexMatrix,
    x10: &ComplexMatrix,
    x11: &ComplexMatrix,
    twiddle: &TwiddleTable,
) {
    let n = x.side();
    let h = n / 2;
    debug_assert_eq!(x00.side(), h);

    for i in 0..h {
        for j in 0..h {
            let tu = twiddle.w(j, n) * x01[(i, j)];
            let ts = twiddle.w(i, n) * x10[(i, j)];
            let td = twiddle.w(i + j, n) * x11[(i, j)];

            let a = x00[(i, j)] + tu;
            let b = x00[(i, j)] - tu;
            let c = ts + td;
            let d = ts - td;

            x[(i, j)] = a + c;
            x[(i, j + h)] = b + d;
            x[(i + h, j)] = a - c;
            x[(i + h, j + h)] = b - d;
        }
    }
}
