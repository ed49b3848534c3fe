//! Event-Driven Incremental 2D FFT Engine
//!
//! Maintains the two-dimensional DFT of an `N x N` binary frame under a
//! stream of pixel events. Instead of recomputing the dense transform after
//! every event, the engine keeps the whole radix-2 decimation-in-frequency
//! recursion tree resident and only replays the butterflies between the
//! touched leaf and the root:
//!
//! ```text
//! level L          [ N x N spectrum ]               <- root, read by fft()
//!                   /    |    |    \
//! level L-1      [ee]  [eo]  [oe]  [oo]             <- parity subgrids
//!                 ...   ...   ...   ...
//! level 0        [1x1] [1x1]  ...  [1x1]            <- one leaf per pixel
//! ```
//!
//! A point update touches one leaf and recomputes one node per level, so it
//! costs `O(N log N)` butterfly terms; an event that does not change its
//! pixel costs `O(log N)` and recomputes nothing. Batch updates partition
//! the events by coordinate parity on the way down and rebuild each shared
//! ancestor once.
//!
//! ## Example
//!
//! ```rust
//! use evfft::{EventFft, Stimuli, Stimulus};
//!
//! let mut engine: EventFft<32> = EventFft::new();
//! engine.initialize().unwrap();
//!
//! // Light up the main diagonal in one batch.
//! let mut batch: Stimuli = (0..8u32).map(|k| Stimulus::new(k, k)).collect();
//! assert!(engine.update_batch(&mut batch).unwrap());
//!
//! let spectrum = engine.fft().unwrap();
//! assert_eq!(spectrum.side(), 32);
//! ```

use crate::stimulus::{Stimuli, Stimulus};
use crate::tree::SpectrumTree;
use crate::twiddle::TwiddleTable;
use crate::types::{ComplexMatrix, FftError, FftResult};

#[cfg(feature = "reference")]
use crate::reference::DenseSpectrum;

/// Incremental 2D FFT over an `N x N` binary frame.
///
/// `N` is fixed at compile time and must be a power of two in `4..=1024`.
/// The engine owns a spectrum tree of `log2(N)+1` levels plus a precomputed
/// twiddle table; both are allocated by [`new`](Self::new) and populated by
/// [`initialize`](Self::initialize).
///
/// A single engine is not synchronized; drive it from one thread. Distinct
/// engines are fully independent.
#[derive(Debug, Clone)]
pub struct EventFft<const N: usize> {
    twiddle: TwiddleTable,
    tree: SpectrumTree,
    #[cfg(feature = "reference")]
    reference: Option<DenseSpectrum>,
}

impl<const N: usize> EventFft<N> {
    const LOG2_N: usize = N.trailing_zeros() as usize;

    /// Allocate an engine for an `N x N` frame.
    ///
    /// # Panics
    ///
    /// Panics if `N` is not a power of two in `4..=1024`. The frame size is
    /// a compile-time parameter, so this can only fire on a miswritten
    /// instantiation, never on runtime data.
    pub fn new() -> Self {
        assert!(
            N.is_power_of_two() && (4..=1024).contains(&N),
            "frame size must be a power of two in 4..=1024, got {N}"
        );
        Self {
            twiddle: TwiddleTable::new(N),
            tree: SpectrumTree::new(Self::LOG2_N + 1),
            #[cfg(feature = "reference")]
            reference: None,
        }
    }

    /// The frame side length `N`.
    pub const fn framesize(&self) -> usize {
        N
    }

    /// Build the spectrum tree for an all-zero frame.
    pub fn initialize(&mut self) -> FftResult<()> {
        self.initialize_with(&ComplexMatrix::zeros(N))
    }

    /// Build the spectrum tree for the given frame.
    ///
    /// One bottom-up pass computes and stores the spectrum of every parity
    /// subgrid. The image may be any complex matrix, but the incremental
    /// updates afterwards assume the pixels they touch hold 0 or 1.
    pub fn initialize_with(&mut self, image: &ComplexMatrix) -> FftResult<()> {
        if image.side() != N {
            return Err(FftError::SizeMismatch { expected: N, actual: image.side() });
        }
        if !self.tree.is_empty() {
            return Err(FftError::AlreadyInitialized);
        }
        self.build(image.clone(), 0);
        debug_assert_eq!(self.tree.level_len(0), N * N);
        Ok(())
    }

    /// Drop all engine state so [`initialize`](Self::initialize) can run
    /// again, as after construction.
    pub fn reset(&mut self) {
        self.tree.clear();
        #[cfg(feature = "reference")]
        {
            self.reference = None;
        }
    }

    /// Apply a single pixel event.
    ///
    /// Returns whether the event changed the stored frame (and therefore the
    /// spectrum). An event that re-asserts the pixel's current state is a
    /// no-op: it returns `false` and leaves every stored spectrum untouched.
    pub fn update(&mut self, stimulus: Stimulus) -> FftResult<bool> {
        self.ensure_ready()?;
        self.ensure_in_range(&stimulus)?;
        Ok(self.update_node(Self::LOG2_N, 0, stimulus))
    }

    /// Apply a batch of pixel events in one tree descent.
    ///
    /// The batch is partitioned by coordinate parity at each level, so an
    /// ancestor shared by many events is rebuilt once instead of once per
    /// event. When several events target the same pixel they collapse into a
    /// single value: `on` if any of them is `on`. This matches
    /// [`Stimuli::filter`], not last-write-wins sequential application.
    ///
    /// The caller's buffer is consumed: entries are reordered and their
    /// coordinates rewritten by the descent. Use
    /// [`update_batch_cloned`](Self::update_batch_cloned) to keep the batch.
    pub fn update_batch(&mut self, stimuli: &mut Stimuli) -> FftResult<bool> {
        self.ensure_ready()?;
        for stimulus in stimuli.iter() {
            self.ensure_in_range(stimulus)?;
        }
        if stimuli.is_empty() {
            return Ok(false);
        }
        Ok(self.update_span(Self::LOG2_N, 0, stimuli.as_mut_slice()))
    }

    /// [`update_batch`](Self::update_batch) on an internal copy, leaving the
    /// caller's batch intact.
    pub fn update_batch_cloned(&mut self, stimuli: &Stimuli) -> FftResult<bool> {
        let mut scratch = stimuli.clone();
        self.update_batch(&mut scratch)
    }

    /// A copy of the current full-frame spectrum.
    ///
    /// Element `(u, v)` equals `sum over (r, s) of frame(r, s) *
    /// exp(-2*pi*i*(u*r + v*s)/N)`: the forward transform with the DC term
    /// at `(0, 0)` and no fftshift.
    pub fn fft(&self) -> FftResult<ComplexMatrix> {
        self.ensure_ready()?;
        Ok(self.tree.root().clone())
    }

    /// Bottom-up build: store the spectra of all parity subgrids of `x`,
    /// then overwrite `x` with their butterfly merge and store it too.
    fn build(&mut self, x: ComplexMatrix, pos: usize) {
        let n = x.side();
        if n == 1 {
            debug_assert_eq!(self.tree.level_len(0), pos);
            self.tree.push(0, x);
            return;
        }
        let level = n.trailing_zeros() as usize;

        self.build(x.parity_subgrid(0, 0), 4 * pos);
        self.build(x.parity_subgrid(0, 1), 4 * pos + 1);
        self.build(x.parity_subgrid(1, 0), 4 * pos + 2);
        self.build(x.parity_subgrid(1, 1), 4 * pos + 3);

        let mut x = x;
        self.tree.combine_into(level, pos, &mut x, &self.twiddle);
        self.tree.push(level, x);
    }

    /// Point-update recursion on the node at `(level, pos)`.
    ///
    /// Descends into the child selected by the parity of the stimulus
    /// coordinates, halving the coordinates on the way. The ancestor is
    /// rebuilt only when the recursion reports an actual change; this early
    /// return is what keeps no-op events cheap.
    fn update_node(&mut self, level: usize, pos: usize, stimulus: Stimulus) -> bool {
        if level == 0 {
            return self.tree.set_leaf(pos, stimulus.state);
        }

        let child = (2 * (stimulus.row & 1) + (stimulus.col & 1)) as usize;
        let below = Stimulus {
            row: stimulus.row >> 1,
            col: stimulus.col >> 1,
            state: stimulus.state,
        };
        let changed = self.update_node(level - 1, 4 * pos + child, below);
        if changed {
            self.tree.rebuild(level, pos, &self.twiddle);
        }
        changed
    }

    /// Batch-update recursion on the node at `(level, pos)`.
    ///
    /// Partitions `span` in place into the four parity groups, halves every
    /// coordinate, recurses into the non-empty groups, and rebuilds this
    /// node if any of them changed. At a leaf the group collapses to a
    /// single value (`on` dominates).
    fn update_span(&mut self, level: usize, pos: usize, span: &mut [Stimulus]) -> bool {
        if level == 0 {
            let state = if span.len() == 1 {
                span[0].state
            } else {
                span.iter().any(|stimulus| stimulus.state)
            };
            return self.tree.set_leaf(pos, state);
        }

        // Group into odd-odd | odd-even | even-odd | even-even. Order within
        // a group is irrelevant; only membership drives the recursion.
        let odd_rows = partition_in_place(span, |s| s.row & 1 == 1);
        let odd_odd = partition_in_place(&mut span[..odd_rows], |s| s.col & 1 == 1);
        let even_odd = odd_rows + partition_in_place(&mut span[odd_rows..], |s| s.col & 1 == 1);

        // Subsequent levels see coordinates relative to their subgrid.
        for stimulus in span.iter_mut() {
            stimulus.row >>= 1;
            stimulus.col >>= 1;
        }

        let (group_oo, rest) = span.split_at_mut(odd_odd);
        let (group_oe, rest) = rest.split_at_mut(odd_rows - odd_odd);
        let (group_eo, group_ee) = rest.split_at_mut(even_odd - odd_rows);

        let mut changed = false;
        if !group_oo.is_empty() {
            changed |= self.update_span(level - 1, 4 * pos + 3, group_oo);
        }
        if !group_oe.is_empty() {
            changed |= self.update_span(level - 1, 4 * pos + 2, group_oe);
        }
        if !group_eo.is_empty() {
            changed |= self.update_span(level - 1, 4 * pos + 1, group_eo);
        }
        if !group_ee.is_empty() {
            changed |= self.update_span(level - 1, 4 * pos, group_ee);
        }

        if changed {
            self.tree.rebuild(level, pos, &self.twiddle);
        }
        changed
    }

    fn ensure_ready(&self) -> FftResult<()> {
        if self.tree.is_empty() {
            Err(FftError::NotInitialized)
        } else {
            Ok(())
        }
    }

    fn ensure_in_range(&self, stimulus: &Stimulus) -> FftResult<()> {
        if (stimulus.row as usize) < N && (stimulus.col as usize) < N {
            Ok(())
        } else {
            Err(FftError::StimulusOutOfRange {
                row: stimulus.row,
                col: stimulus.col,
                frame: N,
            })
        }
    }
}

impl<const N: usize> Default for EventFft<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "reference")]
impl<const N: usize> EventFft<N> {
    /// Build the dense shadow transform for an all-zero frame.
    pub fn initialize_reference(&mut self) -> FftResult<()> {
        self.initialize_reference_with(&ComplexMatrix::zeros(N))
    }

    /// Build the dense shadow transform for the given frame.
    ///
    /// The shadow path keeps its own input buffer and recomputes the full
    /// dense transform on every update; it exists to validate the
    /// incremental path, not to be fast. Re-initializing replaces the
    /// previous shadow state.
    pub fn initialize_reference_with(&mut self, image: &ComplexMatrix) -> FftResult<()> {
        if image.side() != N {
            return Err(FftError::SizeMismatch { expected: N, actual: image.side() });
        }
        let mut dense = DenseSpectrum::new(N);
        dense.load(image);
        dense.execute();
        self.reference = Some(dense);
        Ok(())
    }

    /// Write one event into the shadow input and recompute the dense
    /// transform.
    pub fn update_reference(&mut self, stimulus: Stimulus) -> FftResult<()> {
        self.ensure_in_range(&stimulus)?;
        let dense = self.reference.as_mut().ok_or(FftError::NotInitialized)?;
        dense.set(stimulus.row as usize, stimulus.col as usize, stimulus.state);
        dense.execute();
        Ok(())
    }

    /// Write a batch into the shadow input and recompute the dense
    /// transform once.
    ///
    /// Duplicates collapse with the same rule as
    /// [`update_batch`](Self::update_batch): once a coordinate has been
    /// written `on` by this batch, later `off` events for it are ignored.
    pub fn update_reference_batch(&mut self, stimuli: &Stimuli) -> FftResult<()> {
        for stimulus in stimuli.iter() {
            self.ensure_in_range(stimulus)?;
        }
        let dense = self.reference.as_mut().ok_or(FftError::NotInitialized)?;
        dense.apply(stimuli);
        dense.execute();
        Ok(())
    }

    /// The dense transform's current output, cast to single precision.
    pub fn reference_fft(&self) -> FftResult<ComplexMatrix> {
        Ok(self.reference.as_ref().ok_or(FftError::NotInitialized)?.spectrum())
    }

    /// Frobenius norm of `fft() - reference_fft()`.
    pub fn check(&self) -> FftResult<f64> {
        let incremental = self.fft()?;
        let dense = self.reference_fft()?;
        Ok(incremental.distance(&dense))
    }
}

/// Unstable in-place partition: reorders `span` so every element satisfying
/// `pred` precedes every element that does not, returning the split index.
fn partition_in_place<F>(span: &mut [Stimulus], pred: F) -> usize
where
    F: Fn(&Stimulus) -> bool,
{
    let mut lo = 0;
    let mut hi = span.len();
    while lo < hi {
        if pred(&span[lo]) {
            lo += 1;
        } else {
            hi -= 1;
            span.swap(lo, hi);
        }
    }
    lo
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Complex;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;
    use std::f64::consts::PI;

    /// Closed-form spectrum of a frame holding a single 1 at `(row, col)`:
    /// X(u, v) = exp(-2*pi*i*(u*row + v*col)/N).
    fn single_on_spectrum(n: usize, row: usize, col: usize) -> ComplexMatrix {
        ComplexMatrix::from_fn(n, |u, v| {
            let angle = -2.0 * PI * ((u * row + v * col) % n) as f64 / n as f64;
            Complex::new(angle.cos() as f32, angle.sin() as f32)
        })
    }

    /// O(N^4) direct transform, the oracle for small frames.
    fn naive_dft(image: &ComplexMatrix) -> ComplexMatrix {
        let n = image.side();
        ComplexMatrix::from_fn(n, |u, v| {
            let mut acc_re = 0.0_f64;
            let mut acc_im = 0.0_f64;
            for r in 0..n {
                for s in 0..n {
                    let angle = -2.0 * PI * ((u * r + v * s) % n) as f64 / n as f64;
                    let (sin, cos) = angle.sin_cos();
                    let x = image[(r, s)];
                    acc_re += x.re as f64 * cos - x.im as f64 * sin;
                    acc_im += x.re as f64 * sin + x.im as f64 * cos;
                }
            }
            Complex::new(acc_re as f32, acc_im as f32)
        })
    }

    #[test]
    fn test_framesize() {
        let engine: EventFft<64> = EventFft::new();
        assert_eq!(engine.framesize(), 64);
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut engine: EventFft<16> = EventFft::new();

        assert_eq!(engine.update(Stimulus::new(0, 0)), Err(FftError::NotInitialized));
        assert_eq!(engine.fft().unwrap_err(), FftError::NotInitialized);

        engine.initialize().unwrap();
        assert_eq!(engine.initialize(), Err(FftError::AlreadyInitialized));

        engine.reset();
        engine.initialize().unwrap();
        assert!(engine.update(Stimulus::new(1, 1)).unwrap());
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let mut engine: EventFft<16> = EventFft::new();
        let wrong = ComplexMatrix::zeros(8);
        assert_eq!(
            engine.initialize_with(&wrong),
            Err(FftError::SizeMismatch { expected: 16, actual: 8 })
        );
    }

    #[test]
    fn test_out_of_range_rejected_before_mutation() {
        let mut engine: EventFft<16> = EventFft::new();
        engine.initialize().unwrap();
        let clean = engine.fft().unwrap();

        assert_eq!(
            engine.update(Stimulus::new(16, 0)),
            Err(FftError::StimulusOutOfRange { row: 16, col: 0, frame: 16 })
        );

        let mut batch: Stimuli = vec![Stimulus::new(3, 3), Stimulus::new(2, 16)].into();
        assert!(engine.update_batch(&mut batch).is_err());

        // The valid half of the rejected batch must not have been applied.
        assert_eq!(engine.fft().unwrap(), clean);
    }

    #[test]
    fn test_single_on_at_origin_gives_flat_spectrum() {
        let mut engine: EventFft<16> = EventFft::new();
        engine.initialize().unwrap();
        assert!(engine.update(Stimulus::new(0, 0)).unwrap());

        let spectrum = engine.fft().unwrap();
        for u in 0..16 {
            for v in 0..16 {
                let x = spectrum[(u, v)];
                assert!(
                    (x.re - 1.0).abs() < 1e-5 && x.im.abs() < 1e-5,
                    "bin ({u}, {v}) should be 1+0i, got {x}"
                );
            }
        }
    }

    #[test]
    fn test_repeated_stimulus_reports_no_change() {
        let mut engine: EventFft<64> = EventFft::new();
        engine.initialize().unwrap();

        let stimulus = Stimulus::new(7, 9);
        assert!(engine.update(stimulus).unwrap());
        assert!(!engine.update(stimulus).unwrap());

        let spectrum = engine.fft().unwrap();
        let expected = single_on_spectrum(64, 7, 9);
        assert!(
            spectrum.distance(&expected) < 1e-3,
            "distance {}",
            spectrum.distance(&expected)
        );
    }

    #[test]
    fn test_noop_update_leaves_spectrum_bit_identical() {
        let mut engine: EventFft<16> = EventFft::new();
        engine.initialize().unwrap();
        engine.update(Stimulus::new(3, 5)).unwrap();

        let before = engine.fft().unwrap();
        assert!(!engine.update(Stimulus::new(3, 5)).unwrap());
        assert!(!engine.update(Stimulus::with_state(8, 8, false)).unwrap());
        assert_eq!(engine.fft().unwrap(), before);
    }

    #[test]
    fn test_toggle_round_trip_restores_spectrum() {
        let mut engine: EventFft<32> = EventFft::new();
        engine.initialize().unwrap();
        for (r, c) in [(1, 2), (17, 30), (9, 9)] {
            engine.update(Stimulus::new(r, c)).unwrap();
        }

        let before = engine.fft().unwrap();
        assert!(engine.update(Stimulus::new(5, 21)).unwrap());
        assert!(engine.update(Stimulus::with_state(5, 21, false)).unwrap());

        let after = engine.fft().unwrap();
        assert!(after.distance(&before) < 1e-4, "distance {}", after.distance(&before));
    }

    #[test]
    fn test_full_frame_concentrates_at_dc() {
        let mut engine: EventFft<32> = EventFft::new();
        engine.initialize().unwrap();

        let mut all_on: Stimuli = (0..32u32)
            .flat_map(|r| (0..32u32).map(move |c| Stimulus::new(r, c)))
            .collect();
        assert!(engine.update_batch(&mut all_on).unwrap());

        let spectrum = engine.fft().unwrap();
        assert!((spectrum[(0, 0)].re - 1024.0).abs() < 1e-2);
        assert!(spectrum[(0, 0)].im.abs() < 1e-2);
        for u in 0..32 {
            for v in 0..32 {
                if (u, v) != (0, 0) {
                    assert!(
                        spectrum[(u, v)].norm() < 1e-2,
                        "bin ({u}, {v}) should vanish, got {}",
                        spectrum[(u, v)]
                    );
                }
            }
        }
    }

    #[test]
    fn test_batch_matches_sequential_points_on_distinct_coords() {
        let mut rng = StdRng::seed_from_u64(42);

        // 25 stimuli at pairwise distinct coordinates, mixed states.
        let mut seen = HashSet::new();
        let mut events = Stimuli::with_capacity(25);
        while events.len() < 25 {
            let stimulus = Stimulus::with_state(
                rng.gen_range(0..64),
                rng.gen_range(0..64),
                rng.gen_bool(0.5),
            );
            if seen.insert((stimulus.row, stimulus.col)) {
                events.push(stimulus);
            }
        }

        let mut batched: EventFft<64> = EventFft::new();
        batched.initialize().unwrap();
        batched.update_batch_cloned(&events).unwrap();

        let mut sequential: EventFft<64> = EventFft::new();
        sequential.initialize().unwrap();
        for &stimulus in events.iter() {
            sequential.update(stimulus).unwrap();
        }

        let a = batched.fft().unwrap();
        let b = sequential.fft().unwrap();
        assert!(a.distance(&b) < 1e-1, "distance {}", a.distance(&b));
    }

    #[test]
    fn test_batch_collapses_same_pixel_with_on_dominating() {
        // off-then-on and on-then-off both leave the pixel on.
        for batch in [
            vec![Stimulus::with_state(2, 3, false), Stimulus::with_state(2, 3, true)],
            vec![
                Stimulus::with_state(2, 3, true),
                Stimulus::with_state(2, 3, false),
                Stimulus::with_state(2, 3, false),
            ],
        ] {
            let mut engine: EventFft<16> = EventFft::new();
            engine.initialize().unwrap();
            let mut batch: Stimuli = batch.into();
            assert!(engine.update_batch(&mut batch).unwrap());

            let spectrum = engine.fft().unwrap();
            let expected = single_on_spectrum(16, 2, 3);
            assert!(
                spectrum.distance(&expected) < 1e-3,
                "distance {}",
                spectrum.distance(&expected)
            );
        }
    }

    #[test]
    fn test_update_batch_cloned_preserves_caller_buffer() {
        let mut engine: EventFft<16> = EventFft::new();
        engine.initialize().unwrap();

        let events: Stimuli = vec![Stimulus::new(3, 4), Stimulus::new(9, 1)].into();
        let snapshot = events.clone();
        engine.update_batch_cloned(&events).unwrap();
        assert_eq!(events, snapshot);
        // Coordinates must not have been shifted.
        assert_eq!(events[0].row, 3);
        assert_eq!(events[1].col, 1);
    }

    #[test]
    fn test_empty_batch_is_a_noop() {
        let mut engine: EventFft<16> = EventFft::new();
        engine.initialize().unwrap();
        let before = engine.fft().unwrap();

        let mut empty = Stimuli::new();
        assert!(!engine.update_batch(&mut empty).unwrap());
        assert_eq!(engine.fft().unwrap(), before);
    }

    #[test]
    fn test_initialize_with_matches_naive_dft() {
        let mut rng = StdRng::seed_from_u64(7);
        let image = ComplexMatrix::from_fn(8, |_, _| {
            Complex::new(rng.gen_range(-1.0_f32..1.0), rng.gen_range(-1.0_f32..1.0))
        });

        let mut engine: EventFft<8> = EventFft::new();
        engine.initialize_with(&image).unwrap();

        let spectrum = engine.fft().unwrap();
        let expected = naive_dft(&image);
        assert!(
            spectrum.distance(&expected) < 1e-3,
            "distance {}",
            spectrum.distance(&expected)
        );
    }

    #[test]
    fn test_partition_in_place() {
        let mut span: Vec<Stimulus> = (0..10).map(|k| Stimulus::new(k, 0)).collect();
        let split = partition_in_place(&mut span, |s| s.row % 2 == 1);
        assert_eq!(split, 5);
        assert!(span[..split].iter().all(|s| s.row % 2 == 1));
        assert!(span[split..].iter().all(|s| s.row % 2 == 0));
    }
}
