//! # evfft - Event-Driven Incremental 2D FFT
//!
//! This crate maintains the two-dimensional discrete Fourier transform of a
//! square binary frame under a stream of sparse pixel events, the kind of
//! input produced by event cameras and change detectors. Instead of paying
//! for a dense `O(N^2 log N)` transform after every pixel flip, the engine
//! keeps every intermediate sub-spectrum of the radix-2 recursion cached in
//! a tree and recomputes only the ancestors of the pixel that changed:
//!
//! - **Initialize**: one bottom-up pass builds the full tree from a frame
//!   (or from zero).
//! - **Point update**: `O(N log N)` work per event that changes a pixel,
//!   `O(log N)` for an event that does not.
//! - **Batch update**: events are partitioned by coordinate parity on the
//!   way down the tree, so ancestors shared by many events are rebuilt once.
//! - **Accessor**: the root of the tree *is* the current spectrum; reading
//!   it is a copy.
//!
//! The `reference` feature (on by default) adds a dense rustfft-backed
//! shadow transform for validating the incremental path.
//!
//! ## Example
//!
//! ```rust
//! use evfft::{EventFft, Stimulus};
//!
//! let mut engine: EventFft<16> = EventFft::new();
//! engine.initialize().unwrap();
//!
//! // A single pixel turning on at the origin spreads evenly over all bins.
//! let changed = engine.update(Stimulus::new(0, 0)).unwrap();
//! assert!(changed);
//!
//! let spectrum = engine.fft().unwrap();
//! assert_eq!(spectrum.side(), 16);
//! assert!((spectrum[(0, 0)].re - 1.0).abs() < 1e-5);
//! ```

pub mod engine;
pub mod stimulus;
pub mod types;

mod tree;
mod twiddle;

// Dense ground-truth transform (requires `reference` feature)
#[cfg(feature = "reference")]
mod reference;

// Re-export main types
pub use engine::EventFft;
pub use stimulus::{Stimuli, Stimulus};
pub use types::{Complex, ComplexMatrix, FftError, FftResult};
