//! Stimulus model for pixel-level events
//!
//! A [`Stimulus`] is one pixel mutation: a coordinate pair plus the new
//! binary state of that pixel. This is the natural unit of output of an
//! event camera or change detector, and the unit of input of the
//! incremental FFT engine.
//!
//! [`Stimuli`] is an ordered batch of stimuli with bulk state mutators and a
//! [`filter`](Stimuli::filter) pass that collapses duplicate coordinates.
//!
//! ## Example
//!
//! ```rust
//! use evfft::{Stimuli, Stimulus};
//!
//! let mut events: Stimuli = vec![
//!     Stimulus::new(3, 4),
//!     Stimulus::with_state(3, 4, false),
//!     Stimulus::new(5, 6),
//! ]
//! .into();
//!
//! events.filter();
//! assert_eq!(events.len(), 2);
//! // The on event at (3, 4) wins over the later off event.
//! assert!(events[0].state);
//! ```

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut};

/// A single pixel event: `(row, col)` plus the pixel's new state.
///
/// Equality and hashing consider the coordinates only; two stimuli at the
/// same pixel compare equal regardless of state. This is what lets batches
/// be deduplicated by coordinate.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stimulus {
    /// Pixel row, in `[0, N)`.
    pub row: u32,
    /// Pixel column, in `[0, N)`.
    pub col: u32,
    /// New state of the pixel: `true` = on, `false` = off.
    pub state: bool,
}

impl Stimulus {
    /// An `on` stimulus at `(row, col)`.
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col, state: true }
    }

    /// A stimulus at `(row, col)` with an explicit state.
    pub fn with_state(row: u32, col: u32, state: bool) -> Self {
        Self { row, col, state }
    }

    /// Set the state to on.
    pub fn on(mut self) -> Self {
        self.state = true;
        self
    }

    /// Set the state to off.
    pub fn off(mut self) -> Self {
        self.state = false;
        self
    }

    /// Set the state explicitly.
    pub fn set(mut self, state: bool) -> Self {
        self.state = state;
        self
    }

    /// Flip the state.
    pub fn toggle(mut self) -> Self {
        self.state = !self.state;
        self
    }
}

impl Default for Stimulus {
    /// An `on` stimulus at the origin.
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl PartialEq for Stimulus {
    fn eq(&self, other: &Self) -> bool {
        self.row == other.row && self.col == other.col
    }
}

impl Eq for Stimulus {}

impl Hash for Stimulus {
    // Must stay coordinate-only to agree with PartialEq.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.row.hash(state);
        self.col.hash(state);
    }
}

impl fmt::Display for Stimulus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stimulus(row: {}, col: {}, state: {})",
            self.row,
            self.col,
            if self.state { "on" } else { "off" }
        )
    }
}

/// An ordered batch of stimuli.
///
/// Dereferences to a slice for reading and element mutation. Note that the
/// engine's batch update reorders and rewrites the contents it is given; see
/// [`EventFft::update_batch`](crate::EventFft::update_batch).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stimuli(Vec<Stimulus>);

impl Stimuli {
    /// An empty batch.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// An empty batch with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    /// Append a stimulus.
    pub fn push(&mut self, stimulus: Stimulus) {
        self.0.push(stimulus);
    }

    /// Mutable slice view, used by the in-place batch recursion.
    pub fn as_mut_slice(&mut self) -> &mut [Stimulus] {
        &mut self.0
    }

    /// Set every stimulus to on.
    pub fn on(&mut self) {
        self.set(true);
    }

    /// Set every stimulus to off.
    pub fn off(&mut self) {
        self.set(false);
    }

    /// Set every stimulus to the given state.
    pub fn set(&mut self, state: bool) {
        for stimulus in &mut self.0 {
            stimulus.state = state;
        }
    }

    /// Flip every stimulus.
    pub fn toggle(&mut self) {
        for stimulus in &mut self.0 {
            stimulus.state = !stimulus.state;
        }
    }

    /// Collapse the batch so every coordinate appears at most once.
    ///
    /// When a coordinate occurs several times, an `on` stimulus replaces an
    /// earlier `off` one; otherwise the first occurrence wins. Surviving
    /// entries keep the order of their first appearance.
    pub fn filter(&mut self) {
        let mut kept: Vec<Stimulus> = Vec::with_capacity(self.0.len());
        let mut index: HashMap<(u32, u32), usize> = HashMap::with_capacity(self.0.len());

        for &stimulus in &self.0 {
            match index.entry((stimulus.row, stimulus.col)) {
                Entry::Vacant(slot) => {
                    slot.insert(kept.len());
                    kept.push(stimulus);
                }
                Entry::Occupied(slot) => {
                    let chosen = &mut kept[*slot.get()];
                    if stimulus.state && !chosen.state {
                        *chosen = stimulus;
                    }
                }
            }
        }
        self.0 = kept;
    }
}

impl Deref for Stimuli {
    type Target = [Stimulus];

    fn deref(&self) -> &[Stimulus] {
        &self.0
    }
}

impl DerefMut for Stimuli {
    fn deref_mut(&mut self) -> &mut [Stimulus] {
        &mut self.0
    }
}

impl From<Vec<Stimulus>> for Stimuli {
    fn from(stimuli: Vec<Stimulus>) -> Self {
        Self(stimuli)
    }
}

impl FromIterator<Stimulus> for Stimuli {
    fn from_iter<I: IntoIterator<Item = Stimulus>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Stimulus> for Stimuli {
    fn extend<I: IntoIterator<Item = Stimulus>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Stimuli {
    type Item = Stimulus;
    type IntoIter = std::vec::IntoIter<Stimulus>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Stimuli {
    type Item = &'a Stimulus;
    type IntoIter = std::slice::Iter<'a, Stimulus>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a mut Stimuli {
    type Item = &'a mut Stimulus;
    type IntoIter = std::slice::IterMut<'a, Stimulus>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter_mut()
    }
}
