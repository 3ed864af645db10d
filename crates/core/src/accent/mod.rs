use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::MAX_SIGNATURE;

/// Set of accented beats, stored as one bit per beat index.
///
/// Indices are 1-based and bounded by [`MAX_SIGNATURE`]; anything outside
/// `1..=MAX_SIGNATURE` is ignored by every accessor. Entries above the
/// current signature are kept, so shrinking and then growing the measure
/// brings earlier accents back.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<u32>", into = "Vec<u32>")]
pub struct AccentMap {
    bits: u32,
}

impl Default for AccentMap {
    /// Only the downbeat is accented.
    fn default() -> Self {
        Self::from_beats([1])
    }
}

impl AccentMap {
    pub fn empty() -> Self {
        Self { bits: 0 }
    }

    pub fn from_beats(beats: impl IntoIterator<Item = u32>) -> Self {
        let mut map = Self::empty();
        for beat in beats {
            map.set(beat, true);
        }
        map
    }

    fn mask(beat: u32) -> Option<u32> {
        (1..=MAX_SIGNATURE)
            .contains(&beat)
            .then(|| 1u32 << (beat - 1))
    }

    pub fn is_accented(&self, beat: u32) -> bool {
        Self::mask(beat).is_some_and(|mask| self.bits & mask != 0)
    }

    /// Sets the accent flag for `beat`. Returns `false` when the index is out
    /// of range and nothing changed.
    pub fn set(&mut self, beat: u32, accented: bool) -> bool {
        let Some(mask) = Self::mask(beat) else {
            return false;
        };
        if accented {
            self.bits |= mask;
        } else {
            self.bits &= !mask;
        }
        true
    }

    /// Flips the accent flag and returns the new value.
    pub fn toggle(&mut self, beat: u32) -> Option<bool> {
        let mask = Self::mask(beat)?;
        self.bits ^= mask;
        Some(self.bits & mask != 0)
    }

    /// Accented beats in ascending order, across the whole capacity.
    pub fn beats(&self) -> impl Iterator<Item = u32> {
        let map = *self;
        (1..=MAX_SIGNATURE).filter(move |beat| map.is_accented(*beat))
    }

    /// Accented beats that fall inside a measure of `beats_per_measure`.
    pub fn beats_within(&self, beats_per_measure: u32) -> impl Iterator<Item = u32> {
        self.beats().take_while(move |beat| *beat <= beats_per_measure)
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl From<Vec<u32>> for AccentMap {
    fn from(value: Vec<u32>) -> Self {
        Self::from_beats(value)
    }
}

impl From<AccentMap> for Vec<u32> {
    fn from(value: AccentMap) -> Self {
        value.beats().collect()
    }
}

impl fmt::Debug for AccentMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.beats()).finish()
    }
}
