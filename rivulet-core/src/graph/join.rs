//! Join Rounds
//!
//! A zip node collects one value per parent before it fires. The buffer that
//! holds those values moves through a simple cycle:
//!
//! ```text
//!   Collecting (0 <= filled < width)
//!        | fill last empty slot
//!        v
//!   Ready (filled == width)  -- values taken, buffer cleared -->  Collecting
//! ```
//!
//! The values are taken out in the same call that fills the last slot, so by
//! the time the zip node forwards its result the buffer is already empty. A
//! delivery that re-enters the same zip while the result is being forwarded
//! starts a fresh round.

/// Why a value could not be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotError {
    /// The slot already holds a value for this round.
    Occupied { slot: usize },
    /// The buffer has no such slot.
    OutOfRange,
}

/// Fixed-width buffer holding one pending value per parent slot.
#[derive(Debug, Clone)]
pub(crate) struct JoinBuffer<T> {
    slots: Vec<Option<T>>,
    filled: usize,
}

impl<T> JoinBuffer<T> {
    /// Create an empty buffer with `width` slots.
    pub(crate) fn new(width: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(width).collect(),
            filled: 0,
        }
    }

    /// Number of slots currently holding a value.
    pub(crate) fn filled(&self) -> usize {
        self.filled
    }

    /// Whether `slot` currently holds a value.
    pub(crate) fn is_filled(&self, slot: usize) -> bool {
        self.slots.get(slot).map_or(false, Option::is_some)
    }

    /// Store `value` in `slot`.
    ///
    /// Returns `Ok(Some(values))` when this completes the round, with the
    /// values in slot order and the buffer already reset. Returns `Ok(None)`
    /// while the round is still collecting. A value arriving for a filled
    /// slot, or for a slot past the end, is rejected and the buffer is left
    /// untouched.
    pub(crate) fn fill(&mut self, slot: usize, value: T) -> Result<Option<Vec<T>>, SlotError> {
        let cell = self.slots.get_mut(slot).ok_or(SlotError::OutOfRange)?;
        if cell.is_some() {
            return Err(SlotError::Occupied { slot });
        }
        *cell = Some(value);
        self.filled += 1;

        if self.filled < self.slots.len() {
            return Ok(None);
        }

        let values = self.slots.iter_mut().filter_map(Option::take).collect();
        self.filled = 0;
        Ok(Some(values))
    }

    /// Drop any partially collected round.
    pub(crate) fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.filled = 0;
    }
}
