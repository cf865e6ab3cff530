//! Cache of search results keyed by position fingerprint

use crate::{LOSS_SCORE, MAX_SIZE, WIN_SCORE};

/// Scores beyond this magnitude are wins or losses found by the search
pub const DECISIVE_SCORE: i32 = WIN_SCORE - (MAX_SIZE * MAX_SIZE) as i32;

/// Number of slots in a table created with [`TranspositionTable::new`]
pub const DEFAULT_CAPACITY: usize = 1 << 18;

/// How a cached value relates to the true value of the position
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Bound {
    /// The search finished inside its window, the value is exact
    Exact,
    /// The search was cut off high, the true value is at least this
    Lower,
    /// No move reached the window, the true value is at most this
    Upper,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Entry {
    pub value: i32,
    pub bound: Bound,
    /// Remaining search depth below the position when the value was computed
    pub depth: u32,
}

#[derive(Copy, Clone)]
struct Slot {
    key: u64,
    entry: Entry,
}

/// A fixed size, always-replace transposition table
///
/// Slots are picked from the low bits of the fingerprint and keep the full key,
/// so positions that merely share a slot never answer for each other.
#[derive(Clone)]
pub struct TranspositionTable {
    slots: Vec<Option<Slot>>,
    mask: usize,
    len: usize,
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a table with at least `capacity` slots, rounded up to a power of two
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        Self {
            slots: vec![None; capacity],
            mask: capacity - 1,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        if self.len > 0 {
            self.slots.iter_mut().for_each(|slot| *slot = None);
            self.len = 0;
        }
    }

    pub fn store(&mut self, key: u64, entry: Entry) {
        let slot = &mut self.slots[key as usize & self.mask];
        if slot.is_none() {
            self.len += 1;
        }
        *slot = Some(Slot { key, entry });
    }

    /// Looks up `key`, ignoring entries searched less deeply than `depth`
    pub fn probe(&self, key: u64, depth: u32) -> Option<Entry> {
        match self.slots[key as usize & self.mask] {
            Some(slot) if slot.key == key && slot.entry.depth >= depth => Some(slot.entry),
            _ => None,
        }
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a score measured from the search root into one measured from the
/// node `ply` moves below it, so decisive scores stay valid wherever the
/// position is met again
pub fn score_to_table(value: i32, ply: u32) -> i32 {
    if value >= DECISIVE_SCORE {
        value + ply as i32
    } else if value <= -DECISIVE_SCORE {
        value - ply as i32
    } else {
        value
    }
}

/// Inverse of [`score_to_table`]
pub fn score_from_table(value: i32, ply: u32) -> i32 {
    if value >= DECISIVE_SCORE {
        value - ply as i32
    } else if value <= -DECISIVE_SCORE {
        value + ply as i32
    } else {
        value
    }
}

// decisive scores never leave the band between the bound and the extremes
static_assertions::const_assert!(LOSS_SCORE < -DECISIVE_SCORE);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shallow_entries_do_not_answer_deeper_probes() {
        let mut table = TranspositionTable::with_capacity(64);
        let entry = Entry {
            value: 7,
            bound: Bound::Exact,
            depth: 1,
        };
        table.store(0xdead_beef, entry);

        assert_eq!(table.probe(0xdead_beef, 0), Some(entry));
        assert_eq!(table.probe(0xdead_beef, 1), Some(entry));
        assert_eq!(table.probe(0xdead_beef, 2), None);
    }

    #[test]
    fn keys_sharing_a_slot_are_told_apart() {
        let mut table = TranspositionTable::with_capacity(16);
        let entry = Entry {
            value: -3,
            bound: Bound::Upper,
            depth: 4,
        };
        table.store(5, entry);
        assert_eq!(table.probe(5 + 16, 0), None);

        table.store(5 + 16, Entry { value: 9, ..entry });
        assert_eq!(table.probe(5, 0), None);
        assert_eq!(table.probe(5 + 16, 0).map(|e| e.value), Some(9));
        assert_eq!(table.len(), 1);

        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.probe(5 + 16, 0), None);
    }

    #[test]
    fn decisive_scores_are_rebased() {
        let win_at_ply_five = WIN_SCORE - 5;
        let stored = score_to_table(win_at_ply_five, 2);
        assert_eq!(stored, WIN_SCORE - 3);
        assert_eq!(score_from_table(stored, 4), WIN_SCORE - 7);
        assert_eq!(score_to_table(42, 9), 42);
        assert_eq!(score_from_table(score_to_table(LOSS_SCORE + 6, 3), 3), LOSS_SCORE + 6);
    }
}
