//! Entity handles and the slot table behind them.
//!
//! A handle is a slot number plus the slot's generation at the time the handle
//! was issued. Releasing a slot bumps its generation, which turns every handle
//! issued before the release into a stale one.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A generational entity handle.
///
/// Ordered by slot first, then generation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    slot: u32,
    generation: u32,
}

impl EntityId {
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// Position in the registry's record table.
    #[inline]
    pub fn index(self) -> u32 {
        self.slot
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }

    /// `(low, high)` for an unordered pair, so `(a, b)` and `(b, a)` share a key.
    pub fn sorted_pair(self, other: EntityId) -> (EntityId, EntityId) {
        (self.min(other), self.max(other))
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.slot, self.generation)
    }
}

// ---------------------------------------------------------------------------
// SlotTable
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Slot {
    Occupied { generation: u32 },
    Vacant { next_generation: u32 },
}

/// Issues [`EntityId`]s and takes their slots back.
///
/// Vacated slots queue up and are reissued oldest first, so a slot that was
/// just released is the last one handed out again.
#[derive(Debug, Default)]
pub struct SlotTable {
    slots: Vec<Slot>,
    vacant: VecDeque<u32>,
    occupied: usize,
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Occupy the oldest vacant slot, or append a new one.
    pub fn claim(&mut self) -> EntityId {
        self.occupied += 1;
        let Some(slot) = self.vacant.pop_front() else {
            let slot = self.slots.len() as u32;
            self.slots.push(Slot::Occupied { generation: 0 });
            return EntityId::new(slot, 0);
        };
        let entry = &mut self.slots[slot as usize];
        let generation = match *entry {
            Slot::Vacant { next_generation } => next_generation,
            Slot::Occupied { generation } => generation,
        };
        *entry = Slot::Occupied { generation };
        EntityId::new(slot, generation)
    }

    /// Vacate the slot `id` occupies. `false` for stale or unknown handles.
    pub fn release(&mut self, id: EntityId) -> bool {
        if !self.is_current(id) {
            return false;
        }
        self.slots[id.slot as usize] = Slot::Vacant {
            next_generation: id.generation.wrapping_add(1),
        };
        self.vacant.push_back(id.slot);
        self.occupied -= 1;
        true
    }

    /// `true` while `id` names the occupant of its slot.
    pub fn is_current(&self, id: EntityId) -> bool {
        matches!(
            self.slots.get(id.slot as usize),
            Some(Slot::Occupied { generation }) if *generation == id.generation
        )
    }

    pub fn occupied(&self) -> usize {
        self.occupied
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
