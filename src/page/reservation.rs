use std::collections::BTreeSet;

use crate::model::SLOTS_PER_ROW;

/// Slots the automatic allocator must never choose.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationSet {
    pub nav_enabled: bool,
    pub next_slot: Option<u16>,
    pub prev_slot: Option<u16>,
    pub margin: u16,
    pub other: BTreeSet<u16>,
}

/// Where the travel items land on a page of a given capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavSlots {
    pub next: u16,
    pub prev: u16,
}

impl NavSlots {
    pub fn derive(
        capacity: u16,
        margin: u16,
        next_override: Option<u16>,
        prev_override: Option<u16>,
    ) -> Self {
        let last = capacity.saturating_sub(1);
        let last_row_first = last_row_start(capacity);
        Self {
            next: next_override.unwrap_or_else(|| last.saturating_sub(margin).max(last_row_first)),
            prev: prev_override.unwrap_or_else(|| (last_row_first + margin).min(last)),
        }
    }
}

fn last_row_start(capacity: u16) -> u16 {
    capacity.saturating_sub(SLOTS_PER_ROW)
}

impl ReservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve(&mut self, slot: u16) {
        self.other.insert(slot);
    }

    /// Reserved slots for a page of `capacity` slots.
    pub fn reserved_slots(&self, capacity: u16) -> BTreeSet<u16> {
        let mut reserved: BTreeSet<u16> = self
            .other
            .iter()
            .copied()
            .filter(|slot| *slot < capacity)
            .collect();

        if !self.nav_enabled || capacity == 0 {
            return reserved;
        }

        let slots = NavSlots::derive(capacity, self.margin, self.next_slot, self.prev_slot);
        let band = last_row_start(capacity)..capacity;
        if self.next_slot.is_none() || self.prev_slot.is_none() {
            reserved.extend(band);
        }
        for slot in [slots.next, slots.prev] {
            if slot < capacity {
                reserved.insert(slot);
            }
        }
        reserved
    }

    pub fn is_reserved(&self, slot: u16, capacity: u16) -> bool {
        self.reserved_slots(capacity).contains(&slot)
    }
}
