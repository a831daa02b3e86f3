//! Slot-numbered breakpoint table.
//!
//! Slots run 1..=99 and the lowest free slot wins. Slots are independent:
//! several may hold the same address. The table outlives program reloads.

use fxhash::FxHashMap;

pub const SLOT_MAX: u8 = 99;

#[derive(Default, Debug)]
pub struct Breakpoints {
    slots: FxHashMap<u8, u16>,
}

impl Breakpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the lowest free slot for `addr`. `None` when all 99 slots are
    /// taken.
    pub fn set(&mut self, addr: u16) -> Option<u8> {
        let slot = (1..=SLOT_MAX).find(|slot| !self.slots.contains_key(slot))?;
        self.slots.insert(slot, addr);
        Some(slot)
    }

    /// Remove exactly one slot; returns its address if it was set.
    pub fn delete(&mut self, slot: u8) -> Option<u16> {
        self.slots.remove(&slot)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Lowest slot whose address matches `pr`.
    pub fn hit(&self, pr: u16) -> Option<u8> {
        self.iter()
            .find(|(_, addr)| *addr == pr)
            .map(|(slot, _)| slot)
    }

    /// Entries ordered by slot.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u16)> + '_ {
        let mut entries: Vec<(u8, u16)> = self.slots.iter().map(|(s, a)| (*s, *a)).collect();
        entries.sort_unstable();
        entries.into_iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lowest_free_slot_wins() {
        let mut breaks = Breakpoints::new();
        assert_eq!(breaks.set(0x10), Some(1));
        assert_eq!(breaks.set(0x20), Some(2));
        assert_eq!(breaks.set(0x30), Some(3));
        breaks.delete(2);
        assert_eq!(breaks.set(0x40), Some(2));
    }

    #[test]
    fn same_address_in_multiple_slots() {
        let mut breaks = Breakpoints::new();
        assert_eq!(breaks.set(0x10), Some(1));
        assert_eq!(breaks.set(0x10), Some(2));
        assert_eq!(breaks.hit(0x10), Some(1));
        breaks.delete(1);
        assert_eq!(breaks.hit(0x10), Some(2));
    }

    #[test]
    fn delete_is_exact_and_idempotent() {
        let mut breaks = Breakpoints::new();
        breaks.set(0x10);
        breaks.set(0x20);
        assert_eq!(breaks.delete(1), Some(0x10));
        assert_eq!(breaks.delete(1), None);
        breaks.clear();
        breaks.clear();
        assert!(breaks.is_empty());
    }

    #[test]
    fn table_fills_at_99() {
        let mut breaks = Breakpoints::new();
        for i in 0..99u16 {
            assert!(breaks.set(i).is_some());
        }
        assert_eq!(breaks.set(0x1234), None);
    }

    #[test]
    fn miss_returns_none() {
        let mut breaks = Breakpoints::new();
        breaks.set(0x10);
        assert_eq!(breaks.hit(0x11), None);
    }
}
