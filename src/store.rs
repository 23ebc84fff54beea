//! SlotStore: flat element storage plus the parallel link array.
//!
//! A slot is occupied iff its link is not `FREE`. An occupied slot's
//! link is either `END` (chain terminator) or the index of the next
//! element in the same collision chain. Links are 32-bit indices with
//! two reserved sentinels, which caps capacity at `2^31` slots and keeps
//! the whole chain structure free of per-node allocation.

/// Upper bound on `size_log`; leaves room for the two link sentinels.
pub(crate) const MAX_SIZE_LOG: u32 = 31;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Link(u32);

impl Link {
    pub(crate) const FREE: Link = Link(u32::MAX);
    pub(crate) const END: Link = Link(u32::MAX - 1);

    #[inline]
    pub(crate) fn to(slot: usize) -> Link {
        debug_assert!(slot < (1usize << MAX_SIZE_LOG));
        Link(slot as u32)
    }

    /// The next slot in the chain, or `None` for `FREE`/`END`.
    #[inline]
    pub(crate) fn slot(self) -> Option<usize> {
        if self == Link::FREE || self == Link::END {
            None
        } else {
            Some(self.0 as usize)
        }
    }
}

pub(crate) struct SlotStore<E> {
    slots: Vec<Option<E>>,
    links: Vec<Link>,
    size_log: u32,
}

impl<E> SlotStore<E> {
    pub(crate) fn new(size_log: u32) -> Self {
        assert!(
            size_log <= MAX_SIZE_LOG,
            "table capacity limited to 2^{} slots",
            MAX_SIZE_LOG
        );
        let capacity = 1usize << size_log;
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            links: vec![Link::FREE; capacity],
            size_log,
        }
    }

    #[inline]
    pub(crate) fn size_log(&self) -> u32 {
        self.size_log
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        1usize << self.size_log
    }

    #[inline]
    pub(crate) fn mask(&self) -> u32 {
        (self.capacity() - 1) as u32
    }

    #[inline]
    pub(crate) fn is_occupied(&self, slot: usize) -> bool {
        self.links[slot] != Link::FREE
    }

    #[inline]
    pub(crate) fn link(&self, slot: usize) -> Link {
        self.links[slot]
    }

    #[inline]
    pub(crate) fn set_link(&mut self, slot: usize, link: Link) {
        debug_assert!(self.is_occupied(slot), "only occupied slots carry chain links");
        self.links[slot] = link;
    }

    #[inline]
    pub(crate) fn elem(&self, slot: usize) -> &E {
        self.slots[slot].as_ref().expect("occupied slot holds an element")
    }

    #[inline]
    pub(crate) fn elem_mut(&mut self, slot: usize) -> &mut E {
        self.slots[slot].as_mut().expect("occupied slot holds an element")
    }

    /// Occupy a free slot with `elem` and the given outgoing link.
    pub(crate) fn place(&mut self, slot: usize, elem: E, link: Link) {
        debug_assert!(!self.is_occupied(slot), "placing into an occupied slot");
        debug_assert!(link != Link::FREE);
        self.slots[slot] = Some(elem);
        self.links[slot] = link;
    }

    /// Free a slot and return its element. The caller is responsible for
    /// any chain splicing around it.
    pub(crate) fn vacate(&mut self, slot: usize) -> E {
        debug_assert!(self.is_occupied(slot), "vacating a free slot");
        self.links[slot] = Link::FREE;
        self.slots[slot].take().expect("occupied slot holds an element")
    }

    /// Linear probe (wrapping) for the first free slot after `start`.
    /// Requires at least one free slot, which `fill < capacity`
    /// guarantees between public calls.
    pub(crate) fn probe_free_from(&self, start: usize) -> usize {
        let mask = self.mask() as usize;
        let mut slot = start;
        loop {
            slot = (slot + 1) & mask;
            if !self.is_occupied(slot) {
                return slot;
            }
            assert!(slot != start, "no free slot: fill invariant violated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: sentinels never alias a valid slot index and `slot()`
    /// decodes only real indices.
    #[test]
    fn link_sentinels_are_distinct() {
        assert_ne!(Link::FREE, Link::END);
        assert_eq!(Link::FREE.slot(), None);
        assert_eq!(Link::END.slot(), None);
        assert_eq!(Link::to(5).slot(), Some(5));
    }

    /// Invariant: place/vacate toggle occupancy and round-trip the element.
    #[test]
    fn place_and_vacate_round_trip() {
        let mut s: SlotStore<String> = SlotStore::new(3);
        assert_eq!(s.capacity(), 8);
        assert!(!s.is_occupied(2));
        s.place(2, "x".to_string(), Link::END);
        assert!(s.is_occupied(2));
        assert_eq!(s.elem(2), "x");
        assert_eq!(s.vacate(2), "x");
        assert!(!s.is_occupied(2));
    }

    /// Invariant: probing wraps around the array and skips occupied slots.
    #[test]
    fn probe_wraps_and_skips_occupied() {
        let mut s: SlotStore<u32> = SlotStore::new(2);
        s.place(3, 30, Link::END);
        s.place(0, 0, Link::END);
        // Probing from the last slot wraps past 0 to the free slot 1.
        assert_eq!(s.probe_free_from(3), 1);
        assert_eq!(s.probe_free_from(0), 1);
        assert_eq!(s.probe_free_from(1), 2);
    }
}
