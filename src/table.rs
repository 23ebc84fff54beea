//! ChainTable: the core engine — lookup, relocating insertion, removal,
//! and watermark-driven resizing over a SlotStore.

use crate::policy::{ElementPolicy, HasherPolicy};
use crate::reentrancy::DebugReentrancy;
use crate::store::{Link, SlotStore, MAX_SIZE_LOG};
use core::cmp::Ordering;
use core::hash::Hash;

/// Construction-time geometry and watermarks.
///
/// `high_watermark`/`low_watermark` are fractions of capacity; exceeding
/// the high mark on insert doubles the table, dropping below the low
/// mark on removal halves it (repeatedly) down to `min_size_log`.
#[derive(Copy, Clone, Debug)]
pub struct TableConfig {
    /// Initial `size_log`; capacity is `2^size_log`.
    pub size_log: u32,
    /// Lower bound on `size_log` for shrinking.
    pub min_size_log: u32,
    /// Grow threshold as a fraction of capacity.
    pub high_watermark: f64,
    /// Shrink threshold as a fraction of capacity.
    pub low_watermark: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            size_log: 4,
            min_size_log: 2,
            high_watermark: 0.75,
            low_watermark: 0.125,
        }
    }
}

impl TableConfig {
    fn validate(&self) {
        assert!(
            self.size_log <= MAX_SIZE_LOG && self.min_size_log <= self.size_log,
            "size_log must satisfy min_size_log <= size_log <= {}",
            MAX_SIZE_LOG
        );
        assert!(
            self.high_watermark > 0.0 && self.high_watermark < 1.0,
            "high_watermark must be a fraction in (0, 1)"
        );
        assert!(
            self.low_watermark >= 0.0 && self.low_watermark < self.high_watermark,
            "low_watermark must be below high_watermark"
        );
    }
}

#[derive(Debug)]
pub enum InsertError<E> {
    /// An equal element (per the policy comparator) is already present;
    /// the offered element is handed back untouched.
    Duplicate(E),
}

/// Open-addressing hash table with in-array collision chains.
///
/// Insertion relocates a displaced occupant of the new element's home
/// bucket, so every chain is rooted at the bucket its members hash to.
/// Removal splices chains in place; a removed chain head is replaced by
/// its successor so lookups that hash to the head slot keep working.
///
/// Structural helpers are associated functions over individual fields so
/// the reentrancy guard (held across whole operations) never aliases a
/// mutable borrow.
pub struct ChainTable<E, P: ElementPolicy<E>> {
    pub(crate) store: SlotStore<E>,
    pub(crate) policy: P,
    pub(crate) fill: usize,
    pub(crate) config: TableConfig,
    pub(crate) reentrancy: DebugReentrancy,
}

impl<E: Hash + Ord> ChainTable<E, HasherPolicy> {
    pub fn new() -> Self {
        Self::with_policy(HasherPolicy::new())
    }
}

impl<E: Hash + Ord> Default for ChainTable<E, HasherPolicy> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, P: ElementPolicy<E>> ChainTable<E, P> {
    pub fn with_policy(policy: P) -> Self {
        Self::with_config(policy, TableConfig::default())
    }

    pub fn with_config(policy: P, config: TableConfig) -> Self {
        config.validate();
        Self {
            store: SlotStore::new(config.size_log),
            policy,
            fill: 0,
            config,
            reentrancy: DebugReentrancy::new(),
        }
    }

    /// Count of occupied slots.
    pub fn len(&self) -> usize {
        self.fill
    }

    pub fn is_empty(&self) -> bool {
        self.fill == 0
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    pub fn size_log(&self) -> u32 {
        self.store.size_log()
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    #[inline]
    pub(crate) fn home_of(store: &SlotStore<E>, policy: &P, elem: &E) -> usize {
        (policy.hash(elem) & store.mask()) as usize
    }

    #[inline]
    pub(crate) fn home_of_slot(store: &SlotStore<E>, policy: &P, slot: usize) -> usize {
        Self::home_of(store, policy, store.elem(slot))
    }

    /// Find `probe`'s slot and its chain predecessor, walking the chain
    /// rooted at the probe's home bucket. A home bucket held by an
    /// element of another chain means the probe's chain does not exist.
    fn locate(&self, probe: &E) -> Option<(usize, Option<usize>)> {
        let (store, policy) = (&self.store, &self.policy);
        let home = Self::home_of(store, policy, probe);
        if !store.is_occupied(home) || Self::home_of_slot(store, policy, home) != home {
            return None;
        }
        let mut pred = None;
        let mut cur = home;
        loop {
            if policy.cmp(store.elem(cur), probe) == Ordering::Equal {
                return Some((cur, pred));
            }
            match store.link(cur).slot() {
                Some(next) => {
                    pred = Some(cur);
                    cur = next;
                }
                None => return None,
            }
        }
    }

    /// Look up an element equal to `probe` (per the policy comparator).
    pub fn get(&self, probe: &E) -> Option<&E> {
        let _g = self.reentrancy.enter();
        self.locate(probe).map(|(slot, _)| self.store.elem(slot))
    }

    pub fn contains(&self, probe: &E) -> bool {
        self.get(probe).is_some()
    }

    /// Insert `elem`, growing first if the high watermark would be
    /// exceeded. A duplicate (per the comparator) leaves the table
    /// unchanged and hands the offered element back.
    pub fn add(&mut self, elem: E) -> Result<(), InsertError<E>> {
        let _g = self.reentrancy.enter();
        if self.fill + 1 > Self::mark(self.store.capacity(), self.config.high_watermark) {
            Self::grow(&mut self.store, &self.policy, &self.config, self.fill);
        }
        match Self::insert_new(&mut self.store, &self.policy, elem) {
            None => {
                self.fill += 1;
                Ok(())
            }
            Some(rejected) => Err(InsertError::Duplicate(rejected)),
        }
    }

    /// Core insertion against a store, shared by `add` and resizing.
    /// Returns the element back when an equal one is already present.
    fn insert_new(store: &mut SlotStore<E>, policy: &P, elem: E) -> Option<E> {
        let mask = store.mask();
        let home = (policy.hash(&elem) & mask) as usize;

        if !store.is_occupied(home) {
            // Fresh chain.
            store.place(home, elem, Link::END);
            return None;
        }

        let occupant_home = (policy.hash(store.elem(home)) & mask) as usize;
        if occupant_home != home {
            // The occupant only squats here from another chain's free-slot
            // probe. Relocate it so the new element can root its chain at
            // its true home bucket.
            let mut pred = occupant_home;
            loop {
                match store.link(pred).slot() {
                    Some(next) if next == home => break,
                    Some(next) => pred = next,
                    None => unreachable!("displaced occupant unreachable from its home chain"),
                }
            }
            let free = store.probe_free_from(pred);
            let out_link = store.link(home);
            let moved = store.vacate(home);
            store.place(free, moved, out_link);
            store.set_link(pred, Link::to(free));
            store.place(home, elem, Link::END);
            return None;
        }

        // `home` legitimately heads the chain for this hash class: walk it
        // for a duplicate, then splice a probed free slot onto the tail.
        let mut cur = home;
        loop {
            if policy.cmp(store.elem(cur), &elem) == Ordering::Equal {
                return Some(elem);
            }
            match store.link(cur).slot() {
                Some(next) => cur = next,
                None => break,
            }
        }
        let free = store.probe_free_from(cur);
        store.place(free, elem, Link::END);
        store.set_link(cur, Link::to(free));
        None
    }

    /// Unlink and free `slot`, whose chain predecessor is `pred` (`None`
    /// for a chain head). A removed head with a successor has the
    /// successor promoted into the head slot, because lookups for the
    /// chain hash straight to that index.
    pub(crate) fn remove_at(store: &mut SlotStore<E>, slot: usize, pred: Option<usize>) -> E {
        match pred {
            Some(p) => {
                let next = store.link(slot);
                let removed = store.vacate(slot);
                store.set_link(p, next);
                removed
            }
            None => match store.link(slot).slot() {
                Some(succ) => {
                    let succ_link = store.link(succ);
                    let promoted = store.vacate(succ);
                    let removed = store.vacate(slot);
                    store.place(slot, promoted, succ_link);
                    removed
                }
                None => store.vacate(slot),
            },
        }
    }

    /// Remove the element equal to `probe`, retiring it through the
    /// policy. Reports whether anything was removed.
    pub fn remove(&mut self, probe: &E) -> bool {
        let _g = self.reentrancy.enter();
        let Some((slot, pred)) = self.locate(probe) else {
            return false;
        };
        let removed = Self::remove_at(&mut self.store, slot, pred);
        self.fill -= 1;
        self.policy.retire(removed);
        Self::shrink_if_sparse(&mut self.store, &self.policy, &self.config, self.fill);
        true
    }

    /// As `remove`, but hands the element back to the caller instead of
    /// retiring it through the policy.
    pub fn take(&mut self, probe: &E) -> Option<E> {
        let _g = self.reentrancy.enter();
        let (slot, pred) = self.locate(probe)?;
        let removed = Self::remove_at(&mut self.store, slot, pred);
        self.fill -= 1;
        Self::shrink_if_sparse(&mut self.store, &self.policy, &self.config, self.fill);
        Some(removed)
    }

    /// Resize on demand. The request is clamped so the current fill
    /// still fits under the high watermark and `min_size_log` is
    /// respected; an unchanged log is a no-op.
    pub fn resize(&mut self, new_size_log: u32) {
        let _g = self.reentrancy.enter();
        let mut target = new_size_log.clamp(self.config.min_size_log, MAX_SIZE_LOG);
        while self.fill + 1 > Self::mark(1usize << target, self.config.high_watermark) {
            target += 1;
            assert!(target <= MAX_SIZE_LOG, "table capacity overflow");
        }
        Self::resize_to(&mut self.store, &self.policy, self.fill, target);
    }

    /// Retire every element and return to the configured initial geometry.
    pub fn reset(&mut self) {
        let _g = self.reentrancy.enter();
        let mut old = core::mem::replace(&mut self.store, SlotStore::new(self.config.size_log));
        self.fill = 0;
        for slot in 0..old.capacity() {
            if old.is_occupied(slot) {
                self.policy.retire(old.vacate(slot));
            }
        }
    }

    #[inline]
    fn mark(capacity: usize, fraction: f64) -> usize {
        (capacity as f64 * fraction) as usize
    }

    fn grow(store: &mut SlotStore<E>, policy: &P, config: &TableConfig, fill: usize) {
        let mut target = store.size_log();
        while fill + 1 > Self::mark(1usize << target, config.high_watermark) {
            target += 1;
            assert!(target <= MAX_SIZE_LOG, "table capacity overflow");
        }
        Self::resize_to(store, policy, fill, target);
    }

    /// Halve repeatedly while the fill sits below the low watermark,
    /// bounded by `min_size_log` and by the target's high watermark.
    pub(crate) fn shrink_if_sparse(
        store: &mut SlotStore<E>,
        policy: &P,
        config: &TableConfig,
        fill: usize,
    ) {
        let mut target = store.size_log();
        while target > config.min_size_log
            && fill < Self::mark(1usize << target, config.low_watermark)
        {
            target -= 1;
        }
        while target < store.size_log()
            && fill + 1 > Self::mark(1usize << target, config.high_watermark)
        {
            target += 1;
        }
        Self::resize_to(store, policy, fill, target);
    }

    /// Rebuild storage at the new capacity by re-adding every element.
    /// The lock and reference count live in the wrapper and are
    /// untouched; only the slot/link arrays are replaced.
    fn resize_to(store: &mut SlotStore<E>, policy: &P, fill: usize, new_size_log: u32) {
        if new_size_log == store.size_log() {
            return;
        }
        assert!(
            fill < (1usize << new_size_log),
            "resize target cannot hold the current fill"
        );
        let mut old = core::mem::replace(store, SlotStore::new(new_size_log));
        for slot in 0..old.capacity() {
            if old.is_occupied(slot) {
                let elem = old.vacate(slot);
                if Self::insert_new(store, policy, elem).is_some() {
                    panic!("duplicate element surfaced during resize: table corrupted");
                }
            }
        }
    }

    /// Verify the structural invariants: fill below capacity, fill
    /// accounting exact, chains acyclic and rooted at their members'
    /// home bucket, and every occupied slot reachable from exactly one
    /// chain head. Intended for tests; panics on violation.
    pub fn check_invariants(&self) {
        let (store, policy) = (&self.store, &self.policy);
        let capacity = store.capacity();
        assert!(self.fill < capacity, "fill must stay below capacity");
        assert!(capacity.is_power_of_two());
        assert!(store.size_log() >= self.config.min_size_log);

        let mut visited = vec![false; capacity];
        let mut reachable = 0usize;
        for head in 0..capacity {
            if !store.is_occupied(head) || Self::home_of_slot(store, policy, head) != head {
                continue;
            }
            let mut cur = head;
            loop {
                assert!(store.is_occupied(cur), "chain passes through a free slot");
                assert!(!visited[cur], "chains must not share or revisit slots");
                assert_eq!(
                    Self::home_of_slot(store, policy, cur),
                    head,
                    "chain member homed elsewhere"
                );
                visited[cur] = true;
                reachable += 1;
                match store.link(cur).slot() {
                    Some(next) => cur = next,
                    None => break,
                }
            }
        }
        let occupied = (0..capacity).filter(|&i| store.is_occupied(i)).count();
        assert_eq!(occupied, self.fill, "fill accounting out of sync");
        assert_eq!(
            reachable, self.fill,
            "occupied slot not reachable from any chain head"
        );
    }
}

impl<E, P: ElementPolicy<E>> Drop for ChainTable<E, P> {
    fn drop(&mut self) {
        for slot in 0..self.store.capacity() {
            if self.store.is_occupied(slot) {
                let elem = self.store.vacate(slot);
                self.policy.retire(elem);
            }
        }
    }
}
