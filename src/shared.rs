//! SharedChainTable: shared ownership plus exclusive locking around the
//! core engine.
//!
//! The two mechanisms are independent: the reference count (`Arc`)
//! governs when the table is torn down, the mutex governs who may touch
//! it. Every operation — lookups included — holds the exclusive lock for
//! its full duration; there is no reader/writer split, so concurrent
//! readers serialize (a throughput limitation carried over deliberately,
//! not a correctness one).

use crate::policy::{ElementPolicy, HasherPolicy};
use crate::table::{ChainTable, InsertError, TableConfig};
use crate::traverse::{Traversal, Visit};
use core::hash::Hash;
use parking_lot::Mutex;
use std::sync::Arc;

struct Inner<E, P: ElementPolicy<E>> {
    table: Mutex<ChainTable<E, P>>,
}

pub struct SharedChainTable<E, P: ElementPolicy<E>> {
    inner: Arc<Inner<E, P>>,
}

impl<E: Hash + Ord> SharedChainTable<E, HasherPolicy> {
    pub fn new() -> Self {
        Self::with_policy(HasherPolicy::new())
    }
}

impl<E: Hash + Ord> Default for SharedChainTable<E, HasherPolicy> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, P: ElementPolicy<E>> SharedChainTable<E, P> {
    pub fn with_policy(policy: P) -> Self {
        Self::with_config(policy, TableConfig::default())
    }

    pub fn with_config(policy: P, config: TableConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                table: Mutex::new(ChainTable::with_config(policy, config)),
            }),
        }
    }

    /// Mint another owning handle to the same table (refcount up).
    /// Dropping a handle releases it; the drop that reaches zero tears
    /// the table down, retiring every element through the policy.
    pub fn share(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of outstanding owning handles.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub fn len(&self) -> usize {
        self.inner.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.table.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.table.lock().capacity()
    }

    pub fn contains(&self, probe: &E) -> bool {
        self.inner.table.lock().contains(probe)
    }

    /// Look up and clone out the matching element. References cannot
    /// escape the lock, so the shared lookup returns by value.
    pub fn get(&self, probe: &E) -> Option<E>
    where
        E: Clone,
    {
        self.inner.table.lock().get(probe).cloned()
    }

    pub fn add(&self, elem: E) -> Result<(), InsertError<E>> {
        self.inner.table.lock().add(elem)
    }

    pub fn remove(&self, probe: &E) -> bool {
        self.inner.table.lock().remove(probe)
    }

    pub fn take(&self, probe: &E) -> Option<E> {
        self.inner.table.lock().take(probe)
    }

    pub fn resize(&self, new_size_log: u32) {
        self.inner.table.lock().resize(new_size_log)
    }

    pub fn reset(&self) {
        self.inner.table.lock().reset()
    }

    /// Plain traversal under the lock. The visitor must not call back
    /// into this table: the lock is not reentrant and a nested call
    /// deadlocks.
    pub fn for_each<F>(&self, visit: F) -> Traversal
    where
        F: FnMut(&mut E) -> Visit,
    {
        self.inner.table.lock().for_each(visit)
    }

    /// Ordered traversal under the lock; same reentrancy caveat.
    pub fn for_each_ordered<F>(&self, visit: F) -> Traversal
    where
        E: Clone,
        F: FnMut(&mut E) -> Visit,
    {
        self.inner.table.lock().for_each_ordered(visit)
    }

    /// Scoped access to the engine under the lock, for compound
    /// operations that would otherwise lock per call.
    pub fn with_table<R>(&self, f: impl FnOnce(&mut ChainTable<E, P>) -> R) -> R {
        f(&mut self.inner.table.lock())
    }
}

impl<E, P: ElementPolicy<E>> Clone for SharedChainTable<E, P> {
    fn clone(&self) -> Self {
        self.share()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: `share` bumps the reference count and dropping a
    /// handle releases it.
    #[test]
    fn share_and_release_track_the_count() {
        let t: SharedChainTable<u64, _> = SharedChainTable::new();
        assert_eq!(t.ref_count(), 1);
        let t2 = t.share();
        assert_eq!(t.ref_count(), 2);
        drop(t2);
        assert_eq!(t.ref_count(), 1);
    }

    /// Invariant: all handles see the same table state.
    #[test]
    fn handles_alias_one_table() {
        let t: SharedChainTable<u64, _> = SharedChainTable::new();
        let t2 = t.share();
        t.add(5).unwrap();
        assert!(t2.contains(&5));
        assert!(t2.remove(&5));
        assert!(t.is_empty());
    }

    /// Invariant: only the release that drops the count to zero tears
    /// the table down and retires the remaining elements.
    #[test]
    fn last_release_retires_elements() {
        use crate::policy::FnPolicy;
        use core::cmp::Ordering;
        use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
        static RETIRED: AtomicUsize = AtomicUsize::new(0);
        fn h(e: &u64, _: &()) -> u32 {
            *e as u32
        }
        fn c(a: &u64, b: &u64, _: &()) -> Ordering {
            a.cmp(b)
        }
        fn r(_: u64, _: &()) {
            RETIRED.fetch_add(1, AtomicOrdering::SeqCst);
        }
        let t = SharedChainTable::with_policy(FnPolicy::new(h, c, ()).with_retire(r));
        for k in 0..4u64 {
            t.add(k).unwrap();
        }
        let t2 = t.share();
        drop(t);
        assert_eq!(RETIRED.load(AtomicOrdering::SeqCst), 0, "table must outlive the first release");
        drop(t2);
        assert_eq!(RETIRED.load(AtomicOrdering::SeqCst), 4);
    }

    /// Invariant: concurrent inserters of disjoint key ranges serialize
    /// on the lock and all elements land in the table.
    #[test]
    fn concurrent_inserts_all_land() {
        let t: SharedChainTable<u64, _> = SharedChainTable::new();
        let threads: Vec<_> = (0..4u64)
            .map(|id| {
                let handle = t.share();
                std::thread::spawn(move || {
                    for k in (id * 1000)..(id * 1000 + 250) {
                        handle.add(k).unwrap();
                    }
                })
            })
            .collect();
        for th in threads {
            th.join().unwrap();
        }
        assert_eq!(t.len(), 1000);
        for id in 0..4u64 {
            assert!(t.contains(&(id * 1000)));
            assert!(t.contains(&(id * 1000 + 249)));
        }
        t.with_table(|table| table.check_invariants());
    }

    /// Invariant: traversal under the lock observes a stable snapshot
    /// even while other handles exist on other threads.
    #[test]
    fn traversal_under_lock_is_consistent() {
        let t: SharedChainTable<u64, _> = SharedChainTable::new();
        for k in 0..64u64 {
            t.add(k).unwrap();
        }
        let t2 = t.share();
        let counter = std::thread::spawn(move || {
            let mut n = 0usize;
            t2.for_each(|_| {
                n += 1;
                Visit::Continue
            });
            n
        });
        assert_eq!(counter.join().unwrap(), 64);
    }
}
