//! Visitor-driven traversal: plain (storage order, chain by chain) and
//! ordered (snapshot, sort, replay).

use crate::policy::ElementPolicy;
use crate::store::SlotStore;
use crate::table::ChainTable;

/// Visitor verdict for one element.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Visit {
    /// Proceed to the next element.
    Continue,
    /// Abort the traversal immediately.
    Stop,
    /// Remove this element now (retired through the policy), then proceed.
    Delete,
    /// The visitor mutated hash-relevant fields of the element. Tolerated
    /// only while the home bucket is unchanged; an actual rehoming is an
    /// unsupported operation and panics.
    ModifiedKey,
    /// Restart the whole traversal from slot 0.
    Redo,
}

/// How a traversal ended.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Traversal {
    Completed,
    Stopped,
}

enum ChainEnd {
    Done,
    Stopped,
    Redo,
}

impl<E, P: ElementPolicy<E>> ChainTable<E, P> {
    /// Visit every occupied element exactly once, in storage order chain
    /// by chain: slots are scanned 0..capacity and a chain is walked to
    /// completion when the scan reaches its head, so displaced elements
    /// are neither skipped nor visited twice.
    ///
    /// Deletions requested by the visitor happen in place; if any
    /// occurred, the shrink check runs when the traversal ends. The
    /// visitor runs while the table is borrowed and must not re-enter it.
    pub fn for_each<F>(&mut self, mut visit: F) -> Traversal
    where
        F: FnMut(&mut E) -> Visit,
    {
        let _g = self.reentrancy.enter();
        let mut deleted = false;
        // Redo re-enters the scan through this explicit outer loop.
        let outcome = 'scan: loop {
            let mut idx = 0;
            while idx < self.store.capacity() {
                if self.store.is_occupied(idx)
                    && Self::home_of_slot(&self.store, &self.policy, idx) == idx
                {
                    let end = Self::walk_chain(
                        &mut self.store,
                        &self.policy,
                        &mut self.fill,
                        idx,
                        &mut visit,
                        &mut deleted,
                    );
                    match end {
                        ChainEnd::Done => {}
                        ChainEnd::Stopped => break 'scan Traversal::Stopped,
                        ChainEnd::Redo => continue 'scan,
                    }
                }
                idx += 1;
            }
            break Traversal::Completed;
        };
        if deleted {
            Self::shrink_if_sparse(&mut self.store, &self.policy, &self.config, self.fill);
        }
        outcome
    }

    fn walk_chain<F>(
        store: &mut SlotStore<E>,
        policy: &P,
        fill: &mut usize,
        head: usize,
        visit: &mut F,
        deleted: &mut bool,
    ) -> ChainEnd
    where
        F: FnMut(&mut E) -> Visit,
    {
        let mut pred: Option<usize> = None;
        let mut cur = head;
        loop {
            match visit(store.elem_mut(cur)) {
                Visit::Continue => match store.link(cur).slot() {
                    Some(next) => {
                        pred = Some(cur);
                        cur = next;
                    }
                    None => return ChainEnd::Done,
                },
                Visit::Stop => return ChainEnd::Stopped,
                Visit::Redo => return ChainEnd::Redo,
                Visit::Delete => {
                    *deleted = true;
                    let next = store.link(cur).slot();
                    let removed = Self::remove_at(store, cur, pred);
                    *fill -= 1;
                    policy.retire(removed);
                    match (pred, next) {
                        (_, None) => return ChainEnd::Done,
                        // A deleted head had its successor promoted into
                        // the head slot: revisit it there.
                        (None, Some(_)) => {}
                        (Some(_), Some(next)) => cur = next,
                    }
                }
                Visit::ModifiedKey => {
                    assert!(
                        Self::home_of_slot(store, policy, cur) == head,
                        "visitor moved an element's home bucket; in-place rehoming is not supported"
                    );
                    match store.link(cur).slot() {
                        Some(next) => {
                            pred = Some(cur);
                            cur = next;
                        }
                        None => return ChainEnd::Done,
                    }
                }
            }
        }
    }

    /// Visit every element in the order given by the policy comparator.
    ///
    /// The elements are first copied into a scratch sequence (without
    /// touching the table), sorted, and replayed through the same
    /// visitor contract. `Delete` during the replay removes the matching
    /// element from the live table; `Redo` restarts the replay over the
    /// snapshot; `ModifiedKey` is unsupported here because the visitor
    /// only ever sees the scratch copies.
    pub fn for_each_ordered<F>(&mut self, mut visit: F) -> Traversal
    where
        E: Clone,
        F: FnMut(&mut E) -> Visit,
    {
        let mut scratch: Vec<E> = Vec::with_capacity(self.len());
        {
            let _g = self.reentrancy.enter();
            for idx in 0..self.store.capacity() {
                if !self.store.is_occupied(idx)
                    || Self::home_of_slot(&self.store, &self.policy, idx) != idx
                {
                    continue;
                }
                let mut cur = idx;
                loop {
                    scratch.push(self.store.elem(cur).clone());
                    match self.store.link(cur).slot() {
                        Some(next) => cur = next,
                        None => break,
                    }
                }
            }
            scratch.sort_unstable_by(|a, b| self.policy.cmp(a, b));
        }

        let mut idx = 0;
        loop {
            if idx == scratch.len() {
                return Traversal::Completed;
            }
            match visit(&mut scratch[idx]) {
                Visit::Continue => idx += 1,
                Visit::Stop => return Traversal::Stopped,
                Visit::Redo => idx = 0,
                Visit::Delete => {
                    self.remove(&scratch[idx]);
                    idx += 1;
                }
                Visit::ModifiedKey => {
                    panic!("ordered traversal visits scratch copies; key modification is not supported");
                }
            }
        }
    }
}
