//! Element policies: hashing, ordering, and disposal supplied by the caller.

use core::cmp::Ordering;
use core::hash::{BuildHasher, Hash};
use std::collections::hash_map::RandomState;

/// Caller-supplied behavior bound to a table at construction.
///
/// Contract: `cmp` returning `Ordering::Equal` for two elements implies
/// `hash` returns the same value for both. The engine relies on this to
/// keep every element reachable from its home bucket; a policy that
/// violates it silently loses elements.
///
/// `retire` runs whenever the table itself disposes of an element:
/// visitor-requested deletion, `remove`, `reset`, and teardown. `take`
/// bypasses it by handing ownership back to the caller.
pub trait ElementPolicy<E> {
    fn hash(&self, elem: &E) -> u32;
    fn cmp(&self, a: &E, b: &E) -> Ordering;
    fn retire(&self, elem: E) {
        drop(elem);
    }
}

/// Statically-typed policy for elements that already carry `Hash + Ord`,
/// driven by any `BuildHasher` (default `RandomState`).
#[derive(Debug, Default, Clone)]
pub struct HasherPolicy<S = RandomState> {
    hasher: S,
}

impl HasherPolicy {
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<S: BuildHasher> HasherPolicy<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self { hasher }
    }
}

impl<E, S> ElementPolicy<E> for HasherPolicy<S>
where
    E: Hash + Ord,
    S: BuildHasher,
{
    fn hash(&self, elem: &E) -> u32 {
        fold_hash(self.hasher.hash_one(elem))
    }

    fn cmp(&self, a: &E, b: &E) -> Ordering {
        a.cmp(b)
    }
}

// Fold a 64-bit hash into the table's 32-bit hash domain without
// discarding the high half.
#[inline]
fn fold_hash(h: u64) -> u32 {
    (h ^ (h >> 32)) as u32
}

/// Function-pointer policy with an opaque caller context, for elements
/// whose hashing/ordering is decided at runtime rather than by trait
/// impls. The context is owned by the policy and dropped with the table.
pub struct FnPolicy<E, C = ()> {
    hash_fn: fn(&E, &C) -> u32,
    cmp_fn: fn(&E, &E, &C) -> Ordering,
    retire_fn: Option<fn(E, &C)>,
    ctx: C,
}

impl<E, C> FnPolicy<E, C> {
    pub fn new(hash_fn: fn(&E, &C) -> u32, cmp_fn: fn(&E, &E, &C) -> Ordering, ctx: C) -> Self {
        Self {
            hash_fn,
            cmp_fn,
            retire_fn: None,
            ctx,
        }
    }

    /// Register a disposal hook called whenever the table retires an
    /// element (deletion, reset, teardown).
    pub fn with_retire(mut self, retire_fn: fn(E, &C)) -> Self {
        self.retire_fn = Some(retire_fn);
        self
    }

    pub fn ctx(&self) -> &C {
        &self.ctx
    }
}

impl<E, C> ElementPolicy<E> for FnPolicy<E, C> {
    fn hash(&self, elem: &E) -> u32 {
        (self.hash_fn)(elem, &self.ctx)
    }

    fn cmp(&self, a: &E, b: &E) -> Ordering {
        (self.cmp_fn)(a, b, &self.ctx)
    }

    fn retire(&self, elem: E) {
        match self.retire_fn {
            Some(f) => f(elem, &self.ctx),
            None => drop(elem),
        }
    }
}

/// Policy for fixed-size opaque byte elements (`Box<[u8]>`), the
/// type-erased counterpart of `HasherPolicy`. Every element must be
/// exactly `elem_size` bytes; mismatches are caught in debug builds.
pub struct BlobPolicy<C = ()> {
    elem_size: usize,
    hash_fn: fn(&[u8], &C) -> u32,
    cmp_fn: fn(&[u8], &[u8], &C) -> Ordering,
    retire_fn: Option<fn(Box<[u8]>, &C)>,
    ctx: C,
}

impl<C> BlobPolicy<C> {
    pub fn new(
        elem_size: usize,
        hash_fn: fn(&[u8], &C) -> u32,
        cmp_fn: fn(&[u8], &[u8], &C) -> Ordering,
        ctx: C,
    ) -> Self {
        Self {
            elem_size,
            hash_fn,
            cmp_fn,
            retire_fn: None,
            ctx,
        }
    }

    pub fn with_retire(mut self, retire_fn: fn(Box<[u8]>, &C)) -> Self {
        self.retire_fn = Some(retire_fn);
        self
    }

    pub fn elem_size(&self) -> usize {
        self.elem_size
    }
}

impl<C> ElementPolicy<Box<[u8]>> for BlobPolicy<C> {
    fn hash(&self, elem: &Box<[u8]>) -> u32 {
        debug_assert_eq!(elem.len(), self.elem_size, "blob element size mismatch");
        (self.hash_fn)(elem, &self.ctx)
    }

    fn cmp(&self, a: &Box<[u8]>, b: &Box<[u8]>) -> Ordering {
        debug_assert_eq!(a.len(), self.elem_size, "blob element size mismatch");
        debug_assert_eq!(b.len(), self.elem_size, "blob element size mismatch");
        (self.cmp_fn)(a, b, &self.ctx)
    }

    fn retire(&self, elem: Box<[u8]>) {
        match self.retire_fn {
            Some(f) => f(elem, &self.ctx),
            None => drop(elem),
        }
    }
}
