//! chain-table: an open-addressing hash table that keeps collision
//! chains inside the slot array itself, relocates squatters so every
//! chain starts at its true home bucket, and exposes a visitor-driven
//! traversal that tolerates deletion mid-scan.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: build the table in small, verifiable layers so each piece
//!   can be reasoned about independently.
//! - Layers:
//!   - SlotStore<E>: flat element storage plus the parallel link array
//!     (`FREE`/`END` sentinels or a next-slot index); no per-node heap
//!     allocation, capacity always a power of two.
//!   - ChainTable<E, P>: the core engine — lookup, insertion with
//!     Brent-style relocation, removal with chain splicing, grow/shrink
//!     resizing between watermarks; includes a debug-only reentrancy
//!     guard to keep internals consistent while mutating.
//!   - Traversal (on ChainTable): a visitor protocol (`Visit`) that
//!     enumerates every occupied slot exactly once and supports
//!     in-place deletion, full restart, and early stop; plus an ordered
//!     variant that snapshots, sorts, and replays.
//!   - SharedChainTable<E, P>: shared-ownership wrapper; every public
//!     operation serializes on one exclusive lock, while the reference
//!     count (an `Arc`) governs lifetime independently of the lock.
//!
//! Constraints
//! - Chains live in the slot array: `links[i]` is `FREE`, `END`, or the
//!   index of the next element in the same chain.
//! - A newly inserted element always ends up on the chain rooted at its
//!   home bucket (`hash & mask`); a displaced occupant of that bucket is
//!   relocated first. This keeps average chain length minimal.
//! - `fill < capacity` always holds, so free-slot probing terminates.
//! - Duplicate inserts fail and hand the offered element back.
//! - Reentrancy: disallowed during structural operations (only policy
//!   callbacks — hash/compare/retire — may run); caught by a debug-only
//!   guard. Visitors run under the shared wrapper's lock and must not
//!   re-enter the same table.
//!
//! Why this split?
//! - Localize invariants: the store knows nothing about hashing, the
//!   engine knows nothing about locking, the wrapper adds no structure.
//! - Clear failure boundaries: caller-visible outcomes (not-found,
//!   duplicate, early stop) are ordinary return values; internal
//!   corruption and the unsupported key-rehoming visitor outcome are
//!   fatal assertions.
//!
//! Element policies
//! - `ElementPolicy<E>` supplies `hash`, `cmp`, and the `retire` hook
//!   invoked when the table itself disposes of an element (visitor
//!   deletion, `remove`, `reset`, teardown).
//! - `HasherPolicy` covers the statically-typed case (`E: Hash + Ord`)
//!   with any `BuildHasher`; `FnPolicy` and `BlobPolicy` cover the
//!   function-pointer-plus-context style for opaque byte elements.
//!
//! Notes and non-goals
//! - Not a persistent store and not a distributed structure.
//! - No reader/writer split: lookups serialize with mutations on the
//!   same lock (a throughput limitation, not a correctness one).
//! - No iteration stability across resizes beyond the lock itself.
//! - Public API surface is `ChainTable`, `SharedChainTable`, the policy
//!   types, and the traversal enums; lower layers are implementation
//!   details.

mod policy;
mod reentrancy;
mod shared;
mod store;
mod table;
mod traverse;

// Public surface
pub use policy::{BlobPolicy, ElementPolicy, FnPolicy, HasherPolicy};
pub use shared::SharedChainTable;
pub use table::{ChainTable, InsertError, TableConfig};
pub use traverse::{Traversal, Visit};
