//! A concurrent hash map with lock-free reads and striped-lock writes.
//!
//! Squall is a Rust port of the scalable dictionary design popularized by
//! .NET's `ConcurrentDictionary`: the table is guarded by a fixed set of
//! mutex *stripes* rather than a single lock, and the bucket array, the
//! stripe array, and the per-stripe element counts are bundled into a single
//! *generation* object that is replaced wholesale — with one atomic store —
//! whenever the table grows or is cleared.
//!
//! The upshot:
//!
//! - **Reads never block.** [`HashMap::get`] and iteration load the current
//!   generation once and walk a bucket chain through acquire loads. They
//!   take no locks, never retry, and are never invalidated by concurrent
//!   writes. A read that races with a resize may run against a generation
//!   that is an instant stale; that weak consistency is by design.
//! - **Writes take exactly one stripe lock.** Two writers contend only if
//!   their keys hash to the same stripe, so write throughput scales with the
//!   stripe count (by default a small multiple of the CPU count) rather than
//!   the table size.
//! - **Growth is incremental and cheap to coordinate.** After an insert
//!   overflows its stripe's *budget*, the inserting thread rebuilds the
//!   table into a larger generation and publishes it atomically. Concurrent
//!   growers serialize on stripe 0; losers notice the generation changed and
//!   walk away.
//!
//! # Examples
//!
//! ```
//! use squall::HashMap;
//!
//! let map = HashMap::new();
//!
//! // pin() borrows the map and pins its memory reclamation
//! let mref = map.pin();
//! mref.insert("zero", 0);
//! mref.insert("one", 1);
//! assert_eq!(mref.get("zero"), Some(&0));
//!
//! // compare-and-swap style updates
//! assert!(mref.try_update("one", 2, &1));
//! assert!(!mref.try_update("one", 3, &1));
//!
//! assert_eq!(map.len(), 2);
//! ```
//!
//! Sharing a map across threads requires nothing beyond `Arc`:
//!
//! ```
//! use squall::HashMap;
//! use std::sync::Arc;
//!
//! let map = Arc::new(HashMap::new());
//! let handles: Vec<_> = (0..4)
//!     .map(|t| {
//!         let map = Arc::clone(&map);
//!         std::thread::spawn(move || {
//!             let guard = map.guard();
//!             for i in 0..100 {
//!                 map.insert((t, i), i, &guard);
//!             }
//!         })
//!     })
//!     .collect();
//! for h in handles {
//!     h.join().unwrap();
//! }
//! assert_eq!(map.len(), 400);
//! ```
//!
//! # A note on `Guard` and memory use
//!
//! Because reads take no locks, a reader may still be walking a bucket chain
//! while another thread removes one of its nodes, or while a resize replaces
//! the entire generation. Freed-too-early memory is prevented with deferred
//! reclamation (via the [`seize`] crate): everything the map unlinks is
//! *retired* rather than dropped, and only reclaimed once every [`Guard`]
//! that was active at retirement has been dropped.
//!
//! Practically this means every operation either takes a `&Guard` argument
//! ([`HashMap::guard`] produces one) or goes through a [`HashMap::pin`]
//! reference that holds one for you, and every `&K`/`&V` the map hands out
//! is bound to that guard's lifetime. Holding a guard for a long time delays
//! reclamation of everything retired in the meantime, so prefer re-pinning
//! at reasonable intervals in long-running loops.
//!
//! All guards must come from the map they are used with. Guards from another
//! map's collector are rejected at runtime.
//!
//! [`Guard`]: https://docs.rs/seize/latest/seize/struct.Guard.html
//! [`seize`]: https://docs.rs/seize
//!
//! # Consistency semantics
//!
//! Single-key operations are linearizable: an insert that returned is
//! visible to every subsequent read, and the compare-and-swap operations
//! ([`HashMap::try_update`], [`HashMap::remove_if`]) decide against the
//! value held at the moment of the check, under the key's stripe lock.
//!
//! Aggregate operations pick one of two trade-offs. [`HashMap::len`] and
//! [`HashMap::snapshot`] briefly take *every* stripe lock and observe a
//! single moment in time. [`HashMap::iter`] takes no locks at all and is
//! only weakly consistent: it traverses the generation current at creation
//! and may miss (or include) entries modified while it runs — it will never
//! error out or loop forever because of a concurrent writer.
//!
//! # Resizing behavior
//!
//! The map tracks how many elements each stripe guards. When an insert
//! pushes a stripe past the budget, the table is rebuilt into the smallest
//! capacity at least twice the old one that has no small prime factors
//! (reducing clustering for common hash distributions). If the table turns
//! out to be mostly empty — the pathological case of churn hammering one
//! stripe — the budget is doubled instead and the table left alone. The
//! stripe array itself also doubles as the map grows, up to an internal
//! limit, unless an explicit stripe count was configured at construction.
//! The table never shrinks; only [`HashMap::clear`] resets it to the
//! default capacity.
#![deny(missing_docs, missing_debug_implementations, unreachable_pub)]
#![warn(rust_2018_idioms)]

mod map;
mod map_ref;
mod node;
mod raw;
mod reclaim;

pub mod iter;

#[cfg(feature = "rayon")]
mod rayon_impls;

pub use map::{DuplicateKeyError, HashMap, TryInsertError};
pub use map_ref::HashMapRef;

/// Default hasher for [`HashMap`].
pub type DefaultHashBuilder = ahash::RandomState;
