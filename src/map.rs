use crate::iter::*;
use crate::node::Node;
use crate::raw::Tables;
use crate::reclaim::{Atomic, Collector, Guard, Linked, RetireShared, Shared};
use parking_lot::MutexGuard;
use std::borrow::Borrow;
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

/// The default number of buckets. When choosing this value, we are making a
/// trade-off between the size of a very small map and the number of resizes
/// when constructing a large one. The value must not be divisible by a small
/// prime.
const DEFAULT_CAPACITY: usize = 31;

/// The largest bucket array a resize will produce. The value itself is not
/// divisible by 2, 3, 5, or 7, so it is a legal table length. Once a table
/// reaches it, the budget is frozen and growth stops for good.
const MAXIMUM_CAPACITY: usize = 0x7fff_ffff;

/// The maximum size the stripe array will grow to on its own as the map gets
/// bigger. A caller that picks an explicit stripe count may exceed this.
const MAX_STRIPES: usize = 1024;

/// The default stripe count is `DEFAULT_STRIPE_MULTIPLIER * #CPUs`. A higher
/// multiplier lets more writes proceed without blocking each other, but makes
/// every operation that takes all stripes (resize, `len`, `snapshot`, `clear`)
/// more expensive.
const DEFAULT_STRIPE_MULTIPLIER: usize = 4;

static NCPU_INITIALIZER: Once = Once::new();
static NCPU: AtomicUsize = AtomicUsize::new(0);

fn num_cpus() -> usize {
    NCPU_INITIALIZER.call_once(|| NCPU.store(num_cpus::get(), Ordering::Relaxed));
    NCPU.load(Ordering::Relaxed)
}

/// The number of concurrent writers to optimize for by default.
fn default_stripes() -> usize {
    DEFAULT_STRIPE_MULTIPLIER * num_cpus()
}

/// Smallest legal table length >= `min`: odd, with no factor of 3, 5, or 7.
/// Avoiding small prime factors in the table length reduces clustering for
/// the hash distributions commonly seen in practice.
fn table_size_for(min: usize) -> usize {
    let mut n = min | 1;
    while n % 3 == 0 || n % 5 == 0 || n % 7 == 0 {
        n += 2;
    }
    n
}

/// Smallest legal table length >= `2 * current + 1`, or `None` once that
/// exceeds [`MAXIMUM_CAPACITY`].
fn next_table_size(current: usize) -> Option<usize> {
    // double and add one, so the length stays odd
    let mut new_len = current.checked_mul(2)?.checked_add(1)?;
    while new_len % 3 == 0 || new_len % 5 == 0 || new_len % 7 == 0 {
        new_len = new_len.checked_add(2)?;
    }
    if new_len > MAXIMUM_CAPACITY {
        return None;
    }
    Some(new_len)
}

/// A concurrent hash map with lock-free reads and striped-lock writes.
///
/// Reads (`get`, `contains_key`, iteration) never block: they walk the bucket
/// chains of the current *generation* through atomic loads. Writes take
/// exactly one of the generation's stripe mutexes, so contention between
/// writers is bounded by the stripe count rather than the table size. A
/// resize or `clear` swaps in a whole new generation with a single atomic
/// store; readers that raced with the swap simply finish on the generation
/// they started on.
///
/// Squall uses [`Guard`]s to control the lifetime of the resources that get
/// stored in and extracted from the map. Guards are acquired through
/// [`HashMap::guard`] or [`HashMap::pin`]; every reference handed out by the
/// map is tied to the lifetime of such a guard, and memory is reclaimed only
/// once every guard that could have observed it is gone. For more details,
/// see the [notes in the crate-level documentation].
///
/// [notes in the crate-level documentation]: index.html#a-note-on-guard-and-memory-use
/// [`Guard`]: https://docs.rs/seize/latest/seize/struct.Guard.html
pub struct HashMap<K, V, S = crate::DefaultHashBuilder> {
    /// The current generation: bucket array, stripe locks, and per-stripe
    /// element counts, replaced wholesale by resize and clear. Bundling the
    /// three arrays in one object is what lets us swap all of them at once.
    tables: Atomic<Tables<K, V>>,

    /// The maximum number of elements per stripe before an insert schedules a
    /// resize. Written only while holding stripe 0 of the current generation.
    budget: AtomicUsize,

    /// Whether a resize may double the stripe array. Disabled when the caller
    /// configured an explicit stripe count.
    grow_stripes: bool,

    /// Collector that all `Guard` references used for operations on this map
    /// must be tied to. It is important that they all associate with the
    /// _same_ collector; `check_guard` enforces this. Because the collector
    /// is owned by the map (and dropped with it), retired keys and values
    /// never outlive the map, which is what lets `K` and `V` be non-`'static`.
    collector: Collector,

    build_hasher: S,
}

// The nodes, values, and generations hang off raw pointers, so the auto
// traits cannot see them. The bounds mirror what the map actually hands to
// other threads: owned `K`s and `V`s on insert, `&K`/`&V` on access.
unsafe impl<K, V, S> Send for HashMap<K, V, S>
where
    K: Send,
    V: Send,
    S: Send,
{
}

unsafe impl<K, V, S> Sync for HashMap<K, V, S>
where
    K: Send + Sync,
    V: Send + Sync,
    S: Sync,
{
}

#[derive(Debug)]
enum PutResult<'a, T> {
    Inserted {
        new: &'a T,
    },
    Replaced {
        old: &'a T,
        new: &'a T,
    },
    Exists {
        current: &'a T,
        not_inserted: Box<Linked<T>>,
    },
}

impl<'a, T> PutResult<'a, T> {
    fn before(&self) -> Option<&'a T> {
        match *self {
            PutResult::Inserted { .. } => None,
            PutResult::Replaced { old, .. } => Some(old),
            PutResult::Exists { current, .. } => Some(current),
        }
    }

    #[allow(dead_code)]
    fn after(&self) -> Option<&'a T> {
        match *self {
            PutResult::Inserted { new } => Some(new),
            PutResult::Replaced { new, .. } => Some(new),
            PutResult::Exists { .. } => None,
        }
    }
}

/// The error type for the [`HashMap::try_insert`] method.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TryInsertError<'a, V> {
    /// A reference to the current value mapped to the key.
    pub current: &'a V,
    /// The value that [`HashMap::try_insert`] failed to insert.
    pub not_inserted: V,
}

impl<'a, V> Display for TryInsertError<'a, V>
where
    V: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Insert of \"{:?}\" failed as key was already present with value \"{:?}\"",
            self.not_inserted, self.current
        )
    }
}

impl<'a, V> Error for TryInsertError<'a, V>
where
    V: Debug,
{
    #[inline]
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

/// The error type for seeded construction via [`HashMap::from_entries`].
///
/// Returned when the seed collection contains the same key more than once.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DuplicateKeyError<K> {
    /// The key that appeared twice.
    pub key: K,
}

impl<K> Display for DuplicateKeyError<K>
where
    K: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "The source collection contains duplicate key {:?}", self.key)
    }
}

impl<K> Error for DuplicateKeyError<K>
where
    K: Debug,
{
    #[inline]
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl<K, V> HashMap<K, V, crate::DefaultHashBuilder> {
    /// Creates an empty `HashMap` with the default capacity and the default
    /// stripe count (a small multiple of the available parallelism).
    ///
    /// # Examples
    ///
    /// ```
    /// use squall::HashMap;
    /// let map: HashMap<&str, i32> = HashMap::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty `HashMap` with space for at least `capacity` elements
    /// before the first resize.
    ///
    /// # Examples
    ///
    /// ```
    /// use squall::HashMap;
    /// let map: HashMap<&str, i32> = HashMap::with_capacity(10);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, crate::DefaultHashBuilder::default())
    }

    /// Creates an empty `HashMap` with exactly `stripes` lock stripes.
    ///
    /// The stripe count is the number of writer threads that can mutate the
    /// map without blocking one another. Picking it explicitly also pins it:
    /// the map will never grow the stripe array on its own, which it
    /// otherwise does (up to an internal limit) as the table gets bigger.
    ///
    /// # Panics
    ///
    /// Panics if `stripes` is zero.
    pub fn with_stripes(stripes: usize) -> Self {
        Self::with_stripes_and_capacity(stripes, DEFAULT_CAPACITY)
    }

    /// Creates an empty `HashMap` with exactly `stripes` lock stripes and
    /// space for at least `capacity` elements before the first resize.
    ///
    /// # Panics
    ///
    /// Panics if `stripes` is zero.
    pub fn with_stripes_and_capacity(stripes: usize, capacity: usize) -> Self {
        Self::with_stripes_capacity_and_hasher(
            stripes,
            capacity,
            crate::DefaultHashBuilder::default(),
        )
    }

    /// Creates a map seeded with the given entries, using the default hasher.
    ///
    /// Unlike collecting into a map, seeding is fallible: a key that occurs
    /// twice in `entries` is a construction error, not a silent overwrite.
    ///
    /// # Examples
    ///
    /// ```
    /// use squall::HashMap;
    ///
    /// let map = HashMap::from_entries([("a", 1), ("b", 2)]).unwrap();
    /// assert_eq!(map.pin().get("a"), Some(&1));
    ///
    /// let dup = HashMap::from_entries([("a", 1), ("a", 2)]);
    /// assert_eq!(dup.unwrap_err().key, "a");
    /// ```
    pub fn from_entries<I>(entries: I) -> Result<Self, DuplicateKeyError<K>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Sync + Send + Clone + Hash + Eq,
        V: Sync + Send,
    {
        Self::from_entries_with_hasher(entries, crate::DefaultHashBuilder::default())
    }
}

impl<K, V, S> Default for HashMap<K, V, S>
where
    S: Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> HashMap<K, V, S> {
    /// Creates an empty map which will use `hash_builder` to hash keys.
    ///
    /// The created map has the default initial capacity and stripe count.
    ///
    /// Warning: `hash_builder` is normally randomly generated, and is
    /// designed to allow the map to be resistant to attacks that cause many
    /// collisions and very poor performance. Setting it manually using this
    /// function can expose a DoS attack vector.
    ///
    /// # Examples
    ///
    /// ```
    /// use squall::{HashMap, DefaultHashBuilder};
    ///
    /// let map = HashMap::with_hasher(DefaultHashBuilder::default());
    /// map.pin().insert(1, 2);
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_options(default_stripes(), DEFAULT_CAPACITY, true, hash_builder)
    }

    /// Creates an empty map with space for at least `capacity` elements,
    /// using `hash_builder` to hash the keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use squall::HashMap;
    /// use std::collections::hash_map::RandomState;
    ///
    /// let map = HashMap::with_capacity_and_hasher(10, RandomState::new());
    /// map.pin().insert(1, 2);
    /// ```
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self::with_options(default_stripes(), capacity, true, hash_builder)
    }

    /// Creates an empty map with exactly `stripes` lock stripes, space for at
    /// least `capacity` elements, and `hash_builder` for hashing keys.
    ///
    /// See [`HashMap::with_stripes`] for what pinning the stripe count
    /// implies.
    ///
    /// # Panics
    ///
    /// Panics if `stripes` is zero.
    pub fn with_stripes_capacity_and_hasher(
        stripes: usize,
        capacity: usize,
        hash_builder: S,
    ) -> Self {
        Self::with_options(stripes, capacity, false, hash_builder)
    }

    fn with_options(stripes: usize, capacity: usize, grow_stripes: bool, hash_builder: S) -> Self {
        assert_ne!(stripes, 0, "a map must have at least one lock stripe");

        // the capacity must be at least the stripe count, or some stripes
        // would never guard any bucket
        let capacity = table_size_for(usize::max(capacity, stripes));

        let collector = Collector::new();
        let tables = Atomic::from(Shared::boxed(Tables::new(capacity, stripes), &collector));

        Self {
            tables,
            budget: AtomicUsize::new(usize::max(1, capacity / stripes)),
            grow_stripes,
            collector,
            build_hasher: hash_builder,
        }
    }

    /// Pin a `Guard` for use with this map.
    ///
    /// Keep in mind that for as long as you hold onto this `Guard`, you are
    /// preventing the collection of garbage generated by the map.
    pub fn guard(&self) -> Guard<'_> {
        self.collector.enter()
    }

    #[inline]
    fn check_guard(&self, guard: &Guard<'_>) {
        // guard.collector() may be `None` if the guard is unprotected
        if let Some(c) = guard.collector() {
            assert!(Collector::ptr_eq(c, &self.collector));
        }
    }

    /// Returns the number of entries in the map.
    ///
    /// This has snapshot semantics: it briefly takes every stripe lock and
    /// sums the per-stripe counts, so it observes a single moment in time but
    /// is considerably more expensive than reads or single-key writes.
    ///
    /// # Examples
    ///
    /// ```
    /// use squall::HashMap;
    ///
    /// let map = HashMap::new();
    ///
    /// map.pin().insert(1, "a");
    /// map.pin().insert(2, "b");
    /// assert!(map.len() == 2);
    /// ```
    pub fn len(&self) -> usize {
        let guard = self.collector.enter();
        let (tables, _locks) = self.lock_all(&guard);
        // safety: lock_all verified the generation is current and pinned it
        unsafe { tables.deref() }.count_sum()
    }

    /// Returns `true` if the map is empty. Otherwise returns `false`.
    ///
    /// Like [`HashMap::len`], this takes every stripe lock.
    ///
    /// # Examples
    ///
    /// ```
    /// use squall::HashMap;
    ///
    /// let map = HashMap::new();
    /// assert!(map.is_empty());
    /// map.pin().insert("a", 1);
    /// assert!(!map.is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An iterator visiting all key-value pairs in arbitrary order.
    ///
    /// The iterator element type is `(&'g K, &'g V)`.
    ///
    /// The iterator is weakly consistent: it traverses the generation that
    /// was current when `iter` was called, without locking. It never blocks
    /// and is never invalidated by concurrent writes, but entries inserted or
    /// removed after the call may or may not be reflected. Call `iter` again
    /// for a fresh view.
    pub fn iter<'g>(&'g self, guard: &'g Guard<'_>) -> Iter<'g, K, V> {
        self.check_guard(guard);
        let tables = self.tables.load(Ordering::Acquire, guard);
        // safety: the generation is protected by our guard
        let tables = unsafe { tables.deref() };
        Iter {
            node_iter: NodeIter::new(tables, guard),
            guard,
        }
    }

    /// An iterator visiting all keys in arbitrary order.
    ///
    /// The iterator element type is `&'g K`.
    /// See [`HashMap::iter`] for the consistency guarantees.
    pub fn keys<'g>(&'g self, guard: &'g Guard<'_>) -> Keys<'g, K, V> {
        self.check_guard(guard);
        let tables = self.tables.load(Ordering::Acquire, guard);
        // safety: the generation is protected by our guard
        let tables = unsafe { tables.deref() };
        Keys {
            node_iter: NodeIter::new(tables, guard),
        }
    }

    /// An iterator visiting all values in arbitrary order.
    ///
    /// The iterator element type is `&'g V`.
    /// See [`HashMap::iter`] for the consistency guarantees.
    pub fn values<'g>(&'g self, guard: &'g Guard<'_>) -> Values<'g, K, V> {
        self.check_guard(guard);
        let tables = self.tables.load(Ordering::Acquire, guard);
        // safety: the generation is protected by our guard
        let tables = unsafe { tables.deref() };
        Values {
            node_iter: NodeIter::new(tables, guard),
            guard,
        }
    }

    /// Copies every entry into a new `Vec`, in bucket order.
    ///
    /// Unlike [`HashMap::iter`], this is a moment-in-time snapshot: every
    /// stripe lock is held while the copy is made.
    pub fn snapshot(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let guard = self.collector.enter();
        let (tables, _locks) = self.lock_all(&guard);
        // safety: lock_all verified the generation is current and pinned it
        let tables = unsafe { tables.deref() };

        let mut pairs = Vec::with_capacity(tables.count_sum());
        for bucket in tables.buckets() {
            let mut p = bucket.load(Ordering::Relaxed, &guard);
            while !p.is_null() {
                // safety: we hold every stripe lock, so nothing is unlinked
                // or retired while we walk the chains
                let node = unsafe { p.deref() };
                let value = node.value.load(Ordering::Relaxed, &guard);
                pairs.push((node.key.clone(), unsafe { &**value.deref() }.clone()));
                p = node.next.load(Ordering::Relaxed, &guard);
            }
        }
        pairs
    }

    /// Clears the map, removing all key-value pairs.
    ///
    /// This acquires every stripe of the current generation (in ascending
    /// order) and then publishes a fresh, default-capacity generation with
    /// the same stripe count.
    ///
    /// # Examples
    ///
    /// ```
    /// use squall::HashMap;
    ///
    /// let map = HashMap::new();
    ///
    /// map.pin().insert(1, "a");
    /// map.pin().clear();
    /// assert!(map.pin().is_empty());
    /// ```
    pub fn clear(&self, guard: &Guard<'_>) {
        self.check_guard(guard);
        let (tables, locks) = self.lock_all(guard);
        // safety: lock_all verified the generation is current and pinned it
        let t = unsafe { tables.deref() };

        let stripes = t.stripes();
        let capacity = table_size_for(usize::max(DEFAULT_CAPACITY, stripes));
        let new = Shared::boxed(Tables::new(capacity, stripes), &self.collector);
        self.budget
            .store(usize::max(1, capacity / stripes), Ordering::Relaxed);
        self.tables.store(new, Ordering::Release);

        // The old generation is unreachable for anyone who arrives after the
        // store above; readers already inside it are protected by their
        // guards, so everything can be retired now.
        for bucket in t.buckets() {
            let mut p = bucket.load(Ordering::Relaxed, guard);
            while !p.is_null() {
                // safety: see above
                let node = unsafe { p.deref() };
                let next = node.next.load(Ordering::Relaxed, guard);
                let value = node.value.load(Ordering::Relaxed, guard);
                unsafe {
                    guard.retire_shared(value);
                    guard.retire_shared(p);
                }
                p = next;
            }
        }
        // safety: same as for the nodes
        unsafe { guard.retire_shared(tables) };

        drop(locks);
    }

    /// Acquires every stripe of the current generation, in ascending order.
    ///
    /// Stripe 0 doubles as the publication lock: every generation replacement
    /// starts by taking stripe 0 of the generation it replaces, so holding
    /// stripe 0 and then re-verifying that the generation is still current
    /// pins it for as long as the locks are held.
    fn lock_all<'g>(
        &'g self,
        guard: &'g Guard<'_>,
    ) -> (Shared<'g, Tables<K, V>>, Vec<MutexGuard<'g, ()>>) {
        loop {
            let tables = self.tables.load(Ordering::Acquire, guard);
            // safety: the generation is protected by our guard
            let t = unsafe { tables.deref() };

            let zero = t.lock_stripe(0);
            if self.tables.load(Ordering::Acquire, guard) != tables {
                // a resize or clear snuck in; these locks belong to a stale
                // generation
                drop(zero);
                continue;
            }

            let mut locks = Vec::with_capacity(t.stripes());
            locks.push(zero);
            for s in 1..t.stripes() {
                locks.push(t.lock_stripe(s));
            }
            return (tables, locks);
        }
    }
}

// ===
// the following methods require the keys to be hashable, but do not insert
// anything, and so work with references to keys and values without any
// thread-safety bounds.
// ===

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn hash<Q: ?Sized + Hash>(&self, key: &Q) -> u64 {
        let mut h = self.build_hasher.build_hasher();
        key.hash(&mut h);
        h.finish()
    }

    fn get_node<'g, Q>(&'g self, key: &Q, guard: &'g Guard<'_>) -> Option<&'g Linked<Node<K, V>>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash(key);
        let tables = self.tables.load(Ordering::Acquire, guard);
        // safety: the generation is protected by our guard
        let tables = unsafe { tables.deref() };
        let node = tables.find(hash, key, guard);
        if node.is_null() {
            return None;
        }
        // safety: found nodes are protected by our guard
        Some(unsafe { node.deref() })
    }

    /// Tests if `key` is a key in this map.
    ///
    /// The key may be any borrowed form of the map's key type, but `Hash` and
    /// `Eq` on the borrowed form must match those for the key type.
    pub fn contains_key<Q>(&self, key: &Q, guard: &Guard<'_>) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.check_guard(guard);
        self.get(key, guard).is_some()
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// This is entirely lock-free: the current generation is read once, the
    /// bucket chain is walked with acquire loads, and no retry is ever
    /// needed. A concurrent resize at worst means the walk happens on a
    /// generation that is slightly stale, which is the documented
    /// weak-consistency trade-off.
    ///
    /// The key may be any borrowed form of the map's key type, but `Hash` and
    /// `Eq` on the borrowed form must match those for the key type.
    ///
    /// To obtain a `Guard`, use [`HashMap::guard`].
    ///
    /// # Examples
    ///
    /// ```
    /// use squall::HashMap;
    ///
    /// let map = HashMap::new();
    /// let mref = map.pin();
    /// mref.insert(1, "a");
    /// assert_eq!(mref.get(&1), Some(&"a"));
    /// assert_eq!(mref.get(&2), None);
    /// ```
    #[inline]
    pub fn get<'g, Q>(&'g self, key: &Q, guard: &'g Guard<'_>) -> Option<&'g V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.check_guard(guard);
        let node = self.get_node(key, guard)?;

        let v = node.value.load(Ordering::Acquire, guard);
        debug_assert!(!v.is_null());
        // safety: the value is retired only after it has been swapped out or
        // its node unlinked; either way, our guard delays reclamation until
        // after this borrow ends.
        Some(unsafe { &**v.deref() })
    }

    /// Returns the key-value pair corresponding to `key`.
    ///
    /// Returns `None` if this map contains no mapping for `key`.
    ///
    /// The key may be any borrowed form of the map's key type, but `Hash` and
    /// `Eq` on the borrowed form must match those for the key type.
    #[inline]
    pub fn get_key_value<'g, Q>(&'g self, key: &Q, guard: &'g Guard<'_>) -> Option<(&'g K, &'g V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.check_guard(guard);
        let node = self.get_node(key, guard)?;

        let v = node.value.load(Ordering::Acquire, guard);
        debug_assert!(!v.is_null());
        // safety: same as in `get`
        Some((&node.key, unsafe { &**v.deref() }))
    }

    pub(crate) fn guarded_eq(
        &self,
        other: &Self,
        our_guard: &Guard<'_>,
        their_guard: &Guard<'_>,
    ) -> bool
    where
        V: PartialEq,
    {
        if self.len() != other.len() {
            return false;
        }

        self.iter(our_guard)
            .all(|(key, value)| other.get(key, their_guard).map_or(false, |v| *value == *v))
    }
}

// ===
// the following methods only ever _remove_ items, never introduce them, so
// they do not need the thread-safety bounds of the insert family.
// ===

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Removes the key (and its corresponding value) from this map.
    ///
    /// Returns the previous value associated with the given key, if any.
    ///
    /// The key may be any borrowed form of the map's key type, but `Hash`
    /// and `Eq` on the borrowed form must match those for the key type.
    ///
    /// # Examples
    ///
    /// ```
    /// use squall::HashMap;
    ///
    /// let map = HashMap::new();
    /// let guard = map.guard();
    /// map.insert(1, "a", &guard);
    /// assert_eq!(map.remove(&1, &guard), Some(&"a"));
    /// assert_eq!(map.remove(&1, &guard), None);
    /// ```
    pub fn remove<'g, Q>(&'g self, key: &Q, guard: &'g Guard<'_>) -> Option<&'g V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.check_guard(guard);
        self.remove_internal(key, |_| true, guard).map(|(_, v)| v)
    }

    /// Removes the key from the map, returning the stored key and value if
    /// the key was present.
    pub fn remove_entry<'g, Q>(&'g self, key: &Q, guard: &'g Guard<'_>) -> Option<(&'g K, &'g V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.check_guard(guard);
        self.remove_internal(key, |_| true, guard)
    }

    /// Removes the key only if its current value equals `expected`.
    ///
    /// Returns the removed value on success; `None` if the key was absent
    /// or mapped to a different value. Like [`HashMap::try_update`], the
    /// check and the removal are atomic with respect to all other writes.
    pub fn remove_if<'g, Q>(&'g self, key: &Q, expected: &V, guard: &'g Guard<'_>) -> Option<&'g V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: PartialEq,
    {
        self.check_guard(guard);
        self.remove_internal(key, |v| **v == *expected, guard)
            .map(|(_, v)| v)
    }

    /// Shared implementation for removals.
    ///
    /// Unlinks the first node matching `key` (subject to `should_remove`)
    /// from its bucket chain under the stripe lock, decrements the stripe's
    /// count, and retires the node and its value.
    fn remove_internal<'g, Q, F>(
        &'g self,
        key: &Q,
        should_remove: F,
        guard: &'g Guard<'_>,
    ) -> Option<(&'g K, &'g V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: Fn(&Linked<V>) -> bool,
    {
        let hash = self.hash(key);

        loop {
            let tables = self.tables.load(Ordering::Acquire, guard);
            // safety: the generation is protected by our guard
            let t = unsafe { tables.deref() };
            let bini = t.bucket_index(hash);
            let stripe = t.stripe_of(bini);

            let _stripe = t.lock_stripe(stripe);

            // the generation may have been replaced while we were waiting
            if self.tables.load(Ordering::Acquire, guard) != tables {
                continue;
            }

            let mut pred: Shared<'_, Node<K, V>> = Shared::null();
            let mut p = t.bucket(bini, guard);
            while !p.is_null() {
                // safety: protected by our guard, see `put`
                let n = unsafe { p.deref() };
                if n.hash == hash && n.key.borrow() == key {
                    let value = n.value.load(Ordering::Acquire, guard);
                    // safety: values are retired only under this stripe lock
                    if !should_remove(unsafe { value.deref() }) {
                        return None;
                    }

                    let next = n.next.load(Ordering::Acquire, guard);
                    if pred.is_null() {
                        t.store_bucket(bini, next);
                    } else {
                        // safety: pred is an earlier node of this chain,
                        // protected like every other node we walked
                        unsafe { pred.deref() }.next.store(next, Ordering::Release);
                    }
                    t.decrement_count(stripe);

                    // safety: the node and its value are unreachable once
                    // unlinked; readers that got in earlier hold guards.
                    unsafe {
                        guard.retire_shared(value);
                        guard.retire_shared(p);
                    }
                    // safety: retirement is deferred past our guard
                    return Some((&n.key, unsafe { &**value.deref() }));
                }
                pred = p;
                p = n.next.load(Ordering::Acquire, guard);
            }

            return None;
        }
    }
}

// ===
// the following methods _do_ introduce items into the map, and so must
// require that keys and values are thread safe: they may be handed to (and
// eventually reclaimed on) whichever thread touches the map last.
// ===

impl<K, V, S> HashMap<K, V, S>
where
    K: Sync + Send + Clone + Hash + Eq,
    V: Sync + Send,
    S: BuildHasher,
{
    /// Creates a map seeded with the given entries, using `hash_builder` to
    /// hash keys. Fails with [`DuplicateKeyError`] if a key occurs twice.
    pub fn from_entries_with_hasher<I>(
        entries: I,
        hash_builder: S,
    ) -> Result<Self, DuplicateKeyError<K>>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let map = Self::with_hasher(hash_builder);
        {
            let guard = map.guard();
            for (key, value) in entries {
                if map.contains_key(&key, &guard) {
                    return Err(DuplicateKeyError { key });
                }
                map.insert(key, value, &guard);
            }
        }
        Ok(map)
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map did not have this key present, [`None`] is returned.
    ///
    /// If the map did have this key present, the value is updated, and the
    /// old value is returned. The key is left unchanged. See the
    /// [std-collections documentation] for more.
    ///
    /// [`None`]: std::option::Option::None
    /// [std-collections documentation]: https://doc.rust-lang.org/std/collections/index.html#insert-and-complex-keys
    ///
    /// # Panics
    ///
    /// Panics if the total number of elements overflows a `usize`
    /// (practically unreachable).
    ///
    /// # Examples
    ///
    /// ```
    /// use squall::HashMap;
    ///
    /// let map = HashMap::new();
    /// assert_eq!(map.pin().insert(37, "a"), None);
    /// assert_eq!(map.pin().is_empty(), false);
    ///
    /// // you can also re-use a map pin like so:
    /// let mref = map.pin();
    ///
    /// mref.insert(37, "b");
    /// assert_eq!(mref.insert(37, "c"), Some(&"b"));
    /// assert_eq!(mref.get(&37), Some(&"c"));
    /// ```
    pub fn insert<'g>(&'g self, key: K, value: V, guard: &'g Guard<'_>) -> Option<&'g V> {
        self.check_guard(guard);
        self.put(key, value, false, guard).before()
    }

    /// Inserts a key-value pair into the map unless the key already exists.
    ///
    /// If the map does not contain the key, the key-value pair is inserted
    /// and this method returns `Ok` with the new value.
    ///
    /// If the map does contain the key, the map is left unchanged and this
    /// method returns `Err`. The error carries both the value that is
    /// currently in the map and the value that failed to be inserted, so a
    /// lost race costs nothing but the failed call.
    ///
    /// # Examples
    ///
    /// ```
    /// use squall::{HashMap, TryInsertError};
    ///
    /// let map = HashMap::new();
    /// let mref = map.pin();
    ///
    /// mref.insert(37, "a");
    /// assert_eq!(
    ///     mref.try_insert(37, "b"),
    ///     Err(TryInsertError { current: &"a", not_inserted: "b"})
    /// );
    /// assert_eq!(mref.try_insert(42, "c"), Ok(&"c"));
    /// assert_eq!(mref.get(&37), Some(&"a"));
    /// assert_eq!(mref.get(&42), Some(&"c"));
    /// ```
    #[inline]
    pub fn try_insert<'g>(
        &'g self,
        key: K,
        value: V,
        guard: &'g Guard<'_>,
    ) -> Result<&'g V, TryInsertError<'g, V>> {
        self.check_guard(guard);
        match self.put(key, value, true, guard) {
            PutResult::Exists {
                current,
                not_inserted,
            } => Err(TryInsertError {
                current,
                not_inserted: Linked::into_inner(*not_inserted),
            }),
            PutResult::Inserted { new } => Ok(new),
            PutResult::Replaced { .. } => {
                unreachable!("no_replacement cannot result in PutResult::Replaced")
            }
        }
    }

    /// Returns the value for `key`, inserting `value` if the key is absent.
    ///
    /// If another thread inserts the key concurrently, the already-present
    /// value is returned and `value` is dropped; an insert race is never an
    /// error.
    pub fn get_or_insert<'g>(&'g self, key: K, value: V, guard: &'g Guard<'_>) -> &'g V {
        self.check_guard(guard);
        match self.put(key, value, true, guard) {
            PutResult::Inserted { new } => new,
            PutResult::Exists { current, .. } => current,
            PutResult::Replaced { .. } => {
                unreachable!("no_replacement cannot result in PutResult::Replaced")
            }
        }
    }

    /// Returns the value for `key`, inserting the result of `init` if the
    /// key is absent.
    ///
    /// The factory is skipped entirely when a lock-free probe already finds
    /// the key. If the factory does run but another thread wins the insert
    /// race, the *existing* value is returned and the factory's result is
    /// dropped — last-writer-loses-on-insert, not overwrite.
    ///
    /// # Examples
    ///
    /// ```
    /// use squall::HashMap;
    ///
    /// let map = HashMap::new();
    /// let mref = map.pin();
    ///
    /// assert_eq!(mref.get_or_insert_with("x", || 10), &10);
    /// assert_eq!(mref.get_or_insert_with("x", || 20), &10);
    /// ```
    pub fn get_or_insert_with<'g, F>(&'g self, key: K, init: F, guard: &'g Guard<'_>) -> &'g V
    where
        F: FnOnce() -> V,
    {
        self.check_guard(guard);
        if let Some(v) = self.get(&key, guard) {
            return v;
        }

        match self.put(key, init(), true, guard) {
            PutResult::Inserted { new } => new,
            PutResult::Exists { current, .. } => current,
            PutResult::Replaced { .. } => {
                unreachable!("no_replacement cannot result in PutResult::Replaced")
            }
        }
    }

    /// Replaces the value for `key` with `new` if the current value equals
    /// `current`, compare-and-swap style.
    ///
    /// Returns `true` if the replacement happened. Returns `false` (and
    /// drops `new`) if the key is absent or its value is not equal to
    /// `current` at the moment of the check. The check and the replacement
    /// happen atomically with respect to all other write operations.
    ///
    /// # Examples
    ///
    /// ```
    /// use squall::HashMap;
    ///
    /// let map = HashMap::new();
    /// let guard = map.guard();
    ///
    /// map.insert("a", 1, &guard);
    /// assert!(map.try_update("a", 2, &1, &guard));
    /// assert!(!map.try_update("a", 3, &1, &guard));
    /// assert_eq!(map.get("a", &guard), Some(&2));
    /// ```
    pub fn try_update<Q>(&self, key: &Q, new: V, current: &V, guard: &Guard<'_>) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: PartialEq,
    {
        self.check_guard(guard);
        self.replace_value(key, new, |v| **v == *current, guard)
            .is_ok()
    }

    /// Updates the value for `key` with `update`, or inserts `value` if the
    /// key is absent.
    ///
    /// Returns the value that ended up in the map. This is an unbounded
    /// retry loop: a lost race (someone else updated, inserted, or removed
    /// the key in between) re-reads fresh state and tries again, so `update`
    /// may be invoked more than once — only the winning invocation's result
    /// is published. There is no progress guarantee under pathological
    /// contention, but every retry starts from freshly observed state, so no
    /// incorrect result is ever produced.
    pub fn update_or_insert<'g, F>(
        &'g self,
        key: K,
        update: F,
        value: V,
        guard: &'g Guard<'_>,
    ) -> &'g V
    where
        F: Fn(&K, &V) -> V,
        V: Clone,
    {
        self.update_or_insert_with(key, update, move || value.clone(), guard)
    }

    /// Updates the value for `key` with `update`, or inserts the result of
    /// `init` if the key is absent.
    ///
    /// See [`HashMap::update_or_insert`] for the retry semantics; both
    /// closures may run more than once under contention.
    ///
    /// # Examples
    ///
    /// ```
    /// use squall::HashMap;
    ///
    /// let map = HashMap::new();
    /// let guard = map.guard();
    ///
    /// map.update_or_insert_with("k", |_, n| n + 1, || 0, &guard);
    /// map.update_or_insert_with("k", |_, n| n + 1, || 0, &guard);
    /// assert_eq!(map.get("k", &guard), Some(&1));
    /// ```
    pub fn update_or_insert_with<'g, F, I>(
        &'g self,
        key: K,
        update: F,
        init: I,
        guard: &'g Guard<'_>,
    ) -> &'g V
    where
        F: Fn(&K, &V) -> V,
        I: Fn() -> V,
    {
        self.check_guard(guard);
        loop {
            match self.get_node(&key, guard) {
                None => {
                    // absent: try to insert the initial value; if another
                    // thread beats us to it, go around and take the update
                    // path instead
                    match self.put(key.clone(), init(), true, guard) {
                        PutResult::Inserted { new } => return new,
                        PutResult::Exists { .. } => continue,
                        PutResult::Replaced { .. } => {
                            unreachable!("no_replacement cannot result in PutResult::Replaced")
                        }
                    }
                }
                Some(node) => {
                    let observed = node.value.load(Ordering::Acquire, guard);
                    // safety: the observed value is protected by our guard
                    let new = update(&node.key, unsafe { &**observed.deref() });
                    let observed_ptr = observed.as_ptr();

                    // publish only if the value is still the exact allocation
                    // we computed from; losing means someone else
                    // transitioned the entry first
                    match self.replace_value(
                        &key,
                        new,
                        |v| std::ptr::eq(v as *const _, observed_ptr as *const _),
                        guard,
                    ) {
                        Ok(v) => return v,
                        Err(_lost) => continue,
                    }
                }
            }
        }
    }

    /// Shared implementation for inserts and overwrites.
    ///
    /// If the key exists: with `no_replacement` the map is untouched and the
    /// caller gets the current value and its own value back; otherwise the
    /// value is swapped in place. If the key does not exist, a fully
    /// initialized node is published at the head of its bucket chain, and a
    /// resize is scheduled (after the stripe lock is released) if the
    /// stripe's element count exceeded the budget.
    fn put<'g>(
        &'g self,
        key: K,
        value: V,
        no_replacement: bool,
        guard: &'g Guard<'_>,
    ) -> PutResult<'g, V> {
        let hash = self.hash(&key);
        let value = Shared::boxed(value, &self.collector);

        loop {
            let tables = self.tables.load(Ordering::Acquire, guard);
            // safety: the generation is protected by our guard
            let t = unsafe { tables.deref() };
            let bini = t.bucket_index(hash);
            let stripe = t.stripe_of(bini);

            let mut resize_desired = false;

            {
                let _stripe = t.lock_stripe(stripe);

                // If the generation was replaced while we were waiting for
                // the lock, we are not holding the right stripe and must
                // retry. This should be a rare occurrence.
                if self.tables.load(Ordering::Acquire, guard) != tables {
                    continue;
                }

                let head = t.bucket(bini, guard);
                let mut p = head;
                while !p.is_null() {
                    // safety: nodes are unlinked only under the stripe lock
                    // we hold, and retired only after that; either way our
                    // guard protects this dereference.
                    let n = unsafe { p.deref() };
                    if n.hash == hash && n.key == key {
                        // the key already exists in the map
                        if no_replacement {
                            let current = n.value.load(Ordering::Acquire, guard);
                            // safety: values are retired only after being
                            // swapped out, which requires the lock we hold
                            return PutResult::Exists {
                                current: unsafe { &**current.deref() },
                                // safety: we own `value` and never shared it
                                not_inserted: unsafe { value.into_box() },
                            };
                        }

                        // a plain pointer swap replaces the value without
                        // tearing under concurrent lock-free readers
                        let old = n.value.swap(value, Ordering::AcqRel, guard);
                        // safety: the old value is unreachable once the swap
                        // is visible; readers that loaded it earlier hold
                        // guards that keep it alive until they are done.
                        unsafe { guard.retire_shared(old) };
                        return PutResult::Replaced {
                            // safety: retirement is deferred past our guard
                            old: unsafe { &**old.deref() },
                            new: unsafe { &**value.deref() },
                        };
                    }
                    p = n.next.load(Ordering::Acquire, guard);
                }

                // the key was not found: publish a fully initialized node at
                // the head of the bucket's chain
                let node = Shared::boxed(
                    Node {
                        hash,
                        key,
                        value: Atomic::from(value),
                        next: Atomic::from(head),
                    },
                    &self.collector,
                );
                t.store_bucket(bini, node);

                if t.increment_count(stripe) > self.budget.load(Ordering::Relaxed) {
                    resize_desired = true;
                }
            }

            // We just performed an insertion. If necessary, grow the table —
            // note that no locks are held here, which is what prevents
            // deadlock. As a result the grow call may turn out to be
            // unnecessary; it takes stripe 0 and backs off if this
            // generation has already been replaced.
            if resize_desired {
                self.grow_tables(tables, guard);
            }

            // safety: the value is now reachable from the published node;
            // any retirement of it is deferred past our guard.
            return PutResult::Inserted {
                new: unsafe { &**value.deref() },
            };
        }
    }

    /// Shared implementation for conditional value replacement.
    ///
    /// Finds `key`'s node under its stripe lock, asks `should_replace` about
    /// the current value, and on approval swaps in `new` and retires the old
    /// allocation. Returns the stored reference on success and hands `new`
    /// back on a miss (absent key or rejected value).
    fn replace_value<'g, Q, F>(
        &'g self,
        key: &Q,
        new: V,
        should_replace: F,
        guard: &'g Guard<'_>,
    ) -> Result<&'g V, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: Fn(&Linked<V>) -> bool,
    {
        let hash = self.hash(key);

        loop {
            let tables = self.tables.load(Ordering::Acquire, guard);
            // safety: the generation is protected by our guard
            let t = unsafe { tables.deref() };
            let bini = t.bucket_index(hash);
            let stripe = t.stripe_of(bini);

            let _stripe = t.lock_stripe(stripe);

            // the generation may have been replaced while we were waiting
            if self.tables.load(Ordering::Acquire, guard) != tables {
                continue;
            }

            let mut p = t.bucket(bini, guard);
            while !p.is_null() {
                // safety: protected by our guard, see `put`
                let n = unsafe { p.deref() };
                if n.hash == hash && n.key.borrow() == key {
                    let current = n.value.load(Ordering::Acquire, guard);
                    // safety: values are retired only under this stripe lock
                    if !should_replace(unsafe { current.deref() }) {
                        return Err(new);
                    }

                    let new = Shared::boxed(new, &self.collector);
                    let old = n.value.swap(new, Ordering::AcqRel, guard);
                    // safety: unreachable after the swap; concurrent readers
                    // hold guards
                    unsafe { guard.retire_shared(old) };
                    // safety: reachable from the node; protected by guard
                    return Ok(unsafe { &**new.deref() });
                }
                p = n.next.load(Ordering::Acquire, guard);
            }

            return Err(new);
        }
    }

    /// Replaces the current generation with a larger one.
    ///
    /// `tables` is the generation the caller deemed too small. The thread
    /// that first obtains its stripe 0 performs the resize; every other
    /// caller observes a replaced generation afterwards and returns early,
    /// so concurrent growers serialize without ever deadlocking.
    fn grow_tables<'g>(&'g self, tables: Shared<'g, Tables<K, V>>, guard: &'g Guard<'_>) {
        // safety: the caller loaded `tables` under this guard
        let t = unsafe { tables.deref() };

        let _zero = t.lock_stripe(0);
        if self.tables.load(Ordering::Acquire, guard) != tables {
            // This generation was already replaced (or the budget adjusted).
            // If we ever decide to do table shrinking, or replace the table
            // for other reasons, this logic has to be revisited.
            return;
        }

        // If the bucket array is badly underused, the budget is the problem
        // rather than the capacity: double it instead of resizing. This
        // guards against insert/remove churn that keeps overflowing a single
        // stripe of an otherwise empty table.
        let approx_count = t.count_sum();
        if approx_count < t.len() / 4 {
            let budget = self.budget.load(Ordering::Relaxed);
            self.budget
                .store(budget.saturating_mul(2), Ordering::Relaxed);
            return;
        }

        let new_len = match next_table_size(t.len()) {
            Some(n) => n,
            None => {
                // The table is as large as it gets. Freeze the budget at a
                // value no stripe can reach so grow_tables is never scheduled
                // again (clear() resets both the table and the budget).
                self.budget.store(usize::MAX, Ordering::Relaxed);
                MAXIMUM_CAPACITY
            }
        };

        // now acquire the remaining stripes, in ascending order
        let _rest: Vec<_> = (1..t.stripes()).map(|s| t.lock_stripe(s)).collect();

        // also double the stripe array while we are at it, unless the caller
        // pinned the stripe count or the limit is reached
        let new_stripes = if self.grow_stripes && t.stripes() < MAX_STRIPES {
            t.stripes() * 2
        } else {
            t.stripes()
        };

        // new_len >= 2 * old_len + 1 and the stripe count at most doubles, so
        // the new table always has at least as many buckets as stripes
        let new_tables = Tables::new(new_len, new_stripes);

        // Rehash every chain into the new bucket array. Nodes are rebuilt
        // because next links are never shared between generations; the value
        // allocations _are_ shared, so readers still walking the old
        // generation observe exactly the values the new one holds.
        for bucket in t.buckets() {
            let mut p = bucket.load(Ordering::Relaxed, guard);
            while !p.is_null() {
                // safety: we hold every stripe lock, so the chains are
                // quiescent, and the generation is protected by our guard
                let n = unsafe { p.deref() };
                let bini = new_tables.bucket_index(n.hash);
                let head = new_tables.bucket(bini, guard);
                let node = Shared::boxed(
                    Node {
                        hash: n.hash,
                        key: n.key.clone(),
                        value: n.value.clone(),
                        next: Atomic::from(head),
                    },
                    &self.collector,
                );
                new_tables.store_bucket(bini, node);
                new_tables.increment_count(new_tables.stripe_of(bini));
                p = n.next.load(Ordering::Relaxed, guard);
            }
        }

        // the budget a fresh table tolerates per stripe, unless it was just
        // frozen because the table hit its maximum size
        if self.budget.load(Ordering::Relaxed) != usize::MAX {
            self.budget
                .store(usize::max(1, new_len / new_stripes), Ordering::Relaxed);
        }

        // publish the new generation, then retire the old one and its nodes
        // (but not their values, which now belong to the new nodes)
        let old = self.tables.swap(
            Shared::boxed(new_tables, &self.collector),
            Ordering::AcqRel,
            guard,
        );
        debug_assert!(old == tables);

        for bucket in t.buckets() {
            let mut p = bucket.load(Ordering::Relaxed, guard);
            while !p.is_null() {
                // safety: old nodes are unreachable for anyone arriving
                // after the swap; in-flight readers hold guards
                let n = unsafe { p.deref() };
                let next = n.next.load(Ordering::Relaxed, guard);
                unsafe { guard.retire_shared(p) };
                p = next;
            }
        }
        // safety: same as for the nodes
        unsafe { guard.retire_shared(old) };
    }
}

impl<K, V, S> Drop for HashMap<K, V, S> {
    fn drop(&mut self) {
        // safety: we have &mut self _and_ all references we have handed out
        // are bound to the lifetime of their borrow of self, so there cannot
        // be any outstanding references into the map.
        let guard = unsafe { crate::reclaim::unprotected() };

        let tables = self.tables.swap(Shared::null(), Ordering::Relaxed, &guard);
        assert!(!tables.is_null(), "a map always has a current generation");

        // safety: we own the final generation and everything reachable from
        // it; garbage retired earlier is reclaimed when `collector` drops.
        let mut tables = unsafe { tables.into_box() };
        tables.drop_entries();
    }
}

impl<K, V, S> Debug for HashMap<K, V, S>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let guard = self.collector.enter();
        f.debug_map().entries(self.iter(&guard)).finish()
    }
}

impl<K, V, S> PartialEq for HashMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.guarded_eq(other, &self.guard(), &other.guard())
    }
}

impl<K, V, S> Eq for HashMap<K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S> Extend<(K, V)> for &HashMap<K, V, S>
where
    K: Sync + Send + Clone + Hash + Eq,
    V: Sync + Send,
    S: BuildHasher,
{
    /// Inserts every pair from `iter`, overwriting values of keys that are
    /// already present. For fallible seeded construction, use
    /// [`HashMap::from_entries`] instead.
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        let guard = self.guard();
        for (key, value) in iter {
            self.insert(key, value, &guard);
        }
    }
}


/// There is no way to write a regular `#[test]` that is _not_ supposed to
/// compile, but it _is_ possible to write `compile_fail` doctests:
///
/// # No references outlive the map.
///
/// ```compile_fail
/// let map = squall::HashMap::<(), ()>::default();
/// let guard = map.guard();
/// let r = map.insert((), (), &guard);
/// drop(map);
/// drop(r);
/// ```
/// ```compile_fail
/// let map = squall::HashMap::<(), ()>::default();
/// let guard = map.guard();
/// map.insert((), (), &guard);
/// let r = map.get(&(), &guard);
/// drop(map);
/// drop(r);
/// ```
///
/// # No references outlive the guard.
///
/// ```compile_fail
/// let map = squall::HashMap::<(), ()>::default();
/// let guard = map.guard();
/// let r = map.insert((), (), &guard);
/// drop(guard);
/// drop(r);
/// ```
/// ```compile_fail
/// let map = squall::HashMap::<(), ()>::default();
/// let guard = map.guard();
/// map.insert((), (), &guard);
/// let r = map.iter(&guard).next();
/// drop(guard);
/// drop(r);
/// ```
#[allow(dead_code)]
struct CompileFailTests;
