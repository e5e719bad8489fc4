use crate::node::Node;
use crate::reclaim::{self, Atomic, Guard, Linked, Shared};
use parking_lot::{Mutex, MutexGuard};
use std::borrow::Borrow;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Only the low 31 bits of a hash participate in bucket selection, mirroring
/// the modulo scheme the table sizes are chosen for.
const HASH_BITS: u64 = 0x7fff_ffff;

/// One generation of the map.
///
/// Wrapping the bucket array, the stripe locks, and the per-stripe element
/// counts in a single object lets the map replace all three with one atomic
/// store. The arrays themselves are never resized; growth always publishes a
/// whole new generation. Entries are linked in and out of `buckets` in place
/// (under the owning stripe's lock), so a generation is immutable only in its
/// shape, not in its contents.
#[derive(Debug)]
pub(crate) struct Tables<K, V> {
    /// One lock-free chain of nodes per bucket.
    buckets: Box<[Atomic<Node<K, V>>]>,

    /// `stripes[s]` guards every bucket `b` with `b % stripes.len() == s`.
    stripes: Box<[Mutex<()>]>,

    /// Number of nodes owned by each stripe. Exact only while the stripe's
    /// lock is held; eventually consistent everywhere else.
    counts: Box<[AtomicUsize]>,
}

impl<K, V> Tables<K, V> {
    pub(crate) fn new(buckets: usize, stripes: usize) -> Self {
        assert!(stripes >= 1);
        assert!(buckets >= stripes);
        Self {
            buckets: vec![Atomic::null(); buckets].into_boxed_slice(),
            stripes: (0..stripes).map(|_| Mutex::new(())).collect(),
            counts: (0..stripes).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    /// The number of buckets in this generation.
    pub(crate) fn len(&self) -> usize {
        self.buckets.len()
    }

    /// The number of lock stripes in this generation.
    pub(crate) fn stripes(&self) -> usize {
        self.stripes.len()
    }

    #[inline]
    pub(crate) fn bucket_index(&self, hash: u64) -> usize {
        ((hash & HASH_BITS) % self.buckets.len() as u64) as usize
    }

    #[inline]
    pub(crate) fn stripe_of(&self, bucket_index: usize) -> usize {
        bucket_index % self.stripes.len()
    }

    #[inline]
    pub(crate) fn bucket<'g>(
        &'g self,
        i: usize,
        guard: &'g Guard<'_>,
    ) -> Shared<'g, Node<K, V>> {
        self.buckets[i].load(Ordering::Acquire, guard)
    }

    #[inline]
    pub(crate) fn store_bucket(&self, i: usize, new: Shared<'_, Node<K, V>>) {
        self.buckets[i].store(new, Ordering::Release)
    }

    #[inline]
    pub(crate) fn lock_stripe(&self, s: usize) -> MutexGuard<'_, ()> {
        self.stripes[s].lock()
    }

    /// Walks the chain of `hash`'s bucket without taking any lock.
    pub(crate) fn find<'g, Q>(
        &'g self,
        hash: u64,
        key: &Q,
        guard: &'g Guard<'_>,
    ) -> Shared<'g, Node<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let bini = self.bucket_index(hash);
        let mut node = self.bucket(bini, guard);
        while !node.is_null() {
            // safety: the node was published with release ordering before we
            // could load it, and it is only retired once it is unreachable
            // from any generation. our guard keeps retired nodes alive.
            let n = unsafe { node.deref() };
            if n.hash == hash && n.key.borrow() == key {
                break;
            }
            node = n.next.load(Ordering::Acquire, guard);
        }
        node
    }

    /// Bumps the element count of stripe `s`.
    ///
    /// The caller must hold the stripe's lock; the count cell is atomic only
    /// so that the resize heuristic and `len` can read it from elsewhere.
    pub(crate) fn increment_count(&self, s: usize) -> usize {
        let count = self.counts[s]
            .load(Ordering::Relaxed)
            .checked_add(1)
            .expect("capacity exceeded: element count overflowed");
        self.counts[s].store(count, Ordering::Relaxed);
        count
    }

    /// Decrements the element count of stripe `s`. The caller must hold the
    /// stripe's lock.
    pub(crate) fn decrement_count(&self, s: usize) {
        let count = self.counts[s].load(Ordering::Relaxed) - 1;
        self.counts[s].store(count, Ordering::Relaxed);
    }

    /// Sum of all per-stripe counts. Exact when the caller holds every stripe
    /// lock, approximate otherwise.
    pub(crate) fn count_sum(&self) -> usize {
        self.counts.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    /// Iterate the bucket slots in index order.
    pub(crate) fn buckets(&self) -> impl Iterator<Item = &Atomic<Node<K, V>>> {
        self.buckets.iter()
    }

    /// Frees every node and value reachable from this generation.
    ///
    /// Only called when the map is dropped. Generations retired during the
    /// map's lifetime have their nodes and values retired individually, so
    /// dropping the `Tables` allocation itself never touches them.
    pub(crate) fn drop_entries(&mut self) {
        // safety: we have &mut self _and_ all references we have returned are
        // bound to the lifetime of their borrow of self, so there cannot be
        // any outstanding references to anything in the map.
        let guard = unsafe { reclaim::unprotected() };

        for bucket in Vec::from(std::mem::replace(
            &mut self.buckets,
            vec![].into_boxed_slice(),
        )) {
            let mut p = bucket.load(Ordering::Relaxed, &guard);
            while !p.is_null() {
                // safety: we own every node and value still reachable from
                // this generation.
                let node = Linked::into_inner(*unsafe { p.into_box() });
                let _ = unsafe { node.value.into_box() };
                p = node.next.load(Ordering::Relaxed, &guard);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_maps_to_its_stripe() {
        let tables = Tables::<usize, usize>::new(31, 4);
        for hash in 0..1024u64 {
            let bini = tables.bucket_index(hash);
            assert!(bini < tables.len());
            assert!(tables.stripe_of(bini) < tables.stripes());
            assert_eq!(tables.stripe_of(bini), bini % 4);
        }
    }

    #[test]
    fn high_hash_bits_do_not_select_buckets() {
        let tables = Tables::<usize, usize>::new(31, 4);
        for hash in 0..64u64 {
            assert_eq!(
                tables.bucket_index(hash),
                tables.bucket_index(hash | 1 << 40)
            );
        }
    }
}
