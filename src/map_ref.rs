use crate::iter::*;
use crate::reclaim::{Guard, GuardRef};
use crate::HashMap;
use std::borrow::Borrow;
use std::fmt::{self, Debug, Formatter};
use std::hash::{BuildHasher, Hash};
use std::ops::Index;

use crate::map::TryInsertError;

/// A reference to a [`HashMap`], constructed with [`HashMap::pin`] or
/// [`HashMap::with_guard`].
///
/// The current thread will be pinned for the duration of this reference,
/// which keeps any garbage generated by the map from being reclaimed.
pub struct HashMapRef<'map, K, V, S = crate::DefaultHashBuilder> {
    map: &'map HashMap<K, V, S>,
    guard: GuardRef<'map>,
}

impl<K, V, S> HashMap<K, V, S> {
    /// Get a reference to this map with the current thread pinned.
    ///
    /// Keep in mind that for as long as you hold onto this, you are
    /// preventing the collection of garbage generated by the map.
    pub fn pin(&self) -> HashMapRef<'_, K, V, S> {
        HashMapRef {
            guard: GuardRef::Owned(self.guard()),
            map: self,
        }
    }

    /// Get a reference to this map with the given guard.
    pub fn with_guard<'g>(&'g self, guard: &'g Guard<'g>) -> HashMapRef<'g, K, V, S> {
        HashMapRef {
            map: self,
            guard: GuardRef::Ref(guard),
        }
    }
}

impl<K, V, S> HashMapRef<'_, K, V, S> {
    /// Returns the number of entries in the map.
    /// See also [`HashMap::len`].
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the map is empty. Otherwise returns `false`.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// An iterator visiting all key-value pairs in arbitrary order.
    /// The iterator element type is `(&'g K, &'g V)`.
    /// See also [`HashMap::iter`].
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.map.iter(&self.guard)
    }

    /// An iterator visiting all keys in arbitrary order.
    /// The iterator element type is `&'g K`.
    pub fn keys(&self) -> Keys<'_, K, V> {
        self.map.keys(&self.guard)
    }

    /// An iterator visiting all values in arbitrary order.
    /// The iterator element type is `&'g V`.
    pub fn values(&self) -> Values<'_, K, V> {
        self.map.values(&self.guard)
    }

    /// Copies every entry into a new `Vec` under all stripe locks.
    /// See also [`HashMap::snapshot`].
    pub fn snapshot(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.map.snapshot()
    }

    /// Clears the map, removing all key-value pairs.
    /// See also [`HashMap::clear`].
    pub fn clear(&self) {
        self.map.clear(&self.guard)
    }
}

impl<K, V, S> HashMapRef<'_, K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Tests if `key` is a key in this map.
    ///
    /// The key may be any borrowed form of the map's key type, but `Hash`
    /// and `Eq` on the borrowed form must match those for the key type.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.contains_key(key, &self.guard)
    }

    /// Returns a reference to the value corresponding to the key, without
    /// taking any lock.
    ///
    /// The key may be any borrowed form of the map's key type, but `Hash`
    /// and `Eq` on the borrowed form must match those for the key type.
    pub fn get<'g, Q>(&'g self, key: &Q) -> Option<&'g V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.get(key, &self.guard)
    }

    /// Returns the key-value pair corresponding to `key`.
    ///
    /// The key may be any borrowed form of the map's key type, but `Hash`
    /// and `Eq` on the borrowed form must match those for the key type.
    pub fn get_key_value<'g, Q>(&'g self, key: &Q) -> Option<(&'g K, &'g V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.get_key_value(key, &self.guard)
    }

    /// Removes the key (and its corresponding value) from this map.
    /// Returns the previous value associated with the given key, if any.
    pub fn remove<'g, Q>(&'g self, key: &Q) -> Option<&'g V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.remove(key, &self.guard)
    }

    /// Removes the key from the map, returning the stored key and value if
    /// the key was present.
    pub fn remove_entry<'g, Q>(&'g self, key: &Q) -> Option<(&'g K, &'g V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.remove_entry(key, &self.guard)
    }

    /// Removes the key only if its current value equals `expected`.
    pub fn remove_if<'g, Q>(&'g self, key: &Q, expected: &V) -> Option<&'g V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: PartialEq,
    {
        self.map.remove_if(key, expected, &self.guard)
    }
}

impl<K, V, S> HashMapRef<'_, K, V, S>
where
    K: Sync + Send + Clone + Hash + Eq,
    V: Sync + Send,
    S: BuildHasher,
{
    /// Inserts a key-value pair into the map, returning the previous value
    /// if the key was already present.
    /// See also [`HashMap::insert`].
    pub fn insert<'g>(&'g self, key: K, value: V) -> Option<&'g V> {
        self.map.insert(key, value, &self.guard)
    }

    /// Inserts a key-value pair into the map unless the key already exists.
    /// See also [`HashMap::try_insert`].
    pub fn try_insert<'g>(&'g self, key: K, value: V) -> Result<&'g V, TryInsertError<'g, V>> {
        self.map.try_insert(key, value, &self.guard)
    }

    /// Returns the value for `key`, inserting `value` if the key is absent.
    pub fn get_or_insert<'g>(&'g self, key: K, value: V) -> &'g V {
        self.map.get_or_insert(key, value, &self.guard)
    }

    /// Returns the value for `key`, inserting the result of `init` if the
    /// key is absent. A lost insert race returns the existing value and
    /// drops the factory's result.
    pub fn get_or_insert_with<'g, F>(&'g self, key: K, init: F) -> &'g V
    where
        F: FnOnce() -> V,
    {
        self.map.get_or_insert_with(key, init, &self.guard)
    }

    /// Replaces the value for `key` with `new` if the current value equals
    /// `current`. See also [`HashMap::try_update`].
    pub fn try_update<Q>(&self, key: &Q, new: V, current: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: PartialEq,
    {
        self.map.try_update(key, new, current, &self.guard)
    }

    /// Updates the value for `key` with `update`, or inserts `value` if the
    /// key is absent. See also [`HashMap::update_or_insert`].
    pub fn update_or_insert<'g, F>(&'g self, key: K, update: F, value: V) -> &'g V
    where
        F: Fn(&K, &V) -> V,
        V: Clone,
    {
        self.map.update_or_insert(key, update, value, &self.guard)
    }

    /// Updates the value for `key` with `update`, or inserts the result of
    /// `init` if the key is absent.
    /// See also [`HashMap::update_or_insert_with`].
    pub fn update_or_insert_with<'g, F, I>(&'g self, key: K, update: F, init: I) -> &'g V
    where
        F: Fn(&K, &V) -> V,
        I: Fn() -> V,
    {
        self.map
            .update_or_insert_with(key, update, init, &self.guard)
    }

}

impl<'g, K, V, S> IntoIterator for &'g HashMapRef<'_, K, V, S> {
    type IntoIter = Iter<'g, K, V>;
    type Item = (&'g K, &'g V);

    fn into_iter(self) -> Self::IntoIter {
        self.map.iter(&self.guard)
    }
}

impl<K, V, S> Debug for HashMapRef<'_, K, V, S>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self).finish()
    }
}

impl<K, V, S> Clone for HashMapRef<'_, K, V, S> {
    fn clone(&self) -> Self {
        self.map.pin()
    }
}

impl<K, V, S> PartialEq for HashMapRef<'_, K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.map.guarded_eq(other.map, &self.guard, &other.guard)
    }
}

impl<K, V, S> PartialEq<HashMap<K, V, S>> for HashMapRef<'_, K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &HashMap<K, V, S>) -> bool {
        self.map.guarded_eq(other, &self.guard, &other.guard())
    }
}

impl<K, V, S> PartialEq<HashMapRef<'_, K, V, S>> for HashMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &HashMapRef<'_, K, V, S>) -> bool {
        self.guarded_eq(other.map, &self.guard(), &other.guard)
    }
}

impl<K, V, S> Eq for HashMapRef<'_, K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, Q, V, S> Index<&'_ Q> for HashMapRef<'_, K, V, S>
where
    K: Hash + Eq + Borrow<Q>,
    Q: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    type Output = V;

    /// Returns a reference to the value corresponding to the supplied key.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the map.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}
