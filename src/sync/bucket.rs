use super::value_cell::ValueCell;
use crate::common::key_hasher::KeyHasher;

use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use triomphe::Arc as TrioArc;

pub(crate) type CellRef<V> = TrioArc<ValueCell<V>>;

// Most chains hold a single entry when the hash is good.
type Chain<K, V> = SmallVec<[(Arc<K>, CellRef<V>); 1]>;

/// A fixed-size array of independently locked buckets. Each bucket is a chain
/// of the keys (and their value cells) hashed to that bucket.
///
/// Bucket locks are only held while scanning or editing a chain, never while a
/// value is being computed.
pub(crate) struct BucketArray<K, V> {
    buckets: Box<[Mutex<Chain<K, V>>]>,
}

impl<K, V> BucketArray<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        let buckets = (0..capacity).map(|_| Mutex::new(SmallVec::new())).collect();
        Self { buckets }
    }

    pub(crate) fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the cell for the key, creating an empty one if the key is not in
    /// the bucket yet. The returned flag is `true` when the cell was created by
    /// this call.
    ///
    /// `entry_count` is incremented while the bucket is still locked, so a
    /// concurrent `remove_cell` of the new cell always decrements it afterwards.
    pub(crate) fn find_or_create_cell<H>(
        &self,
        index: usize,
        key: &Arc<K>,
        key_hasher: &H,
        entry_count: &AtomicUsize,
    ) -> (CellRef<V>, bool)
    where
        H: KeyHasher<K>,
    {
        let mut chain = self.buckets[index].lock();

        if let Some(cell) = find_in_chain(&chain, key, key_hasher) {
            return (cell, false);
        }

        let cell = TrioArc::new(ValueCell::new());
        chain.push((Arc::clone(key), TrioArc::clone(&cell)));
        entry_count.fetch_add(1, Ordering::AcqRel);
        (cell, true)
    }

    pub(crate) fn find_cell<H>(&self, index: usize, key: &K, key_hasher: &H) -> Option<CellRef<V>>
    where
        H: KeyHasher<K>,
    {
        let chain = self.buckets[index].lock();
        find_in_chain(&chain, key, key_hasher)
    }

    /// Unlinks this exact cell (compared by address, not by key) from the
    /// bucket and decrements `entry_count`. Returns `false` if the cell was not
    /// there.
    pub(crate) fn remove_cell(
        &self,
        index: usize,
        cell: &CellRef<V>,
        entry_count: &AtomicUsize,
    ) -> bool {
        let mut chain = self.buckets[index].lock();
        match chain.iter().position(|(_, c)| TrioArc::ptr_eq(c, cell)) {
            Some(pos) => {
                // Keep the insertion order of the remaining entries.
                chain.remove(pos);
                entry_count.fetch_sub(1, Ordering::AcqRel);
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn bucket_len(&self, index: usize) -> usize {
        self.buckets[index].lock().len()
    }
}

fn find_in_chain<K, V, H>(chain: &Chain<K, V>, key: &K, key_hasher: &H) -> Option<CellRef<V>>
where
    H: KeyHasher<K>,
{
    chain
        .iter()
        .find(|(k, _)| key_hasher.keys_equal(k, key))
        .map(|(_, cell)| TrioArc::clone(cell))
}
