use crate::storage::types::Key;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Fixed-size hash partitioning.
///
/// Keys hash into `num_partitions` partitions per bucket; partitions and
/// buckets are spread over sorted member lists by modulo. Deterministic for a
/// given build, so every node of the ensemble computes the same owners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partitioner {
    num_partitions: u32,
}

impl Partitioner {
    pub fn new(num_partitions: u32) -> Self {
        Self {
            num_partitions: num_partitions.max(1),
        }
    }

    pub fn num_partitions(&self) -> u32 {
        self.num_partitions
    }

    pub fn get_partition(&self, bucket: &str, key: &Key) -> u32 {
        let mut hasher = DefaultHasher::new();
        bucket.hash(&mut hasher);
        key.as_bytes().hash(&mut hasher);
        let hash = hasher.finish() as u32;
        hash % self.num_partitions
    }

    /// Index of the slot (out of `slots`) a bucket falls in.
    pub fn bucket_slot(&self, bucket: &str, slots: usize) -> usize {
        let mut hasher = DefaultHasher::new();
        bucket.hash(&mut hasher);
        (hasher.finish() as usize) % slots.max(1)
    }

    /// Index of the member (out of `members`) owning `partition`.
    pub fn owner_index(&self, partition: u32, members: usize) -> usize {
        (partition as usize) % members.max(1)
    }
}
