use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use tracing::debug;

use super::record::Record;
use crate::digest::{DigestOutput, Digestible};

/// Number of buckets in a `CategoryIndex`. Part of the bucket-assignment
/// contract, so it is not configurable.
pub const BUCKET_COUNT: usize = 20;

/// Append-only store of every report, hashed by category. Each bucket is a
/// chain of the records whose category hashes to it, kept in insertion order.
#[derive(Debug, PartialEq, Eq)]
pub struct CategoryIndex {
    buckets: Vec<Vec<Record>>,
}

/// Returns the bucket for `category`: the sum of its character codes modulo
/// `BUCKET_COUNT`.
pub fn bucket_for(category: &str) -> usize {
    let sum = category.chars().fold(0u64, |acc, c| acc.wrapping_add(u64::from(c)));
    // the remainder is below BUCKET_COUNT, so it always fits
    (sum % BUCKET_COUNT as u64) as usize
}

impl CategoryIndex {
    pub fn new() -> Self {
        CategoryIndex::default()
    }

    /// Appends `record` to the tail of its category's chain. Never fails;
    /// duplicates of any field are allowed.
    pub fn insert(&mut self, record: Record) -> &Record {
        let bucket = bucket_for(&record.category);
        debug!(category = %record.category, bucket, status = %record.status, "indexing record");
        let chain = &mut self.buckets[bucket];
        chain.push(record);
        // just pushed, so the chain is non-empty
        &chain[chain.len() - 1]
    }

    /// Records whose category is exactly `category` (case-sensitive), in the
    /// order they were inserted. Only the category's own bucket is scanned.
    pub fn find_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a Record> + Clone + 'a {
        self.buckets[bucket_for(category)].iter().filter(move |record| record.category == category)
    }

    /// Records whose description contains `keyword` as a literal,
    /// case-sensitive substring. Buckets are visited in index order and each
    /// chain in insertion order. An empty keyword matches every record.
    pub fn find_by_keyword<'a>(
        &'a self,
        keyword: &'a str,
    ) -> impl Iterator<Item = &'a Record> + Clone + 'a {
        self.buckets.iter().flatten().filter(move |record| record.description.contains(keyword))
    }

    /// Every record paired with the index of the bucket holding it, in bucket
    /// then chain order.
    pub fn list_all(&self) -> impl Iterator<Item = (usize, &Record)> + Clone + '_ {
        self.buckets
            .iter()
            .enumerate()
            .flat_map(|(bucket, chain)| chain.iter().map(move |record| (bucket, record)))
    }

    /// Total number of records across all buckets.
    pub fn count(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    pub fn bucket(&self, bucket: usize) -> Option<&[Record]> {
        self.buckets.get(bucket).map(Vec::as_slice)
    }
}

impl Default for CategoryIndex {
    fn default() -> Self {
        CategoryIndex { buckets: (0..BUCKET_COUNT).map(|_| Vec::new()).collect() }
    }
}

impl Digestible for CategoryIndex {
    fn digest(&self) -> DigestOutput {
        let mut hasher = DefaultHasher::new();
        for (bucket, record) in self.list_all() {
            bucket.hash(&mut hasher);
            record.hash(&mut hasher);
        }
        hasher.finish()
    }
}
