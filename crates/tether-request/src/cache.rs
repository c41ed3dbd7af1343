//! Bounded response cache.

use std::collections::{BTreeMap, HashMap};

use tether_core::HttpResponse;
use tokio::time::Instant;

use crate::signature::RequestSignature;

/// Default number of cached responses.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// A cached successful response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Signature of the request that produced the response.
    pub signature: RequestSignature,
    /// The response.
    pub response: HttpResponse,
    /// When the entry was last inserted.
    pub inserted_at: Instant,
}

/// Insertion-ordered cache that evicts its oldest entry when full.
///
/// Re-inserting a signature replaces the response and makes the entry the
/// newest. A capacity of zero disables caching.
#[derive(Debug)]
pub struct ResponseCache {
    capacity: usize,
    entries: HashMap<RequestSignature, (u64, CacheEntry)>,
    order: BTreeMap<u64, RequestSignature>,
    next_seq: u64,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ResponseCache {
    /// Create a cache holding at most `capacity` responses.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Cached response for `signature`.
    #[must_use]
    pub fn get(&self, signature: &RequestSignature) -> Option<&HttpResponse> {
        self.entries
            .get(signature)
            .map(|(_, entry)| &entry.response)
    }

    /// Full entry for `signature`.
    #[must_use]
    pub fn entry(&self, signature: &RequestSignature) -> Option<&CacheEntry> {
        self.entries.get(signature).map(|(_, entry)| entry)
    }

    /// Store `response`, returning the signature evicted to make room.
    pub fn insert(
        &mut self,
        signature: RequestSignature,
        response: HttpResponse,
    ) -> Option<RequestSignature> {
        if self.capacity == 0 {
            return None;
        }

        if let Some((seq, _)) = self.entries.remove(&signature) {
            self.order.remove(&seq);
        }

        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        self.order.insert(seq, signature.clone());
        self.entries.insert(
            signature.clone(),
            (
                seq,
                CacheEntry {
                    signature,
                    response,
                    inserted_at: Instant::now(),
                },
            ),
        );

        if self.entries.len() > self.capacity {
            let (_, oldest) = self.order.pop_first()?;
            self.entries.remove(&oldest);
            return Some(oldest);
        }
        None
    }

    /// Drop the entry for `signature`. Returns `true` if it was cached.
    pub fn remove(&mut self, signature: &RequestSignature) -> bool {
        match self.entries.remove(signature) {
            Some((seq, _)) => {
                self.order.remove(&seq);
                true
            },
            None => false,
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Number of cached responses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of cached responses.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
