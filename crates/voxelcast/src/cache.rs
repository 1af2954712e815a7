//! Compressed-chunk payload cache for the full-world transfer.
//!
//! Every client that finishes its handshake receives the entire world,
//! so the same chunks are encoded over and over. The cache keeps one
//! compressed payload per chunk key; a block edit invalidates the owning
//! chunk's entry and the next transfer re-encodes it.
//!
//! Coherence is the caller's job: the server holds a single lock across
//! `set_block` + `invalidate` and across `get_or_encode`, so an
//! invalidation always happens before the next read of that key.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;
use voxelcast_world::{Chunk, ChunkCodec, ChunkKey};

/// Cache of compressed chunk payloads, keyed by chunk grid coordinate.
///
/// Payloads are `Arc<[u8]>` so a cached chunk can be handed to many
/// concurrent transfers without copying the bytes.
pub struct ChunkCache<K: ChunkCodec> {
    codec: K,
    payloads: HashMap<ChunkKey, Arc<[u8]>>,
}

impl<K: ChunkCodec> ChunkCache<K> {
    pub fn new(codec: K) -> Self {
        Self {
            codec,
            payloads: HashMap::new(),
        }
    }

    /// Returns the cached payload for `chunk`, encoding and storing it on
    /// a miss. At most one payload exists per key.
    pub fn get_or_encode(&mut self, chunk: &Chunk) -> Arc<[u8]> {
        let key = chunk.key();
        if let Some(payload) = self.payloads.get(&key) {
            return Arc::clone(payload);
        }
        trace!(%key, "encoding chunk payload");
        let payload: Arc<[u8]> = self.codec.encode(chunk.voxels()).into();
        self.payloads.insert(key, Arc::clone(&payload));
        payload
    }

    /// Drops the payload for `key` if present. Safe when absent.
    pub fn invalidate(&mut self, key: &ChunkKey) {
        if self.payloads.remove(key).is_some() {
            trace!(%key, "invalidated chunk payload");
        }
    }

    /// Number of cached payloads.
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Codec that counts how many times `encode` runs.
    struct CountingCodec {
        calls: Arc<AtomicUsize>,
    }

    impl ChunkCodec for CountingCodec {
        fn encode(&self, voxels: &[u16]) -> Vec<u8> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            voxels.iter().flat_map(|v| v.to_le_bytes()).collect()
        }
    }

    fn counting_cache() -> (ChunkCache<CountingCodec>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ChunkCache::new(CountingCodec {
            calls: Arc::clone(&calls),
        });
        (cache, calls)
    }

    fn chunk(x: i32) -> Chunk {
        Chunk::empty(ChunkKey::new(x, 0, 0), [2, 2, 2])
    }

    #[test]
    fn test_get_or_encode_encodes_once_per_key() {
        let (mut cache, calls) = counting_cache();
        let c = chunk(0);

        let first = cache.get_or_encode(&c);
        let second = cache.get_or_encode(&c);

        assert_eq!(calls.load(Ordering::SeqCst), 1, "second read is a hit");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_forces_re_encode() {
        let (mut cache, calls) = counting_cache();
        let c = chunk(0);

        cache.get_or_encode(&c);
        cache.invalidate(&c.key());
        cache.get_or_encode(&c);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalidate_absent_key_is_a_no_op() {
        let (mut cache, _calls) = counting_cache();
        cache.invalidate(&ChunkKey::new(9, 9, 9));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_distinct_keys_are_cached_independently() {
        let (mut cache, calls) = counting_cache();
        let a = chunk(0);
        let b = chunk(1);

        cache.get_or_encode(&a);
        cache.get_or_encode(&b);
        cache.invalidate(&a.key());
        cache.get_or_encode(&b);

        assert_eq!(calls.load(Ordering::SeqCst), 2, "b stays cached");
        assert_eq!(cache.len(), 1);
    }
}
