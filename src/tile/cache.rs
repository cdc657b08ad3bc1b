//! Bounded-memory tile cache
//!
//! The cache maps tile keys to decoded tiles under a byte budget.
//! Lookups for the same key collapse onto a single decode
//! (single-flight); lookups for different keys proceed in parallel.
//!
//! Two locking levels: a short-held global lock guards the slot table,
//! the residency queues and the byte accounting; a per-slot lock
//! guards the decode critical section and is only ever acquired after
//! the global lock has been released. Decoding therefore never blocks
//! unrelated keys.
//!
//! Eviction is FIFO into a secondary "detached" tier with twice the
//! primary budget. The detached tier stands in for soft references: a
//! tile evicted from the primary tier can still be found for a while,
//! and once it falls out of the secondary tier only a weak reference
//! remains in its slot. A slot whose weak reference has drained is a
//! legitimate miss and is repopulated by a fresh decode.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Weak};

use log::{debug, trace};

use crate::tiff::errors::TiffResult;
use crate::tile::index::TileIndex;
use crate::tile::tile::Tile;

/// Cache key: an image fingerprint plus the tile index
///
/// The fingerprint makes keys unique across engines that share one
/// cache; each open image is assigned a distinct fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub fingerprint: u64,
    pub index: TileIndex,
}

impl TileKey {
    pub fn new(fingerprint: u64, index: TileIndex) -> Self {
        TileKey { fingerprint, index }
    }
}

/// Per-key slot holding the soft reference and the decode gate
struct Slot {
    gate: Mutex<Weak<Tile>>,
}

impl Slot {
    fn new() -> Self {
        Slot {
            gate: Mutex::new(Weak::new()),
        }
    }
}

/// State behind the global map lock
struct CacheShared {
    max_memory: u64,
    slots: HashMap<TileKey, Arc<Slot>>,
    /// Strong residents, oldest first
    primary: VecDeque<(TileKey, Arc<Tile>)>,
    primary_bytes: u64,
    /// Detached-but-still-cached residents, oldest first
    detached: VecDeque<(TileKey, Arc<Tile>)>,
    detached_bytes: u64,
}

impl CacheShared {
    fn remove_key(&mut self, key: &TileKey) {
        if let Some(pos) = self.primary.iter().position(|(k, _)| k == key) {
            if let Some((_, tile)) = self.primary.remove(pos) {
                self.primary_bytes -= tile.stored_data_length() as u64;
            }
        }
        if let Some(pos) = self.detached.iter().position(|(k, _)| k == key) {
            if let Some((_, tile)) = self.detached.remove(pos) {
                self.detached_bytes -= tile.stored_data_length() as u64;
            }
        }
    }

    fn insert_strong(&mut self, key: TileKey, tile: Arc<Tile>) {
        self.remove_key(&key);
        self.primary_bytes += tile.stored_data_length() as u64;
        self.primary.push_back((key, tile));
        self.rebalance();
    }

    /// Detaches oldest strong residents until the primary tier fits,
    /// then trims the detached tier to its doubled budget
    fn rebalance(&mut self) {
        while self.primary_bytes > self.max_memory {
            match self.primary.pop_front() {
                Some((key, tile)) => {
                    let size = tile.stored_data_length() as u64;
                    self.primary_bytes -= size;
                    self.detached_bytes += size;
                    trace!("cache: detaching tile {}", key.index);
                    self.detached.push_back((key, tile));
                }
                None => break,
            }
        }
        while self.detached_bytes > self.max_memory.saturating_mul(2) {
            match self.detached.pop_front() {
                Some((key, tile)) => {
                    self.detached_bytes -= tile.stored_data_length() as u64;
                    trace!("cache: dropping detached tile {}", key.index);
                }
                None => break,
            }
        }
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.primary.clear();
        self.detached.clear();
        self.primary_bytes = 0;
        self.detached_bytes = 0;
    }
}

/// Fingerprint-keyed cache of decoded tiles
pub struct TileCache {
    shared: Mutex<CacheShared>,
}

impl TileCache {
    /// Creates a cache with the given byte budget (0 disables caching)
    pub fn new(max_memory: u64) -> Self {
        TileCache {
            shared: Mutex::new(CacheShared {
                max_memory,
                slots: HashMap::new(),
                primary: VecDeque::new(),
                primary_bytes: 0,
                detached: VecDeque::new(),
                detached_bytes: 0,
            }),
        }
    }

    /// Adjusts the byte budget; 0 disables caching and drops all state
    pub fn set_max_memory(&self, bytes: u64) {
        let mut shared = self.shared.lock().unwrap();
        shared.max_memory = bytes;
        if bytes == 0 {
            shared.clear();
        } else {
            shared.rebalance();
        }
    }

    /// Turns the cache off entirely
    pub fn disable(&self) {
        self.set_max_memory(0);
    }

    /// The current byte budget
    pub fn max_memory(&self) -> u64 {
        self.shared.lock().unwrap().max_memory
    }

    /// Bytes currently held by strong (primary-tier) residents
    pub fn resident_bytes(&self) -> u64 {
        self.shared.lock().unwrap().primary_bytes
    }

    /// Keys of the strong residents, oldest first
    pub fn resident_keys(&self) -> Vec<TileKey> {
        self.shared
            .lock()
            .unwrap()
            .primary
            .iter()
            .map(|(k, _)| *k)
            .collect()
    }

    /// Whether a key currently sits in the detached tier
    pub fn is_detached(&self, key: &TileKey) -> bool {
        self.shared
            .lock()
            .unwrap()
            .detached
            .iter()
            .any(|(k, _)| k == key)
    }

    /// Fetches a tile, decoding at most once per sustained residency
    ///
    /// Concurrent calls with the same key block on the slot's gate and
    /// all observe the single decode's result. A decode failure is
    /// returned to every waiter that triggered it but is not memoized;
    /// the next call runs the loader again.
    pub fn read_tile<F>(&self, key: TileKey, loader: F) -> TiffResult<Arc<Tile>>
    where
        F: FnOnce() -> TiffResult<Tile>,
    {
        // Disabled cache: decode on every call, no slot bookkeeping
        let slot = {
            let mut shared = self.shared.lock().unwrap();
            if shared.max_memory == 0 {
                drop(shared);
                return Ok(Arc::new(loader()?));
            }
            shared
                .slots
                .entry(key)
                .or_insert_with(|| Arc::new(Slot::new()))
                .clone()
        };

        // The global lock is released; the gate serializes this key only
        let mut gate = slot.gate.lock().unwrap();

        if let Some(tile) = gate.upgrade() {
            trace!("cache hit for tile {}", key.index);
            let mut shared = self.shared.lock().unwrap();
            let in_primary = shared.primary.iter().any(|(k, _)| k == &key);
            if !in_primary {
                // Detached or fully drained-to-weak: promote back
                shared.insert_strong(key, tile.clone());
            }
            return Ok(tile);
        }

        debug!("cache miss for tile {}, decoding", key.index);
        let tile = Arc::new(loader()?);
        *gate = Arc::downgrade(&tile);

        let mut shared = self.shared.lock().unwrap();
        shared.insert_strong(key, tile.clone());
        Ok(tile)
    }
}

impl Default for TileCache {
    fn default() -> Self {
        TileCache::new(crate::config::default_cache_budget())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn unit_tile(index: TileIndex, bytes: usize) -> Tile {
        let mut tile = Tile::new(index, 1, 1, 1, 1, 1, 1);
        tile.set_decoded(vec![0xAB; bytes]);
        tile
    }

    fn key(n: u32) -> TileKey {
        TileKey::new(1, TileIndex::new(0, n, 0))
    }

    #[test]
    fn caches_and_reuses_decodes() {
        let cache = TileCache::new(1024);
        let decodes = AtomicUsize::new(0);

        for _ in 0..5 {
            let tile = cache
                .read_tile(key(0), || {
                    decodes.fetch_add(1, Ordering::SeqCst);
                    Ok(unit_tile(TileIndex::new(0, 0, 0), 16))
                })
                .unwrap();
            assert_eq!(tile.stored_data_length(), 16);
        }
        assert_eq!(decodes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fifo_eviction_detaches_oldest() {
        let cache = TileCache::new(3);

        for n in 1..=5u32 {
            cache
                .read_tile(key(n), || Ok(unit_tile(TileIndex::new(0, n, 0), 1)))
                .unwrap();
        }

        let resident = cache.resident_keys();
        assert_eq!(resident, vec![key(3), key(4), key(5)]);
        assert!(cache.is_detached(&key(1)));
        assert!(cache.is_detached(&key(2)));
        assert!(cache.resident_bytes() <= 3);
    }

    #[test]
    fn detached_hit_promotes_without_redecoding() {
        let cache = TileCache::new(2);
        let decodes = AtomicUsize::new(0);

        let mut load = |n: u32| {
            cache
                .read_tile(key(n), || {
                    decodes.fetch_add(1, Ordering::SeqCst);
                    Ok(unit_tile(TileIndex::new(0, n, 0), 1))
                })
                .unwrap()
        };

        load(1);
        load(2);
        load(3); // evicts key(1) to the detached tier
        assert!(cache.is_detached(&key(1)));

        load(1); // promoted back, no new decode
        assert_eq!(decodes.load(Ordering::SeqCst), 3);
        assert!(!cache.is_detached(&key(1)));
        assert!(cache.resident_keys().contains(&key(1)));
    }

    #[test]
    fn budget_holds_at_every_quiescent_point() {
        let cache = TileCache::new(100);
        for n in 0..50u32 {
            cache
                .read_tile(key(n), || Ok(unit_tile(TileIndex::new(0, n, 0), 7)))
                .unwrap();
            assert!(cache.resident_bytes() <= 100);
        }
    }

    #[test]
    fn oversized_tile_is_never_strong_resident() {
        let cache = TileCache::new(10);
        let tile = cache
            .read_tile(key(9), || Ok(unit_tile(TileIndex::new(0, 9, 0), 50)))
            .unwrap();
        assert_eq!(tile.stored_data_length(), 50);
        assert_eq!(cache.resident_bytes(), 0);
    }

    #[test]
    fn disabled_cache_decodes_every_time() {
        let cache = TileCache::new(0);
        let decodes = AtomicUsize::new(0);
        for _ in 0..3 {
            cache
                .read_tile(key(0), || {
                    decodes.fetch_add(1, Ordering::SeqCst);
                    Ok(unit_tile(TileIndex::new(0, 0, 0), 4))
                })
                .unwrap();
        }
        assert_eq!(decodes.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn failures_are_not_memoized() {
        let cache = TileCache::new(1024);
        let attempts = AtomicUsize::new(0);

        for round in 0..2 {
            let result = cache.read_tile(key(0), || {
                attempts.fetch_add(1, Ordering::SeqCst);
                if round == 0 {
                    Err(crate::tiff::errors::TiffError::GenericError(
                        "simulated codec failure".to_string(),
                    ))
                } else {
                    Ok(unit_tile(TileIndex::new(0, 0, 0), 4))
                }
            });
            assert_eq!(result.is_ok(), round == 1);
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn single_flight_for_concurrent_same_key_reads() {
        let cache = Arc::new(TileCache::new(1024 * 1024));
        let decodes = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let decodes = Arc::clone(&decodes);
                thread::spawn(move || {
                    let tile = cache
                        .read_tile(key(7), || {
                            decodes.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(100));
                            Ok(unit_tile(TileIndex::new(0, 7, 0), 32))
                        })
                        .unwrap();
                    tile.decoded().unwrap().to_vec()
                })
            })
            .collect();

        let results: Vec<Vec<u8>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(decodes.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn distinct_keys_decode_in_parallel() {
        let cache = Arc::new(TileCache::new(1024 * 1024));
        let start = std::time::Instant::now();

        let handles: Vec<_> = (0..4u32)
            .map(|n| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    cache
                        .read_tile(key(n), || {
                            thread::sleep(Duration::from_millis(80));
                            Ok(unit_tile(TileIndex::new(0, n, 0), 8))
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Serialized decodes would need ~320ms
        assert!(start.elapsed() < Duration::from_millis(300));
    }
}
