//! # Result Cache
//!
//! Memoizes kernel solids for the expensive, repeatable stages of a bin
//! build: the lofted base unit, the tiled base grid, each cutout tool and
//! the final bin.
//!
//! Keys are structural: they are built from the geometry that determines a
//! solid (normalized numbers, shape parameters), never from outline ids, so
//! two outlines with identical geometry share one entry.
//!
//! Evicted or replaced handles are not released immediately. A build may
//! still be holding one (an evicted base unit is still needed to tile the
//! grid), so they are queued and released by [`ResultCache::release_evicted`]
//! once the build is done.

use std::collections::HashMap;
use std::fmt::Write;

use gridbin_kernel::{Kernel, KernelSolidHandle};
use gridbin_types::{BinParameters, GridArea, Outline, OutlineShape, Point2};
use serde::{Deserialize, Serialize};

/// Cache key for solid lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(pub String);

/// Round to micrometers and print with fixed precision, folding `-0` into
/// `0` so equal geometry always prints the same.
fn num(v: f64) -> String {
    let r = (v * 1e6).round() / 1e6;
    let r = if r == 0.0 { 0.0 } else { r };
    format!("{r:.6}")
}

fn push_shape(key: &mut String, shape: &OutlineShape) {
    match shape {
        OutlineShape::RoundedRect {
            width,
            height,
            radius,
        } => {
            let _ = write!(key, "rr:{}:{}:{}", num(*width), num(*height), num(*radius));
        }
        OutlineShape::Spline { points } => {
            key.push_str("sp");
            for p in points {
                let _ = write!(key, ":{},{}", num(p.x), num(p.y));
            }
        }
    }
}

impl CacheKey {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn base_unit(base_height: f64, tile_size: f64, corner_radius: f64) -> Self {
        Self(format!(
            "unit:h={}:s={}:r={}",
            num(base_height),
            num(tile_size),
            num(corner_radius)
        ))
    }

    /// The base grid only depends on the cell counts, not on where the grid
    /// sits in the editor.
    pub fn base_grid(area: &GridArea, base_height: f64) -> Self {
        Self(format!(
            "grid:w={}:d={}:h={}",
            num(area.width()),
            num(area.height()),
            num(base_height)
        ))
    }

    /// A cutout tool is keyed by its placement relative to the grid center.
    pub fn cutout(outline: &Outline, center: Point2, wall_height: f64) -> Self {
        let mut key = String::from("cut:");
        push_shape(&mut key, &outline.shape);
        let _ = write!(
            key,
            ":dx={}:dy={}:rot={}:depth={}:wall={}",
            num(outline.position.x - center.x),
            num(outline.position.y - center.y),
            num(outline.rotation),
            num(outline.depth.clamp(0.0, wall_height.max(0.0))),
            num(wall_height)
        );
        Self(key)
    }

    pub fn bin(outlines: &[Outline], params: &BinParameters) -> Self {
        let mut key = format!(
            "bin:total={}:base={}",
            num(params.total_height),
            num(params.base_height)
        );
        for outline in outlines {
            key.push('|');
            push_shape(&mut key, &outline.shape);
            let _ = write!(
                key,
                ":x={}:y={}:rot={}:depth={}",
                num(outline.position.x),
                num(outline.position.y),
                num(outline.rotation),
                num(outline.depth)
            );
        }
        Self(key)
    }
}

/// Cache entry with metadata.
#[derive(Debug, Clone)]
struct CacheEntry {
    handle: KernelSolidHandle,
    /// Access stamp for LRU ordering.
    access_count: u64,
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub total_stored: u64,
}

impl CacheStats {
    /// Hit rate as a fraction, or 0.0 if there were no lookups.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Bounded LRU map from structural keys to kernel solids.
#[derive(Debug)]
pub struct ResultCache {
    entries: HashMap<CacheKey, CacheEntry>,
    max_entries: usize,
    total_accesses: u64,
    stats: CacheStats,
    /// Handles dropped from the map, awaiting release.
    evicted: Vec<KernelSolidHandle>,
}

impl ResultCache {
    /// Creates a cache holding at most `max_entries` solids (at least one).
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: HashMap::with_capacity(max_entries),
            max_entries,
            total_accesses: 0,
            stats: CacheStats::default(),
            evicted: Vec::new(),
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<KernelSolidHandle> {
        self.total_accesses += 1;

        if let Some(entry) = self.entries.get_mut(key) {
            entry.access_count = self.total_accesses;
            self.stats.hits += 1;
            Some(entry.handle.clone())
        } else {
            self.stats.misses += 1;
            None
        }
    }

    /// Store `handle` under `key`, evicting least recently used entries if
    /// at capacity. A handle previously stored under the same key is queued
    /// for release.
    pub fn put(&mut self, key: CacheKey, handle: KernelSolidHandle) {
        if let Some(old) = self.entries.remove(&key) {
            if old.handle != handle {
                self.evicted.push(old.handle);
            }
        }
        while self.entries.len() >= self.max_entries {
            if !self.evict_lru() {
                break;
            }
        }

        self.total_accesses += 1;
        self.entries.insert(
            key,
            CacheEntry {
                handle,
                access_count: self.total_accesses,
            },
        );
        self.stats.total_stored += 1;
    }

    fn evict_lru(&mut self) -> bool {
        let lru_key = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.access_count)
            .map(|(key, _)| key.clone());

        match lru_key.and_then(|key| self.entries.remove(&key)) {
            Some(entry) => {
                self.evicted.push(entry.handle);
                self.stats.evictions += 1;
                true
            }
            None => false,
        }
    }

    /// Release every handle evicted since the last call.
    pub fn release_evicted(&mut self, kernel: &mut dyn Kernel) -> usize {
        let count = self.evicted.len();
        for handle in self.evicted.drain(..) {
            kernel.release(&handle);
        }
        count
    }

    /// Drop every entry and release all cached solids.
    pub fn clear(&mut self, kernel: &mut dyn Kernel) {
        for (_, entry) in self.entries.drain() {
            self.evicted.push(entry.handle);
        }
        self.release_evicted(kernel);
    }

    /// Whether `handle` is currently stored.
    pub fn holds(&self, handle: &KernelSolidHandle) -> bool {
        self.entries.values().any(|e| &e.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridbin_kernel::MockKernel;

    fn solid(kernel: &mut MockKernel) -> KernelSolidHandle {
        let p = kernel.rounded_rect_profile(1.0, 1.0, 0.0).unwrap();
        kernel.extrude_profile(p, 0.0, 1.0).unwrap()
    }

    #[test]
    fn test_num_normalizes_noise_and_negative_zero() {
        assert_eq!(num(-0.0), "0.000000");
        assert_eq!(num(-1e-9), "0.000000");
        assert_eq!(num(1.0000000004), num(1.0));
        assert_ne!(num(1.000001), num(1.0));
    }

    #[test]
    fn test_keys_ignore_outline_id() {
        let a = Outline::rounded_rect("a", Point2::new(1.0, 2.0), 3.0, 4.0, 0.5).with_depth(2.0);
        let mut b = a.clone();
        b.id = "b".into();
        let params = BinParameters::new(20.0, 4.75);
        assert_eq!(CacheKey::bin(&[a.clone()], &params), CacheKey::bin(&[b.clone()], &params));
        let c = Point2::new(0.0, 0.0);
        assert_eq!(CacheKey::cutout(&a, c, 14.0), CacheKey::cutout(&b, c, 14.0));
        assert_ne!(
            CacheKey::cutout(&a, c, 14.0),
            CacheKey::cutout(&a.clone().with_depth(3.0), c, 14.0)
        );
    }

    #[test]
    fn test_lru_eviction_is_deferred() {
        let mut kernel = MockKernel::new();
        let mut cache = ResultCache::new(2);
        let (a, b, c) = (solid(&mut kernel), solid(&mut kernel), solid(&mut kernel));

        cache.put(CacheKey::new("a"), a.clone());
        cache.put(CacheKey::new("b"), b.clone());
        assert!(cache.get(&CacheKey::new("a")).is_some());
        cache.put(CacheKey::new("c"), c.clone());

        assert!(cache.get(&CacheKey::new("b")).is_none());
        assert_eq!(cache.stats().evictions, 1);
        // Still alive until the build releases it.
        assert_eq!(kernel.live_solids(), 3);
        assert_eq!(cache.release_evicted(&mut kernel), 1);
        assert_eq!(kernel.live_solids(), 2);
        assert!(cache.holds(&a) && cache.holds(&c));
    }

    #[test]
    fn test_replace_queues_old_handle() {
        let mut kernel = MockKernel::new();
        let mut cache = ResultCache::new(4);
        let (a, b) = (solid(&mut kernel), solid(&mut kernel));
        cache.put(CacheKey::new("k"), a);
        cache.put(CacheKey::new("k"), b.clone());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.release_evicted(&mut kernel), 1);
        assert_eq!(cache.get(&CacheKey::new("k")), Some(b));
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut kernel = MockKernel::new();
        let mut cache = ResultCache::new(4);
        let a = solid(&mut kernel);
        cache.put(CacheKey::new("a"), a);
        cache.clear(&mut kernel);
        assert!(cache.is_empty());
        assert_eq!(kernel.live_solids(), 0);
    }

    #[test]
    fn test_hit_rate() {
        let mut cache = ResultCache::new(0);
        assert_eq!(cache.capacity(), 1);
        assert!(cache.get(&CacheKey::new("x")).is_none());
        assert_eq!(cache.stats().hit_rate(), 0.0);
    }
}
