//! Gram cache for cutting-plane gradients
//!
//! The master problem solver needs the inner products ⟨g_i, g_j⟩ between the
//! gradients of all planes in the bundle. Each product costs a pass over a
//! D-dimensional vector, and the bundle only grows, so products are kept in
//! an LRU cache. The Gram matrix is symmetric, so only (i, j) with i <= j is
//! stored.

use crate::core::Bundle;
use crate::utils::linalg::dot;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Cache key for a plane pair, normalized so that i <= j
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    i: usize,
    j: usize,
}

impl CacheKey {
    /// Create a normalized cache key where i <= j
    fn new(i: usize, j: usize) -> Self {
        if i <= j {
            Self { i, j }
        } else {
            Self { i: j, j: i }
        }
    }
}

/// LRU cache of inner products between plane gradients
pub struct GramCache {
    cache: LruCache<CacheKey, f64>,
    hits: u64,
    misses: u64,
}

impl GramCache {
    /// Create a new cache with specified capacity in number of entries
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Create a cache with capacity based on memory size in bytes
    pub fn with_memory_limit(memory_bytes: usize) -> Self {
        let capacity = (memory_bytes / 32).max(1); // key + value + list overhead
        Self::new(capacity)
    }

    /// Get a cached inner product
    pub fn get(&mut self, i: usize, j: usize) -> Option<f64> {
        let key = CacheKey::new(i, j);
        if let Some(&value) = self.cache.get(&key) {
            self.hits += 1;
            Some(value)
        } else {
            self.misses += 1;
            None
        }
    }

    /// Store an inner product
    pub fn put(&mut self, i: usize, j: usize, value: f64) {
        self.cache.put(CacheKey::new(i, j), value);
    }

    /// Inner product of the gradients of planes `i` and `j`, computed on a
    /// cache miss
    pub fn inner_product(&mut self, bundle: &Bundle, i: usize, j: usize) -> f64 {
        if let Some(value) = self.get(i, j) {
            return value;
        }
        let planes = bundle.planes();
        let value = dot(&planes[i].gradient, &planes[j].gradient);
        self.put(i, j, value);
        value
    }

    /// Dense Gram matrix of all planes in the bundle, row-major
    pub fn gram_matrix(&mut self, bundle: &Bundle) -> Vec<f64> {
        let n = bundle.len();
        let mut gram = vec![0.0; n * n];
        for i in 0..n {
            for j in i..n {
                let value = self.inner_product(bundle, i, j);
                gram[i * n + j] = value;
                gram[j * n + i] = value;
            }
        }
        gram
    }

    /// Get cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.cache.cap().get(),
            size: self.cache.len(),
        }
    }

    /// Clear the cache
    pub fn clear(&mut self) {
        self.cache.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}
