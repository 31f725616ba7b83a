//! Midpoint cache: a triple-key hash table keyed by a triangle's
//! unordered vertex-index triple (spec.md §4.1).
//!
//! Rebuilt on demand within each refinement phase and torn down before
//! the next (spec.md §3 Lifecycle). Reproduces the original
//! implementation's sizing and key-construction exactly (SPEC_FULL.md
//! §9) rather than reaching for a generic next-prime routine or
//! `std::collections::HashMap`, since tests peek at bucket contents and
//! the original's collision behavior is itself part of what's being
//! ported faithfully.

use crate::constants::PRIME_TABLE;

/// Cached value for one triangle: whether its surface midpoint lies
/// close to the face boundary, and the cached world-space coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidpointValue {
    pub close: bool,
    pub xyz: [f64; 3],
}

/// Outcome of an [`MidpointHash::add`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

#[derive(Debug, Clone)]
struct Entry {
    key: (i32, i32, i32),
    value: MidpointValue,
}

/// Append-only singly-linked bucket chain, sized to the first prime at
/// or above the requested capacity.
#[derive(Debug, Clone)]
pub struct MidpointHash {
    buckets: Vec<Vec<Entry>>,
    size: usize,
}

fn sorted_key(i0: i32, i1: i32, i2: i32) -> (i32, i32, i32) {
    let min = i0.min(i1).min(i2);
    let max = i0.max(i1).max(i2);
    let mid = i0 + i1 + i2 - min - max;
    (min, mid, max)
}

impl MidpointHash {
    /// Creates a hash table sized to the first prime `>= requested`
    /// (or `requested` itself if larger than every entry in
    /// [`PRIME_TABLE`]).
    #[must_use]
    pub fn create(requested: u32) -> Self {
        let size = PRIME_TABLE
            .iter()
            .copied()
            .find(|&p| p >= requested)
            .unwrap_or(requested.max(1)) as usize;
        Self {
            buckets: vec![Vec::new(); size],
            size,
        }
    }

    /// Capacity of the underlying bucket array.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.size
    }

    fn hash(&self, key: (i32, i32, i32)) -> usize {
        // Original uses signed-int modulo; triangle indices are always
        // non-negative in this crate so this never goes negative.
        ((key.0 + key.1 + key.2).rem_euclid(self.size as i32)) as usize
    }

    /// Looks up the cached value for the unordered triple `(i0, i1, i2)`.
    #[must_use]
    pub fn find(&self, i0: i32, i1: i32, i2: i32) -> Option<MidpointValue> {
        let key = sorted_key(i0, i1, i2);
        let bucket = &self.buckets[self.hash(key)];
        bucket.iter().find(|e| e.key == key).map(|e| e.value)
    }

    /// Inserts `(i0, i1, i2) -> (close, xyz)`. Returns
    /// [`AddOutcome::AlreadyPresent`] without overwriting if the triple
    /// is already cached, matching the original's append-only chain
    /// semantics.
    pub fn add(&mut self, i0: i32, i1: i32, i2: i32, close: bool, xyz: [f64; 3]) -> AddOutcome {
        let key = sorted_key(i0, i1, i2);
        let idx = self.hash(key);
        if self.buckets[idx].iter().any(|e| e.key == key) {
            return AddOutcome::AlreadyPresent;
        }
        self.buckets[idx].push(Entry {
            key,
            value: MidpointValue { close, xyz },
        });
        AddOutcome::Added
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_to_first_prime_at_or_above_request() {
        let h = MidpointHash::create(200);
        assert_eq!(h.capacity(), 251);
    }

    #[test]
    fn falls_back_to_request_beyond_table() {
        let h = MidpointHash::create(3_000_000_000);
        assert_eq!(h.capacity(), 3_000_000_000);
    }

    #[test]
    fn key_is_order_independent() {
        let mut h = MidpointHash::create(16);
        h.add(3, 1, 2, false, [1.0, 2.0, 3.0]);
        assert_eq!(
            h.find(1, 2, 3),
            Some(MidpointValue {
                close: false,
                xyz: [1.0, 2.0, 3.0]
            })
        );
        assert_eq!(h.find(2, 3, 1), h.find(1, 2, 3));
    }

    #[test]
    fn add_is_append_only() {
        let mut h = MidpointHash::create(16);
        assert_eq!(
            h.add(1, 2, 3, false, [0.0, 0.0, 0.0]),
            AddOutcome::Added
        );
        assert_eq!(
            h.add(1, 2, 3, true, [9.0, 9.0, 9.0]),
            AddOutcome::AlreadyPresent
        );
        // The original entry is retained, not overwritten.
        assert_eq!(h.find(1, 2, 3).unwrap().close, false);
    }

    #[test]
    fn find_on_missing_triple_is_none() {
        let h = MidpointHash::create(16);
        assert_eq!(h.find(1, 2, 3), None);
    }
}
