//! Memoized image decoding keyed by the raw input bytes.
//!
//! Decoding is deterministic, so re-decoding the same upload every time
//! an unrelated filter parameter changes is wasted work. [`DecodeCache`]
//! remembers decoded grids by a SipHash fingerprint of the source bytes
//! and confirms every hit with a byte-exact comparison, so two
//! different inputs can never share an entry.
//!
//! The cache is owned by the caller (there is no global instance) and
//! holds at most `capacity` entries, evicting the least recently used.

use std::collections::VecDeque;
use std::hash::Hasher;
use std::sync::Arc;

use siphasher::sip::SipHasher13;

use crate::decode::load_image;
use crate::types::{PipelineError, RgbImage};

/// A decoded image together with the bytes it came from.
struct Entry {
    fingerprint: u64,
    source: Vec<u8>,
    image: Arc<RgbImage>,
}

/// Bounded least-recently-used cache for [`load_image`].
pub struct DecodeCache {
    capacity: usize,
    /// Most recently used entry at the back.
    entries: VecDeque<Entry>,
    hits: u64,
    misses: u64,
}

impl DecodeCache {
    /// Capacity used by [`DecodeCache::default`].
    pub const DEFAULT_CAPACITY: usize = 8;

    /// Create an empty cache holding at most `capacity` decoded images.
    ///
    /// A capacity of zero disables caching: every call decodes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Decode `bytes`, returning a shared grid from the cache when the
    /// same byte sequence was decoded before.
    ///
    /// Failed decodes are not cached.
    ///
    /// # Errors
    ///
    /// Propagates [`PipelineError::EmptyInput`] and
    /// [`PipelineError::DecodeFailure`] from [`load_image`].
    pub fn load(&mut self, bytes: &[u8]) -> Result<Arc<RgbImage>, PipelineError> {
        let fingerprint = fingerprint(bytes);

        if let Some(pos) = self
            .entries
            .iter()
            .position(|e| e.fingerprint == fingerprint && e.source == bytes)
            && let Some(entry) = self.entries.remove(pos)
        {
            self.hits += 1;
            log::trace!("decode cache hit ({} bytes, {fingerprint:016x})", bytes.len());
            let image = Arc::clone(&entry.image);
            self.entries.push_back(entry);
            return Ok(image);
        }

        self.misses += 1;
        log::trace!("decode cache miss ({} bytes, {fingerprint:016x})", bytes.len());
        let image = Arc::new(load_image(bytes)?);

        if self.capacity > 0 {
            while self.entries.len() >= self.capacity {
                self.entries.pop_front();
            }
            self.entries.push_back(Entry {
                fingerprint,
                source: bytes.to_vec(),
                image: Arc::clone(&image),
            });
        }
        Ok(image)
    }

    /// Number of cached images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of cached images.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of [`load`](Self::load) calls served from the cache.
    #[must_use]
    pub const fn hits(&self) -> u64 {
        self.hits
    }

    /// Number of [`load`](Self::load) calls that had to decode.
    #[must_use]
    pub const fn misses(&self) -> u64 {
        self.misses
    }

    /// Drop every cached image. Hit/miss counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for DecodeCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

fn fingerprint(bytes: &[u8]) -> u64 {
    let mut hasher = SipHasher13::new();
    hasher.write(bytes);
    hasher.finish()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::ImageEncoder;

    use super::*;

    fn solid_png(value: u8) -> Vec<u8> {
        let img = RgbImage::from_pixel(3, 3, image::Rgb([value, value, value]));
        let mut buf = Vec::new();
        image::codecs::png::PngEncoder::new(&mut buf)
            .write_image(img.as_raw(), 3, 3, image::ExtendedColorType::Rgb8)
            .unwrap();
        buf
    }

    #[test]
    fn second_load_is_a_hit() {
        let mut cache = DecodeCache::default();
        let png = solid_png(10);
        let first = cache.load(&png).unwrap();
        let second = cache.load(&png).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cached_image_matches_direct_decode() {
        let mut cache = DecodeCache::default();
        let png = solid_png(77);
        let cached = cache.load(&png).unwrap();
        assert_eq!(*cached, load_image(&png).unwrap());
    }

    #[test]
    fn distinct_inputs_get_distinct_entries() {
        let mut cache = DecodeCache::default();
        let a = cache.load(&solid_png(1)).unwrap();
        let b = cache.load(&solid_png(2)).unwrap();
        assert_ne!(a.get_pixel(0, 0), b.get_pixel(0, 0));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let mut cache = DecodeCache::new(2);
        let (a, b, c) = (solid_png(1), solid_png(2), solid_png(3));
        cache.load(&a).unwrap();
        cache.load(&b).unwrap();
        // Touch `a` so `b` becomes the eviction candidate.
        cache.load(&a).unwrap();
        cache.load(&c).unwrap();
        assert_eq!(cache.len(), 2);

        let misses = cache.misses();
        cache.load(&a).unwrap();
        assert_eq!(cache.misses(), misses, "a should still be cached");
        cache.load(&b).unwrap();
        assert_eq!(cache.misses(), misses + 1, "b should have been evicted");
    }

    #[test]
    fn failures_are_not_cached() {
        let mut cache = DecodeCache::default();
        assert!(cache.load(&[1, 2, 3]).is_err());
        assert!(cache.load(&[]).is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn zero_capacity_never_stores() {
        let mut cache = DecodeCache::new(0);
        let png = solid_png(5);
        cache.load(&png).unwrap();
        cache.load(&png).unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.hits(), 0);
        assert_eq!(cache.capacity(), 0);
    }

    #[test]
    fn clear_empties_but_keeps_counters() {
        let mut cache = DecodeCache::default();
        cache.load(&solid_png(9)).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.misses(), 1);
    }
}
