//! Reference-counted PCM buffers.
//!
//! `Memblock` is a ref-counted, immutable byte buffer; `Memchunk` is a
//! `(memblock, offset, length)` view into one, mirroring PulseAudio's
//! `pa_memblock`/`pa_memchunk` without the separate shared-memory pool
//! machinery — plain `Arc` refcounting is all a single-process mixer needs.

use std::sync::Arc;
use std::sync::Mutex;

/// A reference-counted, immutable block of PCM data.
#[derive(Debug, Clone)]
pub struct Memblock(Arc<Vec<u8>>);

impl Memblock {
    pub fn from_vec(data: Vec<u8>) -> Self {
        Memblock(Arc::new(data))
    }

    pub fn zeroed(len: usize) -> Self {
        Self::from_vec(vec![0u8; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Whether this is the only reference to the underlying storage.
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.0) == 1
    }
}

/// A `(memblock, offset, length)` view into a [`Memblock`].
///
/// Cloning a `Memchunk` is cheap (it bumps the `Memblock`'s refcount) and
/// does not copy sample data.
#[derive(Debug, Clone)]
pub struct Memchunk {
    memblock: Memblock,
    index: usize,
    length: usize,
}

impl Memchunk {
    pub fn new(memblock: Memblock, index: usize, length: usize) -> Self {
        assert!(index + length <= memblock.len(), "memchunk view out of bounds");
        Memchunk { memblock, index, length }
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        let length = data.len();
        Memchunk::new(Memblock::from_vec(data), 0, length)
    }

    pub fn zeroed(length: usize) -> Self {
        Memchunk::new(Memblock::zeroed(length), 0, length)
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.memblock.as_slice()[self.index..self.index + self.length]
    }

    pub fn memblock(&self) -> &Memblock {
        &self.memblock
    }

    /// Whether this chunk refers to the same underlying storage as `other`
    /// (used to detect zero-copy passthrough in tests).
    pub fn shares_storage_with(&self, other: &Memchunk) -> bool {
        Arc::ptr_eq(&self.memblock.0, &other.memblock.0)
    }

    /// Narrows the chunk to `new_len` bytes from the front, in place.
    pub fn truncate(&mut self, new_len: usize) {
        assert!(new_len <= self.length, "cannot grow a memchunk view via truncate");
        self.length = new_len;
    }

    /// Drops the first `n` bytes of the view, in place.
    pub fn advance(&mut self, n: usize) {
        assert!(n <= self.length, "advance past end of memchunk");
        self.index += n;
        self.length -= n;
    }

    /// Returns a writable slice over this chunk's bytes, cloning the backing
    /// storage first if it is shared or this view doesn't cover the whole
    /// block. The mixer is the only code that should call this.
    pub fn make_writable(&mut self) -> &mut [u8] {
        let needs_clone = !self.memblock.is_unique()
            || self.index != 0
            || self.length != self.memblock.len();

        if needs_clone {
            let owned = self.as_slice().to_vec();
            self.memblock = Memblock::from_vec(owned);
            self.index = 0;
            self.length = self.memblock.len();
        }

        let data = Arc::get_mut(&mut self.memblock.0)
            .expect("memblock uniquely owned immediately after make_writable clone");
        &mut data[self.index..self.index + self.length]
    }
}

/// Lazily-grown cache of an all-zeroes [`Memblock`], shared across sinks.
///
/// Silence is the same bytes regardless of sample spec, so a single growable
/// buffer serves every caller; `get` only allocates when asked for more
/// bytes than it has ever produced before.
#[derive(Debug)]
pub struct SilenceCache {
    block: Mutex<Memblock>,
}

impl SilenceCache {
    pub fn new() -> Self {
        SilenceCache { block: Mutex::new(Memblock::zeroed(0)) }
    }

    /// Returns a `Memchunk` of exactly `len` zero bytes, ref-counted against
    /// the cache's backing storage.
    pub fn get(&self, len: usize) -> Memchunk {
        let mut guard = self.block.lock().unwrap();
        if guard.len() < len {
            *guard = Memblock::zeroed(len);
        }
        Memchunk::new(guard.clone(), 0, len)
    }
}

impl Default for SilenceCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_copy_clone_shares_storage() {
        let chunk = Memchunk::from_vec(vec![1, 2, 3, 4]);
        let clone = chunk.clone();
        assert!(chunk.shares_storage_with(&clone));
    }

    #[test]
    fn make_writable_clones_when_shared() {
        let chunk = Memchunk::from_vec(vec![0u8; 4]);
        let mut writable = chunk.clone();
        writable.make_writable()[0] = 42;
        assert_eq!(chunk.as_slice()[0], 0);
        assert_eq!(writable.as_slice()[0], 42);
    }

    #[test]
    fn make_writable_is_in_place_when_unique() {
        let mut chunk = Memchunk::from_vec(vec![0u8; 4]);
        chunk.make_writable()[0] = 7;
        assert_eq!(chunk.as_slice()[0], 7);
    }

    #[test]
    fn silence_cache_grows_and_reuses() {
        let cache = SilenceCache::new();
        let a = cache.get(16);
        let b = cache.get(8);
        assert!(a.as_slice().iter().all(|&b| b == 0));
        assert!(b.as_slice().iter().all(|&b| b == 0));
        assert_eq!(b.len(), 8);
    }

    #[test]
    fn advance_and_truncate_narrow_the_view() {
        let mut chunk = Memchunk::from_vec(vec![1, 2, 3, 4, 5]);
        chunk.advance(1);
        chunk.truncate(2);
        assert_eq!(chunk.as_slice(), &[2, 3]);
    }
}
