use crate::error::SetupError;
use std::fmt;
use std::mem;
use std::ptr;

/// Number of candidates prepared for every trial.
pub const DEFAULT_POOL_SIZE: usize = 3;
/// Length in bytes of each prepared candidate. Large enough that an
/// accidental copy would dominate the measurement.
pub const DEFAULT_BUFFER_LEN: usize = 100_000;

/// An immutable byte buffer.
///
/// Buffers are compared by identity, never by content: two buffers with the
/// same bytes are still different values as far as the swap is concerned.
pub struct Buffer {
    bytes: Box<[u8]>,
}

#[allow(clippy::len_without_is_empty)]
impl Buffer {
    pub fn filled(len: usize, byte: u8) -> Self {
        Self {
            bytes: vec![byte; len].into_boxed_slice(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Identity comparison.
    pub fn same(&self, other: &Buffer) -> bool {
        ptr::eq(self, other)
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("addr", &(self as *const Self))
            .field("len", &self.bytes.len())
            .field("fill", &self.bytes.first())
            .finish()
    }
}

/// The trial-scoped set of buffers a cell may hold.
///
/// Candidate `i` is filled with `b'A' + i` (wrapping), so the standard pool
/// holds an `A` buffer, a `B` buffer and a `C` buffer.
#[derive(Debug)]
pub struct CandidatePool {
    buffers: Box<[Buffer]>,
}

impl CandidatePool {
    /// Prepares `size` fresh buffers of `len` bytes each.
    pub fn prepare(size: usize, len: usize) -> Result<Self, SetupError> {
        if size == 0 {
            return Err(SetupError::EmptyPool);
        }
        let buffers = (0..size)
            .map(|i| Buffer::filled(len, b'A'.wrapping_add(i as u8)))
            .collect();
        Ok(Self { buffers })
    }

    /// Three buffers of [`DEFAULT_BUFFER_LEN`] bytes.
    pub fn standard() -> Self {
        let buffers = (0..DEFAULT_POOL_SIZE)
            .map(|i| Buffer::filled(DEFAULT_BUFFER_LEN, b'A' + i as u8))
            .collect();
        Self { buffers }
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Always false: an empty pool cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Buffer> {
        self.buffers.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Buffer> {
        self.buffers.iter()
    }

    pub fn as_slice(&self) -> &[Buffer] {
        &self.buffers
    }

    /// The candidate to try after `successes` successful swaps.
    pub fn candidate(&self, successes: u64) -> &Buffer {
        let index = successes % self.buffers.len() as u64;
        &self.buffers[index as usize]
    }

    /// The value a fresh cell starts with.
    pub fn initial(&self) -> &Buffer {
        &self.buffers[self.buffers.len() - 1]
    }

    /// Position of `buffer` in this pool, by identity.
    pub fn index_of(&self, buffer: &Buffer) -> Option<usize> {
        let range = self.buffers.as_ptr_range();
        let addr = buffer as *const Buffer;
        if !range.contains(&addr) {
            return None;
        }
        Some((addr as usize - range.start as usize) / mem::size_of::<Buffer>())
    }

    pub fn contains(&self, buffer: &Buffer) -> bool {
        self.index_of(buffer).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_pool_layout() {
        let pool = CandidatePool::standard();
        assert_eq!(pool.len(), 3);
        for (i, buffer) in pool.iter().enumerate() {
            assert_eq!(buffer.len(), DEFAULT_BUFFER_LEN);
            assert!(buffer.as_bytes().iter().all(|&b| b == b'A' + i as u8));
        }
        assert!(pool.initial().same(pool.get(2).unwrap()));
    }

    #[test]
    fn test_identity_not_content() {
        let a = Buffer::filled(4, b'x');
        let b = Buffer::filled(4, b'x');
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert!(!a.same(&b));
        assert!(a.same(&a));
    }

    #[test]
    fn test_candidate_wraps() {
        let pool = CandidatePool::prepare(3, 1).unwrap();
        assert!(pool.candidate(0).same(pool.get(0).unwrap()));
        assert!(pool.candidate(4).same(pool.get(1).unwrap()));
        assert!(pool.candidate(u64::MAX).same(pool.get((u64::MAX % 3) as usize).unwrap()));
    }

    #[test]
    fn test_index_of() {
        let pool = CandidatePool::prepare(5, 0).unwrap();
        for i in 0..5 {
            assert_eq!(pool.index_of(pool.get(i).unwrap()), Some(i));
        }
        let stranger = Buffer::filled(0, 0);
        assert_eq!(pool.index_of(&stranger), None);
        assert!(!pool.contains(&stranger));
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert_eq!(CandidatePool::prepare(0, 10).unwrap_err(), SetupError::EmptyPool);
    }
}
