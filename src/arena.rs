use std::{ptr::NonNull, slice};

use crate::{
    error::{Error, Result},
    kernel::{self, page_size},
    utils::align,
};

/// The contiguous byte buffer backing one pool.
///
/// The memory is mapped straight from the kernel when the pool opens and
/// returned in one piece when the arena is dropped. The mapping is rounded up
/// to whole pages, but only the first `size` bytes belong to the pool.
///
/// ```text
/// ptr                          size                  mapped
/// +------------------------------+---------------------+
/// |        pool bytes            |  page padding       |
/// +------------------------------+---------------------+
/// ```
pub(crate) struct Arena {
    ptr: NonNull<u8>,
    size: usize,
    mapped: usize,
}

impl Arena {
    /// Maps a new arena able to hold `size` bytes.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidSize);
        }

        let mapped = align(size, page_size()).ok_or(Error::AllocationFailure)?;

        // SAFETY: `mapped` is a non zero multiple of the page size.
        let Some(ptr) = (unsafe { kernel::request_memory(mapped) }) else {
            tracing::warn!(size, mapped, "arena mapping failed");
            return Err(Error::AllocationFailure);
        };

        Ok(Self { ptr, size, mapped })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Bytes `offset..offset + len` of the arena.
    pub fn bytes(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let end = offset.checked_add(len)?;
        if end > self.size {
            return None;
        }

        // SAFETY: the range was checked against the mapping, which lives as
        // long as `self`.
        unsafe { Some(slice::from_raw_parts(self.ptr.as_ptr().add(offset), len)) }
    }

    /// Mutable bytes `offset..offset + len` of the arena.
    pub fn bytes_mut(&mut self, offset: usize, len: usize) -> Option<&mut [u8]> {
        let end = offset.checked_add(len)?;
        if end > self.size {
            return None;
        }

        // SAFETY: same as `bytes`, and `&mut self` guarantees exclusivity.
        unsafe {
            Some(slice::from_raw_parts_mut(
                self.ptr.as_ptr().add(offset),
                len,
            ))
        }
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        // SAFETY: the mapping came from `request_memory` with this length and
        // is only returned here.
        unsafe { kernel::return_memory(self.ptr, self.mapped) }
    }
}
