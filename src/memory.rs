//! A region of memory captured in a crash dump.

use scroll::ctx::{SizeWith, TryFromCtx};
use scroll::{Pread, LE};

/// A contiguous range of memory with a known base address.
///
/// The address calculator only needs the region's extent, for deciding
/// whether the faulting instruction is inside it at all, and single bytes,
/// for copying out the instruction window. Anything that can answer those
/// two questions can back a calculation.
pub trait MemoryRegion {
    /// The address the first byte of this region was mapped at.
    fn base_address(&self) -> u64;

    /// The length of this region in bytes.
    fn size(&self) -> u64;

    /// Returns the byte at the given absolute address, or `None` if the
    /// address falls outside the region.
    fn byte_at_address(&self, address: u64) -> Option<u8>;
}

/// A memory region backed by bytes copied out of a dump.
#[derive(Clone, Debug)]
pub struct DumpMemory<'a> {
    /// The starting address of this range of memory.
    pub base_address: u64,
    /// The contents of the memory.
    pub bytes: &'a [u8],
}

impl<'a> DumpMemory<'a> {
    /// Get `mem::size_of::<T>()` bytes of memory at `address` from this region.
    ///
    /// Reads are little-endian and return `None` when any part of the value
    /// lies outside the region.
    pub fn get_memory_at_address<T>(&self, address: u64) -> Option<T>
    where
        T: TryFromCtx<'a, scroll::Endian, [u8], Error = scroll::Error>,
        T: SizeWith<scroll::Endian>,
    {
        let start = address.checked_sub(self.base_address)? as usize;
        self.bytes.pread_with::<T>(start, LE).ok()
    }
}

impl<'a> MemoryRegion for DumpMemory<'a> {
    fn base_address(&self) -> u64 {
        self.base_address
    }

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn byte_at_address(&self, address: u64) -> Option<u8> {
        self.get_memory_at_address::<u8>(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BYTES: &[u8] = &[0x11, 0x22, 0x33, 0x44, 0x55];

    fn test_memory() -> DumpMemory<'static> {
        DumpMemory {
            base_address: 0x1000,
            bytes: BYTES,
        }
    }

    #[test]
    fn test_byte_reads() {
        let memory = test_memory();
        assert_eq!(memory.byte_at_address(0x1000), Some(0x11));
        assert_eq!(memory.byte_at_address(0x1004), Some(0x55));
        // One past the end, and one before the start.
        assert_eq!(memory.byte_at_address(0x1005), None);
        assert_eq!(memory.byte_at_address(0xfff), None);
        assert_eq!(memory.byte_at_address(0), None);
    }

    #[test]
    fn test_wider_reads_are_little_endian() {
        let memory = test_memory();
        assert_eq!(memory.get_memory_at_address::<u32>(0x1000), Some(0x44332211));
        assert_eq!(memory.get_memory_at_address::<u16>(0x1003), Some(0x5544));
        // A u32 read needs all four bytes in range.
        assert_eq!(memory.get_memory_at_address::<u32>(0x1002), None);
    }

    #[test]
    fn test_extent() {
        let memory = test_memory();
        assert_eq!(memory.base_address(), 0x1000);
        assert_eq!(memory.size(), 5);
    }
}
