//! Page-aligned write envelope
//!
//! A write of `count` bytes at `offset` touches every page from the one
//! containing `offset` up to the one containing `offset + count - 1`. The
//! envelope is that page range; the bytes inside it but outside the write
//! (the prefix and suffix fringes) must be read back and rewritten.

use core::ops::Range;

/// Page-aligned range covering a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    /// Start of the caller's data
    pub offset: u32,
    /// Length of the caller's data
    pub count: u32,
    /// Page size the envelope is aligned to
    pub page_size: u32,
    /// First page index
    pub first_page: u32,
    /// One past the last page index
    pub last_page: u32,
}

impl Envelope {
    /// Compute the envelope of `[offset, offset + count)`
    pub fn new(offset: u32, count: u32, page_size: u32) -> Self {
        let first_page = offset / page_size;
        let last_page = (offset + count).div_ceil(page_size);
        Self {
            offset,
            count,
            page_size,
            first_page,
            last_page,
        }
    }

    /// First byte of the envelope
    pub fn start(&self) -> u32 {
        self.first_page * self.page_size
    }

    /// One past the last byte of the envelope
    pub fn end(&self) -> u32 {
        self.last_page * self.page_size
    }

    /// Envelope size in bytes
    pub fn len(&self) -> usize {
        (self.end() - self.start()) as usize
    }

    /// Whether the envelope covers nothing
    pub fn is_empty(&self) -> bool {
        self.first_page == self.last_page
    }

    /// Bytes before the caller's data that must be preserved
    pub fn prefix(&self) -> Range<u32> {
        self.start()..self.offset
    }

    /// Bytes after the caller's data that must be preserved
    pub fn suffix(&self) -> Range<u32> {
        self.offset + self.count..self.end()
    }

    /// Position of the caller's data inside the envelope buffer
    pub fn data_range(&self) -> Range<usize> {
        let pre = (self.offset - self.start()) as usize;
        pre..pre + self.count as usize
    }

    /// Page indices covered
    pub fn pages(&self) -> Range<u32> {
        self.first_page..self.last_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unaligned_small_write() {
        let env = Envelope::new(0x10, 100, 0x1000);
        assert_eq!(env.start(), 0);
        assert_eq!(env.end(), 0x1000);
        assert_eq!(env.prefix(), 0..0x10);
        assert_eq!(env.suffix(), 0x74..0x1000);
        assert_eq!(env.data_range(), 0x10..0x74);
        assert_eq!(env.len(), 0x1000);
    }

    #[test]
    fn test_aligned_write_has_no_fringes() {
        let env = Envelope::new(0x2000, 0x2000, 0x1000);
        assert!(env.prefix().is_empty());
        assert!(env.suffix().is_empty());
        assert_eq!(env.pages(), 2..4);
    }

    #[test]
    fn test_write_straddling_pages() {
        let env = Envelope::new(0xFFF, 2, 0x1000);
        assert_eq!(env.pages(), 0..2);
        assert_eq!(env.len(), 0x2000);
        assert_eq!(env.prefix(), 0..0xFFF);
        assert_eq!(env.suffix(), 0x1001..0x2000);
    }

    #[test]
    fn test_envelope_bounds_hold() {
        let page = 0x1000;
        for offset in [0, 1, 0x10, 0xFFF, 0x1000, 0x1234, 0x1F_FFFF] {
            for count in [1, 3, 4, 100, 0xFFF, 0x1000, 0x1001, 0x3456] {
                if offset + count > 0x20_0000 {
                    continue;
                }
                let env = Envelope::new(offset, count, page);
                assert!(env.start() <= offset);
                assert!(env.end() >= offset + count);
                assert_eq!(env.start() % page, 0);
                assert_eq!(env.end() % page, 0);
                assert!(!env.is_empty());
                // Never more than one extra page on either side
                assert!(offset - env.start() < page);
                assert!(env.end() - (offset + count) < page);
            }
        }
    }
}
