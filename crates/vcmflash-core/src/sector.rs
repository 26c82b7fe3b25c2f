//! Erase sector bookkeeping

/// One erase sector of the bank
///
/// `is_erased` and `is_protected` are tri-state: `None` means the state is
/// not known, e.g. after a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sector {
    /// Offset from the bank base
    pub offset: u32,
    /// Size in bytes
    pub size: u32,
    /// Erase state
    pub is_erased: Option<bool>,
    /// Protection state
    pub is_protected: Option<bool>,
}

impl Sector {
    /// Sector with unknown erase state and protection cleared
    pub fn new(offset: u32, size: u32) -> Self {
        Self {
            offset,
            size,
            is_erased: None,
            is_protected: Some(false),
        }
    }

    /// One past the last byte
    pub fn end(&self) -> u32 {
        self.offset + self.size
    }

    /// Whether `addr` falls inside the sector
    pub fn contains(&self, addr: u32) -> bool {
        self.offset <= addr && addr < self.end()
    }

    /// Known to be erased
    pub fn known_erased(&self) -> bool {
        self.is_erased == Some(true)
    }

    /// Protection bit set or not known to be clear
    pub fn may_be_protected(&self) -> bool {
        self.is_protected != Some(false)
    }
}

/// Build the sector table for a bank of `flash_size` bytes
pub fn layout(flash_size: u32, sector_size: u32) -> alloc::vec::Vec<Sector> {
    (0..flash_size / sector_size)
        .map(|i| Sector::new(i * sector_size, sector_size))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let sectors = layout(0x20_0000, 0x1000);
        assert_eq!(sectors.len(), 512);
        assert_eq!(sectors[0].offset, 0);
        assert_eq!(sectors[511].offset, 0x1F_F000);
        assert!(sectors[511].contains(0x1F_FFFF));
        assert!(!sectors[511].contains(0x20_0000));
        assert!(!sectors[0].known_erased());
        assert!(!sectors[0].may_be_protected());
    }
}
