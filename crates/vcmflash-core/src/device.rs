//! Known VCM4 silicon

/// Static description of one VCM4 variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSpec {
    /// Value of the `VERSION_ID` register
    pub version_id: u32,
    /// Variant name
    pub variant: &'static str,
    /// Erase sector size in KiB
    pub sector_size_kb: u32,
    /// Flash size in KiB
    pub flash_size_kb: u32,
}

impl DeviceSpec {
    /// Sector size in bytes
    pub fn sector_size(&self) -> u32 {
        self.sector_size_kb * 1024
    }

    /// Flash size in bytes
    pub fn flash_size(&self) -> u32 {
        self.flash_size_kb * 1024
    }

    /// Number of erase sectors
    pub fn num_sectors(&self) -> usize {
        (self.flash_size_kb / self.sector_size_kb) as usize
    }
}

/// All variants the driver knows about
pub static KNOWN_DEVICES: &[DeviceSpec] = &[DeviceSpec {
    version_id: 0x1906_1001,
    variant: "phoenix",
    sector_size_kb: 4,
    flash_size_kb: 2048,
}];

/// Look up a variant by exact version ID
pub fn find_by_version(version_id: u32) -> Option<&'static DeviceSpec> {
    KNOWN_DEVICES.iter().find(|d| d.version_id == version_id)
}
