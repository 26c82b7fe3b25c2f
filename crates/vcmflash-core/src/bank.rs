//! Flash bank
//!
//! [`FlashBank`] is the entry point for host tools. It owns the controller
//! driver and all per-device state (probed flag, geometry, sector table),
//! so there is exactly one state object per bank and every operation goes
//! through `&mut self`.
//!
//! Every operation that touches the device first checks that the target
//! core is halted and probes the bank if that has not happened yet.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Range;

use crate::controller::FlashController;
use crate::device::{self, DeviceSpec};
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::options::{BankOptions, ErasePolicy};
use crate::sector::{self, Sector};
use crate::status::VendorLayout;
use crate::strategy::ProgramStrategy;
use crate::target::TargetAccess;

/// The only base address the controller maps flash at
pub const BANK_BASE: u32 = 0x0000_0000;

/// Byte count programmed by [`FlashBank::write_test`]
pub const WRITE_TEST_LEN: usize = 100;

/// Word pattern programmed by [`FlashBank::write_test`]
pub const WRITE_TEST_WORD: u32 = 0xDEAD_BEEF;

/// Summary of a probed bank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankInfo {
    /// Variant name from the device table
    pub variant: &'static str,
    /// Silicon version ID
    pub version_id: u32,
    /// Flash size in bytes
    pub flash_size: u32,
    /// Sector size in bytes
    pub sector_size: u32,
    /// Number of sectors
    pub num_sectors: usize,
    /// SPI-NOR manufacturer ID
    pub manufacturer_id: u8,
    /// Status register layout in use
    pub vendor: VendorLayout,
}

impl fmt::Display for BankInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "vcm4-{} (version 0x{:08X})",
            self.variant, self.version_id
        )?;
        writeln!(
            f,
            "  flash:  {} KiB, {} sectors of {} KiB",
            self.flash_size / 1024,
            self.num_sectors,
            self.sector_size / 1024
        )?;
        write!(
            f,
            "  SPI-NOR manufacturer 0x{:02X} ({} status layout)",
            self.manufacturer_id, self.vendor
        )
    }
}

/// One VCM4 flash bank
pub struct FlashBank<T: TargetAccess> {
    ctl: FlashController<T>,
    options: BankOptions,
    device: Option<&'static DeviceSpec>,
    page_size: u32,
    probed: bool,
    sectors: Vec<Sector>,
}

impl<T: TargetAccess> FlashBank<T> {
    /// Declare a bank at `base`
    ///
    /// The controller only maps flash at [`BANK_BASE`]. Nothing is read
    /// from the target until the first operation.
    pub fn new(target: T, base: u32, options: BankOptions) -> Result<Self> {
        if base != BANK_BASE {
            log::error!("invalid bank address 0x{:08X}", base);
            return Err(Error::InvalidBankBase { base });
        }

        let mut ctl = FlashController::new(target);
        ctl.set_status_wait(options.status_wait);

        Ok(Self {
            ctl,
            options,
            device: None,
            page_size: 0,
            probed: false,
            sectors: Vec::new(),
        })
    }

    /// Active options
    pub fn options(&self) -> &BankOptions {
        &self.options
    }

    /// Register-level driver
    pub fn controller(&mut self) -> &mut FlashController<T> {
        &mut self.ctl
    }

    /// Give the target handle back
    pub fn into_target(self) -> T {
        self.ctl.into_target()
    }

    /// Whether a probe has succeeded
    pub fn is_probed(&self) -> bool {
        self.probed
    }

    /// Matched device, once probed
    pub fn device(&self) -> Option<&'static DeviceSpec> {
        self.device
    }

    /// Flash size in bytes (0 until probed)
    pub fn size(&self) -> u32 {
        self.device.map_or(0, DeviceSpec::flash_size)
    }

    /// Program/erase granularity in bytes (0 until probed)
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Sector table (empty until probed)
    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    /// Sector containing `addr`
    pub fn sector_by_address(&self, addr: u32) -> Option<&Sector> {
        self.sectors.iter().find(|s| s.contains(addr))
    }

    /// Identify the device and bring the controller into programming state
    ///
    /// Probing an already probed bank does nothing.
    pub fn probe(&mut self) -> Result<()> {
        if self.probed {
            return Ok(());
        }

        let version_id = self.ctl.read_version_id()?;
        let Some(spec) = device::find_by_version(version_id) else {
            log::error!("unknown device version id (0x{:08X})", version_id);
            return Err(Error::UnknownDevice { version_id });
        };
        log::info!("vcm4-{}: {}KB flash", spec.variant, spec.flash_size_kb);

        self.ctl.set_cache(false)?;
        let setup = self
            .ctl
            .configure()
            .and_then(|()| self.ctl.quad_enable())
            .and_then(|()| self.ctl.protect_disable());
        // Cache goes back on even when the sequences failed
        let cache = self.ctl.set_cache(true);
        setup.and(cache)?;

        self.page_size = spec.sector_size();
        self.sectors = sector::layout(spec.flash_size(), spec.sector_size());
        self.device = Some(spec);
        self.probed = true;

        log::info!(
            "flash info - size[{}], num_sectors[{}], page_size[{}]",
            spec.flash_size(),
            self.sectors.len(),
            self.page_size
        );
        self.protect_check()?;

        let cfg = self.ctl.read_config()?;
        log::info!("FLASH_CFG: 0x{:08X}", cfg);
        Ok(())
    }

    /// Probe unless already probed
    pub fn auto_probe(&mut self) -> Result<()> {
        if self.probed {
            Ok(())
        } else {
            self.probe()
        }
    }

    fn ready(&mut self) -> Result<()> {
        if !self.ctl.target.is_halted() {
            log::error!("Target not halted");
            return Err(Error::TargetNotHalted);
        }
        self.auto_probe().map_err(|e| match e {
            Error::UnknownDevice { .. } => Error::NotProbed,
            other => other,
        })
    }

    fn check_range(&self, first: usize, last: usize) -> Result<()> {
        if last >= self.sectors.len() {
            return Err(Error::InvalidSector { index: last });
        }
        if first > last {
            return Err(Error::InvalidSector { index: first });
        }
        Ok(())
    }

    fn check_bounds(&self, offset: u32, len: usize) -> Result<()> {
        let end = offset as u64 + len as u64;
        if end > self.size() as u64 {
            return Err(Error::AddressOutOfBounds);
        }
        Ok(())
    }

    fn erase_one(&mut self, index: usize) -> Result<()> {
        let sector = self.sectors[index];
        if sector.may_be_protected() {
            log::error!("cannot erase protected sector at 0x{:08X}", sector.offset);
            return Err(Error::SectorProtected {
                offset: sector.offset,
            });
        }

        match self.ctl.erase_sector(sector.offset) {
            Ok(()) => {
                self.sectors[index].is_erased = Some(true);
                Ok(())
            }
            Err(e) => {
                log::error!("failed to erase sector at 0x{:08X}", sector.offset);
                self.sectors[index].is_erased = None;
                Err(e)
            }
        }
    }

    fn erase_all(&mut self) -> Result<()> {
        let result = self.ctl.erase_chip();
        let state = if result.is_ok() { Some(true) } else { None };
        for sector in &mut self.sectors {
            sector.is_erased = state;
        }
        if result.is_err() {
            log::error!("failed to erase the chip");
        }
        result
    }

    fn mark(&mut self, range: Range<usize>, erased: Option<bool>) {
        for sector in &mut self.sectors[range] {
            sector.is_erased = erased;
        }
    }

    /// Erase sectors `first..=last`
    pub fn erase(&mut self, first: usize, last: usize) -> Result<()> {
        self.ready()?;
        self.check_range(first, last)?;

        for index in first..=last {
            self.erase_one(index)?;
        }
        Ok(())
    }

    /// Erase the whole device
    pub fn mass_erase(&mut self) -> Result<()> {
        self.ready()?;
        log::info!("mass erase of bank at 0x{:08X}", BANK_BASE);
        let result = self.erase_all();
        self.protect_check()?;
        result
    }

    /// Refresh sector protection state
    ///
    /// The controller exposes no per-sector protection, and probe clears the
    /// block-protect bits, so there is nothing to read back.
    pub fn protect_check(&mut self) -> Result<()> {
        Ok(())
    }

    /// Set or clear protection of sectors `first..=last`
    pub fn protect(&mut self, set: bool, first: usize, last: usize) -> Result<()> {
        self.ready()?;
        self.check_range(first, last)?;
        log::error!(
            "cannot {} sectors {}..={}: sector protection is not supported",
            if set { "protect" } else { "unprotect" },
            first,
            last
        );
        Err(Error::NotSupported("sector protection"))
    }

    /// Read `buf.len()` bytes of flash at `offset`
    pub fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<()> {
        self.ready()?;
        self.check_bounds(offset, buf.len())?;
        self.ctl.target.read_block(BANK_BASE + offset, buf)
    }

    /// Write `buf` at `offset`
    ///
    /// Any alignment is accepted. The page-aligned envelope around the
    /// write is read back first so that the bytes around `buf` survive the
    /// erase, unless the erase policy is [`ErasePolicy::Chip`], in which
    /// case everything outside the envelope is lost.
    pub fn write(&mut self, buf: &[u8], offset: u32) -> Result<()> {
        self.ready()?;
        if buf.is_empty() {
            return Ok(());
        }
        self.check_bounds(offset, buf.len())?;

        let env = Envelope::new(offset, buf.len() as u32, self.page_size);
        log::info!(
            "Padding write from 0x{:08X}-0x{:08X} as 0x{:08X}-0x{:08X}",
            offset,
            offset as usize + buf.len(),
            env.start(),
            env.end()
        );

        let touched = env.first_page as usize..env.last_page as usize;
        if let Some(sector) = self.sectors[touched.clone()]
            .iter()
            .find(|s| s.may_be_protected())
        {
            log::error!("can't write protected sector at 0x{:08X}", sector.offset);
            return Err(Error::SectorProtected {
                offset: sector.offset,
            });
        }

        let staged = self.stage_envelope(&env, buf)?;

        match self.options.erase_policy {
            ErasePolicy::Sectors => {
                for index in touched.clone() {
                    if !self.sectors[index].known_erased() {
                        self.erase_one(index)?;
                    }
                }
            }
            ErasePolicy::Chip => {
                log::warn!("chip erase policy: flash outside the write is lost");
                self.erase_all()?;
            }
        }

        let strategy = self.options.strategy;
        log::debug!("programming envelope with {} strategy", strategy.name());
        match strategy.program(&mut self.ctl, BANK_BASE + env.start(), &staged) {
            Ok(()) => {
                self.mark(touched, Some(false));
                Ok(())
            }
            Err(e) => {
                self.mark(touched, None);
                Err(e)
            }
        }
    }

    // Envelope buffer: current flash content in the fringes, `buf` in the
    // middle.
    fn stage_envelope(&mut self, env: &Envelope, buf: &[u8]) -> Result<Vec<u8>> {
        let mut staged = vec![0xFF; env.len()];
        let data = env.data_range();

        let prefix = env.prefix();
        if !prefix.is_empty() {
            self.ctl
                .target
                .read_block(BANK_BASE + prefix.start, &mut staged[..data.start])?;
        }

        staged[data.clone()].copy_from_slice(buf);

        let suffix = env.suffix();
        if !suffix.is_empty() {
            self.ctl
                .target
                .read_block(BANK_BASE + suffix.start, &mut staged[data.end..])?;
        }

        Ok(staged)
    }

    /// Program a fixed pattern at the start of flash
    ///
    /// Erases sector 0 unless it is known to be erased, then programs
    /// [`WRITE_TEST_LEN`] bytes of [`WRITE_TEST_WORD`] through the configured
    /// strategy. Nothing around it is preserved.
    pub fn write_test(&mut self) -> Result<()> {
        self.ready()?;
        let Some(sector) = self.sector_by_address(BANK_BASE).copied() else {
            return Err(Error::InvalidSector { index: 0 });
        };

        if !sector.known_erased() {
            self.erase_one(0)?;
        }

        let pattern: Vec<u8> = WRITE_TEST_WORD
            .to_le_bytes()
            .iter()
            .copied()
            .cycle()
            .take(WRITE_TEST_LEN)
            .collect();

        let strategy = self.options.strategy;
        let result = strategy.program(&mut self.ctl, sector.offset, &pattern);
        self.sectors[0].is_erased = if result.is_ok() { Some(false) } else { None };
        result
    }

    /// Summary of the probed device
    pub fn info(&mut self) -> Result<BankInfo> {
        self.ready()?;
        let spec = self.device.ok_or(Error::NotProbed)?;
        let manufacturer_id = self.ctl.read_manufacturer_id()?;

        Ok(BankInfo {
            variant: spec.variant,
            version_id: spec.version_id,
            flash_size: spec.flash_size(),
            sector_size: spec.sector_size(),
            num_sectors: self.sectors.len(),
            manufacturer_id,
            vendor: VendorLayout::from_manufacturer(manufacturer_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTarget;
    use crate::regs::*;

    fn phoenix() -> MockTarget {
        let mut mock = MockTarget::new();
        mock.set_reg(VERSION_ID, 0x1906_1001);
        mock.set_reg(FLASH_ID, 0x00EF_4015);
        mock
    }

    fn bank(mock: MockTarget) -> FlashBank<MockTarget> {
        FlashBank::new(mock, BANK_BASE, BankOptions::default()).unwrap()
    }

    #[test]
    fn test_rejects_nonzero_base() {
        let err = FlashBank::new(phoenix(), 0x0800_0000, BankOptions::default())
            .err()
            .unwrap();
        assert_eq!(err, Error::InvalidBankBase { base: 0x0800_0000 });
    }

    #[test]
    fn test_probe_geometry() {
        let mut bank = bank(phoenix());
        bank.probe().unwrap();
        assert!(bank.is_probed());
        assert_eq!(bank.size(), 2048 * 1024);
        assert_eq!(bank.page_size(), 4096);
        assert_eq!(bank.sectors().len(), 512);
        assert_eq!(bank.sectors()[0].offset, 0);
        assert_eq!(bank.sectors()[511].offset, 0x1F_F000);
        assert_eq!(bank.sector_by_address(0x1F_F800).unwrap().offset, 0x1F_F000);
        assert!(bank.sector_by_address(0x20_0000).is_none());
        // Cache is back on after the setup sequences
        assert_eq!(bank.controller().target().reg(FLASH_CACHE) & CACHE_EN, CACHE_EN);
    }

    #[test]
    fn test_probe_is_idempotent() {
        let mut bank = bank(phoenix());
        bank.probe().unwrap();
        let sectors = bank.sectors().to_vec();
        let writes = bank.controller().target().writes().len();

        bank.probe().unwrap();
        bank.auto_probe().unwrap();
        assert_eq!(bank.sectors(), &sectors[..]);
        assert_eq!(bank.controller().target().writes().len(), writes);
    }

    #[test]
    fn test_probe_runs_status_sequences() {
        let mut bank = bank(phoenix());
        bank.probe().unwrap();
        let opcodes: Vec<_> = bank
            .controller()
            .target()
            .commands()
            .iter()
            .map(|c| (c & 0xFF) as u8)
            .collect();
        // quad enable, then protect disable (Winbond)
        assert_eq!(
            opcodes,
            [
                CMDID_WRITE_ENABLE,
                CMDID_WRSR2,
                CMDID_WRITE_ENABLE,
                CMDID_WRSR2,
                CMDID_WRITE_ENABLE,
                CMDID_WRSR1
            ]
        );
    }

    #[test]
    fn test_unknown_device() {
        let mut mock = phoenix();
        mock.set_reg(VERSION_ID, 0x1234_5678);
        let mut bank = bank(mock);

        assert_eq!(
            bank.probe(),
            Err(Error::UnknownDevice {
                version_id: 0x1234_5678
            })
        );
        assert!(!bank.is_probed());
        assert!(bank.sectors().is_empty());
        assert_eq!(bank.erase(0, 0), Err(Error::NotProbed));
        assert_eq!(bank.write(&[0], 0), Err(Error::NotProbed));
        assert_eq!(bank.mass_erase(), Err(Error::NotProbed));
        assert_eq!(bank.info().err(), Some(Error::NotProbed));
        // Only version reads, never a command
        assert!(bank.controller().target().commands().is_empty());
    }

    #[test]
    fn test_not_halted() {
        let mut mock = phoenix();
        mock.running = true;
        let mut bank = bank(mock);
        assert_eq!(bank.erase(0, 0), Err(Error::TargetNotHalted));
        assert_eq!(bank.write(&[0], 0), Err(Error::TargetNotHalted));
        assert!(!bank.is_probed());
        assert_eq!(bank.controller().target().reads(), 0);
    }

    #[test]
    fn test_erase_range_checks() {
        let mut bank = bank(phoenix());
        assert_eq!(bank.erase(0, 512), Err(Error::InvalidSector { index: 512 }));
        assert_eq!(bank.erase(3, 2), Err(Error::InvalidSector { index: 3 }));
    }

    #[test]
    fn test_erase_marks_sectors() {
        let mut bank = bank(phoenix());
        bank.erase(2, 4).unwrap();
        let erased: Vec<_> = bank.sectors()[..6].iter().map(|s| s.is_erased).collect();
        assert_eq!(
            erased,
            [None, None, Some(true), Some(true), Some(true), None]
        );
    }

    #[test]
    fn test_erase_failure_leaves_unknown() {
        let mut bank = bank(phoenix());
        bank.probe().unwrap();
        bank.controller().target_mut().stuck_action = true;
        assert!(bank.erase(0, 1).unwrap_err().is_busy());
        assert_eq!(bank.sectors()[0].is_erased, None);
        assert_eq!(bank.sectors()[1].is_erased, None);
    }

    #[test]
    fn test_protected_sector_refused_before_hardware() {
        let mut bank = bank(phoenix());
        bank.probe().unwrap();
        bank.sectors[1].is_protected = Some(true);
        let writes = bank.controller().target().writes().len();

        assert_eq!(
            bank.erase(1, 1),
            Err(Error::SectorProtected { offset: 0x1000 })
        );
        assert_eq!(
            bank.write(&[0; 16], 0xFF8),
            Err(Error::SectorProtected { offset: 0x1000 })
        );
        assert_eq!(bank.controller().target().writes().len(), writes);
    }

    #[test]
    fn test_protect_not_supported() {
        let mut bank = bank(phoenix());
        bank.protect_check().unwrap();
        assert_eq!(
            bank.protect(true, 0, 1),
            Err(Error::NotSupported("sector protection"))
        );
        assert_eq!(
            bank.protect(false, 0, 600),
            Err(Error::InvalidSector { index: 600 })
        );
    }

    #[test]
    fn test_bounds() {
        let mut bank = bank(phoenix());
        let mut buf = [0u8; 8];
        assert_eq!(
            bank.read(0x1F_FFFC, &mut buf),
            Err(Error::AddressOutOfBounds)
        );
        assert_eq!(
            bank.write(&buf, 0x1F_FFFC),
            Err(Error::AddressOutOfBounds)
        );
        bank.write(&[], 0x30_0000).unwrap();
    }

    #[test]
    fn test_info() {
        let mut bank = bank(phoenix());
        let info = bank.info().unwrap();
        assert_eq!(info.variant, "phoenix");
        assert_eq!(info.num_sectors, 512);
        assert_eq!(info.manufacturer_id, 0xEF);
        assert_eq!(info.vendor, VendorLayout::Winbond);
    }
}
