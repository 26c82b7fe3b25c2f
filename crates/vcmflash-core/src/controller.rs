//! VCM4 flash controller driver
//!
//! [`FlashController`] owns the target handle and implements the
//! register-level protocol: issuing command words, staging payloads into the
//! controller buffer, the write-enable primitive, cache control and the
//! controller configuration step run at probe time.
//!
//! The higher-level primitives are split across sibling modules as further
//! `impl` blocks on the same type:
//!
//! - [`poll`](crate::poll) - completion polling
//! - [`status`](crate::status) - status register / protection sequences
//! - [`erase`](crate::erase) - sector and chip erase
//! - [`program`](crate::program) - page and word program

use crate::command::{stage_payload, CommandWord};
use crate::error::Result;
use crate::poll::{Completion, WRITE_ENABLE_TICKS};
use crate::regs::*;
use crate::target::TargetAccess;

/// Register-level driver for one VCM4 flash controller
pub struct FlashController<T: TargetAccess> {
    pub(crate) target: T,
    /// Completion signal status-register writes wait on
    pub(crate) status_wait: Completion,
}

impl<T: TargetAccess> FlashController<T> {
    /// Create a controller driver on top of a target handle
    pub fn new(target: T) -> Self {
        Self {
            target,
            status_wait: Completion::ActionDone,
        }
    }

    /// Select the completion signal used by status-register writes
    pub fn set_status_wait(&mut self, signal: Completion) {
        self.status_wait = signal;
    }

    /// Shared access to the underlying target
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Exclusive access to the underlying target
    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// Give the target handle back
    pub fn into_target(self) -> T {
        self.target
    }

    /// Write a command word to `FLASH_CMD`, starting the operation
    pub(crate) fn issue(&mut self, cmd: CommandWord) -> Result<()> {
        log::trace!("FLASH_CMD <- {:#010x}", cmd.raw());
        self.target.write_u32(FLASH_CMD, cmd.raw())
    }

    /// Copy a payload into the controller buffer registers
    pub(crate) fn stage(&mut self, payload: &[u8]) -> Result<()> {
        for write in stage_payload(payload)? {
            self.target.write_u32(write.addr, write.value)?;
        }
        Ok(())
    }

    /// Load the address register for the next address-phase command
    pub(crate) fn set_address(&mut self, addr: u32) -> Result<()> {
        self.target.write_u32(FLASH_ADDR, addr)
    }

    /// Issue the write-enable command and wait for it to complete
    ///
    /// Every erase, program and status-register write is prefixed by this.
    pub fn write_enable(&mut self) -> Result<()> {
        self.issue(CommandWord::issue(CMDID_WRITE_ENABLE))?;
        self.wait(Completion::ActionDone, WRITE_ENABLE_TICKS)
    }

    /// Read the SPI-NOR manufacturer ID latched by the controller
    pub fn read_manufacturer_id(&mut self) -> Result<u8> {
        let id = self.target.read_u32(FLASH_ID)?;
        Ok((id >> ID_MANUFACTURER_OFF) as u8)
    }

    /// Read the silicon version ID
    pub fn read_version_id(&mut self) -> Result<u32> {
        self.target.read_u32(VERSION_ID)
    }

    /// Read the controller configuration register
    pub fn read_config(&mut self) -> Result<u32> {
        self.target.read_u32(FLASH_CFG)
    }

    /// Enable or disable the memory-mapped read cache
    pub fn set_cache(&mut self, enable: bool) -> Result<()> {
        let mut cache = self.target.read_u32(FLASH_CACHE)?;
        if enable {
            cache |= CACHE_EN;
        } else {
            cache &= !CACHE_EN;
        }
        log::debug!("FLASH_CACHE <- {:#010x}", cache);
        self.target.write_u32(FLASH_CACHE, cache)
    }

    fn modify(&mut self, addr: u32, clear: u32, set: u32) -> Result<()> {
        let value = self.target.read_u32(addr)?;
        self.target.write_u32(addr, (value & !clear) | set)
    }

    /// Bring the system clock and the controller bus setup into the state
    /// the programming sequences expect
    ///
    /// Runs the GPPLL at 150 MHz, switches the AHB clock to it and programs
    /// `FLASH_CFG` for a 16 Mbit part in 4I4O memory mode.
    pub fn configure(&mut self) -> Result<()> {
        // GPPLL: POSDIV /4, enable
        self.modify(ANA_RG_GPPLL_CTRL0, 0x3 << 5, (0x2 << 5) | (0x1 << 15))?;
        // GPPLL: DDSM fraction 0, integer 0x18, enable
        self.modify(
            ANA_RG_GPPLL_CTRL1,
            0xfffff | (0x3f << 20),
            (0x18 << 20) | (0x1 << 26),
        )?;
        self.target.delay_ms(100);

        // AHB clock from GPLL
        self.modify(MISC2_CLKSEL, 0x3, 0x2)?;

        self.modify(
            FLASH_CFG,
            CFG_SIZE
                | CFG_CMD_LATENCY
                | CFG_MEM_LATENCY
                | CFG_MEMMODE
                | CFG_CMD_CLKDIV
                | CFG_MEM_CLKDIV,
            (CFG_SIZE_16MBIT << CFG_SIZE_OFF)
                | (0x1 << CFG_CMD_LATENCY_OFF)
                | (0x1 << CFG_MEM_LATENCY_OFF)
                | (CFG_MEMMODE_4I4O << CFG_MEMMODE_OFF)
                | (0x2 << CFG_CMD_CLKDIV_OFF)
                | (0x1 << CFG_MEM_CLKDIV_OFF),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTarget;

    #[test]
    fn test_write_enable_issues_wren() {
        let mut ctl = FlashController::new(MockTarget::new());
        ctl.write_enable().unwrap();
        assert_eq!(ctl.target().commands(), [0x8100_0006]);
    }

    #[test]
    fn test_manufacturer_id_byte() {
        let mut mock = MockTarget::new();
        mock.set_reg(FLASH_ID, 0x00EF_4015);
        let mut ctl = FlashController::new(mock);
        assert_eq!(ctl.read_manufacturer_id().unwrap(), 0xEF);
    }

    #[test]
    fn test_cache_toggle_preserves_other_bits() {
        let mut mock = MockTarget::new();
        mock.set_reg(FLASH_CACHE, 0x0000_0F01);
        let mut ctl = FlashController::new(mock);

        ctl.set_cache(false).unwrap();
        assert_eq!(ctl.target().reg(FLASH_CACHE), 0x0000_0F00);
        ctl.set_cache(true).unwrap();
        assert_eq!(ctl.target().reg(FLASH_CACHE), 0x0000_0F01);
    }

    #[test]
    fn test_configure_flash_cfg() {
        let mut mock = MockTarget::new();
        mock.set_reg(FLASH_CFG, 0xFFFF_FFFF);
        let mut ctl = FlashController::new(mock);
        ctl.configure().unwrap();

        let cfg = ctl.target().reg(FLASH_CFG);
        assert_eq!((cfg & CFG_SIZE) >> CFG_SIZE_OFF, CFG_SIZE_16MBIT);
        assert_eq!((cfg & CFG_MEMMODE) >> CFG_MEMMODE_OFF, CFG_MEMMODE_4I4O);
        assert_eq!((cfg & CFG_CMD_LATENCY) >> CFG_CMD_LATENCY_OFF, 1);
        assert_eq!((cfg & CFG_MEM_LATENCY) >> CFG_MEM_LATENCY_OFF, 1);
        assert_eq!(cfg & CFG_CMD_CLKDIV, 0x2);
        assert_eq!((cfg & CFG_MEM_CLKDIV) >> CFG_MEM_CLKDIV_OFF, 0x1);
        // Bits outside the touched fields are untouched
        assert_eq!(cfg & 0xFFF0_8000, 0xFFF0_8000);
    }
}
