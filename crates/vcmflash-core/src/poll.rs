//! Completion polling
//!
//! The controller exposes two completion signals and they are not
//! interchangeable:
//!
//! - [`Completion::ActionDone`]: the ACT bit of `FLASH_CMD` has been cleared
//!   by hardware. Used by write-enable, erase and program commands.
//! - [`Completion::StatusIdle`]: the busy bit of the `FLASH_SR` mirror has
//!   cleared, i.e. the SPI-NOR device itself reports it is done.
//!
//! Each operation names the signal it waits on. Polling is bounded: one
//! register read per tick, one tick being a fixed 1 ms sleep.

use core::fmt;

use crate::controller::FlashController;
use crate::error::{Error, Result};
use crate::regs::*;
use crate::target::TargetAccess;

/// Length of one poll tick in milliseconds
pub const TICK_MS: u32 = 1;

/// Ticks allowed for a write-enable to complete
pub const WRITE_ENABLE_TICKS: u32 = 100;
/// Ticks allowed for a status register write
pub const STATUS_WRITE_TICKS: u32 = 100;
/// Ticks allowed for a single word program
pub const WORD_PROGRAM_TICKS: u32 = 100;
/// Ticks allowed for a page program
pub const PAGE_PROGRAM_TICKS: u32 = 1000;
/// Ticks allowed for a sector erase
pub const SECTOR_ERASE_TICKS: u32 = 1000;
/// Ticks allowed for a full chip erase
pub const CHIP_ERASE_TICKS: u32 = 10000;

/// Hardware completion signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Completion {
    /// `FLASH_CMD.ACT` cleared
    #[default]
    ActionDone,
    /// `FLASH_SR` busy bit cleared
    StatusIdle,
}

impl Completion {
    /// Register the signal is read from
    pub fn register(self) -> u32 {
        match self {
            Self::ActionDone => FLASH_CMD,
            Self::StatusIdle => FLASH_SR,
        }
    }

    /// Bit that reads as set while the operation is in flight
    pub fn busy_mask(self) -> u32 {
        match self {
            Self::ActionDone => 1 << CMD_ACT_OFF,
            Self::StatusIdle => SR_BUSY,
        }
    }

    /// Parse a signal name ("action" or "status")
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "action" | "act" => Some(Self::ActionDone),
            "status" | "sr" => Some(Self::StatusIdle),
            _ => None,
        }
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActionDone => write!(f, "action done"),
            Self::StatusIdle => write!(f, "status idle"),
        }
    }
}

impl<T: TargetAccess> FlashController<T> {
    /// Wait for `signal` with a budget of `ticks` register reads
    ///
    /// Returns as soon as the busy bit reads clear. After `ticks` reads
    /// without seeing it clear, returns [`Error::FlashBusy`]. A failed
    /// register read is returned immediately.
    pub fn wait(&mut self, signal: Completion, ticks: u32) -> Result<()> {
        let reg = signal.register();
        let mask = signal.busy_mask();

        for tick in 0..ticks {
            let value = self.target.read_u32(reg)?;
            if value & mask == 0 {
                log::trace!("{} after {} tick(s)", signal, tick + 1);
                return Ok(());
            }
            // No point sleeping after the last read
            if tick + 1 < ticks {
                self.target.delay_ms(TICK_MS);
            }
        }

        log::warn!("timeout waiting for flash {}", signal);
        Err(Error::FlashBusy { signal })
    }
}
