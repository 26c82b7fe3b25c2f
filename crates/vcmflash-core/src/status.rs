//! Status register and write protection sequences
//!
//! The quad-enable and block-protect bits live in different status
//! registers depending on the SPI-NOR vendor. Two layouts are known:
//! Winbond parts split them across SR1 and SR2, everything else is driven
//! as a single two-byte write to SR1.

use core::fmt;

use crate::command::{CommandFlags, CommandWord};
use crate::controller::FlashController;
use crate::error::Result;
use crate::poll::STATUS_WRITE_TICKS;
use crate::regs::*;
use crate::target::TargetAccess;

/// Status register layout family, selected by manufacturer ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorLayout {
    /// QE in SR2, BP bits in SR1, each with its own write opcode
    Winbond,
    /// SR1 and SR2 written together through the SR1 opcode
    Generic,
}

impl VendorLayout {
    /// Pick the layout for a manufacturer ID
    ///
    /// Unrecognized IDs use [`VendorLayout::Generic`].
    pub fn from_manufacturer(id: u8) -> Self {
        match id {
            MANUFACTURER_WINBOND => Self::Winbond,
            other => {
                log::debug!(
                    "manufacturer 0x{:02X} not recognized, using generic status layout",
                    other
                );
                Self::Generic
            }
        }
    }

    /// Writes that set the quad-enable bit
    pub fn quad_enable(self) -> &'static [StatusWrite] {
        match self {
            Self::Winbond => &WINBOND_QUAD_ENABLE,
            Self::Generic => &GENERIC_COMBINED,
        }
    }

    /// Writes that clear the block-protect bits
    pub fn protect_disable(self) -> &'static [StatusWrite] {
        match self {
            Self::Winbond => &WINBOND_PROTECT_DISABLE,
            Self::Generic => &GENERIC_COMBINED,
        }
    }
}

impl fmt::Display for VendorLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Winbond => write!(f, "Winbond"),
            Self::Generic => write!(f, "generic"),
        }
    }
}

/// One status register write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusWrite {
    /// Write opcode (WRSR1 or WRSR2)
    pub opcode: u8,
    /// Word staged into `FLASH_BUF0`
    pub data: u32,
    /// Bytes transferred; 0 leaves LENGTH at the controller default
    pub byte_count: usize,
}

const WINBOND_QUAD_ENABLE: [StatusWrite; 1] = [StatusWrite {
    opcode: CMDID_WRSR2,
    data: SR2_QE as u32,
    byte_count: 0,
}];

const WINBOND_PROTECT_DISABLE: [StatusWrite; 2] = [
    StatusWrite {
        opcode: CMDID_WRSR2,
        data: SR2_QE as u32,
        byte_count: 0,
    },
    StatusWrite {
        opcode: CMDID_WRSR1,
        data: 0x00,
        byte_count: 0,
    },
];

// SR1 = 0x00 (no BP bits), SR2 = QE
const GENERIC_COMBINED: [StatusWrite; 1] = [StatusWrite {
    opcode: CMDID_WRSR1,
    data: (SR2_QE as u32) << 8,
    byte_count: 2,
}];

impl<T: TargetAccess> FlashController<T> {
    /// Layout of the currently attached SPI-NOR part
    ///
    /// The manufacturer ID is read fresh on every call.
    pub fn vendor_layout(&mut self) -> Result<VendorLayout> {
        let id = self.read_manufacturer_id()?;
        Ok(VendorLayout::from_manufacturer(id))
    }

    /// Write one status register, prefixed by a write-enable
    pub fn write_status_register(&mut self, write: &StatusWrite) -> Result<()> {
        self.write_enable()?;

        let cmd = CommandWord::issue(write.opcode)
            .with_flags(CommandFlags::CMDWR | CommandFlags::CMDDATA)
            .with_byte_count(write.byte_count)?;

        log::debug!(
            "status write: opcode 0x{:02X} data 0x{:08X}",
            write.opcode,
            write.data
        );
        self.target.write_u32(FLASH_BUF0, write.data)?;
        self.issue(cmd)?;
        self.wait(self.status_wait, STATUS_WRITE_TICKS)
    }

    fn run_status_writes(&mut self, writes: &[StatusWrite]) -> Result<()> {
        for write in writes {
            self.write_status_register(write)?;
        }
        Ok(())
    }

    /// Set the quad-enable bit of the attached part
    pub fn quad_enable(&mut self) -> Result<()> {
        let layout = self.vendor_layout()?;
        log::debug!("quad enable ({} layout)", layout);
        self.run_status_writes(layout.quad_enable())
    }

    /// Clear all block-protect bits of the attached part
    pub fn protect_disable(&mut self) -> Result<()> {
        let layout = self.vendor_layout()?;
        log::debug!("write protect disable ({} layout)", layout);
        self.run_status_writes(layout.protect_disable())
    }
}
