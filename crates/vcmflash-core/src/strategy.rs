//! Program strategies
//!
//! Two ways of moving a prepared, erased envelope into flash:
//!
//! - [`BulkTransfer`]: stream the data through a helper running on the
//!   target. Fast, but needs scratch RAM. Falls back to its
//!   [`SlowProgram`] whenever the scratch allocation fails.
//! - [`SlowProgram`]: drive page or word program commands from the host.
//!
//! [`Strategy`] is the closed set the bank is configured with.

use alloc::vec::Vec;
use core::fmt;

use crate::algorithm::{self, BLOCK_SIZE, INITIAL_STAGING_SIZE};
use crate::controller::FlashController;
use crate::error::{Error, Result};
use crate::program::{PAGE_SIZE, WORD_SIZE};
use crate::target::TargetAccess;

/// Something that can program a range of already-erased flash
pub trait ProgramStrategy {
    /// Short name used in log output
    fn name(&self) -> &'static str;

    /// Program `data` at `addr`
    fn program<T: TargetAccess>(
        &self,
        ctl: &mut FlashController<T>,
        addr: u32,
        data: &[u8],
    ) -> Result<()>;
}

/// Unit the host-driven path programs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgramUnit {
    /// 256-byte page program commands
    #[default]
    Page,
    /// 4-byte word program commands
    Word,
}

impl fmt::Display for ProgramUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page => write!(f, "page"),
            Self::Word => write!(f, "word"),
        }
    }
}

/// Host-driven page or word programming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlowProgram {
    /// Program command granularity
    pub unit: ProgramUnit,
}

impl SlowProgram {
    /// Slow path programming in `unit` steps
    pub fn new(unit: ProgramUnit) -> Self {
        Self { unit }
    }
}

impl ProgramStrategy for SlowProgram {
    fn name(&self) -> &'static str {
        match self.unit {
            ProgramUnit::Page => "page",
            ProgramUnit::Word => "word",
        }
    }

    fn program<T: TargetAccess>(
        &self,
        ctl: &mut FlashController<T>,
        addr: u32,
        data: &[u8],
    ) -> Result<()> {
        let unit = match self.unit {
            ProgramUnit::Page => PAGE_SIZE,
            ProgramUnit::Word => WORD_SIZE,
        };

        let mut offset = addr;
        for chunk in data.chunks(unit) {
            match self.unit {
                ProgramUnit::Page => ctl.program_page(offset, chunk)?,
                ProgramUnit::Word => ctl.program_word(offset, pack_word(chunk))?,
            }
            offset += chunk.len() as u32;
        }
        Ok(())
    }
}

// Short tails are padded with the erased value so the missing bytes are
// left untouched.
fn pack_word(chunk: &[u8]) -> u32 {
    let mut bytes = [0xFF; WORD_SIZE];
    bytes[..chunk.len()].copy_from_slice(chunk);
    u32::from_le_bytes(bytes)
}

/// Stream through the target-resident helper, with a host-driven fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkTransfer {
    /// First staging FIFO size tried; halved until allocation succeeds
    pub staging_size: u32,
    /// Used when no scratch RAM is available
    pub fallback: SlowProgram,
}

impl Default for BulkTransfer {
    fn default() -> Self {
        Self {
            staging_size: INITIAL_STAGING_SIZE,
            fallback: SlowProgram::default(),
        }
    }
}

impl ProgramStrategy for BulkTransfer {
    fn name(&self) -> &'static str {
        "bulk"
    }

    fn program<T: TargetAccess>(
        &self,
        ctl: &mut FlashController<T>,
        addr: u32,
        data: &[u8],
    ) -> Result<()> {
        let padded;
        let data = if data.len() % BLOCK_SIZE as usize != 0 {
            let mut buf = Vec::with_capacity(data.len() + BLOCK_SIZE as usize);
            buf.extend_from_slice(data);
            buf.resize(data.len().next_multiple_of(BLOCK_SIZE as usize), 0xFF);
            padded = buf;
            padded.as_slice()
        } else {
            data
        };

        log::info!(
            "writing buffer to flash offset=0x{:08X} bytes=0x{:X}",
            addr,
            data.len()
        );

        match algorithm::run_word_program(ctl, addr, data, self.staging_size) {
            Err(Error::ResourceUnavailable) => {
                log::warn!(
                    "can't allocate working area, using {} mode",
                    self.fallback.name()
                );
                self.fallback.program(ctl, addr, data)
            }
            other => other,
        }
    }
}

/// Configured program strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Resident helper with host fallback
    Bulk(BulkTransfer),
    /// Host-driven only
    Slow(SlowProgram),
}

impl Default for Strategy {
    fn default() -> Self {
        Self::Bulk(BulkTransfer::default())
    }
}

impl ProgramStrategy for Strategy {
    fn name(&self) -> &'static str {
        match self {
            Self::Bulk(s) => s.name(),
            Self::Slow(s) => s.name(),
        }
    }

    fn program<T: TargetAccess>(
        &self,
        ctl: &mut FlashController<T>,
        addr: u32,
        data: &[u8],
    ) -> Result<()> {
        match self {
            Self::Bulk(s) => s.program(ctl, addr, data),
            Self::Slow(s) => s.program(ctl, addr, data),
        }
    }
}
