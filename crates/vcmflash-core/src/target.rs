//! Target access trait
//!
//! The engine never touches hardware directly. Everything goes through
//! [`TargetAccess`], which is implemented by the host debug framework (or by
//! `vcmflash-sim` in tests): 32-bit register access, block memory access,
//! scratch RAM allocation on the target, and running a small resident
//! routine out of that scratch RAM.
//!
//! Implementations map their own failures onto the transport variants of
//! [`Error`](crate::Error) (`RegisterRead`, `RegisterWrite`, `MemoryRead`,
//! `MemoryWrite`), and report allocation failure as `ResourceUnavailable`.

use crate::error::Result;

/// A block of scratch RAM allocated on the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchArea {
    /// Target address of the block
    pub address: u32,
    /// Size in bytes
    pub size: u32,
}

impl ScratchArea {
    /// One past the last byte of the block
    pub fn end(&self) -> u32 {
        self.address + self.size
    }
}

/// Core register passed to (and optionally read back from) a resident routine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegParam {
    /// Register name understood by the target ("r0".."r12")
    pub name: &'static str,
    /// Value loaded before the routine starts; holds the result afterwards
    pub value: u32,
    /// Whether the routine's final value should be read back
    pub read_back: bool,
}

impl RegParam {
    /// Input-only register
    pub fn input(name: &'static str, value: u32) -> Self {
        Self {
            name,
            value,
            read_back: false,
        }
    }

    /// Register that is both loaded and read back
    pub fn in_out(name: &'static str, value: u32) -> Self {
        Self {
            name,
            value,
            read_back: true,
        }
    }
}

/// A streamed run of a resident routine
///
/// The host feeds `data` into the circular `fifo` in `block_size` units
/// while the routine at `entry` consumes it. The FIFO header follows the
/// usual convention: write pointer at `fifo.address`, read pointer at
/// `fifo.address + 4`, data from `fifo.address + 8` to `fifo.end()`.
/// A read pointer of zero written by the routine signals an error.
#[derive(Debug)]
pub struct ResidentCall<'a> {
    /// Entry point of the uploaded routine
    pub entry: u32,
    /// Data streamed through the FIFO
    pub data: &'a [u8],
    /// Unit the host writes into the FIFO
    pub block_size: u32,
    /// FIFO area in scratch RAM
    pub fifo: ScratchArea,
    /// Register parameters; values of `read_back` entries are updated
    pub params: &'a mut [RegParam],
}

/// Access to a debug target carrying the VCM4 flash controller
///
/// Calls are strictly sequential. The trait takes `&mut self` throughout so
/// that one in-flight flash operation per device is enforced by ownership.
pub trait TargetAccess {
    /// Read a 32-bit register or memory word
    fn read_u32(&mut self, addr: u32) -> Result<u32>;

    /// Write a 32-bit register or memory word
    fn write_u32(&mut self, addr: u32, value: u32) -> Result<()>;

    /// Read a block of target memory byte-wise
    fn read_block(&mut self, addr: u32, buf: &mut [u8]) -> Result<()>;

    /// Write a block of target memory
    fn write_block(&mut self, addr: u32, data: &[u8]) -> Result<()>;

    /// Allocate scratch RAM on the target
    ///
    /// Returns `Error::ResourceUnavailable` if no block of `size` bytes is
    /// free. This is not fatal to a write; the caller falls back.
    fn alloc_scratch(&mut self, size: u32) -> Result<ScratchArea>;

    /// Release scratch RAM obtained from [`alloc_scratch`](Self::alloc_scratch)
    fn free_scratch(&mut self, area: ScratchArea);

    /// Run an uploaded routine, streaming `call.data` through its FIFO
    fn run_resident(&mut self, call: &mut ResidentCall<'_>) -> Result<()>;

    /// Sleep for the given number of milliseconds
    fn delay_ms(&mut self, ms: u32);

    /// Whether the target core is halted
    fn is_halted(&mut self) -> bool {
        true
    }
}

impl<T: TargetAccess + ?Sized> TargetAccess for &mut T {
    fn read_u32(&mut self, addr: u32) -> Result<u32> {
        (**self).read_u32(addr)
    }

    fn write_u32(&mut self, addr: u32, value: u32) -> Result<()> {
        (**self).write_u32(addr, value)
    }

    fn read_block(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        (**self).read_block(addr, buf)
    }

    fn write_block(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        (**self).write_block(addr, data)
    }

    fn alloc_scratch(&mut self, size: u32) -> Result<ScratchArea> {
        (**self).alloc_scratch(size)
    }

    fn free_scratch(&mut self, area: ScratchArea) {
        (**self).free_scratch(area)
    }

    fn run_resident(&mut self, call: &mut ResidentCall<'_>) -> Result<()> {
        (**self).run_resident(call)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }

    fn is_halted(&mut self) -> bool {
        (**self).is_halted()
    }
}
