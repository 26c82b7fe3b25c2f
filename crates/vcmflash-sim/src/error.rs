//! Error types for the simulated target

#[cfg(not(feature = "std"))]
use alloc::string::String;

#[cfg(feature = "std")]
use thiserror::Error;

use vcmflash_core::Error as CoreError;

/// Simulator errors
#[derive(Debug)]
#[cfg_attr(feature = "std", derive(Error))]
pub enum SimError {
    /// Access to an address nothing is mapped at
    #[cfg_attr(feature = "std", error("No register or memory mapped at 0x{0:08X}"))]
    Unmapped(u32),

    /// Block access crossing the end of a memory region
    #[cfg_attr(
        feature = "std",
        error("Access of {len} bytes at 0x{addr:08X} crosses region end")
    )]
    OutOfRange { addr: u32, len: usize },

    /// Flash cannot be written through the memory bus
    #[cfg_attr(feature = "std", error("Flash at 0x{0:08X} is read-only on the bus"))]
    ReadOnly(u32),

    /// Image does not fit the configured flash
    #[cfg_attr(
        feature = "std",
        error("Image of {image} bytes exceeds flash size of {flash} bytes")
    )]
    ImageTooLarge { image: usize, flash: usize },

    /// Uploaded helper does not match the known word program routine
    #[cfg_attr(feature = "std", error("Unknown resident code at 0x{0:08X}"))]
    UnknownHelper(u32),

    /// Invalid parameter
    #[cfg_attr(feature = "std", error("Invalid parameter: {0}"))]
    InvalidParameter(String),

    /// I/O error on the backing image file
    #[cfg(feature = "std")]
    #[cfg_attr(feature = "std", error("I/O error: {0}"))]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Map onto the engine's error for a register read at `addr`
    pub(crate) fn on_read(&self, addr: u32) -> CoreError {
        log::debug!("sim: read at 0x{:08X} failed: {:?}", addr, self);
        CoreError::RegisterRead { addr }
    }

    /// Map onto the engine's error for a register write at `addr`
    pub(crate) fn on_write(&self, addr: u32) -> CoreError {
        log::debug!("sim: write at 0x{:08X} failed: {:?}", addr, self);
        CoreError::RegisterWrite { addr }
    }
}

impl From<SimError> for CoreError {
    fn from(e: SimError) -> Self {
        match e {
            SimError::Unmapped(addr) => CoreError::MemoryRead { addr },
            SimError::OutOfRange { addr, .. } => CoreError::MemoryRead { addr },
            SimError::ReadOnly(addr) => CoreError::MemoryWrite { addr },
            SimError::UnknownHelper(_) => CoreError::AlgorithmFailed { status: 0 },
            _ => CoreError::NotSupported("simulator"),
        }
    }
}
