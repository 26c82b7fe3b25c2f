//! Error types for vcmflash-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate. Variants fall into four groups:
//!
//! - **Transport**: a register or memory access itself failed. Always
//!   propagated immediately, never retried.
//! - **Busy**: a completion poll ran out of ticks. The caller decides
//!   whether to retry; the controller state is undefined afterwards.
//! - **Protocol/state**: the operation was refused before touching the
//!   hardware (not probed, unknown silicon, protected sector, ...).
//! - **Resource**: scratch memory on the target could not be allocated.
//!   The write path recovers from this by falling back to slow mode.

use core::fmt;

use crate::poll::Completion;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Transport errors
    /// Reading a 32-bit register failed
    RegisterRead {
        /// Register address
        addr: u32,
    },
    /// Writing a 32-bit register failed
    RegisterWrite {
        /// Register address
        addr: u32,
    },
    /// Reading a block of target memory failed
    MemoryRead {
        /// Start address of the block
        addr: u32,
    },
    /// Writing a block of target memory failed
    MemoryWrite {
        /// Start address of the block
        addr: u32,
    },

    // Busy/timeout
    /// The controller did not signal completion within the tick budget
    FlashBusy {
        /// Which completion signal was being polled
        signal: Completion,
    },

    // Protocol/state errors
    /// Operation attempted before a successful probe
    NotProbed,
    /// Version ID register did not match any known device
    UnknownDevice {
        /// Value read from the version ID register
        version_id: u32,
    },
    /// Target core is running; flash access requires a halted core
    TargetNotHalted,
    /// Sector is marked protected and cannot be erased or programmed
    SectorProtected {
        /// Offset of the protected sector
        offset: u32,
    },
    /// Sector index is outside the probed geometry
    InvalidSector {
        /// Offending sector index
        index: usize,
    },
    /// Address range is beyond the flash size
    AddressOutOfBounds,
    /// Payload does not fit in the controller buffer
    PayloadTooLarge {
        /// Payload length in bytes
        len: usize,
    },
    /// The bank was declared at a base address the controller does not map
    InvalidBankBase {
        /// Requested base address
        base: u32,
    },
    /// Feature is not implemented for this controller
    NotSupported(&'static str),
    /// An option value could not be parsed
    InvalidOption(&'static str),

    // Resource errors
    /// Scratch memory on the target could not be allocated
    ResourceUnavailable,
    /// The resident flash helper reported a failure
    AlgorithmFailed {
        /// Status word returned by the helper
        status: u32,
    },
}

impl Error {
    /// Returns true for failures of the register/memory transport itself
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::RegisterRead { .. }
                | Self::RegisterWrite { .. }
                | Self::MemoryRead { .. }
                | Self::MemoryWrite { .. }
        )
    }

    /// Returns true if the error is a completion timeout
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::FlashBusy { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegisterRead { addr } => write!(f, "failed to read register 0x{:08X}", addr),
            Self::RegisterWrite { addr } => write!(f, "failed to write register 0x{:08X}", addr),
            Self::MemoryRead { addr } => write!(f, "failed to read memory at 0x{:08X}", addr),
            Self::MemoryWrite { addr } => write!(f, "failed to write memory at 0x{:08X}", addr),
            Self::FlashBusy { signal } => {
                write!(f, "flash busy: timeout waiting for {}", signal)
            }
            Self::NotProbed => write!(f, "flash bank not probed"),
            Self::UnknownDevice { version_id } => {
                write!(f, "unknown device version id (0x{:08X})", version_id)
            }
            Self::TargetNotHalted => write!(f, "target not halted"),
            Self::SectorProtected { offset } => {
                write!(f, "sector at 0x{:08X} is protected", offset)
            }
            Self::InvalidSector { index } => write!(f, "invalid sector index {}", index),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::PayloadTooLarge { len } => {
                write!(f, "payload of {} bytes exceeds controller buffer", len)
            }
            Self::InvalidBankBase { base } => {
                write!(f, "invalid bank address 0x{:08X}", base)
            }
            Self::NotSupported(what) => write!(f, "not supported: {}", what),
            Self::InvalidOption(msg) => write!(f, "invalid option: {}", msg),
            Self::ResourceUnavailable => write!(f, "target scratch memory not available"),
            Self::AlgorithmFailed { status } => {
                write!(f, "flash helper failed with status 0x{:08X}", status)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
