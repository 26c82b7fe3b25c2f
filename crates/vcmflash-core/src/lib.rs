//! vcmflash-core - Programming engine for the VCM4 flash controller
//!
//! The VCM4 flash controller (FCSR) fronts an external SPI-NOR device
//! through a command register and a 256-byte buffer. This crate implements
//! the register-level protocol on top of it: command word encoding,
//! completion polling, vendor-specific status register sequences, sector
//! and chip erase, page program, and an unaligned write path that
//! preserves the bytes around the written range.
//!
//! Hardware access goes through the [`TargetAccess`] trait, implemented by
//! the host debug framework. The crate is `no_std` and needs `alloc`.
//!
//! # Features
//!
//! - `std` - Implement `std::error::Error` for [`Error`]
//!
//! # Example
//!
//! ```ignore
//! use vcmflash_core::{BankOptions, FlashBank, TargetAccess};
//!
//! fn flash_image<T: TargetAccess>(target: T, image: &[u8]) -> vcmflash_core::Result<()> {
//!     let mut bank = FlashBank::new(target, 0, BankOptions::default())?;
//!     bank.probe()?;
//!     bank.write(image, 0)
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod algorithm;
pub mod bank;
pub mod command;
pub mod controller;
pub mod device;
pub mod envelope;
pub mod erase;
pub mod error;
pub mod options;
pub mod poll;
pub mod program;
pub mod regs;
pub mod sector;
pub mod status;
pub mod strategy;
pub mod target;

#[cfg(test)]
mod mock;

pub use bank::{BankInfo, FlashBank};
pub use controller::FlashController;
pub use error::{Error, Result};
pub use options::{BankOptions, ErasePolicy};
pub use poll::Completion;
pub use strategy::{BulkTransfer, ProgramStrategy, ProgramUnit, SlowProgram, Strategy};
pub use target::{RegParam, ResidentCall, ScratchArea, TargetAccess};
