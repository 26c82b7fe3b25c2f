//! VCM4 flash controller register definitions
//!
//! Register addresses and bit positions for the FCSR (flash controller
//! command/status register) block, the SPI-NOR opcodes the controller is
//! driven with, and the handful of system registers touched during probe.
//!
//! # Register Layout
//!
//! The controller exposes a single command register that both configures
//! and triggers an operation, an address register, and a 256-byte data
//! buffer (`BUF0..BUF63`) used for both directions.

// ============================================================================
// System registers
// ============================================================================

/// Silicon version ID register
pub const VERSION_ID: u32 = 0x4004_803C;

/// Analog GPPLL control 0
pub const ANA_RG_GPPLL_CTRL0: u32 = 0x4004_B004;
/// Analog GPPLL control 1
pub const ANA_RG_GPPLL_CTRL1: u32 = 0x4004_B008;
/// AHB clock source select
pub const MISC2_CLKSEL: u32 = 0x4004_7004;

// ============================================================================
// FCSR register block
// ============================================================================

/// FCSR register block base address
pub const FCSR_BASE: u32 = 0x4002_0000;

const fn fcsr(offset: u32) -> u32 {
    FCSR_BASE + offset
}

/// Flash controller command register
pub const FLASH_CMD: u32 = fcsr(0x000);
/// Flash controller address register
pub const FLASH_ADDR: u32 = fcsr(0x004);
/// Flash controller configuration register
pub const FLASH_CFG: u32 = fcsr(0x008);
/// Flash controller cache configuration register
pub const FLASH_CACHE: u32 = fcsr(0x00C);
/// SPI flash status register mirror
pub const FLASH_SR: u32 = fcsr(0x010);
/// SPI flash ID register
pub const FLASH_ID: u32 = fcsr(0x014);
/// Cache hit rate counter
pub const FLASH_CACHEHIT: u32 = fcsr(0x018);
/// Cache invalidate/flush start address
pub const FLASH_INVADDR_S: u32 = fcsr(0x020);
/// Cache invalidate/flush end address
pub const FLASH_INVADDR_E: u32 = fcsr(0x024);
/// Cache invalidate control
pub const FLASH_CACHE_INV: u32 = fcsr(0x028);
/// Cache flush control
pub const FLASH_CACHE_FLUSH: u32 = fcsr(0x02C);
/// Read/write buffer word 0
pub const FLASH_BUF0: u32 = fcsr(0x100);
/// Read/write buffer word 63
pub const FLASH_BUF63: u32 = fcsr(0x1FC);

/// Number of 32-bit words in the controller buffer
pub const BUF_WORDS: usize = 64;
/// Controller buffer size in bytes (one program page)
pub const BUF_SIZE: usize = BUF_WORDS * 4;

/// Address of buffer word `index`
pub const fn flash_buf(index: usize) -> u32 {
    FLASH_BUF0 + (index as u32) * 4
}

// FLASH_CMD fields
/// Action: set to start, cleared by hardware on completion
pub const CMD_ACT_OFF: u32 = 31;
/// Poll the device WIP bit before clearing ACT
pub const CMD_POLL_OFF: u32 = 24;
/// Transfer length minus one
pub const CMD_LENGTH_OFF: u32 = 16;
/// Mask of the LENGTH field
pub const CMD_LENGTH: u32 = 0xFF << CMD_LENGTH_OFF;
/// Command I/O mode
pub const CMD_CMDMODE_OFF: u32 = 12;
/// Mask of the CMDMODE field
pub const CMD_CMDMODE: u32 = 0x7 << CMD_CMDMODE_OFF;
/// Four-byte address phase
pub const CMD_CMDADDR4_OFF: u32 = 11;
/// Address phase present
pub const CMD_CMDADDR_OFF: u32 = 10;
/// Write direction
pub const CMD_CMDWR_OFF: u32 = 9;
/// Data phase present
pub const CMD_CMDDATA_OFF: u32 = 8;
/// SPI opcode
pub const CMD_CMDID_OFF: u32 = 0;
/// Mask of the CMDID field
pub const CMD_CMDID: u32 = 0xFF << CMD_CMDID_OFF;

// FLASH_CACHE bits
/// Cache enable
pub const CACHE_EN: u32 = 1 << 0;

// FLASH_SR bits
/// SPI device busy (mirror of the NOR WIP bit)
pub const SR_BUSY: u32 = 1 << 0;

// FLASH_ID fields
/// Manufacturer ID byte position
pub const ID_MANUFACTURER_OFF: u32 = 16;

// FLASH_CFG fields
/// Command clock divider
pub const CFG_CMD_CLKDIV_OFF: u32 = 0;
/// Mask of the command clock divider
pub const CFG_CMD_CLKDIV: u32 = 0xF << CFG_CMD_CLKDIV_OFF;
/// Memory-mapped read clock divider
pub const CFG_MEM_CLKDIV_OFF: u32 = 4;
/// Mask of the memory clock divider
pub const CFG_MEM_CLKDIV: u32 = 0xF << CFG_MEM_CLKDIV_OFF;
/// Flash size code
pub const CFG_SIZE_OFF: u32 = 8;
/// Mask of the size code
pub const CFG_SIZE: u32 = 0x7 << CFG_SIZE_OFF;
/// Memory-mapped read I/O mode
pub const CFG_MEMMODE_OFF: u32 = 12;
/// Mask of the memory mode
pub const CFG_MEMMODE: u32 = 0x7 << CFG_MEMMODE_OFF;
/// Command latency
pub const CFG_CMD_LATENCY_OFF: u32 = 16;
/// Mask of the command latency
pub const CFG_CMD_LATENCY: u32 = 0x3 << CFG_CMD_LATENCY_OFF;
/// Memory read latency
pub const CFG_MEM_LATENCY_OFF: u32 = 18;
/// Mask of the memory latency
pub const CFG_MEM_LATENCY: u32 = 0x3 << CFG_MEM_LATENCY_OFF;

/// Flash size code for 16 Mbit
pub const CFG_SIZE_16MBIT: u32 = 0x5;
/// Memory mode: quad in, quad out
pub const CFG_MEMMODE_4I4O: u32 = 0x5;

// ============================================================================
// SPI-NOR opcodes
// ============================================================================

/// Write status register 1
pub const CMDID_WRSR1: u8 = 0x01;
/// Page program
pub const CMDID_PAGE_PROG: u8 = 0x02;
/// Read data
pub const CMDID_READ_DATA: u8 = 0x03;
/// Write disable
pub const CMDID_WRITE_DISABLE: u8 = 0x04;
/// Read status register 1
pub const CMDID_RDSR1: u8 = 0x05;
/// Write enable
pub const CMDID_WRITE_ENABLE: u8 = 0x06;
/// Fast read
pub const CMDID_FAST_READ: u8 = 0x0B;
/// Read configuration register
pub const CMDID_RDCR: u8 = 0x15;
/// 4 KB sector erase
pub const CMDID_SECTOR_ERASE: u8 = 0x20;
/// Write status register 2
pub const CMDID_WRSR2: u8 = 0x31;
/// Quad page program
pub const CMDID_QUADPAGE_PROG: u8 = 0x32;
/// Read status register 2
pub const CMDID_RDSR2: u8 = 0x35;
/// 32 KB block erase
pub const CMDID_BLOCK_ERASE_32K: u8 = 0x52;
/// Chip erase
pub const CMDID_CHIP_ERASE: u8 = 0xC7;
/// 64 KB block erase
pub const CMDID_BLOCK_ERASE_64K: u8 = 0xD8;

/// Winbond JEDEC manufacturer ID
pub const MANUFACTURER_WINBOND: u8 = 0xEF;

// Status register payloads
/// SR2 quad-enable bit
pub const SR2_QE: u8 = 0x02;
