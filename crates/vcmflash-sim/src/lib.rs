//! vcmflash-sim - Simulated VCM4 target
//!
//! This crate provides an in-memory model of a VCM4 part: the FCSR flash
//! controller register block, the SPI-NOR device behind it (array, status
//! registers, write-enable latch, block protection), the memory-mapped flash
//! window, a scratch SRAM with an allocator, and the resident word program
//! helper. It implements [`TargetAccess`] so the real engine can run
//! against it without hardware.
//!
//! Faults can be injected through [`Faults`]: stuck completion bits, failing
//! register reads and a failing helper.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod error;

use alloc::collections::BTreeMap;
use alloc::string::ToString;
use alloc::vec;
use alloc::vec::Vec;

use vcmflash_core::algorithm::WORD_PROGRAM;
use vcmflash_core::command::CommandWord;
use vcmflash_core::error::{Error, Result};
use vcmflash_core::regs::*;
use vcmflash_core::target::{ResidentCall, ScratchArea, TargetAccess};

pub use error::SimError;

/// Base address of the scratch SRAM
pub const SRAM_BASE: u32 = 0x2000_0000;

/// JEDEC device ID reported next to the manufacturer (W25Q16)
pub const DEVICE_ID: u16 = 0x4015;

/// SR1 block-protect bits (BP0..BP2)
pub const SR1_BP_MASK: u8 = 0x1C;

const SECTOR_SIZE: usize = 4096;
const NOR_PAGE_SIZE: usize = 256;

// Registers that simply hold what was last written
const PLAIN_REGS: [u32; 11] = [
    FLASH_ADDR,
    FLASH_CFG,
    FLASH_CACHE,
    FLASH_CACHEHIT,
    FLASH_INVADDR_S,
    FLASH_INVADDR_E,
    FLASH_CACHE_INV,
    FLASH_CACHE_FLUSH,
    ANA_RG_GPPLL_CTRL0,
    ANA_RG_GPPLL_CTRL1,
    MISC2_CLKSEL,
];

/// Configuration for the simulated target
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Value of the `VERSION_ID` register
    pub version_id: u32,
    /// SPI-NOR manufacturer ID reported in `FLASH_ID`
    pub manufacturer_id: u8,
    /// Flash size in bytes
    pub flash_size: usize,
    /// Scratch SRAM available to the allocator, in bytes
    pub scratch_size: u32,
    /// Register reads a command stays busy for after being issued
    pub busy_reads: u32,
    /// Whether the core is halted
    pub halted: bool,
    /// Whether the part comes up with its block-protect bits set
    pub locked: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            version_id: 0x1906_1001, // phoenix
            manufacturer_id: MANUFACTURER_WINBOND,
            flash_size: 2048 * 1024,
            scratch_size: 32 * 1024,
            busy_reads: 2,
            halted: true,
            locked: true,
        }
    }
}

impl SimConfig {
    /// Parse configuration from key-value pairs (from CLI)
    ///
    /// Supported options:
    /// - scratch=<bytes>
    /// - mfr=<id>
    /// - version=<id>
    /// - size=<KiB>
    /// - busy=<reads>
    /// - running (core not halted)
    /// - unlocked (block-protect bits clear at reset)
    ///
    /// Numbers are decimal or `0x`-prefixed hex.
    pub fn from_options(options: &[(&str, &str)]) -> core::result::Result<Self, SimError> {
        let mut config = Self::default();

        for (key, value) in options {
            match *key {
                "scratch" => config.scratch_size = parse_number(key, value)?,
                "mfr" => {
                    let id = parse_number(key, value)?;
                    config.manufacturer_id = u8::try_from(id).map_err(|_| {
                        SimError::InvalidParameter("mfr must fit in one byte".to_string())
                    })?;
                }
                "version" => config.version_id = parse_number(key, value)?,
                "size" => config.flash_size = parse_number(key, value)? as usize * 1024,
                "busy" => config.busy_reads = parse_number(key, value)?,
                "running" => config.halted = false,
                "unlocked" => config.locked = false,
                _ => {
                    log::warn!("Unknown sim option: {}={}", key, value);
                }
            }
        }

        Ok(config)
    }
}

fn parse_number(key: &str, value: &str) -> core::result::Result<u32, SimError> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| SimError::InvalidParameter(alloc::format!("{}={}", key, value)))
}

/// Fault injection switches
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// `FLASH_CMD.ACT` never clears
    pub stuck_action: bool,
    /// `FLASH_SR` busy never clears
    pub stuck_status: bool,
    /// Reads of this register fail
    pub fail_read: Option<u32>,
    /// The resident helper reports an error
    pub fail_resident: bool,
}

/// Simulated VCM4 target
pub struct SimTarget {
    config: SimConfig,
    flash: Vec<u8>,
    ram: Vec<u8>,
    allocations: Vec<ScratchArea>,
    regs: BTreeMap<u32, u32>,
    buf: [u32; BUF_WORDS],
    cmd: u32,
    busy: u32,
    status_reg1: u8,
    status_reg2: u8,
    write_enabled: bool,
    commands: Vec<u32>,
    resident_runs: usize,
    elapsed_ms: u64,
    /// Active fault injection
    pub faults: Faults,
}

impl SimTarget {
    /// Create a target with erased flash
    pub fn new(config: SimConfig) -> Self {
        let flash = vec![0xFF; config.flash_size];
        let ram = vec![0; config.scratch_size as usize];
        let mut regs: BTreeMap<u32, u32> = PLAIN_REGS.iter().map(|&r| (r, 0)).collect();
        regs.insert(FLASH_CACHE, CACHE_EN);
        let status_reg1 = if config.locked { SR1_BP_MASK } else { 0 };

        Self {
            config,
            flash,
            ram,
            allocations: Vec::new(),
            regs,
            buf: [0; BUF_WORDS],
            cmd: 0,
            busy: 0,
            status_reg1,
            status_reg2: 0,
            write_enabled: false,
            commands: Vec::new(),
            resident_runs: 0,
            elapsed_ms: 0,
            faults: Faults::default(),
        }
    }

    /// Create a target with default configuration (phoenix, Winbond part)
    pub fn new_default() -> Self {
        Self::new(SimConfig::default())
    }

    /// Create a target whose flash starts with `image`
    pub fn with_data(config: SimConfig, image: &[u8]) -> core::result::Result<Self, SimError> {
        if image.len() > config.flash_size {
            return Err(SimError::ImageTooLarge {
                image: image.len(),
                flash: config.flash_size,
            });
        }
        let mut target = Self::new(config);
        target.flash[..image.len()].copy_from_slice(image);
        Ok(target)
    }

    /// Load the flash content from a file; a missing file means erased flash
    #[cfg(feature = "std")]
    pub fn from_image_file(
        config: SimConfig,
        path: &std::path::Path,
    ) -> core::result::Result<Self, SimError> {
        match std::fs::read(path) {
            Ok(image) => Self::with_data(config, &image),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("{} does not exist, starting erased", path.display());
                Ok(Self::new(config))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write the flash content to a file
    #[cfg(feature = "std")]
    pub fn save_image(&self, path: &std::path::Path) -> core::result::Result<(), SimError> {
        std::fs::write(path, &self.flash)?;
        Ok(())
    }

    /// Configuration the target was built with
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Flash array content
    pub fn flash(&self) -> &[u8] {
        &self.flash
    }

    /// Mutable flash array content (bypasses the controller)
    pub fn flash_mut(&mut self) -> &mut [u8] {
        &mut self.flash
    }

    /// SPI-NOR status register 1
    pub fn status_reg1(&self) -> u8 {
        self.status_reg1
    }

    /// SPI-NOR status register 2
    pub fn status_reg2(&self) -> u8 {
        self.status_reg2
    }

    /// Write-enable latch
    pub fn write_enabled(&self) -> bool {
        self.write_enabled
    }

    /// Every command word issued with ACT set, in order
    pub fn command_log(&self) -> &[u32] {
        &self.commands
    }

    /// Number of issued commands with the given opcode
    pub fn count_opcode(&self, opcode: u8) -> usize {
        self.commands
            .iter()
            .filter(|&&c| CommandWord::from_raw(c).opcode() == opcode)
            .count()
    }

    /// Forget the command log
    pub fn clear_log(&mut self) {
        self.commands.clear();
    }

    /// Number of completed resident helper runs
    pub fn resident_runs(&self) -> usize {
        self.resident_runs
    }

    /// Scratch blocks currently allocated
    pub fn allocations(&self) -> &[ScratchArea] {
        &self.allocations
    }

    /// Total time spent in `delay_ms`
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Halt or resume the simulated core
    pub fn set_halted(&mut self, halted: bool) {
        self.config.halted = halted;
    }

    fn locked(&self) -> bool {
        self.status_reg1 & SR1_BP_MASK != 0
    }

    fn flash_range(&self, addr: u32, len: usize) -> Option<core::ops::Range<usize>> {
        let start = addr as usize;
        let end = start.checked_add(len)?;
        (end <= self.flash.len()).then_some(start..end)
    }

    fn ram_range(&self, addr: u32, len: usize) -> Option<core::ops::Range<usize>> {
        let start = addr.checked_sub(SRAM_BASE)? as usize;
        let end = start.checked_add(len)?;
        (end <= self.ram.len()).then_some(start..end)
    }

    fn is_buf(addr: u32) -> bool {
        (FLASH_BUF0..=FLASH_BUF63).contains(&addr) && addr % 4 == 0
    }

    // One poll of a completion bit
    fn tick(&mut self) -> bool {
        if self.busy > 0 {
            self.busy -= 1;
            true
        } else {
            false
        }
    }

    fn read_reg(&mut self, addr: u32) -> core::result::Result<u32, SimError> {
        match addr {
            VERSION_ID => Ok(self.config.version_id),
            FLASH_CMD => {
                let busy = self.tick() || self.faults.stuck_action;
                let act = 1 << CMD_ACT_OFF;
                Ok(if busy { self.cmd | act } else { self.cmd & !act })
            }
            FLASH_SR => {
                let busy = self.tick() || self.faults.stuck_status;
                Ok(if busy { SR_BUSY } else { 0 })
            }
            FLASH_ID => Ok(((self.config.manufacturer_id as u32) << ID_MANUFACTURER_OFF)
                | DEVICE_ID as u32),
            a if Self::is_buf(a) => Ok(self.buf[((a - FLASH_BUF0) / 4) as usize]),
            a if self.regs.contains_key(&a) => Ok(self.regs[&a]),
            a => {
                let range = self
                    .flash_range(a, 4)
                    .map(|r| &self.flash[r])
                    .or_else(|| self.ram_range(a, 4).map(|r| &self.ram[r]))
                    .ok_or(SimError::Unmapped(a))?;
                Ok(u32::from_le_bytes([range[0], range[1], range[2], range[3]]))
            }
        }
    }

    fn write_reg(&mut self, addr: u32, value: u32) -> core::result::Result<(), SimError> {
        match addr {
            FLASH_CMD => {
                self.cmd = value;
                let cmd = CommandWord::from_raw(value);
                if cmd.action() {
                    self.execute(cmd);
                    self.busy = self.config.busy_reads;
                }
                Ok(())
            }
            VERSION_ID | FLASH_SR | FLASH_ID => {
                log::debug!("sim: write to read-only register 0x{:08X} ignored", addr);
                Ok(())
            }
            a if Self::is_buf(a) => {
                self.buf[((a - FLASH_BUF0) / 4) as usize] = value;
                Ok(())
            }
            a if self.regs.contains_key(&a) => {
                self.regs.insert(a, value);
                Ok(())
            }
            a if self.flash_range(a, 4).is_some() => Err(SimError::ReadOnly(a)),
            a => {
                let range = self.ram_range(a, 4).ok_or(SimError::Unmapped(a))?;
                self.ram[range].copy_from_slice(&value.to_le_bytes());
                Ok(())
            }
        }
    }

    // Take the write-enable latch; every write-type command clears it
    fn take_write_enable(&mut self, opcode: u8) -> bool {
        let enabled = self.write_enabled;
        self.write_enabled = false;
        if !enabled {
            log::warn!("sim: opcode 0x{:02X} without write enable, ignored", opcode);
        }
        enabled
    }

    fn payload(&self, len: usize) -> Vec<u8> {
        self.buf
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .take(len)
            .collect()
    }

    fn execute(&mut self, cmd: CommandWord) {
        self.commands.push(cmd.raw());
        let opcode = cmd.opcode();
        let addr = self.regs.get(&FLASH_ADDR).copied().unwrap_or(0);
        let len = if cmd.data_present() {
            cmd.byte_count()
        } else {
            0
        };

        log::trace!("sim: cmd 0x{:08X} addr 0x{:08X}", cmd.raw(), addr);

        match opcode {
            CMDID_WRITE_ENABLE => self.write_enabled = true,
            CMDID_WRITE_DISABLE => self.write_enabled = false,
            CMDID_WRSR1 => {
                if self.take_write_enable(opcode) {
                    let data = self.payload(len);
                    if let Some(&sr1) = data.first() {
                        self.status_reg1 = sr1;
                    }
                    if let Some(&sr2) = data.get(1) {
                        self.status_reg2 = sr2;
                    }
                }
            }
            CMDID_WRSR2 => {
                if self.take_write_enable(opcode) {
                    self.status_reg2 = self.payload(1)[0];
                }
            }
            CMDID_SECTOR_ERASE => {
                if self.take_write_enable(opcode) {
                    self.erase(addr as usize & !(SECTOR_SIZE - 1), SECTOR_SIZE);
                }
            }
            CMDID_CHIP_ERASE => {
                if self.take_write_enable(opcode) {
                    self.erase(0, self.flash.len());
                }
            }
            CMDID_PAGE_PROG => {
                if self.take_write_enable(opcode) {
                    let data = self.payload(len);
                    self.program(addr as usize, &data);
                }
            }
            _ => log::warn!("sim: unhandled opcode 0x{:02X}", opcode),
        }
    }

    fn erase(&mut self, start: usize, len: usize) {
        if self.locked() {
            log::warn!("sim: erase at 0x{:08X} ignored, block protect set", start);
            return;
        }
        if start + len > self.flash.len() {
            log::warn!("sim: erase at 0x{:08X} beyond end of flash", start);
            return;
        }
        self.flash[start..start + len].fill(0xFF);
    }

    // Page program wraps inside the 256-byte NOR page like the real part
    fn program(&mut self, addr: usize, data: &[u8]) {
        if self.locked() {
            log::warn!("sim: program at 0x{:08X} ignored, block protect set", addr);
            return;
        }
        if addr >= self.flash.len() {
            log::warn!("sim: program at 0x{:08X} beyond end of flash", addr);
            return;
        }
        let page = addr & !(NOR_PAGE_SIZE - 1);
        for (i, &byte) in data.iter().enumerate() {
            let a = page | ((addr + i) & (NOR_PAGE_SIZE - 1));
            // Flash programming: can only change 1 -> 0
            self.flash[a] &= byte;
        }
    }

    fn allocated(&self, addr: u32, len: u32) -> bool {
        self.allocations
            .iter()
            .any(|a| a.address <= addr && addr + len <= a.end())
    }

    // Behaves like the word program helper: wait for data in the FIFO, then
    // WREN plus a 4-byte program for every word.
    fn run_word_program(&mut self, call: &mut ResidentCall<'_>) -> core::result::Result<(), Error> {
        let entry_ok = self
            .ram_range(call.entry, WORD_PROGRAM.len())
            .is_some_and(|r| self.ram[r] == WORD_PROGRAM[..]);
        if !entry_ok || !self.allocated(call.entry, WORD_PROGRAM.len() as u32) {
            return Err(SimError::UnknownHelper(call.entry).into());
        }

        let reg = |name: &str| call.params.iter().find(|p| p.name == name).map(|p| p.value);
        let (Some(fifo_start), Some(fifo_end), Some(mut addr), Some(count), Some(base)) =
            (reg("r0"), reg("r1"), reg("r2"), reg("r3"), reg("r4"))
        else {
            return Err(Error::AlgorithmFailed { status: 0 });
        };

        let fifo = call.fifo;
        if fifo_start != fifo.address
            || fifo_end != fifo.end()
            || base != FCSR_BASE
            || count as usize != call.data.len()
            || count % call.block_size != 0
            || !self.allocated(fifo.address, fifo.size)
            || fifo.size <= 8
        {
            return Err(Error::AlgorithmFailed { status: 0 });
        }

        if self.faults.fail_resident {
            call.params[0].value = 0;
            return Err(Error::AlgorithmFailed { status: 0 });
        }

        let capacity = ((fifo.size - 8) & !3) as usize;
        let data_start = fifo.address + 8;
        for chunk in call.data.chunks(capacity) {
            let range = self
                .ram_range(data_start, chunk.len())
                .ok_or(Error::MemoryWrite { addr: data_start })?;
            self.ram[range.clone()].copy_from_slice(chunk);

            for word in range.step_by(4) {
                let value = u32::from_le_bytes([
                    self.ram[word],
                    self.ram[word + 1],
                    self.ram[word + 2],
                    self.ram[word + 3],
                ]);
                self.execute(CommandWord::from_raw(0x8100_0006));
                self.buf[0] = value;
                self.regs.insert(FLASH_ADDR, addr);
                self.execute(CommandWord::from_raw(0x8103_0702));
                addr += 4;
            }
        }

        if let Some(r0) = call.params.iter_mut().find(|p| p.name == "r0") {
            r0.value = data_start;
        }
        self.resident_runs += 1;
        Ok(())
    }
}

impl TargetAccess for SimTarget {
    fn read_u32(&mut self, addr: u32) -> Result<u32> {
        if self.faults.fail_read == Some(addr) {
            return Err(Error::RegisterRead { addr });
        }
        self.read_reg(addr).map_err(|e| e.on_read(addr))
    }

    fn write_u32(&mut self, addr: u32, value: u32) -> Result<()> {
        self.write_reg(addr, value).map_err(|e| e.on_write(addr))
    }

    fn read_block(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        let src = match self.flash_range(addr, buf.len()) {
            Some(r) => &self.flash[r],
            None => {
                let r = self.ram_range(addr, buf.len()).ok_or(SimError::OutOfRange {
                    addr,
                    len: buf.len(),
                })?;
                &self.ram[r]
            }
        };
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write_block(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        if self.flash_range(addr, 1).is_some() {
            return Err(SimError::ReadOnly(addr).into());
        }
        let range = self
            .ram_range(addr, data.len())
            .ok_or(Error::MemoryWrite { addr })?;
        self.ram[range].copy_from_slice(data);
        Ok(())
    }

    fn alloc_scratch(&mut self, size: u32) -> Result<ScratchArea> {
        let size = (size + 3) & !3;
        let mut taken = self.allocations.clone();
        taken.sort_by_key(|a| a.address);

        let mut candidate = SRAM_BASE;
        for area in &taken {
            if candidate + size <= area.address {
                break;
            }
            candidate = candidate.max(area.end());
        }
        if candidate + size > SRAM_BASE + self.config.scratch_size {
            log::debug!("sim: no {} byte scratch block free", size);
            return Err(Error::ResourceUnavailable);
        }

        let area = ScratchArea {
            address: candidate,
            size,
        };
        self.allocations.push(area);
        Ok(area)
    }

    fn free_scratch(&mut self, area: ScratchArea) {
        self.allocations.retain(|a| *a != area);
    }

    fn run_resident(&mut self, call: &mut ResidentCall<'_>) -> Result<()> {
        self.run_word_program(call)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ms += ms as u64;
    }

    fn is_halted(&mut self) -> bool {
        self.config.halted
    }
}
