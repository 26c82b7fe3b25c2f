//! Register-level mock target for unit tests
//!
//! Records every register write and completes commands instantly unless
//! told to keep a completion bit stuck.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::regs::*;
use crate::target::{ResidentCall, ScratchArea, TargetAccess};

#[derive(Default)]
pub(crate) struct MockTarget {
    regs: BTreeMap<u32, u32>,
    writes: Vec<(u32, u32)>,
    reads: usize,
    delays: u32,
    pub stuck_action: bool,
    pub stuck_status: bool,
    pub fail_read: Option<u32>,
    /// Report the core as running
    pub running: bool,
    /// Largest scratch block that can be allocated (0: none)
    pub scratch_limit: u32,
    next_scratch: u32,
    live_scratch: Vec<ScratchArea>,
    blocks: Vec<(u32, usize)>,
    resident: Vec<(u32, usize, Vec<u32>)>,
}

impl MockTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reg(&mut self, addr: u32, value: u32) {
        self.regs.insert(addr, value);
    }

    pub fn reg(&self, addr: u32) -> u32 {
        self.regs.get(&addr).copied().unwrap_or(0)
    }

    pub fn writes(&self) -> &[(u32, u32)] {
        &self.writes
    }

    pub fn commands(&self) -> Vec<u32> {
        self.writes
            .iter()
            .filter(|(addr, _)| *addr == FLASH_CMD)
            .map(|(_, value)| *value)
            .collect()
    }

    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn delays(&self) -> u32 {
        self.delays
    }

    /// Scratch blocks allocated and not yet freed
    pub fn live_scratch(&self) -> &[ScratchArea] {
        &self.live_scratch
    }

    /// (address, length) of every block write
    pub fn blocks(&self) -> &[(u32, usize)] {
        &self.blocks
    }

    /// (entry, data length, register values) of every resident run
    pub fn resident_runs(&self) -> &[(u32, usize, Vec<u32>)] {
        &self.resident
    }
}

impl TargetAccess for MockTarget {
    fn read_u32(&mut self, addr: u32) -> Result<u32> {
        self.reads += 1;
        if self.fail_read == Some(addr) {
            return Err(Error::RegisterRead { addr });
        }
        if addr == FLASH_SR {
            return Ok(if self.stuck_status { SR_BUSY } else { 0 });
        }
        Ok(self.reg(addr))
    }

    fn write_u32(&mut self, addr: u32, value: u32) -> Result<()> {
        self.writes.push((addr, value));
        let stored = if addr == FLASH_CMD && !self.stuck_action {
            value & !(1 << CMD_ACT_OFF)
        } else {
            value
        };
        self.regs.insert(addr, stored);
        Ok(())
    }

    fn read_block(&mut self, addr: u32, _buf: &mut [u8]) -> Result<()> {
        Err(Error::MemoryRead { addr })
    }

    fn write_block(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        if !self.live_scratch.iter().any(|a| a.address == addr) {
            return Err(Error::MemoryWrite { addr });
        }
        self.blocks.push((addr, data.len()));
        Ok(())
    }

    fn alloc_scratch(&mut self, size: u32) -> Result<ScratchArea> {
        if size > self.scratch_limit {
            return Err(Error::ResourceUnavailable);
        }
        let area = ScratchArea {
            address: 0x2000_0000 + self.next_scratch,
            size,
        };
        self.next_scratch += size;
        self.live_scratch.push(area);
        Ok(area)
    }

    fn free_scratch(&mut self, area: ScratchArea) {
        self.live_scratch.retain(|a| *a != area);
    }

    fn run_resident(&mut self, call: &mut ResidentCall<'_>) -> Result<()> {
        let values = call.params.iter().map(|p| p.value).collect();
        self.resident.push((call.entry, call.data.len(), values));
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays += ms;
    }

    fn is_halted(&mut self) -> bool {
        !self.running
    }
}
