//! Controller command word encoding
//!
//! Every controller operation is started by writing one 32-bit word to
//! `FLASH_CMD`. The word carries the SPI opcode plus a handful of phase
//! flags and a transfer length:
//!
//! ```text
//!  31  30..25  24   23..16   15  14..12  11     10    9    8     7..0
//! ACT   -     POLL  LENGTH   -  CMDMODE ADDR4  ADDR   WR  DATA   CMDID
//! ```
//!
//! Any bit-position mismatch silently issues a different command, so the
//! layout is kept behind a typed builder and tested field by field.

use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::regs::*;

bitflags! {
    /// Single-bit fields of the command word
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CommandFlags: u32 {
        /// Start the operation; hardware clears it on completion
        const ACT      = 1 << CMD_ACT_OFF;
        /// Let the controller poll the device busy bit before completing
        const POLL     = 1 << CMD_POLL_OFF;
        /// Four-byte address phase
        const CMDADDR4 = 1 << CMD_CMDADDR4_OFF;
        /// Address phase present (address taken from `FLASH_ADDR`)
        const CMDADDR  = 1 << CMD_CMDADDR_OFF;
        /// Write direction
        const CMDWR    = 1 << CMD_CMDWR_OFF;
        /// Data phase present (payload in `FLASH_BUF*`)
        const CMDDATA  = 1 << CMD_CMDDATA_OFF;
    }
}

/// A controller command word
///
/// Built with the `with_*` methods and read back with the named accessors.
/// `ACT` and `POLL` are set by every constructor used by the engine, so the
/// word issued to hardware always starts exactly one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CommandWord(u32);

impl CommandWord {
    /// Empty command word (no fields set)
    pub const fn new() -> Self {
        Self(0)
    }

    /// Wrap a raw register value
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw value to be written to `FLASH_CMD`
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// A started, auto-polled command for `opcode` with no phases
    pub fn issue(opcode: u8) -> Self {
        Self::new()
            .with_flags(CommandFlags::ACT | CommandFlags::POLL)
            .with_opcode(opcode)
    }

    /// Set the given flag bits
    pub fn with_flags(self, flags: CommandFlags) -> Self {
        Self(self.0 | flags.bits())
    }

    /// Set the SPI opcode
    pub fn with_opcode(self, opcode: u8) -> Self {
        Self((self.0 & !CMD_CMDID) | ((opcode as u32) << CMD_CMDID_OFF))
    }

    /// Set the LENGTH field for a transfer of `byte_count` bytes
    ///
    /// The field holds `byte_count - 1`. A count of zero leaves the field
    /// untouched so the controller uses its default single-unit transfer.
    pub fn with_byte_count(self, byte_count: usize) -> Result<Self> {
        if byte_count == 0 {
            return Ok(self);
        }
        if byte_count > BUF_SIZE {
            return Err(Error::PayloadTooLarge { len: byte_count });
        }
        let len = (byte_count - 1) as u32;
        Ok(Self((self.0 & !CMD_LENGTH) | (len << CMD_LENGTH_OFF)))
    }

    /// Flag bits currently set
    pub fn flags(self) -> CommandFlags {
        CommandFlags::from_bits_truncate(self.0)
    }

    /// ACT bit
    pub fn action(self) -> bool {
        self.flags().contains(CommandFlags::ACT)
    }

    /// POLL bit
    pub fn poll(self) -> bool {
        self.flags().contains(CommandFlags::POLL)
    }

    /// Raw LENGTH field (byte count minus one)
    pub fn length(self) -> u8 {
        ((self.0 & CMD_LENGTH) >> CMD_LENGTH_OFF) as u8
    }

    /// Number of bytes the data phase transfers
    pub fn byte_count(self) -> usize {
        self.length() as usize + 1
    }

    /// CMDMODE field
    pub fn mode(self) -> u8 {
        ((self.0 & CMD_CMDMODE) >> CMD_CMDMODE_OFF) as u8
    }

    /// Address phase present
    pub fn address_present(self) -> bool {
        self.flags().contains(CommandFlags::CMDADDR)
    }

    /// Write direction
    pub fn write_present(self) -> bool {
        self.flags().contains(CommandFlags::CMDWR)
    }

    /// Data phase present
    pub fn data_present(self) -> bool {
        self.flags().contains(CommandFlags::CMDDATA)
    }

    /// SPI opcode
    pub fn opcode(self) -> u8 {
        ((self.0 & CMD_CMDID) >> CMD_CMDID_OFF) as u8
    }
}

impl From<CommandWord> for u32 {
    fn from(cmd: CommandWord) -> u32 {
        cmd.raw()
    }
}

/// One staged write to a controller buffer register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferWrite {
    /// Buffer register address (`FLASH_BUF0 + 4 * index`)
    pub addr: u32,
    /// Little-endian packed payload word
    pub value: u32,
}

/// Iterator over the buffer-register writes needed to stage a payload
///
/// Full 4-byte chunks become one word each, little-endian. A trailing
/// 1–3 byte remainder is packed least-significant-byte-first into one more
/// word placed directly after the last full word.
pub struct StagedPayload<'a> {
    chunks: core::slice::Chunks<'a, u8>,
    index: usize,
}

impl Iterator for StagedPayload<'_> {
    type Item = BufferWrite;

    fn next(&mut self) -> Option<BufferWrite> {
        let chunk = self.chunks.next()?;
        let value = chunk
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, &b)| acc | ((b as u32) << (i * 8)));
        let write = BufferWrite {
            addr: flash_buf(self.index),
            value,
        };
        self.index += 1;
        Some(write)
    }
}

/// Compute the buffer-register writes for `payload`
///
/// Fails if the payload does not fit in the 256-byte controller buffer.
pub fn stage_payload(payload: &[u8]) -> Result<StagedPayload<'_>> {
    if payload.len() > BUF_SIZE {
        return Err(Error::PayloadTooLarge {
            len: payload.len(),
        });
    }
    Ok(StagedPayload {
        chunks: payload.chunks(4),
        index: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn test_field_positions() {
        let cmd = CommandWord::new()
            .with_flags(CommandFlags::ACT)
            .with_flags(CommandFlags::POLL);
        assert_eq!(cmd.raw(), 0x8100_0000);

        let cmd = CommandWord::new().with_flags(CommandFlags::CMDADDR);
        assert_eq!(cmd.raw(), 1 << 10);
        let cmd = CommandWord::new().with_flags(CommandFlags::CMDWR);
        assert_eq!(cmd.raw(), 1 << 9);
        let cmd = CommandWord::new().with_flags(CommandFlags::CMDDATA);
        assert_eq!(cmd.raw(), 1 << 8);
        let cmd = CommandWord::new().with_opcode(0xC7);
        assert_eq!(cmd.raw(), 0xC7);
        let cmd = CommandWord::new().with_byte_count(256).unwrap();
        assert_eq!(cmd.raw(), 0x00FF_0000);
    }

    #[test]
    fn test_write_enable_word() {
        // Same constant the resident helper uses for WREN
        let cmd = CommandWord::issue(CMDID_WRITE_ENABLE);
        assert_eq!(cmd.raw(), 0x8100_0006);
    }

    #[test]
    fn test_word_program_word() {
        let cmd = CommandWord::issue(CMDID_PAGE_PROG)
            .with_flags(CommandFlags::CMDADDR | CommandFlags::CMDWR | CommandFlags::CMDDATA)
            .with_byte_count(4)
            .unwrap();
        assert_eq!(cmd.raw(), 0x8103_0702);
        assert!(cmd.action());
        assert!(cmd.poll());
        assert!(cmd.address_present());
        assert!(cmd.write_present());
        assert!(cmd.data_present());
        assert_eq!(cmd.length(), 3);
        assert_eq!(cmd.byte_count(), 4);
        assert_eq!(cmd.opcode(), CMDID_PAGE_PROG);
    }

    #[test]
    fn test_zero_byte_count_omits_length() {
        let base = CommandWord::issue(CMDID_WRSR2);
        assert_eq!(base.with_byte_count(0).unwrap(), base);
        assert_eq!(base.with_byte_count(1).unwrap(), base);
        assert_eq!(base.with_byte_count(256).unwrap().length(), 0xFF);
        assert_eq!(
            base.with_byte_count(257),
            Err(Error::PayloadTooLarge { len: 257 })
        );
    }

    #[test]
    fn test_accessors_roundtrip_raw() {
        let cmd = CommandWord::from_raw(0x8101_0301);
        assert!(cmd.action());
        assert!(cmd.poll());
        assert_eq!(cmd.length(), 1);
        assert!(cmd.write_present());
        assert!(cmd.data_present());
        assert!(!cmd.address_present());
        assert_eq!(cmd.opcode(), CMDID_WRSR1);
        assert_eq!(cmd.mode(), 0);
    }

    #[test]
    fn test_stage_payload_full_words() {
        let writes: Vec<_> = stage_payload(&[0x01, 0x02, 0x03, 0x04, 0xAA, 0xBB, 0xCC, 0xDD])
            .unwrap()
            .collect();
        assert_eq!(
            writes,
            [
                BufferWrite {
                    addr: FLASH_BUF0,
                    value: 0x0403_0201
                },
                BufferWrite {
                    addr: FLASH_BUF0 + 4,
                    value: 0xDDCC_BBAA
                },
            ]
        );
    }

    #[test]
    fn test_stage_payload_remainder() {
        let writes: Vec<_> = stage_payload(&[0x11, 0x22, 0x33, 0x44, 0x55, 0x66])
            .unwrap()
            .collect();
        assert_eq!(writes.len(), 2);
        // Remainder lands in the word after the last full one
        assert_eq!(writes[1].addr, FLASH_BUF0 + 4);
        assert_eq!(writes[1].value, 0x0000_6655);
    }

    #[test]
    fn test_stage_payload_limits() {
        assert_eq!(stage_payload(&[]).unwrap().count(), 0);
        let full = [0u8; BUF_SIZE];
        let writes: Vec<_> = stage_payload(&full).unwrap().collect();
        assert_eq!(writes.len(), BUF_WORDS);
        assert_eq!(writes.last().unwrap().addr, FLASH_BUF63);
        assert!(stage_payload(&[0u8; BUF_SIZE + 1]).is_err());
    }
}
