//! Page and word program primitives
//!
//! Neither primitive erases. Programming can only clear bits, so the target
//! range must already be erased for the result to match the payload.

use crate::command::{CommandFlags, CommandWord};
use crate::controller::FlashController;
use crate::error::{Error, Result};
use crate::poll::{Completion, PAGE_PROGRAM_TICKS, WORD_PROGRAM_TICKS};
use crate::regs::*;
use crate::target::TargetAccess;

/// Bytes programmed by one page program command
pub const PAGE_SIZE: usize = BUF_SIZE;

/// Bytes programmed by one word program command
pub const WORD_SIZE: usize = 4;

fn program_command(byte_count: usize) -> Result<CommandWord> {
    CommandWord::issue(CMDID_PAGE_PROG)
        .with_flags(CommandFlags::CMDADDR | CommandFlags::CMDWR | CommandFlags::CMDDATA)
        .with_byte_count(byte_count)
}

impl<T: TargetAccess> FlashController<T> {
    /// Program up to one controller buffer (256 bytes) at `addr`
    pub fn program_page(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        if data.len() > PAGE_SIZE {
            return Err(Error::PayloadTooLarge { len: data.len() });
        }
        let cmd = program_command(data.len())?;

        self.write_enable()?;
        self.stage(data)?;
        self.set_address(addr)?;
        self.issue(cmd)?;
        self.wait(Completion::ActionDone, PAGE_PROGRAM_TICKS)
    }

    /// Program one 32-bit word at `addr`
    pub fn program_word(&mut self, addr: u32, word: u32) -> Result<()> {
        let cmd = program_command(WORD_SIZE)?;

        self.write_enable()?;
        self.target.write_u32(FLASH_BUF0, word)?;
        self.set_address(addr)?;
        self.issue(cmd)?;
        self.wait(Completion::ActionDone, WORD_PROGRAM_TICKS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTarget;
    use alloc::vec::Vec;

    #[test]
    fn test_program_word_sequence() {
        let mut ctl = FlashController::new(MockTarget::new());
        ctl.program_word(0x100, 0xDEAD_BEEF).unwrap();
        assert_eq!(
            ctl.target().writes(),
            [
                (FLASH_CMD, 0x8100_0006),
                (FLASH_BUF0, 0xDEAD_BEEF),
                (FLASH_ADDR, 0x100),
                (FLASH_CMD, 0x8103_0702),
            ]
        );
    }

    #[test]
    fn test_program_full_page() {
        let data: Vec<u8> = (0..=255u8).collect();
        let mut ctl = FlashController::new(MockTarget::new());
        ctl.program_page(0x2000, &data).unwrap();

        let writes = ctl.target().writes();
        // WREN, 64 buffer words, address, program
        assert_eq!(writes.len(), 67);
        assert_eq!(writes[1], (FLASH_BUF0, 0x0302_0100));
        assert_eq!(writes[64], (FLASH_BUF63, 0xFFFE_FDFC));
        assert_eq!(writes[65], (FLASH_ADDR, 0x2000));
        assert_eq!(writes[66], (FLASH_CMD, 0x81FF_0702));
    }

    #[test]
    fn test_program_partial_page_remainder() {
        let mut ctl = FlashController::new(MockTarget::new());
        ctl.program_page(0, &[1, 2, 3, 4, 5, 6, 7]).unwrap();

        let writes = ctl.target().writes();
        assert_eq!(writes[1], (FLASH_BUF0, 0x0403_0201));
        // Trailing bytes go to the next word, not back to BUF0
        assert_eq!(writes[2], (FLASH_BUF0 + 4, 0x0007_0605));
        let cmd = CommandWord::from_raw(writes[4].1);
        assert_eq!(cmd.byte_count(), 7);
    }

    #[test]
    fn test_program_page_rejects_oversized() {
        let mut ctl = FlashController::new(MockTarget::new());
        assert_eq!(
            ctl.program_page(0, &[0u8; PAGE_SIZE + 1]),
            Err(Error::PayloadTooLarge {
                len: PAGE_SIZE + 1
            })
        );
        assert!(ctl.target().writes().is_empty());
    }

    #[test]
    fn test_program_timeout_is_busy() {
        let mut mock = MockTarget::new();
        mock.stuck_action = true;
        let mut ctl = FlashController::new(mock);
        let err = ctl.program_word(0, 0).unwrap_err();
        assert!(err.is_busy());
        assert!(!err.is_transport());
    }
}
