//! Sector and chip erase

use crate::command::{CommandFlags, CommandWord};
use crate::controller::FlashController;
use crate::error::Result;
use crate::poll::{Completion, CHIP_ERASE_TICKS, SECTOR_ERASE_TICKS};
use crate::regs::*;
use crate::target::TargetAccess;

impl<T: TargetAccess> FlashController<T> {
    /// Erase the 4 KB sector starting at `offset`
    ///
    /// `offset` must already be sector aligned.
    pub fn erase_sector(&mut self, offset: u32) -> Result<()> {
        log::debug!("erasing sector at 0x{:08X}", offset);
        self.write_enable()?;
        self.set_address(offset)?;
        self.issue(
            CommandWord::issue(CMDID_SECTOR_ERASE)
                .with_flags(CommandFlags::CMDADDR | CommandFlags::CMDWR),
        )?;
        self.wait(Completion::ActionDone, SECTOR_ERASE_TICKS)
    }

    /// Erase the whole SPI-NOR device
    pub fn erase_chip(&mut self) -> Result<()> {
        log::debug!("erasing chip");
        self.write_enable()?;
        self.issue(CommandWord::issue(CMDID_CHIP_ERASE).with_flags(CommandFlags::CMDWR))?;
        self.wait(Completion::ActionDone, CHIP_ERASE_TICKS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTarget;

    #[test]
    fn test_erase_sector_sequence() {
        let mut ctl = FlashController::new(MockTarget::new());
        ctl.erase_sector(0x1F_F000).unwrap();
        assert_eq!(
            ctl.target().writes(),
            [
                (FLASH_CMD, 0x8100_0006),
                (FLASH_ADDR, 0x1F_F000),
                (FLASH_CMD, 0x8100_0620),
            ]
        );
    }

    #[test]
    fn test_erase_chip_sequence() {
        let mut ctl = FlashController::new(MockTarget::new());
        ctl.erase_chip().unwrap();
        assert_eq!(ctl.target().commands(), [0x8100_0006, 0x8100_02C7]);
    }

    #[test]
    fn test_erase_chip_timeout_budget() {
        let mut mock = MockTarget::new();
        mock.stuck_action = true;
        let mut ctl = FlashController::new(mock);
        // Write-enable never completes; erase is not issued
        assert!(ctl.erase_chip().unwrap_err().is_busy());
        assert_eq!(ctl.target().reads(), 100);
        assert_eq!(ctl.target().commands().len(), 1);
    }
}
