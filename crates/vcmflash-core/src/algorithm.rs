//! Target-resident word program helper
//!
//! For large writes the data is streamed into a FIFO in target RAM and a
//! small Thumb routine running on the target itself drains it into the
//! flash, issuing WREN plus a 4-byte page program per word.
//!
//! Register contract on entry:
//!
//! | Register | Meaning |
//! |----------|---------|
//! | r0 | FIFO start (write pointer); read pointer at `r0 + 4` on exit, 0 on error |
//! | r1 | FIFO end |
//! | r2 | flash address of the first word |
//! | r3 | byte count (multiple of 4) |
//! | r4 | FCSR base address |
//!
//! The routine ends on a `bkpt`. The two literal words at the end of the
//! blob are the WREN and word-program command words.

use crate::controller::FlashController;
use crate::error::{Error, Result};
use crate::regs::FCSR_BASE;
use crate::target::{RegParam, ResidentCall, ScratchArea, TargetAccess};

/// Thumb-2 word program loop
pub const WORD_PROGRAM: [u8; 80] = [
    0xd0, 0xf8, 0x00, 0x80, // ldr.w   r8, [r0]
    0xb8, 0xf1, 0x00, 0x0f, // cmp.w   r8, #0
    0x1c, 0xd0, //             beq.n   exit
    0x47, 0x68, //             ldr     r7, [r0, #4]
    0x47, 0x45, //             cmp     r7, r8
    0xf7, 0xd0, //             beq.n   wait_fifo
    0x0d, 0x4e, //             ldr     r6, =WREN
    0x26, 0x60, //             str     r6, [r4]
    0x26, 0x68, //             ldr     r6, [r4]
    0x16, 0xf0, 0x00, 0x4f, // tst.w   r6, #0x80000000
    0xfb, 0xd1, //             bne.n   busy
    0x57, 0xf8, 0x04, 0x6b, // ldr.w   r6, [r7], #4
    0xc4, 0xf8, 0x00, 0x61, // str.w   r6, [r4, #0x100]
    0x16, 0x46, //             mov     r6, r2
    0x04, 0x32, //             adds    r2, #4
    0x66, 0x60, //             str     r6, [r4, #4]
    0x08, 0x4e, //             ldr     r6, =PROGRAM
    0x26, 0x60, //             str     r6, [r4]
    0x26, 0x68, //             ldr     r6, [r4]
    0x16, 0xf0, 0x00, 0x4f, // tst.w   r6, #0x80000000
    0xfb, 0xd1, //             bne.n   busy
    0x8f, 0x42, //             cmp     r7, r1
    0x01, 0xd3, //             bcc.n   no_wrap
    0x07, 0x46, //             mov     r7, r0
    0x08, 0x37, //             adds    r7, #8
    0x47, 0x60, //             str     r7, [r0, #4]
    0x04, 0x3b, //             subs    r3, #4
    0xdd, 0xd1, //             bne.n   wait_fifo
    0x00, 0xbe, //             bkpt    0
    0x00, 0x00, //             padding
    0x06, 0x00, 0x00, 0x81, // WREN command word
    0x02, 0x07, 0x03, 0x81, // word program command word
];

/// First staging FIFO size tried
pub const INITIAL_STAGING_SIZE: u32 = 16384;

/// Staging sizes at or below this are not worth the round trip
pub const MIN_STAGING_SIZE: u32 = 256;

/// FIFO block size the host streams in
pub const BLOCK_SIZE: u32 = 4;

/// Allocate scratch for the helper and its FIFO, run it, release both
///
/// Returns [`Error::ResourceUnavailable`] when either allocation fails, with
/// nothing left allocated, so the caller can fall back to programming from
/// the host. `data.len()` must be a multiple of [`BLOCK_SIZE`].
pub(crate) fn run_word_program<T: TargetAccess>(
    ctl: &mut FlashController<T>,
    addr: u32,
    data: &[u8],
    staging_size: u32,
) -> Result<()> {
    let target = &mut ctl.target;

    let code = target.alloc_scratch(WORD_PROGRAM.len() as u32)?;
    if let Err(e) = target.write_block(code.address, &WORD_PROGRAM) {
        target.free_scratch(code);
        return Err(e);
    }

    let fifo = match alloc_fifo(target, staging_size) {
        Ok(fifo) => fifo,
        Err(e) => {
            target.free_scratch(code);
            return Err(e);
        }
    };

    log::debug!(
        "helper at 0x{:08X}, {} byte FIFO at 0x{:08X}",
        code.address,
        fifo.size,
        fifo.address
    );

    let mut params = [
        RegParam::in_out("r0", fifo.address),
        RegParam::input("r1", fifo.end()),
        RegParam::input("r2", addr),
        RegParam::input("r3", data.len() as u32),
        RegParam::input("r4", FCSR_BASE),
    ];
    let mut call = ResidentCall {
        entry: code.address,
        data,
        block_size: BLOCK_SIZE,
        fifo,
        params: &mut params,
    };
    let result = target.run_resident(&mut call);

    target.free_scratch(fifo);
    target.free_scratch(code);

    result.map_err(|e| {
        log::error!("error executing flash write helper: {}", e);
        e
    })
}

fn alloc_fifo<T: TargetAccess>(target: &mut T, initial: u32) -> Result<ScratchArea> {
    let mut size = initial;
    loop {
        match target.alloc_scratch(size) {
            Ok(area) => return Ok(area),
            Err(Error::ResourceUnavailable) => {
                size /= 2;
                if size <= MIN_STAGING_SIZE {
                    log::warn!("no large enough working area available for block writes");
                    return Err(Error::ResourceUnavailable);
                }
            }
            Err(e) => return Err(e),
        }
    }
}
