//! Write and write-test command implementation

use std::path::Path;

use vcmflash_core::bank::{WRITE_TEST_LEN, WRITE_TEST_WORD};

use super::read::read_with_progress;
use super::spinner;
use crate::targets::Bank;

/// Run the write command
pub fn run_write(
    bank: &mut Bank<'_>,
    input: &Path,
    offset: u32,
    verify: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let data = std::fs::read(input)?;
    if data.is_empty() {
        println!("{:?} is empty, nothing to write", input);
        return Ok(false);
    }

    bank.auto_probe()?;

    let pb = spinner(format!(
        "Writing {} bytes at 0x{:08X}...",
        data.len(),
        offset
    ));
    let result = bank.write(&data, offset);
    match &result {
        Ok(()) => pb.finish_with_message("Write complete"),
        Err(e) => pb.abandon_with_message(format!("Write failed: {}", e)),
    }
    result?;

    if verify {
        let readback = read_with_progress(bank, offset, data.len())?;
        if let Some(pos) = readback.iter().zip(&data).position(|(a, b)| a != b) {
            return Err(format!(
                "Verification failed at 0x{:08X}: expected 0x{:02X}, found 0x{:02X}",
                offset as usize + pos,
                data[pos],
                readback[pos]
            )
            .into());
        }
        println!("Verified {} bytes", data.len());
    }

    Ok(true)
}

/// Run the write-test command
pub fn run_write_test(bank: &mut Bank<'_>) -> Result<bool, Box<dyn std::error::Error>> {
    bank.write_test()?;

    let mut readback = [0u8; WRITE_TEST_LEN];
    bank.read(0, &mut readback)?;
    let ok = readback
        .chunks(4)
        .all(|w| w == &WRITE_TEST_WORD.to_le_bytes()[..w.len()]);
    if !ok {
        return Err("Test pattern did not read back".into());
    }

    println!(
        "Programmed {} bytes of 0x{:08X} at offset 0",
        WRITE_TEST_LEN, WRITE_TEST_WORD
    );
    Ok(true)
}
