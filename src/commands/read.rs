//! Read command implementation

use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::targets::Bank;

/// Default chunk size for reading (one sector)
const READ_CHUNK_SIZE: usize = 4096;

/// Run the read command
pub fn run_read(
    bank: &mut Bank<'_>,
    output: &Path,
    offset: u32,
    length: Option<u32>,
) -> Result<bool, Box<dyn std::error::Error>> {
    bank.auto_probe()?;

    let length = match length {
        Some(len) => len,
        None => bank
            .size()
            .checked_sub(offset)
            .ok_or("Offset is beyond the end of flash")?,
    };

    let data = read_with_progress(bank, offset, length as usize)?;

    let mut file = File::create(output)?;
    file.write_all(&data)?;

    println!("Wrote {} bytes to {:?}", data.len(), output);
    Ok(false)
}

/// Read a flash range with progress bar
pub fn read_with_progress(
    bank: &mut Bank<'_>,
    offset: u32,
    length: usize,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut data = vec![0u8; length];

    let pb = ProgressBar::new(length as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );

    let mut done = 0usize;
    while done < length {
        let chunk_size = std::cmp::min(READ_CHUNK_SIZE, length - done);
        bank.read(offset + done as u32, &mut data[done..done + chunk_size])?;

        done += chunk_size;
        pb.set_position(done as u64);
    }

    pb.finish_with_message("Read complete");
    Ok(data)
}
