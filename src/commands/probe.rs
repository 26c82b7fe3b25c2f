//! Probe and info command implementation

use vcmflash_core::ProgramStrategy;

use crate::targets::Bank;

/// Probe the device
pub fn run_probe(bank: &mut Bank<'_>) -> Result<bool, Box<dyn std::error::Error>> {
    match bank.probe() {
        Ok(()) => {
            let info = bank.info()?;
            println!("Found vcm4-{}:", info.variant);
            println!("  Size:    {} bytes ({} KiB)", info.flash_size, info.flash_size / 1024);
            println!("  Sectors: {} x {} bytes", info.num_sectors, info.sector_size);
            Ok(false)
        }
        Err(e) => {
            eprintln!("Probe failed: {}", e);
            Err(Box::new(e))
        }
    }
}

/// Print device information, optionally with the sector table
pub fn run_info(bank: &mut Bank<'_>, sectors: bool) -> Result<bool, Box<dyn std::error::Error>> {
    let info = bank.info()?;
    println!("{}", info);
    let options = *bank.options();
    println!(
        "  Strategy: {} (erase policy: {})",
        options.strategy.name(),
        options.erase_policy
    );

    if sectors {
        println!();
        println!("{:>5} {:>10} {:>8} {:>8} {:>10}", "#", "Offset", "Size", "Erased", "Protected");
        for (i, s) in bank.sectors().iter().enumerate() {
            println!(
                "{:>5} 0x{:08X} {:>8} {:>8} {:>10}",
                i,
                s.offset,
                s.size,
                tri_state(s.is_erased),
                tri_state(s.is_protected)
            );
        }
    }
    Ok(false)
}

fn tri_state(state: Option<bool>) -> &'static str {
    match state {
        Some(true) => "yes",
        Some(false) => "no",
        None => "unknown",
    }
}
