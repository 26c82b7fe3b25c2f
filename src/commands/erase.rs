//! Erase and protect command implementation

use super::spinner;
use crate::targets::Bank;

/// Erase sectors `first..=last`
pub fn run_erase(
    bank: &mut Bank<'_>,
    first: usize,
    last: usize,
) -> Result<bool, Box<dyn std::error::Error>> {
    let pb = spinner(format!("Erasing sectors {}..={}...", first, last));
    match bank.erase(first, last) {
        Ok(()) => {
            pb.finish_with_message("Erase complete");
            Ok(true)
        }
        Err(e) => {
            pb.abandon_with_message(format!("Erase failed: {}", e));
            Err(Box::new(e))
        }
    }
}

/// Erase the whole device
pub fn run_mass_erase(bank: &mut Bank<'_>) -> Result<bool, Box<dyn std::error::Error>> {
    let pb = spinner("Erasing chip...".to_string());
    match bank.mass_erase() {
        Ok(()) => {
            pb.finish_with_message("Erase complete");
            Ok(true)
        }
        Err(e) => {
            pb.abandon_with_message(format!("Erase failed: {}", e));
            Err(Box::new(e))
        }
    }
}

/// Set or clear protection of sectors `first..=last`
pub fn run_protect(
    bank: &mut Bank<'_>,
    set: bool,
    first: usize,
    last: usize,
) -> Result<bool, Box<dyn std::error::Error>> {
    bank.protect(set, first, last)?;
    Ok(false)
}
