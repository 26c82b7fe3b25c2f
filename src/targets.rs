//! Target registration and dispatch
//!
//! Targets are selected with a string of the form `name:key=value,...`.
//! Each backend is compiled in behind its own feature.

use vcmflash_core::{BankOptions, FlashBank, TargetAccess};

/// Bank over whichever target backend was opened
pub type Bank<'a> = FlashBank<&'a mut dyn TargetAccess>;

/// Information about a target backend
pub struct TargetInfo {
    /// Name used for matching
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
}

/// Get information about all available targets (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_targets() -> Vec<TargetInfo> {
    let mut targets = Vec::new();

    #[cfg(feature = "sim")]
    targets.push(TargetInfo {
        name: "sim",
        description: "Simulated VCM4 (image=<file>,scratch=<bytes>,mfr=<id>,version=<id>,busy=<reads>,running,unlocked)",
    });

    targets
}

/// Generate a short list of target names for CLI help
pub fn target_names_short() -> String {
    let targets = available_targets();
    let names: Vec<&str> = targets.iter().map(|t| t.name).collect();
    names.join(", ")
}

/// List all supported targets
pub fn list_targets() {
    println!("Supported targets:");
    println!();
    for t in available_targets() {
        println!("  {:8} - {}", t.name, t.description);
    }
}

/// Split a target string into its name and options
///
/// Options without a value (e.g. `running`) get an empty value.
pub fn parse_target_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    let (name, opts) = s.split_once(':').unwrap_or((s, ""));
    let options = opts
        .split(',')
        .filter(|opt| !opt.is_empty())
        .map(|opt| opt.split_once('=').unwrap_or((opt, "")))
        .collect();
    (name, options)
}

/// Open the target named by `spec`, build a bank on it and run `f`
///
/// `f` returns whether it changed the flash content; backends with
/// persistent state (the simulator's image file) save it in that case.
#[allow(unused_variables)]
pub fn with_bank<F>(
    spec: &str,
    options: BankOptions,
    f: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut Bank<'_>) -> Result<bool, Box<dyn std::error::Error>>,
{
    let (name, target_options) = parse_target_string(spec);

    match name {
        #[cfg(feature = "sim")]
        "sim" => with_sim(&target_options, options, f),
        _ => Err(format!(
            "Unknown target '{}' (available: {})",
            name,
            target_names_short()
        )
        .into()),
    }
}

#[cfg(feature = "sim")]
fn with_sim<F>(
    target_options: &[(&str, &str)],
    options: BankOptions,
    f: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut Bank<'_>) -> Result<bool, Box<dyn std::error::Error>>,
{
    use std::path::PathBuf;
    use vcmflash_sim::{SimConfig, SimTarget};

    let image = target_options
        .iter()
        .find(|(key, _)| *key == "image")
        .map(|(_, value)| PathBuf::from(*value));
    let sim_options: Vec<(&str, &str)> = target_options
        .iter()
        .copied()
        .filter(|(key, _)| *key != "image")
        .collect();
    let config = SimConfig::from_options(&sim_options)?;

    let mut sim = match &image {
        Some(path) => SimTarget::from_image_file(config, path)?,
        None => {
            log::info!("No image given, simulated flash starts erased and is discarded");
            SimTarget::new(config)
        }
    };

    let modified = {
        let mut bank = FlashBank::new(&mut sim as &mut dyn TargetAccess, 0, options)?;
        f(&mut bank)?
    };

    log::debug!("simulated time spent polling: {} ms", sim.elapsed_ms());
    if let (true, Some(path)) = (modified, &image) {
        sim.save_image(path)?;
        log::info!("Saved flash image to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target_string() {
        let (name, opts) = parse_target_string("sim:image=a.bin,scratch=0x800,running");
        assert_eq!(name, "sim");
        assert_eq!(
            opts,
            [("image", "a.bin"), ("scratch", "0x800"), ("running", "")]
        );

        let (name, opts) = parse_target_string("sim");
        assert_eq!(name, "sim");
        assert!(opts.is_empty());
    }

    #[test]
    fn test_unknown_target() {
        let result = with_bank("jtag", BankOptions::default(), |_| Ok(false));
        assert!(result.is_err());
    }

    #[cfg(feature = "sim")]
    #[test]
    fn test_sim_bank_runs_closure() {
        let mut seen = None;
        with_bank("sim:scratch=0", BankOptions::default(), |bank| {
            bank.probe()?;
            seen = Some(bank.sectors().len());
            Ok(false)
        })
        .unwrap();
        assert_eq!(seen, Some(512));
    }
}
