//! vcmflash - VCM4 on-chip flash programmer
//!
//! Drives the `vcmflash-core` engine against a target backend. The target
//! is chosen with `--target name:key=value,...`; the simulator
//! (`sim:image=<file>`) keeps the flash content in an image file between
//! runs.

mod cli;
mod commands;
mod targets;

use clap::Parser;
use cli::{Cli, Commands};
use vcmflash_core::BankOptions;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    if let Commands::ListTargets = cli.command {
        commands::list_targets();
        return Ok(());
    }

    let options = BankOptions::from_options(&cli.option_pairs()?)?;
    log::debug!("bank options: {:?}", options);

    let result = targets::with_bank(&cli.target, options, |bank| match &cli.command {
        Commands::Probe => commands::probe::run_probe(bank),
        Commands::Info { sectors } => commands::probe::run_info(bank, *sectors),
        Commands::Read {
            output,
            offset,
            length,
        } => commands::read::run_read(bank, output, *offset, *length),
        Commands::Write {
            input,
            offset,
            verify,
        } => commands::write::run_write(bank, input, *offset, *verify),
        Commands::Erase { first, last } => {
            commands::erase::run_erase(bank, *first, last.unwrap_or(*first))
        }
        Commands::MassErase => commands::erase::run_mass_erase(bank),
        Commands::WriteTest => commands::write::run_write_test(bank),
        Commands::Protect { first, last, clear } => {
            commands::erase::run_protect(bank, !*clear, *first, *last)
        }
        Commands::ListTargets => Ok(false),
    });

    if let Err(e) = &result {
        log::error!("{}", e);
    }
    result
}
