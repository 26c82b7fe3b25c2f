//! CLI argument parsing

use crate::targets;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Generate dynamic help text for the target argument
fn target_help() -> String {
    format!(
        "Target to use, e.g. sim:image=flash.bin [available: {}]",
        targets::target_names_short()
    )
}

#[derive(Parser)]
#[command(name = "vcmflash")]
#[command(author, version, about = "VCM4 on-chip flash programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Target to use
    #[arg(short, long, global = true, default_value = "sim", help = target_help())]
    pub target: String,

    /// Bank option as key=value (erase=sectors|chip, mode=bulk|page|word,
    /// fallback=page|word, staging=<bytes>, status_wait=action|status)
    #[arg(short = 'o', long = "option", global = true)]
    pub options: Vec<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Bank options split into key-value pairs
    pub fn option_pairs(&self) -> Result<Vec<(&str, &str)>, String> {
        self.options
            .iter()
            .map(|opt| {
                opt.split_once('=')
                    .ok_or_else(|| format!("Bank option '{}' is not key=value", opt))
            })
            .collect()
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify the device and bring the controller into programming state
    Probe,

    /// Show device information
    Info {
        /// Also list every sector with its state
        #[arg(long)]
        sectors: bool,
    },

    /// Read flash contents to file
    Read {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Start offset (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        offset: u32,

        /// Number of bytes to read (default: to the end of flash)
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,
    },

    /// Write file to flash at any offset, preserving surrounding data
    Write {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Start offset (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        offset: u32,

        /// Skip reading the data back after writing
        #[arg(long = "no-verify", action = clap::ArgAction::SetFalse)]
        verify: bool,
    },

    /// Erase a range of sectors
    Erase {
        /// First sector index
        #[arg(long)]
        first: usize,

        /// Last sector index (inclusive, default: same as first)
        #[arg(long)]
        last: Option<usize>,
    },

    /// Erase the whole flash
    MassErase,

    /// Program a test pattern at the start of flash
    WriteTest,

    /// Set or clear sector protection
    Protect {
        /// First sector index
        #[arg(long)]
        first: usize,

        /// Last sector index (inclusive)
        #[arg(long)]
        last: usize,

        /// Clear protection instead of setting it
        #[arg(long)]
        clear: bool,
    },

    /// List supported targets
    ListTargets,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_verify(args: &[&str]) -> bool {
        let cli = Cli::try_parse_from(args.iter().copied()).unwrap();
        match cli.command {
            Commands::Write { verify, .. } => verify,
            _ => panic!("expected write command"),
        }
    }

    #[test]
    fn test_write_verify_flag() {
        assert!(write_verify(&["vcmflash", "write", "-i", "a.bin"]));
        assert!(!write_verify(&["vcmflash", "write", "-i", "a.bin", "--no-verify"]));
    }

    #[test]
    fn test_option_pairs() {
        let cli = Cli::try_parse_from(["vcmflash", "-o", "erase=chip", "probe"]).unwrap();
        assert_eq!(cli.option_pairs().unwrap(), [("erase", "chip")]);

        let cli = Cli::try_parse_from(["vcmflash", "-o", "chip", "probe"]).unwrap();
        assert!(cli.option_pairs().is_err());
    }
}
