//! Flash bank options
//!
//! The two write behaviors (erase policy, program strategy) produce
//! different preservation guarantees and different performance, so both
//! are chosen explicitly per bank rather than hard-wired.

use core::fmt;

use crate::error::{Error, Result};
use crate::poll::Completion;
use crate::strategy::{BulkTransfer, ProgramUnit, SlowProgram, Strategy};

/// How a write clears the flash it is about to program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErasePolicy {
    /// Erase only the sectors covering the write envelope; data outside the
    /// envelope is preserved
    #[default]
    Sectors,
    /// Erase the whole chip before every write; data outside the envelope
    /// is lost
    Chip,
}

impl ErasePolicy {
    /// Parse a policy name ("sectors" or "chip")
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sectors" | "sector" => Some(Self::Sectors),
            "chip" => Some(Self::Chip),
            _ => None,
        }
    }
}

impl fmt::Display for ErasePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sectors => write!(f, "sectors"),
            Self::Chip => write!(f, "chip"),
        }
    }
}

/// Options for a flash bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BankOptions {
    /// Erase policy applied by `write`
    pub erase_policy: ErasePolicy,
    /// How the prepared envelope is programmed
    pub strategy: Strategy,
    /// Completion signal status register writes wait on
    pub status_wait: Completion,
}

impl BankOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the erase policy
    pub fn with_erase_policy(mut self, policy: ErasePolicy) -> Self {
        self.erase_policy = policy;
        self
    }

    /// Set the program strategy
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the completion signal for status register writes
    pub fn with_status_wait(mut self, signal: Completion) -> Self {
        self.status_wait = signal;
        self
    }

    /// Parse options from key-value pairs (from CLI)
    ///
    /// Supported options:
    /// - erase=sectors|chip
    /// - mode=bulk|page|word
    /// - fallback=page|word (slow path used when bulk has no scratch RAM)
    /// - staging=<bytes> (first bulk FIFO size tried)
    /// - status_wait=action|status
    pub fn from_options(options: &[(&str, &str)]) -> Result<Self> {
        let mut opts = Self::default();
        let mut mode = "bulk";
        let mut bulk = BulkTransfer::default();

        for (key, value) in options {
            match *key {
                "erase" | "erase_policy" => {
                    opts.erase_policy = ErasePolicy::parse(value).ok_or(
                        Error::InvalidOption("invalid erase value (use: sectors or chip)"),
                    )?;
                }
                "mode" => {
                    if !matches!(*value, "bulk" | "page" | "word") {
                        return Err(Error::InvalidOption(
                            "invalid mode value (use: bulk, page or word)",
                        ));
                    }
                    mode = *value;
                }
                "fallback" => {
                    bulk.fallback = SlowProgram::new(parse_unit(value).ok_or(
                        Error::InvalidOption("invalid fallback value (use: page or word)"),
                    )?);
                }
                "staging" => {
                    bulk.staging_size = value
                        .parse()
                        .ok()
                        .filter(|size: &u32| size.is_power_of_two())
                        .ok_or(Error::InvalidOption(
                            "invalid staging value (use a power of two)",
                        ))?;
                }
                "status_wait" => {
                    opts.status_wait = Completion::parse(value).ok_or(Error::InvalidOption(
                        "invalid status_wait value (use: action or status)",
                    ))?;
                }
                _ => {
                    log::warn!("Unknown bank option: {}={}", key, value);
                }
            }
        }

        opts.strategy = match mode {
            "page" => Strategy::Slow(SlowProgram::new(ProgramUnit::Page)),
            "word" => Strategy::Slow(SlowProgram::new(ProgramUnit::Word)),
            _ => Strategy::Bulk(bulk),
        };

        Ok(opts)
    }
}

fn parse_unit(s: &str) -> Option<ProgramUnit> {
    match s {
        "page" => Some(ProgramUnit::Page),
        "word" => Some(ProgramUnit::Word),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = BankOptions::from_options(&[]).unwrap();
        assert_eq!(opts, BankOptions::default());
        assert_eq!(opts.erase_policy, ErasePolicy::Sectors);
        assert_eq!(opts.status_wait, Completion::ActionDone);
        assert!(matches!(opts.strategy, Strategy::Bulk(_)));
    }

    #[test]
    fn test_parse_all_keys() {
        let opts = BankOptions::from_options(&[
            ("erase", "chip"),
            ("fallback", "word"),
            ("staging", "4096"),
            ("status_wait", "status"),
        ])
        .unwrap();
        assert_eq!(opts.erase_policy, ErasePolicy::Chip);
        assert_eq!(opts.status_wait, Completion::StatusIdle);
        assert_eq!(
            opts.strategy,
            Strategy::Bulk(BulkTransfer {
                staging_size: 4096,
                fallback: SlowProgram::new(ProgramUnit::Word),
            })
        );

        let opts = BankOptions::from_options(&[("mode", "word")]).unwrap();
        assert_eq!(
            opts.strategy,
            Strategy::Slow(SlowProgram::new(ProgramUnit::Word))
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(BankOptions::from_options(&[("erase", "all")]).is_err());
        assert!(BankOptions::from_options(&[("mode", "fast")]).is_err());
        assert!(BankOptions::from_options(&[("staging", "1000")]).is_err());
        assert!(BankOptions::from_options(&[("staging", "x")]).is_err());
        // Unknown keys only warn
        assert!(BankOptions::from_options(&[("speed", "1")]).is_ok());
    }
}
