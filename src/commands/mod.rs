//! CLI command implementations
//!
//! Every command works on a [`Bank`](crate::targets::Bank) opened by
//! [`targets::with_bank`](crate::targets::with_bank) and returns whether it
//! modified the flash content.

pub mod erase;
pub mod probe;
pub mod read;
pub mod write;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub use crate::targets::list_targets;

/// Spinner shown while a single long engine call runs
pub(crate) fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
