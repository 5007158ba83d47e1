//! Per-transfer log lines and the end-of-run summary.
//!
//! Reporting is side-effect only: nothing here influences control flow or the
//! tally. Each `record` call emits one tracing event, so concurrent workers
//! never interleave within a line.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::types::{Tally, TransferOutcome, TransferStatus};

pub struct Reporter {
    progress: ProgressBar,
    unit_divisor: f64,
    unit_label: &'static str,
}

impl Reporter {
    pub fn new(total: u64, decimals: u8, unit_label: &'static str) -> Self {
        let progress = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} Transferring")
        {
            progress.set_style(style);
        }
        Self {
            progress,
            unit_divisor: 10f64.powi(decimals as i32),
            unit_label,
        }
    }

    /// A reporter with no visible progress bar, for tests.
    pub fn hidden(decimals: u8, unit_label: &'static str) -> Self {
        Self {
            progress: ProgressBar::hidden(),
            unit_divisor: 10f64.powi(decimals as i32),
            unit_label,
        }
    }

    pub fn start_banner(&self, funding_balance: &str, total_required: &str) {
        info!("=========================================================================");
        info!("================================= START =================================");
        info!("=========================================================================");
        info!("Funding account balance: {funding_balance}");
        info!("Total to distribute (incl. fee margin): {total_required}");
        info!("=========================================================================");
    }

    pub fn record(&self, outcome: &TransferOutcome) {
        let amount = outcome.record.amount as f64 / self.unit_divisor;
        match &outcome.status {
            TransferStatus::Succeeded(signature) => {
                info!(
                    "SUCCESS - Sent {} {} to {} - Signature: {}",
                    amount, self.unit_label, outcome.record.recipient, signature
                );
            }
            TransferStatus::Failed(reason) => {
                error!(
                    "Transaction failed for {} - Error: {}",
                    outcome.record.recipient, reason
                );
            }
        }
        self.progress.inc(1);
    }

    pub fn summarize(&self, tally: &Tally) {
        self.progress.finish_and_clear();
        info!("-------------------------------------------------------------------------");
        info!("Total transfers succeeded: {}", tally.succeeded);
        info!("Total transfers failed: {}", tally.failed);
        info!(
            "Run finished at {} - check the log file for signatures and error details.",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        info!("-------------------------------------------------------------------------");
    }
}
