use solana_sdk::signature::Signature;
use thiserror::Error;

/// Fatal pre-dispatch problems with the run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("concurrency must be between 1 and 10, got {0}")]
    ConcurrencyOutOfRange(usize),

    #[error("config sets both `concurrency` and `delay_secs`; pick one dispatch mode")]
    ModeConflict,

    #[error("config must set either `concurrency` or `delay_secs`")]
    ModeMissing,

    #[error("`delay_secs` must be a non-negative number, got {0}")]
    InvalidDelay(f64),

    #[error("invalid token mint address `{0}`")]
    InvalidMint(String),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to read recipients file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse recipients file: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
}

/// A single transfer attempt that did not reach confirmed success. These stay
/// contained in the dispatcher as failed outcomes; they never abort the batch.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("send error: {0}")]
    Send(String),

    #[error("transaction failed: {0}")]
    OnChain(String),

    #[error("timed out waiting for confirmation of {0}")]
    ConfirmationTimeout(Signature),
}
