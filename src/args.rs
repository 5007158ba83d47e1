use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version)]
#[command(about = "Solana batch airdrop utility")]
#[command(
    long_about = "Distributes SOL or SPL-token balances from one funding account to a list of \
    recipients. Supports a bounded concurrent dispatch pool or paced sequential sending, with a \
    pre-flight balance check and a success/failure tally."
)]
pub struct Args {
    /// Path to the YAML configuration file
    #[clap(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Timeout in seconds for transaction confirmation
    #[clap(short, long, default_value = "60")]
    pub timeout: u64,

    /// Skip the interactive confirmation prompt in token mode
    #[clap(long)]
    pub yes: bool,
}
