mod args;
mod config;
mod dispatcher;
mod error;
mod executor;
mod gate;
mod ledger;
mod logging;
mod reporter;
mod types;

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use args::Args;
use clap::Parser;
use config::Config;
use dispatcher::Dispatcher;
use executor::RpcTransferExecutor;
use gate::Affordability;
use reporter::Reporter;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    program_pack::Pack,
    signature::Keypair,
    signer::{Signer, keypair::read_keypair_file},
};
use spl_associated_token_account::get_associated_token_address;
use spl_token::state::{Account as TokenAccount, Mint};
use tracing::{error, info};
use types::{AssetKind, DistributionPlan, LAMPORTS_PER_SOL};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    let _log_guard = logging::init_logging(&config);

    let mode = config.dispatch_mode()?;
    let asset = config.asset()?;

    let funding = read_keypair_file(&config.funding_keypair_path).map_err(|e| {
        anyhow!(
            "Failed to read funding keypair from {}: {e}",
            config.funding_keypair_path
        )
    })?;

    let client = Arc::new(RpcClient::new_with_commitment(
        config.rpc_url.clone(),
        CommitmentConfig::confirmed(),
    ));

    // Token runs need the mint's decimals before amounts can be converted.
    let (decimals, unit_label) = match asset {
        AssetKind::Sol => (9u8, "SOL"),
        AssetKind::Token { mint } => {
            let account = client
                .get_account(&mint)
                .await
                .context("Failed to fetch token mint account")?;
            let mint_state = Mint::unpack(&account.data)
                .context("Configured mint is not a valid token mint account")?;
            (mint_state.decimals, "tokens")
        }
    };

    let plan = ledger::load_plan(&config.wallets_csv, asset, decimals, config.on_malformed)
        .with_context(|| format!("Failed to load recipients from {:?}", config.wallets_csv))?;
    info!(
        "Loaded {} transfer records from {:?}",
        plan.len(),
        config.wallets_csv
    );

    let (balance_display, required_display) =
        check_funding(&client, &funding, &plan, asset, decimals).await?;

    let reporter = Arc::new(Reporter::new(plan.len() as u64, decimals, unit_label));
    reporter.start_banner(&balance_display, &required_display);

    // Token distributions are gated behind an explicit go-ahead.
    if matches!(asset, AssetKind::Token { .. }) && !args.yes && !confirm_prompt()? {
        info!("Aborted by user.");
        return Ok(());
    }

    let executor = Arc::new(RpcTransferExecutor::new(
        Arc::clone(&client),
        funding,
        decimals,
        Duration::from_secs(args.timeout),
    ));
    let dispatcher = Dispatcher::new(executor, Arc::clone(&reporter), mode);

    let started = Instant::now();
    let (outcomes, tally) = dispatcher.run(&plan).await;
    info!(
        "All {} transfers completed in {}ms",
        outcomes.len(),
        started.elapsed().as_millis()
    );

    reporter.summarize(&tally);
    Ok(())
}

/// Verifies the funding account can cover the whole plan before anything is
/// dispatched, returning display strings for the start banner. Token runs
/// gate the token balance and the SOL fee balance separately.
async fn check_funding(
    client: &RpcClient,
    funding: &Keypair,
    plan: &DistributionPlan,
    asset: AssetKind,
    decimals: u8,
) -> Result<(String, String)> {
    match asset {
        AssetKind::Sol => {
            let balance = client
                .get_balance(&funding.pubkey())
                .await
                .context("Failed to fetch funding balance")?;
            let required = plan.required.total_lamports();
            if let Affordability::Insufficient { shortfall } = gate::check(balance, required) {
                error!(
                    "Your distribution amount ({} SOL) is higher than the balance in your funding wallet ({} SOL) - short {} SOL.",
                    sol(required),
                    sol(balance),
                    sol(shortfall)
                );
                bail!("insufficient funding balance");
            }
            Ok((
                format!("{} SOL", sol(balance)),
                format!("{} SOL", sol(required)),
            ))
        }
        AssetKind::Token { mint } => {
            let source = get_associated_token_address(&funding.pubkey(), &mint);
            let account = client
                .get_account(&source)
                .await
                .context("Failed to fetch funding token account")?;
            let token_balance = TokenAccount::unpack(&account.data)
                .context("Funding token account is not a valid token account")?
                .amount;

            let unit = 10f64.powi(decimals as i32);
            if let Affordability::Insufficient { shortfall } =
                gate::check(token_balance, plan.required.asset_units)
            {
                error!(
                    "Your distribution amount ({} tokens) is higher than the token balance in your funding wallet ({} tokens) - short {} tokens.",
                    plan.required.asset_units as f64 / unit,
                    token_balance as f64 / unit,
                    shortfall as f64 / unit
                );
                bail!("insufficient token balance");
            }

            let sol_balance = client
                .get_balance(&funding.pubkey())
                .await
                .context("Failed to fetch funding balance")?;
            if let Affordability::Insufficient { shortfall } =
                gate::check(sol_balance, plan.required.fee_lamports)
            {
                error!(
                    "Fees for this run need {} SOL but the funding wallet only holds {} SOL - short {} SOL.",
                    sol(plan.required.fee_lamports),
                    sol(sol_balance),
                    sol(shortfall)
                );
                bail!("insufficient balance for fees");
            }

            Ok((
                format!(
                    "{} tokens / {} SOL",
                    token_balance as f64 / unit,
                    sol(sol_balance)
                ),
                format!(
                    "{} tokens + {} SOL fees",
                    plan.required.asset_units as f64 / unit,
                    sol(plan.required.fee_lamports)
                ),
            ))
        }
    }
}

fn sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

fn confirm_prompt() -> Result<bool> {
    print!("Ready to distribute? [y/N] ");
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
