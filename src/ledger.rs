//! Loads the recipients file into a validated distribution plan.

use std::path::Path;
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use tracing::warn;

use crate::error::LedgerError;
use crate::types::{AssetKind, DistributionPlan, TransferRecord};

/// What to do with a row that fails validation. Abort keeps the ledger
/// all-or-nothing; skip logs the row and loads the rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedRowPolicy {
    #[default]
    Abort,
    Skip,
}

/// Parses headerless `address,amount` rows, converting human-unit amounts to
/// the asset's smallest unit via `10^decimals`. The returned plan's required
/// total is a pure function of the rows that loaded.
pub fn load_plan(
    path: impl AsRef<Path>,
    asset: AssetKind,
    decimals: u8,
    policy: MalformedRowPolicy,
) -> Result<DistributionPlan, LedgerError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let unit = 10u64.pow(decimals as u32) as f64;
    let mut records = Vec::new();

    for (idx, row) in reader.records().enumerate() {
        let line = idx + 1;
        let parsed = match row {
            Ok(row) => parse_row(&row, asset, unit),
            Err(e) => Err(e.to_string()),
        };
        match parsed {
            Ok(record) => records.push(record),
            Err(reason) => match policy {
                MalformedRowPolicy::Abort => {
                    return Err(LedgerError::MalformedRecord { line, reason });
                }
                MalformedRowPolicy::Skip => {
                    warn!("Skipping malformed record at line {line}: {reason}");
                }
            },
        }
    }

    Ok(DistributionPlan::new(records))
}

fn parse_row(row: &StringRecord, asset: AssetKind, unit: f64) -> Result<TransferRecord, String> {
    let address = row.get(0).ok_or_else(|| "missing address field".to_string())?;
    let amount_field = row.get(1).ok_or_else(|| "missing amount field".to_string())?;

    let recipient = Pubkey::from_str(address)
        .map_err(|e| format!("invalid address `{address}`: {e}"))?;
    let human: f64 = amount_field
        .parse()
        .map_err(|e| format!("invalid amount `{amount_field}`: {e}"))?;
    if !human.is_finite() || human < 0.0 {
        return Err(format!(
            "amount must be a non-negative number, got `{amount_field}`"
        ));
    }

    Ok(TransferRecord {
        recipient,
        amount: (human * unit) as u64,
        asset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_csv(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("airdrop-cli-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_rows_and_computes_required_total() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let path = write_csv("totals.csv", &format!("{a},1.5\n{b},2.0\n"));

        let plan = load_plan(&path, AssetKind::Sol, 9, MalformedRowPolicy::Abort).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.records[0].recipient, a);
        assert_eq!(plan.records[0].amount, 1_500_000_000);
        assert_eq!(plan.records[1].amount, 2_000_000_000);
        // 3.5 SOL plus two 0.000005 SOL fee margins.
        assert_eq!(plan.required.total_lamports(), 3_500_010_000);
    }

    #[test]
    fn required_total_is_idempotent() {
        let path = write_csv(
            "idempotent.csv",
            &format!("{},0.25\n{},0.75\n", Pubkey::new_unique(), Pubkey::new_unique()),
        );

        let first = load_plan(&path, AssetKind::Sol, 9, MalformedRowPolicy::Abort).unwrap();
        let second = load_plan(&path, AssetKind::Sol, 9, MalformedRowPolicy::Abort).unwrap();

        assert_eq!(first.required, second.required);
    }

    #[test]
    fn bad_address_aborts_with_line_number() {
        let path = write_csv(
            "bad-address.csv",
            &format!("{},1.0\nnot-a-pubkey,2.0\n", Pubkey::new_unique()),
        );

        let err = load_plan(&path, AssetKind::Sol, 9, MalformedRowPolicy::Abort).unwrap_err();
        match err {
            LedgerError::MalformedRecord { line, .. } => assert_eq!(line, 2),
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn negative_amount_is_malformed() {
        let path = write_csv("negative.csv", &format!("{},-1.0\n", Pubkey::new_unique()));

        let err = load_plan(&path, AssetKind::Sol, 9, MalformedRowPolicy::Abort).unwrap_err();
        assert!(matches!(err, LedgerError::MalformedRecord { line: 1, .. }));
    }

    #[test]
    fn skip_policy_drops_bad_rows_and_keeps_the_rest() {
        let good = Pubkey::new_unique();
        let path = write_csv("skip.csv", &format!("garbage,1.0\n{good},0.5\n"));

        let plan = load_plan(&path, AssetKind::Sol, 9, MalformedRowPolicy::Skip).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan.records[0].recipient, good);
    }

    #[test]
    fn token_amounts_use_mint_decimals() {
        let mint = Pubkey::new_unique();
        let path = write_csv("token.csv", &format!("{},12.5\n", Pubkey::new_unique()));

        let plan = load_plan(
            &path,
            AssetKind::Token { mint },
            6,
            MalformedRowPolicy::Abort,
        )
        .unwrap();

        assert_eq!(plan.records[0].amount, 12_500_000);
        assert_eq!(plan.records[0].asset, AssetKind::Token { mint });
        // Fees stay in lamports even when the distributed asset is a token.
        assert_eq!(plan.required.fee_lamports, 5_000);
    }
}
