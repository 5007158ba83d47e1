use solana_sdk::{pubkey::Pubkey, signature::Signature};

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Flat per-transfer fee margin (0.000005 SOL), charged into the pre-flight
/// total as a safety cushion rather than an authoritative fee estimate.
pub const FEE_PER_TRANSFER_LAMPORTS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Sol,
    Token { mint: Pubkey },
}

/// One validated row of the recipients file. Amounts are already converted to
/// the asset's smallest unit (lamports or token base units).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRecord {
    pub recipient: Pubkey,
    pub amount: u64,
    pub asset: AssetKind,
}

#[derive(Debug)]
pub enum TransferStatus {
    Succeeded(Signature),
    Failed(String),
}

/// Exactly one of these is produced per dispatched record.
#[derive(Debug)]
pub struct TransferOutcome {
    pub record: TransferRecord,
    pub status: TransferStatus,
}

impl TransferOutcome {
    pub fn succeeded(record: TransferRecord, signature: Signature) -> Self {
        Self {
            record,
            status: TransferStatus::Succeeded(signature),
        }
    }

    pub fn failed(record: TransferRecord, reason: impl Into<String>) -> Self {
        Self {
            record,
            status: TransferStatus::Failed(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, TransferStatus::Succeeded(_))
    }
}

/// What a full run costs. Fees are always paid in SOL, so token runs gate the
/// two components against different balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredFunds {
    pub asset_units: u64,
    pub fee_lamports: u64,
}

impl RequiredFunds {
    /// Total lamports needed when the distributed asset is SOL itself.
    pub fn total_lamports(&self) -> u64 {
        self.asset_units + self.fee_lamports
    }
}

/// The ordered set of transfers for one run plus its precomputed cost.
#[derive(Debug, Clone)]
pub struct DistributionPlan {
    pub records: Vec<TransferRecord>,
    pub required: RequiredFunds,
}

impl DistributionPlan {
    pub fn new(records: Vec<TransferRecord>) -> Self {
        let required = RequiredFunds {
            asset_units: records.iter().map(|r| r.amount).sum(),
            fee_lamports: FEE_PER_TRANSFER_LAMPORTS * records.len() as u64,
        };
        Self { records, required }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub succeeded: usize,
    pub failed: usize,
}

impl Tally {
    pub fn observe(&mut self, outcome: &TransferOutcome) {
        match outcome.status {
            TransferStatus::Succeeded(_) => self.succeeded += 1,
            TransferStatus::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(amount: u64) -> TransferRecord {
        TransferRecord {
            recipient: Pubkey::new_unique(),
            amount,
            asset: AssetKind::Sol,
        }
    }

    #[test]
    fn plan_required_sums_amounts_and_fees() {
        let plan = DistributionPlan::new(vec![record(1_500_000_000), record(2_000_000_000)]);
        assert_eq!(plan.required.asset_units, 3_500_000_000);
        assert_eq!(plan.required.fee_lamports, 10_000);
        assert_eq!(plan.required.total_lamports(), 3_500_010_000);
    }

    #[test]
    fn empty_plan_requires_nothing() {
        let plan = DistributionPlan::new(Vec::new());
        assert!(plan.is_empty());
        assert_eq!(plan.required.total_lamports(), 0);
    }

    #[test]
    fn tally_counts_each_status() {
        let mut tally = Tally::default();
        tally.observe(&TransferOutcome::succeeded(record(1), Signature::default()));
        tally.observe(&TransferOutcome::failed(record(2), "node unreachable"));
        assert_eq!(tally.succeeded, 1);
        assert_eq!(tally.failed, 1);
        assert_eq!(tally.total(), 2);
    }
}
