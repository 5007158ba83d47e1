//! Transfer execution against a Solana RPC endpoint.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    signature::{Keypair, Signature},
    signer::Signer,
    system_instruction,
    transaction::Transaction,
};
use solana_transaction_status::TransactionConfirmationStatus;
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use spl_token::instruction::transfer_checked;
use tokio::time::sleep;

use crate::error::TransferError;
use crate::types::{AssetKind, TransferRecord};

/// One attempt at submitting a single transfer. Implementations report every
/// non-success as an error; the dispatcher keeps those contained so one bad
/// transfer never takes down the batch. No retries: one attempt per record.
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    async fn execute(&self, record: TransferRecord) -> Result<Signature, TransferError>;
}

pub struct RpcTransferExecutor {
    client: Arc<RpcClient>,
    funding: Keypair,
    /// Mint decimals for `transfer_checked`; unused for native transfers.
    token_decimals: u8,
    confirm_timeout: Duration,
}

impl RpcTransferExecutor {
    pub fn new(
        client: Arc<RpcClient>,
        funding: Keypair,
        token_decimals: u8,
        confirm_timeout: Duration,
    ) -> Self {
        Self {
            client,
            funding,
            token_decimals,
            confirm_timeout,
        }
    }

    fn instructions_for(&self, record: &TransferRecord) -> Result<Vec<Instruction>, TransferError> {
        match record.asset {
            AssetKind::Sol => Ok(vec![system_instruction::transfer(
                &self.funding.pubkey(),
                &record.recipient,
                record.amount,
            )]),
            AssetKind::Token { mint } => {
                let source = get_associated_token_address(&self.funding.pubkey(), &mint);
                let destination = get_associated_token_address(&record.recipient, &mint);
                // Idempotent, so recipients that already hold the token are fine.
                let create_ata = create_associated_token_account_idempotent(
                    &self.funding.pubkey(),
                    &record.recipient,
                    &mint,
                    &spl_token::id(),
                );
                let transfer = transfer_checked(
                    &spl_token::id(),
                    &source,
                    &mint,
                    &destination,
                    &self.funding.pubkey(),
                    &[],
                    record.amount,
                    self.token_decimals,
                )
                .map_err(|e| TransferError::Send(format!("failed to build transfer instruction: {e}")))?;
                Ok(vec![create_ata, transfer])
            }
        }
    }

    async fn confirm(&self, signature: &Signature) -> Result<(), TransferError> {
        let deadline = Instant::now() + self.confirm_timeout;

        while Instant::now() < deadline {
            match self.client.get_signature_statuses(&[*signature]).await {
                Ok(response) => {
                    if let Some(status) = response.value.into_iter().flatten().next() {
                        if let Some(err) = status.err {
                            return Err(TransferError::OnChain(err.to_string()));
                        }
                        if matches!(
                            status.confirmation_status,
                            Some(
                                TransactionConfirmationStatus::Confirmed
                                    | TransactionConfirmationStatus::Finalized
                            )
                        ) {
                            return Ok(());
                        }
                    }
                    sleep(Duration::from_millis(500)).await;
                }
                Err(_) => {
                    sleep(Duration::from_millis(1_000)).await;
                }
            }
        }

        Err(TransferError::ConfirmationTimeout(*signature))
    }
}

#[async_trait]
impl TransferExecutor for RpcTransferExecutor {
    async fn execute(&self, record: TransferRecord) -> Result<Signature, TransferError> {
        let instructions = self.instructions_for(&record)?;

        // Fresh blockhash per attempt; a shared one would expire under paced
        // dispatch of a long plan.
        let blockhash = self
            .client
            .get_latest_blockhash()
            .await
            .map_err(|e| TransferError::Send(format!("failed to fetch blockhash: {e}")))?;

        let transaction = Transaction::new_signed_with_payer(
            &instructions,
            Some(&self.funding.pubkey()),
            &[&self.funding],
            blockhash,
        );

        let signature = self
            .client
            .send_transaction_with_config(
                &transaction,
                RpcSendTransactionConfig {
                    skip_preflight: false,
                    preflight_commitment: Some(CommitmentConfig::confirmed().commitment),
                    encoding: None,
                    max_retries: Some(5),
                    min_context_slot: None,
                },
            )
            .await
            .map_err(|e| TransferError::Send(e.to_string()))?;

        self.confirm(&signature).await?;
        Ok(signature)
    }
}
