//! Transfer and application-fee ledger merges.
//!
//! Each handler is a read-merge-write against one transaction row keyed
//! by a provider id. Failures are logged and swallowed: the ledger is
//! bookkeeping on top of money that already moved.

use annpale_common::get_current_timestamp;
use serde_json::json;

use super::WebhookProcessor;
use crate::error::ReconcileError;
use crate::events::{ApplicationFee, Transfer};
use crate::transaction::TransactionRecord;

impl WebhookProcessor {
    pub(super) async fn handle_transfer_event(
        &self,
        transfer: &Transfer,
        reversal: bool,
    ) -> Result<(), ReconcileError> {
        let Some(source_transaction) = &transfer.source_transaction else {
            tracing::debug!(
                "[handle_transfer_event] Transfer {} has no source transaction",
                transfer.id
            );
            return Ok(());
        };

        let patch = if reversal {
            json!({
                "transferId": transfer.id,
                "transferReversed": true,
                "transferReversedAt": get_current_timestamp(),
            })
        } else {
            json!({
                "transferId": transfer.id,
                "transferAmount": transfer.amount,
                "transferReversed": transfer.reversed,
                "transferDestination": transfer.destination,
            })
        };

        if let Err(err) =
            TransactionRecord::merge_metadata(self.pool, source_transaction, patch).await
        {
            tracing::warn!(
                "[handle_transfer_event] Failed to merge transfer {} into {}: {}",
                transfer.id,
                source_transaction,
                err
            );
        }
        Ok(())
    }

    pub(super) async fn handle_application_fee_created(
        &self,
        fee: &ApplicationFee,
    ) -> Result<(), ReconcileError> {
        let patch = json!({
            "applicationFeeId": fee.id,
            "applicationFeeCreatedAt": get_current_timestamp(),
        });
        if let Err(err) =
            TransactionRecord::merge_with_platform_fee(self.pool, &fee.charge, fee.amount, patch)
                .await
        {
            tracing::warn!(
                "[handle_application_fee_created] Failed to record fee {} on {}: {}",
                fee.id,
                fee.charge,
                err
            );
        }
        Ok(())
    }

    pub(super) async fn handle_application_fee_refunded(
        &self,
        fee: &ApplicationFee,
    ) -> Result<(), ReconcileError> {
        let patch = json!({
            "applicationFeeRefunded": true,
            "applicationFeeRefundedAmount": fee.amount_refunded,
            "applicationFeeRefundedAt": get_current_timestamp(),
        });
        if let Err(err) = TransactionRecord::merge_metadata(self.pool, &fee.charge, patch).await {
            tracing::warn!(
                "[handle_application_fee_refunded] Failed to record fee refund {} on {}: {}",
                fee.id,
                fee.charge,
                err
            );
        }
        Ok(())
    }
}
