//! Refund and dispute reconciliation.

use annpale_common::get_current_timestamp;
use annpale_database::{QueryCriteria, SqlxCrud, SqlxFilterQuery};
use serde_json::json;

use super::WebhookProcessor;
use crate::error::ReconcileError;
use crate::events::{Charge, Dispute, Refund};
use crate::notifications::{Notification, Severity, SystemAlert};
use crate::order::{Order, OrderStatus};
use crate::split::format_amount;
use crate::transaction::TransactionRecord;
use crate::video_request::{VideoRequest, VideoRequestStatus};

impl WebhookProcessor {
    /// Money went back to the fan. The sub-steps are independent side
    /// effects: each failure is logged and the rest still run.
    pub(super) async fn handle_charge_refunded(
        &self,
        charge: &Charge,
    ) -> Result<(), ReconcileError> {
        let payment_ref = charge.payment_reference();
        let refunds: &[Refund] = charge
            .refunds
            .as_ref()
            .map(|list| list.data.as_slice())
            .unwrap_or_default();

        // Refund-tracking ledger entries, keyed by the provider refund id
        // so redeliveries merge instead of duplicating.
        for refund in refunds {
            let ledger_status = match refund.status.as_deref() {
                Some("succeeded") => "succeeded",
                Some("failed") => "failed",
                _ => "processing",
            };
            let mut patch = json!({
                "refundId": refund.id,
                "refundStatus": ledger_status,
                "refundAmount": refund.amount,
            });
            if let Some(reason) = &refund.failure_reason {
                patch["refundFailureReason"] = json!(reason);
            }
            if let Err(err) = TransactionRecord::merge_metadata(self.pool, payment_ref, patch).await
            {
                tracing::warn!(
                    "[handle_charge_refunded] Failed to update refund ledger for {}: {}",
                    refund.id,
                    err
                );
            }
        }

        let found = Order::find_one_by_criteria(
            QueryCriteria::new().add_valued_filter(
                "payment_reference_id",
                "=",
                payment_ref.to_string(),
            ),
            self.pool,
        )
        .await?;
        let Some(mut order) = found else {
            return Err(ReconcileError::RecordNotFound {
                entity: "order",
                key: payment_ref.to_string(),
            });
        };

        let latest_refund = refunds.first();
        let reason = latest_refund
            .and_then(|r| r.reason.clone())
            .unwrap_or_else(|| "requested".to_string());

        order.status = OrderStatus::Refunded;
        order.merge_metadata(json!({
            "refundAmount": charge.amount_refunded,
            "refundReason": reason,
            "refundId": latest_refund.map(|r| r.id.clone()),
            "refundedAt": get_current_timestamp(),
        }));
        let order = match order.clone().update(self.pool).await {
            Ok(updated) => updated,
            Err(err) => {
                tracing::error!(
                    "[handle_charge_refunded] Failed to mark order {} refunded: {}",
                    order.id,
                    err
                );
                order
            }
        };

        if let Some(video_request_id) = order.video_request_id {
            match VideoRequest::find_one_by_criteria(
                QueryCriteria::new().add_valued_filter("id", "=", video_request_id),
                self.pool,
            )
            .await
            {
                Ok(Some(mut request)) => {
                    request.status = VideoRequestStatus::Cancelled;
                    request.rejection_reason = Some(format!("Order refunded: {}", reason));
                    if let Err(err) = request.update(self.pool).await {
                        tracing::warn!(
                            "[handle_charge_refunded] Failed to cancel video request {}: {}",
                            video_request_id,
                            err
                        );
                    }
                }
                Ok(None) => {
                    tracing::warn!(
                        "[handle_charge_refunded] Order {} links missing video request {}",
                        order.id,
                        video_request_id
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        "[handle_charge_refunded] Failed to load video request {}: {}",
                        video_request_id,
                        err
                    );
                }
            }
        }

        let body = format!(
            "Your refund of {} has been processed",
            format_amount(charge.amount_refunded)
        );
        if let Err(err) = self
            .notifier
            .send_notification(order.customer_id, "Refund processed", &body)
            .await
        {
            tracing::warn!(
                "[handle_charge_refunded] Failed to notify customer {}: {}",
                order.customer_id,
                err
            );
        }

        let creator_initiated = latest_refund
            .map(|r| r.metadata.get("initiated_by").map(String::as_str) == Some("creator"))
            .unwrap_or(false);
        if creator_initiated {
            if let Err(err) = self
                .notifier
                .send_creator_notification(Notification::refund_completed(&order))
                .await
            {
                tracing::warn!(
                    "[handle_charge_refunded] Failed to notify creator {}: {}",
                    order.creator_id,
                    err
                );
            }
        }

        Ok(())
    }

    pub(super) async fn handle_dispute_created(
        &self,
        dispute: &Dispute,
    ) -> Result<(), ReconcileError> {
        // Orders are keyed by payment intent; dispute payloads usually
        // carry it, but the charge lookup covers the ones that do not.
        let payment_ref = match &dispute.payment_intent {
            Some(payment_intent) => payment_intent.clone(),
            None => self.lookup_payment_intent(&dispute.charge).await?,
        };

        let found = Order::find_one_by_criteria(
            QueryCriteria::new().add_valued_filter(
                "payment_reference_id",
                "=",
                payment_ref.clone(),
            ),
            self.pool,
        )
        .await?;
        let Some(mut order) = found else {
            return Err(ReconcileError::RecordNotFound {
                entity: "order",
                key: payment_ref,
            });
        };

        order.status = OrderStatus::Disputed;
        order.merge_metadata(json!({
            "disputeId": dispute.id,
            "disputeReason": dispute.reason,
            "disputeAmount": dispute.amount,
            "disputeStatus": dispute.status,
            "disputeCreatedAt": dispute.created,
            "evidenceDueBy": dispute.evidence_details.as_ref().and_then(|e| e.due_by),
        }));
        let order = order.update(self.pool).await?;

        let alert = SystemAlert {
            alert_type: "order_disputed".to_string(),
            severity: Severity::Critical,
            data: json!({
                "orderId": order.id,
                "paymentReferenceId": order.payment_reference_id,
                "disputeId": dispute.id,
                "amount": dispute.amount,
                "reason": dispute.reason,
            }),
        };
        if let Err(err) = self.notifier.send_system_alert(alert).await {
            tracing::error!(
                "[handle_dispute_created] Failed to emit dispute alert for {}: {}",
                dispute.id,
                err
            );
        }

        Ok(())
    }

    /// Resolves a charge to its payment intent through the provider.
    async fn lookup_payment_intent(&self, charge_id: &str) -> Result<String, ReconcileError> {
        let id = charge_id
            .parse::<stripe::ChargeId>()
            .map_err(|e| ReconcileError::Provider(e.to_string()))?;
        let charge = stripe::Charge::retrieve(&self.stripe, &id, &[])
            .await
            .map_err(|e| ReconcileError::Provider(e.to_string()))?;

        match charge.payment_intent {
            Some(stripe::Expandable::Id(payment_intent_id)) => Ok(payment_intent_id.to_string()),
            Some(stripe::Expandable::Object(payment_intent)) => Ok(payment_intent.id.to_string()),
            None => Err(ReconcileError::Provider(format!(
                "charge {} has no payment intent",
                charge_id
            ))),
        }
    }
}
