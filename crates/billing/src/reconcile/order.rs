//! Order reconciliation: successful and failed charges.

use annpale_database::SqlxCrud;
use serde_json::json;

use super::WebhookProcessor;
use crate::error::ReconcileError;
use crate::events::Charge;
use crate::notifications::{Notification, Severity, SystemAlert};
use crate::order::Order;

impl WebhookProcessor {
    pub(super) async fn handle_charge_succeeded(
        &self,
        charge: &Charge,
    ) -> Result<(), ReconcileError> {
        let order = Order::from_charge(charge)?;

        let order = match order.create(self.pool).await {
            Ok(order) => order,
            Err(err) => {
                // A lost order is money the platform took without a record
                // of what it owes anyone. Escalate with enough context to
                // reconstruct the order by hand.
                let alert = SystemAlert {
                    alert_type: "order_creation_failed".to_string(),
                    severity: Severity::Critical,
                    data: json!({
                        "paymentReferenceId": charge.payment_reference(),
                        "chargeId": charge.id,
                        "error": err.to_string(),
                        "metadata": charge.metadata,
                    }),
                };
                if let Err(alert_err) = self.notifier.send_system_alert(alert).await {
                    tracing::error!(
                        "[handle_charge_succeeded] Failed to emit order-creation alert for {}: {}",
                        charge.payment_reference(),
                        alert_err
                    );
                }
                return Err(ReconcileError::Persistence(err));
            }
        };

        tracing::info!(
            "[handle_charge_succeeded] Created order {} for {} ({} to creator {})",
            order.id,
            order.payment_reference_id,
            order.amount_total,
            order.creator_id
        );

        if let Err(err) = self
            .notifier
            .send_creator_notification(Notification::new_order(&order))
            .await
        {
            tracing::warn!(
                "[handle_charge_succeeded] Failed to notify creator {} about order {}: {}",
                order.creator_id,
                order.id,
                err
            );
        }

        Ok(())
    }

    pub(super) async fn handle_charge_failed(&self, charge: &Charge) -> Result<(), ReconcileError> {
        // Failed-charge follow-up (fan retry prompts) is not built yet;
        // acknowledge so the provider stops redelivering.
        tracing::info!(
            "[handle_charge_failed] Charge {} failed: {}",
            charge.id,
            charge
                .failure_message
                .as_deref()
                .or(charge.failure_code.as_deref())
                .unwrap_or("no reason given")
        );
        Ok(())
    }
}
