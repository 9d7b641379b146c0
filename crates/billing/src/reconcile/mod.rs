//! The webhook reconciliation state machine.
//!
//! One verified event enters, exactly one handler runs, and the provider
//! always gets an acknowledgement: every business failure is caught here
//! and turned into a log line (plus a system alert on the order-creation
//! path), because retrying cannot fix conditions like "not our charge" or
//! "row not written yet".

mod account;
mod ledger;
mod order;
mod refund;
mod subscription;

use std::sync::Arc;

use annpale_common::get_current_timestamp;
use annpale_database::SqlxCrud;

use crate::error::ReconcileError;
use crate::events::{ReconcileEvent, StripeEvent};
use crate::notifications::NotificationSink;
use crate::webhook_event::WebhookEventLog;

/// Drives the multi-entity state machine behind one webhook event.
/// Constructed once per process with its collaborators injected; handlers
/// never reach for ambient singletons.
pub struct WebhookProcessor {
    pool: &'static sqlx::PgPool,
    stripe: stripe::Client,
    notifier: Arc<dyn NotificationSink>,
}

impl WebhookProcessor {
    pub fn new(
        pool: &'static sqlx::PgPool,
        stripe: stripe::Client,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            pool,
            stripe,
            notifier,
        }
    }

    /// Processes one verified event end to end, then appends the audit
    /// record. Never fails: reconciliation errors become log lines.
    pub async fn process(&self, event: &StripeEvent) {
        match self.dispatch(event).await {
            Ok(()) => {}
            Err(ReconcileError::NotOurs(detail)) => {
                tracing::info!(
                    "[WebhookProcessor::process] Skipping {} ({}): {}",
                    event.event_type,
                    event.id,
                    detail
                );
            }
            Err(ReconcileError::RecordNotFound { entity, key }) => {
                tracing::warn!(
                    "[WebhookProcessor::process] No {} for {} while handling {} ({})",
                    entity,
                    key,
                    event.event_type,
                    event.id
                );
            }
            Err(err) => {
                tracing::error!(
                    "[WebhookProcessor::process] Failed to handle {} ({}): {}",
                    event.event_type,
                    event.id,
                    err
                );
            }
        }

        self.audit(event).await;
    }

    async fn dispatch(&self, event: &StripeEvent) -> Result<(), ReconcileError> {
        let resolved = event
            .classify()
            .map_err(|e| ReconcileError::Payload(e.to_string()))?;

        match resolved {
            ReconcileEvent::ChargeSucceeded(charge) => self.handle_charge_succeeded(&charge).await,
            ReconcileEvent::ChargeFailed(charge) => self.handle_charge_failed(&charge).await,
            ReconcileEvent::ChargeRefunded(charge) => self.handle_charge_refunded(&charge).await,
            ReconcileEvent::DisputeCreated(dispute) => self.handle_dispute_created(&dispute).await,
            ReconcileEvent::CheckoutCompleted(session) => {
                self.handle_checkout_completed(&session).await
            }
            ReconcileEvent::SubscriptionCreated(subscription) => {
                self.handle_subscription_created(&subscription).await
            }
            ReconcileEvent::SubscriptionUpdated(subscription) => {
                self.handle_subscription_updated(&subscription).await
            }
            ReconcileEvent::SubscriptionDeleted(subscription) => {
                self.handle_subscription_deleted(&subscription).await
            }
            ReconcileEvent::InvoicePaymentSucceeded(invoice) => {
                self.handle_invoice_payment_succeeded(&invoice).await
            }
            ReconcileEvent::InvoicePaymentFailed(invoice) => {
                self.handle_invoice_payment_failed(&invoice).await
            }
            ReconcileEvent::AccountUpdated(account) => self.handle_account_updated(&account).await,
            ReconcileEvent::AccountDeauthorized { account_id } => {
                self.handle_account_deauthorized(account_id.as_deref()).await
            }
            ReconcileEvent::TransferCreated(transfer) | ReconcileEvent::TransferUpdated(transfer) => {
                self.handle_transfer_event(&transfer, false).await
            }
            ReconcileEvent::TransferReversed(transfer) => {
                self.handle_transfer_event(&transfer, true).await
            }
            ReconcileEvent::ApplicationFeeCreated(fee) => {
                self.handle_application_fee_created(&fee).await
            }
            ReconcileEvent::ApplicationFeeRefunded(fee) => {
                self.handle_application_fee_refunded(&fee).await
            }
            ReconcileEvent::Unhandled { event_type } => {
                tracing::info!(
                    "[WebhookProcessor::dispatch] Unhandled event type: {}",
                    event_type
                );
                Ok(())
            }
        }
    }

    /// Best-effort audit trail; a failed append never changes the
    /// acknowledgement returned to the provider.
    async fn audit(&self, event: &StripeEvent) {
        let record = WebhookEventLog::from_event(event, get_current_timestamp());
        if let Err(err) = record.create(self.pool).await {
            tracing::warn!(
                "[WebhookProcessor::audit] Failed to record event {}: {}",
                event.id,
                err
            );
        }
    }
}
