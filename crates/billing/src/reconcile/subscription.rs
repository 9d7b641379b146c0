//! Subscription lifecycle reconciliation.
//!
//! Every lookup miss here is a soft failure: the provider may deliver an
//! event before the local row exists (or long after it was cancelled), so
//! "not found" is logged upstream and acknowledged.

use annpale_common::get_current_timestamp;
use annpale_database::{QueryCriteria, SqlxCrud, SqlxFilterQuery};

use super::WebhookProcessor;
use crate::error::ReconcileError;
use crate::events::{CheckoutSession, Invoice, Subscription};
use crate::notifications::Notification;
use crate::subscription::{SubscriptionOrder, SubscriptionOrderStatus};

impl WebhookProcessor {
    pub(super) async fn handle_checkout_completed(
        &self,
        session: &CheckoutSession,
    ) -> Result<(), ReconcileError> {
        if session.mode.as_deref() != Some("subscription") {
            // Payment-mode checkouts become orders through charge events.
            tracing::debug!(
                "[handle_checkout_completed] Ignoring {} checkout session {}",
                session.mode.as_deref().unwrap_or("unknown-mode"),
                session.id
            );
            return Ok(());
        }

        let found = SubscriptionOrder::find_one_by_criteria(
            QueryCriteria::new().add_valued_filter(
                "checkout_session_id",
                "=",
                session.id.clone(),
            ),
            self.pool,
        )
        .await?;
        let Some(mut order) = found else {
            return Err(ReconcileError::RecordNotFound {
                entity: "subscription order",
                key: session.id.clone(),
            });
        };

        order.activate_from_checkout(
            session.subscription.clone(),
            session.customer.clone(),
            get_current_timestamp(),
        );
        if let Some(reference) = &session.client_reference_id {
            if let Ok(fan_id) = reference.parse() {
                order.customer_id = Some(fan_id);
            }
        }
        let order = order.update(self.pool).await?;

        tracing::info!(
            "[handle_checkout_completed] Activated subscription order {} for session {}",
            order.id,
            session.id
        );

        if let Err(err) = self
            .notifier
            .send_creator_notification(Notification::new_subscriber(&order))
            .await
        {
            tracing::warn!(
                "[handle_checkout_completed] Failed to notify creator {}: {}",
                order.creator_id,
                err
            );
        }

        Ok(())
    }

    pub(super) async fn handle_subscription_created(
        &self,
        subscription: &Subscription,
    ) -> Result<(), ReconcileError> {
        let found = SubscriptionOrder::find_one_by_criteria(
            QueryCriteria::new()
                .add_valued_filter("stripe_customer_id", "=", subscription.customer.clone())
                .add_valued_filter(
                    "status",
                    "=",
                    SubscriptionOrderStatus::Pending.to_string(),
                ),
            self.pool,
        )
        .await?;
        let Some(mut order) = found else {
            return Err(ReconcileError::RecordNotFound {
                entity: "pending subscription order",
                key: subscription.customer.clone(),
            });
        };

        order.activate_from_provider(subscription, get_current_timestamp());
        order.update(self.pool).await?;
        Ok(())
    }

    pub(super) async fn handle_subscription_updated(
        &self,
        subscription: &Subscription,
    ) -> Result<(), ReconcileError> {
        let mut order = self.find_by_subscription_id(&subscription.id).await?;
        order.apply_provider_status(subscription.status);
        order.refresh_periods(subscription);
        order.update(self.pool).await?;
        Ok(())
    }

    pub(super) async fn handle_subscription_deleted(
        &self,
        subscription: &Subscription,
    ) -> Result<(), ReconcileError> {
        let mut order = self.find_by_subscription_id(&subscription.id).await?;
        order.cancel(
            subscription
                .canceled_at
                .unwrap_or_else(get_current_timestamp),
        );
        order.update(self.pool).await?;
        Ok(())
    }

    pub(super) async fn handle_invoice_payment_succeeded(
        &self,
        invoice: &Invoice,
    ) -> Result<(), ReconcileError> {
        let Some(subscription_id) = &invoice.subscription else {
            tracing::debug!(
                "[handle_invoice_payment_succeeded] Invoice {} has no subscription link",
                invoice.id
            );
            return Ok(());
        };

        let mut order = self.find_by_subscription_id(subscription_id).await?;
        order.record_payment_success(get_current_timestamp());
        order.update(self.pool).await?;
        Ok(())
    }

    pub(super) async fn handle_invoice_payment_failed(
        &self,
        invoice: &Invoice,
    ) -> Result<(), ReconcileError> {
        let Some(subscription_id) = &invoice.subscription else {
            tracing::debug!(
                "[handle_invoice_payment_failed] Invoice {} has no subscription link",
                invoice.id
            );
            return Ok(());
        };

        let mut order = self.find_by_subscription_id(subscription_id).await?;
        order.record_payment_failure();
        let order = order.update(self.pool).await?;

        if order.status == SubscriptionOrderStatus::Paused {
            tracing::warn!(
                "[handle_invoice_payment_failed] Subscription order {} paused after {} failed payments",
                order.id,
                order.failed_payment_count
            );
        }
        Ok(())
    }

    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionOrder, ReconcileError> {
        SubscriptionOrder::find_one_by_criteria(
            QueryCriteria::new().add_valued_filter(
                "stripe_subscription_id",
                "=",
                subscription_id.to_string(),
            ),
            self.pool,
        )
        .await?
        .ok_or_else(|| ReconcileError::RecordNotFound {
            entity: "subscription order",
            key: subscription_id.to_string(),
        })
    }
}
