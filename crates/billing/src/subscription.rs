use annpale_database::{SqlxObject, TextEnum};
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use crate::events::{ProviderSubscriptionStatus, Subscription};
use crate::Profile;

/// Consecutive failed invoice payments after which a subscription is
/// paused instead of being billed further.
pub const FAILED_PAYMENT_PAUSE_THRESHOLD: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, TextEnum, Default)]
pub enum SubscriptionOrderStatus {
    #[default]
    Pending,
    Active,
    Paused,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, TextEnum, Default)]
pub enum PaymentOutcome {
    #[default]
    Succeeded,
    Failed,
}

/// A recurring billing relationship tied to a provider checkout/
/// subscription pair.
#[derive(Debug, Serialize, Deserialize, Clone, Default, SqlxObject)]
#[table_name = "subscription_orders"]
pub struct SubscriptionOrder {
    pub id: Uuid,

    #[indexed]
    pub checkout_session_id: String,
    #[indexed]
    pub stripe_subscription_id: Option<String>,
    #[indexed]
    pub stripe_customer_id: Option<String>,

    #[foreign_key(referenced_table = "profiles", related_rust_type = "Profile")]
    #[indexed]
    pub creator_id: Uuid,

    #[foreign_key(referenced_table = "profiles", related_rust_type = "Profile")]
    pub customer_id: Option<Uuid>,

    pub tier_id: String,

    pub status: SubscriptionOrderStatus,

    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    pub next_billing_date: Option<i64>,

    pub last_payment_status: Option<PaymentOutcome>,
    pub last_payment_date: Option<i64>,
    pub failed_payment_count: i32,

    pub activated_at: Option<i64>,
    pub cancelled_at: Option<i64>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl SubscriptionOrder {
    /// Checkout finished: the subscription is live and the provider ids
    /// are now known.
    pub fn activate_from_checkout(
        &mut self,
        subscription_id: Option<String>,
        customer_id: Option<String>,
        now: i64,
    ) {
        self.status = SubscriptionOrderStatus::Active;
        if subscription_id.is_some() {
            self.stripe_subscription_id = subscription_id;
        }
        if customer_id.is_some() {
            self.stripe_customer_id = customer_id;
        }
        self.activated_at = Some(now);
    }

    /// The provider reported the subscription object itself was created.
    pub fn activate_from_provider(&mut self, subscription: &Subscription, now: i64) {
        self.status = SubscriptionOrderStatus::Active;
        self.stripe_subscription_id = Some(subscription.id.clone());
        self.refresh_periods(subscription);
        if self.activated_at.is_none() {
            self.activated_at = Some(now);
        }
    }

    /// Copies the provider's billing period onto the local record; the
    /// next billing date is the period end.
    pub fn refresh_periods(&mut self, subscription: &Subscription) {
        self.current_period_start = subscription.current_period_start;
        self.current_period_end = subscription.current_period_end;
        self.next_billing_date = subscription.current_period_end;
    }

    /// Mirrors a provider-reported status transition.
    pub fn apply_provider_status(&mut self, provider: ProviderSubscriptionStatus) {
        self.status = map_provider_status(provider, self.status.clone());
    }

    pub fn cancel(&mut self, at: i64) {
        self.status = SubscriptionOrderStatus::Cancelled;
        self.cancelled_at = Some(at);
    }

    /// An invoice for this subscription was paid: the failure streak is
    /// over.
    pub fn record_payment_success(&mut self, now: i64) {
        self.last_payment_status = Some(PaymentOutcome::Succeeded);
        self.last_payment_date = Some(now);
        self.failed_payment_count = 0;
    }

    /// An invoice payment failed. The third consecutive failure pauses
    /// the subscription.
    pub fn record_payment_failure(&mut self) {
        self.failed_payment_count += 1;
        self.last_payment_status = Some(PaymentOutcome::Failed);
        if self.failed_payment_count >= FAILED_PAYMENT_PAUSE_THRESHOLD {
            self.status = SubscriptionOrderStatus::Paused;
        }
    }
}

/// Maps a provider-reported subscription status onto the local lifecycle.
/// Provider statuses the platform does not track leave the current local
/// status in place.
pub fn map_provider_status(
    provider: ProviderSubscriptionStatus,
    current: SubscriptionOrderStatus,
) -> SubscriptionOrderStatus {
    match provider {
        ProviderSubscriptionStatus::Active => SubscriptionOrderStatus::Active,
        ProviderSubscriptionStatus::Canceled => SubscriptionOrderStatus::Cancelled,
        ProviderSubscriptionStatus::PastDue => SubscriptionOrderStatus::Paused,
        ProviderSubscriptionStatus::Unpaid => SubscriptionOrderStatus::Failed,
        ProviderSubscriptionStatus::Incomplete
        | ProviderSubscriptionStatus::IncompleteExpired
        | ProviderSubscriptionStatus::Trialing
        | ProviderSubscriptionStatus::Paused
        | ProviderSubscriptionStatus::Unknown => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_order() -> SubscriptionOrder {
        SubscriptionOrder {
            checkout_session_id: "cs_1".into(),
            stripe_subscription_id: Some("sub_1".into()),
            status: SubscriptionOrderStatus::Active,
            ..Default::default()
        }
    }

    #[test]
    fn three_consecutive_failures_pause_the_subscription() {
        let mut order = active_order();

        order.record_payment_failure();
        assert_eq!(order.failed_payment_count, 1);
        assert_eq!(order.status, SubscriptionOrderStatus::Active);

        order.record_payment_failure();
        assert_eq!(order.failed_payment_count, 2);
        assert_eq!(order.status, SubscriptionOrderStatus::Active);

        order.record_payment_failure();
        assert_eq!(order.failed_payment_count, 3);
        assert_eq!(order.status, SubscriptionOrderStatus::Paused);
        assert_eq!(order.last_payment_status, Some(PaymentOutcome::Failed));
    }

    #[test]
    fn a_success_resets_the_failure_streak() {
        let mut order = active_order();
        order.record_payment_failure();
        order.record_payment_failure();

        order.record_payment_success(1_714_556_800);
        assert_eq!(order.failed_payment_count, 0);
        assert_eq!(order.status, SubscriptionOrderStatus::Active);
        assert_eq!(order.last_payment_status, Some(PaymentOutcome::Succeeded));
        assert_eq!(order.last_payment_date, Some(1_714_556_800));

        // The streak starts over after the reset.
        order.record_payment_failure();
        assert_eq!(order.failed_payment_count, 1);
        assert_eq!(order.status, SubscriptionOrderStatus::Active);
    }

    #[test]
    fn provider_status_mapping_table() {
        use ProviderSubscriptionStatus as P;
        use SubscriptionOrderStatus as S;

        let current = S::Active;
        assert_eq!(map_provider_status(P::Active, current.clone()), S::Active);
        assert_eq!(map_provider_status(P::Canceled, current.clone()), S::Cancelled);
        assert_eq!(map_provider_status(P::PastDue, current.clone()), S::Paused);
        assert_eq!(map_provider_status(P::Unpaid, current.clone()), S::Failed);
        assert_eq!(map_provider_status(P::Trialing, current.clone()), S::Active);
        assert_eq!(map_provider_status(P::Unknown, S::Paused), S::Paused);
    }

    #[test]
    fn checkout_activation_records_provider_ids() {
        let mut order = SubscriptionOrder {
            checkout_session_id: "cs_9".into(),
            ..Default::default()
        };
        assert_eq!(order.status, SubscriptionOrderStatus::Pending);

        order.activate_from_checkout(Some("sub_9".into()), Some("cus_9".into()), 1_714_556_800);
        assert_eq!(order.status, SubscriptionOrderStatus::Active);
        assert_eq!(order.stripe_subscription_id.as_deref(), Some("sub_9"));
        assert_eq!(order.stripe_customer_id.as_deref(), Some("cus_9"));
        assert_eq!(order.activated_at, Some(1_714_556_800));
    }

    #[test]
    fn deletion_cancels_permanently() {
        let mut order = active_order();
        order.cancel(1_714_556_800);
        assert_eq!(order.status, SubscriptionOrderStatus::Cancelled);
        assert_eq!(order.cancelled_at, Some(1_714_556_800));
    }
}
