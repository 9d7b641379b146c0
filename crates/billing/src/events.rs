//! Typed Stripe webhook events.
//!
//! The provider delivers a loosely-typed JSON envelope; everything the
//! reconcilers consume is deserialized here, at the router boundary, into
//! a closed union. Event types outside the union fall into a single
//! `Unhandled` variant so the provider always gets an acknowledgement.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WebhookError;

/// Stripe event types this service reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ChargeSucceeded,
    ChargeFailed,
    ChargeRefunded,
    ChargeDisputeCreated,
    CheckoutSessionCompleted,
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionDeleted,
    InvoicePaymentSucceeded,
    InvoicePaymentFailed,
    AccountUpdated,
    AccountDeauthorized,
    TransferCreated,
    TransferUpdated,
    TransferReversed,
    ApplicationFeeCreated,
    ApplicationFeeRefunded,
    /// Everything the platform does not care about.
    Unknown,
}

impl FromStr for EventKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "charge.succeeded" => Self::ChargeSucceeded,
            "charge.failed" => Self::ChargeFailed,
            "charge.refunded" => Self::ChargeRefunded,
            "charge.dispute.created" => Self::ChargeDisputeCreated,
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "customer.subscription.created" => Self::SubscriptionCreated,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            "account.updated" => Self::AccountUpdated,
            "account.application.deauthorized" => Self::AccountDeauthorized,
            "transfer.created" => Self::TransferCreated,
            "transfer.updated" => Self::TransferUpdated,
            "transfer.reversed" => Self::TransferReversed,
            "application_fee.created" => Self::ApplicationFeeCreated,
            "application_fee.refunded" => Self::ApplicationFeeRefunded,
            _ => Self::Unknown,
        })
    }
}

impl EventKind {
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Generic Stripe event envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEvent {
    /// Unique identifier for the event. Redeliveries reuse it.
    pub id: String,

    /// Type of event, e.g. `charge.succeeded`.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time of event creation (unix timestamp).
    pub created: i64,

    /// API version used to render the payload.
    #[serde(default)]
    pub api_version: Option<String>,

    /// Whether this is a live mode event.
    #[serde(default)]
    pub livemode: bool,

    /// Connected account the event originates from, when applicable.
    #[serde(default)]
    pub account: Option<String>,

    /// Object containing event data.
    pub data: EventData,
}

/// Event data container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    /// The actual event object (charge, subscription, transfer, ...).
    pub object: serde_json::Value,
}

impl StripeEvent {
    /// Parse from raw JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(bytes).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
    }

    /// The typed event kind.
    pub fn kind(&self) -> EventKind {
        // Infallible error type means this can never fail
        EventKind::from_str(&self.event_type).unwrap()
    }

    fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, WebhookError> {
        serde_json::from_value(self.data.object.clone())
            .map_err(|e| WebhookError::InvalidPayload(format!("{}: {}", self.event_type, e)))
    }

    /// Resolves the envelope into the closed per-family union consumed by
    /// the reconcilers.
    pub fn classify(&self) -> Result<ReconcileEvent, WebhookError> {
        Ok(match self.kind() {
            EventKind::ChargeSucceeded => ReconcileEvent::ChargeSucceeded(self.decode()?),
            EventKind::ChargeFailed => ReconcileEvent::ChargeFailed(self.decode()?),
            EventKind::ChargeRefunded => ReconcileEvent::ChargeRefunded(self.decode()?),
            EventKind::ChargeDisputeCreated => ReconcileEvent::DisputeCreated(self.decode()?),
            EventKind::CheckoutSessionCompleted => ReconcileEvent::CheckoutCompleted(self.decode()?),
            EventKind::SubscriptionCreated => ReconcileEvent::SubscriptionCreated(self.decode()?),
            EventKind::SubscriptionUpdated => ReconcileEvent::SubscriptionUpdated(self.decode()?),
            EventKind::SubscriptionDeleted => ReconcileEvent::SubscriptionDeleted(self.decode()?),
            EventKind::InvoicePaymentSucceeded => {
                ReconcileEvent::InvoicePaymentSucceeded(self.decode()?)
            }
            EventKind::InvoicePaymentFailed => ReconcileEvent::InvoicePaymentFailed(self.decode()?),
            EventKind::AccountUpdated => ReconcileEvent::AccountUpdated(self.decode()?),
            EventKind::AccountDeauthorized => ReconcileEvent::AccountDeauthorized {
                account_id: self.account.clone(),
            },
            EventKind::TransferCreated => ReconcileEvent::TransferCreated(self.decode()?),
            EventKind::TransferUpdated => ReconcileEvent::TransferUpdated(self.decode()?),
            EventKind::TransferReversed => ReconcileEvent::TransferReversed(self.decode()?),
            EventKind::ApplicationFeeCreated => {
                ReconcileEvent::ApplicationFeeCreated(self.decode()?)
            }
            EventKind::ApplicationFeeRefunded => {
                ReconcileEvent::ApplicationFeeRefunded(self.decode()?)
            }
            EventKind::Unknown => ReconcileEvent::Unhandled {
                event_type: self.event_type.clone(),
            },
        })
    }
}

/// One verified event, resolved to the handler family that owns it.
#[derive(Debug, Clone)]
pub enum ReconcileEvent {
    ChargeSucceeded(Charge),
    ChargeFailed(Charge),
    ChargeRefunded(Charge),
    DisputeCreated(Dispute),
    CheckoutCompleted(CheckoutSession),
    SubscriptionCreated(Subscription),
    SubscriptionUpdated(Subscription),
    SubscriptionDeleted(Subscription),
    InvoicePaymentSucceeded(Invoice),
    InvoicePaymentFailed(Invoice),
    AccountUpdated(Account),
    AccountDeauthorized { account_id: Option<String> },
    TransferCreated(Transfer),
    TransferUpdated(Transfer),
    TransferReversed(Transfer),
    ApplicationFeeCreated(ApplicationFee),
    ApplicationFeeRefunded(ApplicationFee),
    Unhandled { event_type: String },
}

/// Stripe charge object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charge {
    /// Charge ID (ch_...)
    pub id: String,
    /// Amount in minor units.
    pub amount: i64,
    #[serde(default)]
    pub amount_refunded: i64,
    pub currency: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Payment intent the charge belongs to (pi_...), when created
    /// through a payment intent flow.
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub refunded: bool,
    #[serde(default)]
    pub refunds: Option<RefundList>,
    #[serde(default)]
    pub failure_code: Option<String>,
    #[serde(default)]
    pub failure_message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Charge {
    /// The key orders are reconciled under: the payment-intent id, with
    /// the charge id as fallback for intent-less charges.
    pub fn payment_reference(&self) -> &str {
        self.payment_intent.as_deref().unwrap_or(&self.id)
    }
}

/// Refunds list container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundList {
    #[serde(default)]
    pub data: Vec<Refund>,
}

/// Stripe refund object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    /// Refund ID (re_...)
    pub id: String,
    /// Amount in minor units.
    pub amount: i64,
    /// pending, succeeded, failed, canceled...
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Stripe checkout session object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Session ID (cs_...)
    pub id: String,
    /// payment, setup or subscription.
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    /// Customer ID (cus_...)
    #[serde(default)]
    pub customer: Option<String>,
    /// Subscription ID (sub_...) for subscription-mode sessions.
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
}

/// Stripe subscription object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription ID (sub_...)
    pub id: String,
    /// Customer ID (cus_...)
    pub customer: String,
    pub status: ProviderSubscriptionStatus,
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub canceled_at: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Subscription status as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderSubscriptionStatus {
    Active,
    PastDue,
    Unpaid,
    Canceled,
    Incomplete,
    IncompleteExpired,
    Trialing,
    Paused,
    #[serde(other)]
    Unknown,
}

/// Stripe invoice object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Invoice ID (in_...)
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    /// Associated subscription ID, when the invoice bills one.
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub amount_paid: Option<i64>,
    #[serde(default)]
    pub amount_due: Option<i64>,
    #[serde(default)]
    pub billing_reason: Option<String>,
}

/// Stripe Connect account object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Account ID (acct_...)
    pub id: String,
    #[serde(default)]
    pub charges_enabled: bool,
    #[serde(default)]
    pub payouts_enabled: bool,
    #[serde(default)]
    pub details_submitted: bool,
    #[serde(default)]
    pub requirements: Option<AccountRequirements>,
}

/// Outstanding onboarding/verification requirements for an account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountRequirements {
    #[serde(default)]
    pub currently_due: Vec<String>,
    #[serde(default)]
    pub eventually_due: Vec<String>,
    #[serde(default)]
    pub past_due: Vec<String>,
}

/// Stripe transfer object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    /// Transfer ID (tr_...)
    pub id: String,
    /// Amount in minor units.
    pub amount: i64,
    /// The charge the transfer was created from (ch_...).
    #[serde(default)]
    pub source_transaction: Option<String>,
    /// Destination account (acct_...).
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub reversed: bool,
}

/// Stripe application fee object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationFee {
    /// Fee ID (fee_...)
    pub id: String,
    /// Amount in minor units.
    pub amount: i64,
    /// The charge the fee was taken from (ch_...).
    pub charge: String,
    #[serde(default)]
    pub refunded: bool,
    #[serde(default)]
    pub amount_refunded: i64,
}

/// Stripe dispute object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    /// Dispute ID (dp_...)
    pub id: String,
    /// Amount in minor units.
    pub amount: i64,
    /// The disputed charge (ch_...).
    pub charge: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub evidence_details: Option<EvidenceDetails>,
}

/// Evidence timing details on a dispute.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceDetails {
    #[serde(default)]
    pub due_by: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_parsing() {
        assert_eq!(
            EventKind::from_str("charge.succeeded").unwrap(),
            EventKind::ChargeSucceeded
        );
        assert_eq!(
            EventKind::from_str("customer.subscription.updated").unwrap(),
            EventKind::SubscriptionUpdated
        );
        assert_eq!(EventKind::from_str("foo.bar.baz").unwrap(), EventKind::Unknown);
        assert!(!EventKind::Unknown.is_known());
    }

    #[test]
    fn parses_and_classifies_a_charge_event() {
        let json = r#"{
            "id": "evt_1AaBbCc",
            "type": "charge.succeeded",
            "created": 1714556800,
            "api_version": "2023-10-16",
            "livemode": false,
            "data": {
                "object": {
                    "id": "ch_1AaBbCc",
                    "object": "charge",
                    "amount": 10000,
                    "currency": "usd",
                    "payment_intent": "pi_1AaBbCc",
                    "status": "succeeded",
                    "metadata": {
                        "source": "ann-pale-video-request",
                        "creatorId": "7e6cf8bc-6f38-4ba3-9a26-3bfb60a4ce39",
                        "userId": "a3fca07a-8c12-4f43-9d3d-2f34c6a0c0de"
                    }
                }
            }
        }"#;

        let event = StripeEvent::from_bytes(json.as_bytes()).unwrap();
        assert_eq!(event.id, "evt_1AaBbCc");
        assert_eq!(event.kind(), EventKind::ChargeSucceeded);

        match event.classify().unwrap() {
            ReconcileEvent::ChargeSucceeded(charge) => {
                assert_eq!(charge.amount, 10000);
                assert_eq!(charge.payment_reference(), "pi_1AaBbCc");
                assert_eq!(
                    charge.metadata.get("source").map(String::as_str),
                    Some("ann-pale-video-request")
                );
            }
            other => panic!("expected ChargeSucceeded, got {:?}", other),
        }
    }

    #[test]
    fn payment_reference_falls_back_to_charge_id() {
        let charge = Charge {
            id: "ch_noint".into(),
            amount: 500,
            amount_refunded: 0,
            currency: "usd".into(),
            metadata: HashMap::new(),
            payment_intent: None,
            refunded: false,
            refunds: None,
            failure_code: None,
            failure_message: None,
            status: None,
        };
        assert_eq!(charge.payment_reference(), "ch_noint");
    }

    #[test]
    fn parses_a_subscription_event_with_unknown_status() {
        let json = r#"{
            "id": "evt_sub1",
            "type": "customer.subscription.updated",
            "created": 1714556800,
            "livemode": false,
            "data": {
                "object": {
                    "id": "sub_123",
                    "customer": "cus_123",
                    "status": "some_future_status",
                    "current_period_start": 1714556800,
                    "current_period_end": 1717235200
                }
            }
        }"#;

        let event = StripeEvent::from_bytes(json.as_bytes()).unwrap();
        match event.classify().unwrap() {
            ReconcileEvent::SubscriptionUpdated(sub) => {
                assert_eq!(sub.id, "sub_123");
                assert_eq!(sub.status, ProviderSubscriptionStatus::Unknown);
                assert_eq!(sub.current_period_end, Some(1717235200));
            }
            other => panic!("expected SubscriptionUpdated, got {:?}", other),
        }
    }

    #[test]
    fn unknown_event_types_classify_as_unhandled() {
        let json = r#"{
            "id": "evt_x",
            "type": "foo.bar.baz",
            "created": 1714556800,
            "livemode": true,
            "data": { "object": { "id": "whatever" } }
        }"#;

        let event = StripeEvent::from_bytes(json.as_bytes()).unwrap();
        match event.classify().unwrap() {
            ReconcileEvent::Unhandled { event_type } => assert_eq!(event_type, "foo.bar.baz"),
            other => panic!("expected Unhandled, got {:?}", other),
        }
    }

    #[test]
    fn deauthorization_takes_the_account_from_the_envelope() {
        let json = r#"{
            "id": "evt_deauth",
            "type": "account.application.deauthorized",
            "created": 1714556800,
            "livemode": true,
            "account": "acct_123",
            "data": { "object": { "id": "ca_app", "object": "application" } }
        }"#;

        let event = StripeEvent::from_bytes(json.as_bytes()).unwrap();
        match event.classify().unwrap() {
            ReconcileEvent::AccountDeauthorized { account_id } => {
                assert_eq!(account_id.as_deref(), Some("acct_123"));
            }
            other => panic!("expected AccountDeauthorized, got {:?}", other),
        }
    }

    #[test]
    fn recognized_type_with_malformed_object_is_an_error() {
        let json = r#"{
            "id": "evt_bad",
            "type": "charge.succeeded",
            "created": 1714556800,
            "livemode": false,
            "data": { "object": { "object": "charge" } }
        }"#;

        let event = StripeEvent::from_bytes(json.as_bytes()).unwrap();
        assert!(event.classify().is_err());
    }
}
