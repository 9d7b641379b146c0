mod error;
mod events;
mod notifications;
mod order;
mod profile;
mod reconcile;
mod split;
mod stripe_account;
mod subscription;
mod transaction;
mod verifier;
mod video_request;
mod webhook_event;

pub use error::{ReconcileError, WebhookError};
pub use events::{EventKind, ReconcileEvent, StripeEvent};
pub use notifications::{
    DbNotificationSink, Notification, NotificationSink, NotificationType, Severity, SystemAlert,
};
pub use order::{Order, OrderStatus, ORDER_SOURCE_MARKER};
pub use profile::Profile;
pub use reconcile::WebhookProcessor;
pub use split::{format_amount, split_amount, RevenueSplit, PLATFORM_FEE_RATE};
pub use stripe_account::StripeAccount;
pub use subscription::{
    map_provider_status, PaymentOutcome, SubscriptionOrder, SubscriptionOrderStatus,
    FAILED_PAYMENT_PAUSE_THRESHOLD,
};
pub use transaction::TransactionRecord;
pub use verifier::{verify_signature, EventVerifier, SIGNATURE_HEADER};
pub use video_request::{VideoRequest, VideoRequestStatus};
pub use webhook_event::WebhookEventLog;
