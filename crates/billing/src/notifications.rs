use annpale_database::{SqlxCrud, SqlxObject, TextEnum};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::types::{Json, Uuid};

use crate::split::format_amount;
use crate::{Order, Profile, SubscriptionOrder};

#[derive(Debug, Clone, PartialEq, Eq, TextEnum, Default)]
pub enum NotificationType {
    #[default]
    SystemAlert,
    NewOrder,
    NewSubscriber,
    RefundProcessed,
    RefundCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq, TextEnum, Default)]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Critical,
}

/// Persisted notification row. Rows without a recipient are operator
/// alerts for the back-office feed.
#[derive(Debug, Serialize, Deserialize, Clone, Default, SqlxObject)]
#[table_name = "notifications"]
pub struct Notification {
    pub id: Uuid,

    #[foreign_key(referenced_table = "profiles", related_rust_type = "Profile")]
    pub recipient: Option<Uuid>,

    pub notification_type: NotificationType,
    pub severity: Severity,

    pub title: String,
    pub content: Option<String>,

    /// Structured payload consumed by the delivery channel.
    pub data: Json<serde_json::Value>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Notification {
    /// A creator just received a paid video request.
    pub fn new_order(order: &Order) -> Self {
        Self {
            id: Uuid::default(),
            recipient: Some(order.creator_id),
            notification_type: NotificationType::NewOrder,
            severity: Severity::Info,
            title: "New video request".to_string(),
            content: Some(format!(
                "You have a new video request worth {}",
                format_amount(order.amount_total)
            )),
            data: Json(json!({
                "paymentReferenceId": order.payment_reference_id,
                "amountTotal": order.amount_total,
                "creatorEarnings": order.creator_earnings,
                "platformFee": order.platform_fee,
                "customerId": order.customer_id,
                "request": order.metadata.0,
            })),
            created_at: 0,
            updated_at: 0,
        }
    }

    /// A creator gained a subscriber.
    pub fn new_subscriber(order: &SubscriptionOrder) -> Self {
        Self {
            id: Uuid::default(),
            recipient: Some(order.creator_id),
            notification_type: NotificationType::NewSubscriber,
            severity: Severity::Info,
            title: "New subscriber".to_string(),
            content: Some("A fan subscribed to your channel".to_string()),
            data: Json(json!({
                "subscriptionOrderId": order.id,
                "tierId": order.tier_id,
                "customerId": order.customer_id,
            })),
            created_at: 0,
            updated_at: 0,
        }
    }

    /// A creator-initiated rejection finished refunding.
    pub fn refund_completed(order: &Order) -> Self {
        Self {
            id: Uuid::default(),
            recipient: Some(order.creator_id),
            notification_type: NotificationType::RefundCompleted,
            severity: Severity::Info,
            title: "Refund completed".to_string(),
            content: Some(format!(
                "The refund of {} for your rejected request has completed",
                format_amount(order.amount_total)
            )),
            data: Json(json!({
                "paymentReferenceId": order.payment_reference_id,
                "orderId": order.id,
            })),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn notice(recipient: Uuid, title: &str, body: &str) -> Self {
        Self {
            id: Uuid::default(),
            recipient: Some(recipient),
            notification_type: NotificationType::RefundProcessed,
            severity: Severity::Info,
            title: title.to_string(),
            content: Some(body.to_string()),
            data: Json(json!({})),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn from_alert(alert: &SystemAlert) -> Self {
        Self {
            id: Uuid::default(),
            recipient: None,
            notification_type: NotificationType::SystemAlert,
            severity: alert.severity.clone(),
            title: alert.alert_type.clone(),
            content: None,
            data: Json(alert.data.clone()),
            created_at: 0,
            updated_at: 0,
        }
    }
}

/// A structured alert for the operations feed.
#[derive(Debug, Clone)]
pub struct SystemAlert {
    pub alert_type: String,
    pub severity: Severity,
    pub data: serde_json::Value,
}

/// Outbound notification contract consumed by the reconcilers. Failures
/// are the caller's to log; they never abort reconciliation.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_creator_notification(&self, notification: Notification) -> anyhow::Result<()>;
    async fn send_notification(&self, recipient: Uuid, title: &str, body: &str) -> anyhow::Result<()>;
    async fn send_system_alert(&self, alert: SystemAlert) -> anyhow::Result<()>;
}

/// Default sink: persists notifications as rows, which the delivery
/// channel polls.
pub struct DbNotificationSink {
    pool: &'static sqlx::PgPool,
}

impl DbNotificationSink {
    pub fn new(pool: &'static sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSink for DbNotificationSink {
    async fn send_creator_notification(&self, notification: Notification) -> anyhow::Result<()> {
        notification.create(self.pool).await?;
        Ok(())
    }

    async fn send_notification(&self, recipient: Uuid, title: &str, body: &str) -> anyhow::Result<()> {
        Notification::notice(recipient, title, body).create(self.pool).await?;
        Ok(())
    }

    async fn send_system_alert(&self, alert: SystemAlert) -> anyhow::Result<()> {
        tracing::error!(
            "[DbNotificationSink::send_system_alert] {} ({}): {}",
            alert.alert_type,
            alert.severity,
            alert.data
        );
        Notification::from_alert(&alert).create(self.pool).await?;
        Ok(())
    }
}
