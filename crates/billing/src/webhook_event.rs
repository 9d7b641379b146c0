use annpale_database::SqlxObject;
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use crate::events::StripeEvent;

/// Audit row for one processed webhook delivery. Append-only and
/// best-effort: redeliveries of the same event id produce one row each,
/// which is what makes delivery history reconstructible.
#[derive(Debug, Serialize, Deserialize, Clone, Default, SqlxObject)]
#[table_name = "webhook_events"]
pub struct WebhookEventLog {
    pub id: Uuid,

    #[indexed]
    pub event_id: String,
    pub event_type: String,

    pub api_version: Option<String>,
    pub live_mode: bool,

    pub processed_at: i64,

    pub created_at: i64,
    pub updated_at: i64,
}

impl WebhookEventLog {
    pub fn from_event(event: &StripeEvent, processed_at: i64) -> Self {
        Self {
            id: Uuid::default(),
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
            api_version: event.api_version.clone(),
            live_mode: event.livemode,
            processed_at,
            created_at: 0,
            updated_at: 0,
        }
    }
}
