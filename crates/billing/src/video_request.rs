use annpale_database::{SqlxObject, TextEnum};
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use crate::Profile;

#[derive(Debug, Clone, PartialEq, Eq, TextEnum, Default)]
pub enum VideoRequestStatus {
    #[default]
    Pending,
    Accepted,
    Completed,
    Cancelled,
}

/// The fulfillment record behind an order: what the fan asked the creator
/// to record.
#[derive(Debug, Serialize, Deserialize, Clone, Default, SqlxObject)]
#[table_name = "video_requests"]
pub struct VideoRequest {
    pub id: Uuid,

    #[foreign_key(referenced_table = "profiles", related_rust_type = "Profile")]
    #[indexed]
    pub creator_id: Uuid,

    #[foreign_key(referenced_table = "profiles", related_rust_type = "Profile")]
    #[indexed]
    pub customer_id: Uuid,

    pub occasion: Option<String>,
    pub recipient_name: Option<String>,
    pub instructions: Option<String>,

    pub status: VideoRequestStatus,
    pub rejection_reason: Option<String>,

    pub created_at: i64,
    pub updated_at: i64,
}
