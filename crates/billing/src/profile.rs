use annpale_database::SqlxObject;
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

/// Local mirror of a platform user, as far as the payments service needs
/// one: identity for notifications and the Connect account link.
#[derive(Debug, Serialize, Deserialize, Clone, Default, SqlxObject)]
#[table_name = "profiles"]
pub struct Profile {
    pub id: Uuid,

    pub display_name: String,
    pub email: Option<String>,

    /// Stripe Connect account backing this creator's payouts, if any.
    #[indexed]
    pub stripe_account_id: Option<String>,
    /// Last time the Connect mirror refreshed this profile.
    pub stripe_account_synced_at: Option<i64>,

    pub created_at: i64,
    pub updated_at: i64,
}
