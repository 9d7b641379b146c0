use annpale_database::{SqlxObject, TextEnum};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::types::{Json, Uuid};

use crate::error::ReconcileError;
use crate::events::Charge;
use crate::split::split_amount;
use crate::transaction::merge_json;
use crate::{Profile, VideoRequest};

/// Metadata marker identifying charges that originate from this
/// platform's checkout flow. Charges without it belong to someone else's
/// integration and are ignored.
pub const ORDER_SOURCE_MARKER: &str = "ann-pale-video-request";

#[derive(Debug, Clone, PartialEq, Eq, TextEnum, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
    Refunded,
    Disputed,
}

/// One paid video-message request and its revenue split.
///
/// The UNIQUE constraint on `payment_reference_id` is the dedup backstop
/// against concurrent redelivery of the same charge event.
#[derive(Debug, Serialize, Deserialize, Clone, Default, SqlxObject)]
#[table_name = "orders"]
pub struct Order {
    pub id: Uuid,

    #[unique]
    pub payment_reference_id: String,

    #[foreign_key(referenced_table = "profiles", related_rust_type = "Profile")]
    #[indexed]
    pub creator_id: Uuid,

    #[foreign_key(referenced_table = "profiles", related_rust_type = "Profile")]
    #[indexed]
    pub customer_id: Uuid,

    /// Customer-paid total, in minor units.
    pub amount_total: i64,
    pub platform_fee: i64,
    pub creator_earnings: i64,
    pub currency: String,

    pub status: OrderStatus,

    /// Free-form request details plus refund/dispute records as they
    /// accumulate.
    pub metadata: Json<serde_json::Value>,

    #[foreign_key(referenced_table = "video_requests", related_rust_type = "VideoRequest")]
    pub video_request_id: Option<Uuid>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// Builds a pending order from a successful charge, or reports why
    /// the charge is not ours to record.
    pub fn from_charge(charge: &Charge) -> Result<Self, ReconcileError> {
        let source = charge.metadata.get("source").map(String::as_str);
        if source != Some(ORDER_SOURCE_MARKER) {
            return Err(ReconcileError::NotOurs(format!(
                "source marker is {:?}",
                source.unwrap_or("absent")
            )));
        }

        let creator_id = parse_metadata_uuid(charge, "creatorId")?;
        let customer_id = parse_metadata_uuid(charge, "userId")?;
        let split = split_amount(charge.amount);

        Ok(Self {
            id: Uuid::default(),
            payment_reference_id: charge.payment_reference().to_string(),
            creator_id,
            customer_id,
            amount_total: charge.amount,
            platform_fee: split.platform_fee,
            creator_earnings: split.creator_earnings,
            currency: charge.currency.clone(),
            status: OrderStatus::Pending,
            metadata: Json(json!({
                "occasion": charge.metadata.get("occasion"),
                "recipientName": charge.metadata.get("recipientName"),
                "instructions": charge.metadata.get("instructions"),
            })),
            video_request_id: None,
            created_at: 0,
            updated_at: 0,
        })
    }

    /// Shallow-merges extra keys into the order's metadata blob, keeping
    /// whatever is already recorded there.
    pub fn merge_metadata(&mut self, patch: serde_json::Value) {
        merge_json(&mut self.metadata.0, patch);
    }
}

fn parse_metadata_uuid(charge: &Charge, key: &str) -> Result<Uuid, ReconcileError> {
    let raw = charge
        .metadata
        .get(key)
        .ok_or_else(|| ReconcileError::NotOurs(format!("missing {} in charge metadata", key)))?;
    raw.parse()
        .map_err(|_| ReconcileError::NotOurs(format!("{} is not a valid uuid: {}", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn charge_with_metadata(entries: &[(&str, &str)]) -> Charge {
        Charge {
            id: "ch_1".into(),
            amount: 10_000,
            amount_refunded: 0,
            currency: "usd".into(),
            metadata: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            payment_intent: Some("pi_1".into()),
            refunded: false,
            refunds: None,
            failure_code: None,
            failure_message: None,
            status: Some("succeeded".into()),
        }
    }

    #[test]
    fn builds_a_pending_order_with_the_split() {
        let charge = charge_with_metadata(&[
            ("source", ORDER_SOURCE_MARKER),
            ("creatorId", "7e6cf8bc-6f38-4ba3-9a26-3bfb60a4ce39"),
            ("userId", "a3fca07a-8c12-4f43-9d3d-2f34c6a0c0de"),
            ("occasion", "birthday"),
            ("recipientName", "Marie"),
        ]);

        let order = Order::from_charge(&charge).unwrap();
        assert_eq!(order.payment_reference_id, "pi_1");
        assert_eq!(order.amount_total, 10_000);
        assert_eq!(order.platform_fee, 3_000);
        assert_eq!(order.creator_earnings, 7_000);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.metadata.0["occasion"], "birthday");
        assert_eq!(order.metadata.0["recipientName"], "Marie");
    }

    #[test]
    fn rejects_charges_without_the_source_marker() {
        let charge = charge_with_metadata(&[
            ("creatorId", "7e6cf8bc-6f38-4ba3-9a26-3bfb60a4ce39"),
            ("userId", "a3fca07a-8c12-4f43-9d3d-2f34c6a0c0de"),
        ]);
        assert!(matches!(
            Order::from_charge(&charge),
            Err(ReconcileError::NotOurs(_))
        ));
    }

    #[test]
    fn rejects_charges_with_missing_or_invalid_ids() {
        let missing = charge_with_metadata(&[("source", ORDER_SOURCE_MARKER)]);
        assert!(matches!(
            Order::from_charge(&missing),
            Err(ReconcileError::NotOurs(_))
        ));

        let invalid = charge_with_metadata(&[
            ("source", ORDER_SOURCE_MARKER),
            ("creatorId", "not-a-uuid"),
            ("userId", "a3fca07a-8c12-4f43-9d3d-2f34c6a0c0de"),
        ]);
        assert!(matches!(
            Order::from_charge(&invalid),
            Err(ReconcileError::NotOurs(_))
        ));
    }

    #[test]
    fn payment_reference_is_unique_at_the_schema_level() {
        use annpale_database::SqlxSchema;

        // Concurrent redelivery of the same charge event must not be able
        // to insert two orders for one payment.
        let sql = Order::create_table_sql();
        assert!(sql.contains("\"payment_reference_id\" TEXT NOT NULL UNIQUE"));
    }

    #[test]
    fn metadata_merge_keeps_existing_keys() {
        let charge = charge_with_metadata(&[
            ("source", ORDER_SOURCE_MARKER),
            ("creatorId", "7e6cf8bc-6f38-4ba3-9a26-3bfb60a4ce39"),
            ("userId", "a3fca07a-8c12-4f43-9d3d-2f34c6a0c0de"),
            ("occasion", "graduation"),
        ]);
        let mut order = Order::from_charge(&charge).unwrap();

        order.merge_metadata(json!({ "refundId": "re_1", "refundAmount": 10_000 }));
        assert_eq!(order.metadata.0["occasion"], "graduation");
        assert_eq!(order.metadata.0["refundId"], "re_1");
    }
}
