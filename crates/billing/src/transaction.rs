use annpale_database::{QueryCriteria, SqlxCrud, SqlxFilterQuery, SqlxObject};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::{Json, Uuid};

/// Ledger row keyed by the provider's charge or payment-intent id,
/// accumulating transfer, application-fee and refund-tracking details as
/// separate events arrive over time.
#[derive(Debug, Serialize, Deserialize, Clone, Default, SqlxObject)]
#[table_name = "transactions"]
pub struct TransactionRecord {
    pub id: Uuid,

    #[unique]
    pub payment_ref: String,

    /// Application fee charged by the platform, in minor units.
    pub platform_fee: Option<i64>,

    pub metadata: Json<Value>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl TransactionRecord {
    /// Read-merge-write a metadata patch into the row identified by
    /// `payment_ref`, creating the row when it does not exist yet. The
    /// pre-existing metadata map is read and merged, never replaced
    /// wholesale.
    pub async fn merge_metadata(
        pool: &sqlx::PgPool,
        payment_ref: &str,
        patch: Value,
    ) -> Result<Self, sqlx::Error> {
        Self::merge_with(pool, payment_ref, None, patch).await
    }

    /// Same as [`merge_metadata`](Self::merge_metadata), also setting the
    /// typed platform-fee column.
    pub async fn merge_with_platform_fee(
        pool: &sqlx::PgPool,
        payment_ref: &str,
        platform_fee: i64,
        patch: Value,
    ) -> Result<Self, sqlx::Error> {
        Self::merge_with(pool, payment_ref, Some(platform_fee), patch).await
    }

    async fn merge_with(
        pool: &sqlx::PgPool,
        payment_ref: &str,
        platform_fee: Option<i64>,
        patch: Value,
    ) -> Result<Self, sqlx::Error> {
        let existing = Self::find_one_by_criteria(
            QueryCriteria::new().add_valued_filter("payment_ref", "=", payment_ref.to_string()),
            pool,
        )
        .await?;

        match existing {
            Some(mut record) => {
                merge_json(&mut record.metadata.0, patch);
                if platform_fee.is_some() {
                    record.platform_fee = platform_fee;
                }
                record.update(pool).await
            }
            None => {
                let mut record = Self {
                    id: Uuid::default(),
                    payment_ref: payment_ref.to_string(),
                    platform_fee,
                    metadata: Json(serde_json::json!({})),
                    created_at: 0,
                    updated_at: 0,
                };
                merge_json(&mut record.metadata.0, patch);
                record.create(pool).await
            }
        }
    }
}

/// Shallow merge of a JSON object patch into a base value. A non-object
/// base (fresh rows start as `{}` but old data may hold anything) is
/// replaced by an empty object first; keys absent from the patch are kept.
pub(crate) fn merge_json(base: &mut Value, patch: Value) {
    if !base.is_object() {
        *base = serde_json::json!({});
    }
    if let (Some(base_map), Value::Object(patch_map)) = (base.as_object_mut(), patch) {
        for (key, value) in patch_map {
            base_map.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_keeps_existing_keys_and_overwrites_patched_ones() {
        let mut base = json!({ "transferId": "tr_1", "transferAmount": 7000 });
        merge_json(
            &mut base,
            json!({ "transferReversed": true, "transferAmount": 6000 }),
        );
        assert_eq!(base["transferId"], "tr_1");
        assert_eq!(base["transferAmount"], 6000);
        assert_eq!(base["transferReversed"], true);
    }

    #[test]
    fn merge_into_a_non_object_starts_fresh() {
        let mut base = Value::Null;
        merge_json(&mut base, json!({ "applicationFeeId": "fee_1" }));
        assert_eq!(base, json!({ "applicationFeeId": "fee_1" }));
    }

    #[test]
    fn non_object_patch_is_a_no_op() {
        let mut base = json!({ "kept": 1 });
        merge_json(&mut base, json!("scalar"));
        assert_eq!(base, json!({ "kept": 1 }));
    }
}
