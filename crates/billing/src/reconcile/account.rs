//! Connect-account mirroring.

use annpale_common::get_current_timestamp;
use annpale_database::{QueryCriteria, SqlxCrud, SqlxFilterQuery};

use super::WebhookProcessor;
use crate::error::ReconcileError;
use crate::events::Account;
use crate::profile::Profile;
use crate::stripe_account::StripeAccount;

impl WebhookProcessor {
    pub(super) async fn handle_account_updated(
        &self,
        account: &Account,
    ) -> Result<(), ReconcileError> {
        let existing = StripeAccount::find_one_by_criteria(
            QueryCriteria::new().add_valued_filter("stripe_account_id", "=", account.id.clone()),
            self.pool,
        )
        .await?;

        match existing {
            Some(mut mirror) => {
                mirror.apply(account);
                mirror.update(self.pool).await?;
            }
            None => {
                StripeAccount::for_account(account).create(self.pool).await?;
            }
        }

        // Backward-compatibility mirror on profiles; either side may be
        // missing and that is fine.
        match Profile::find_by_criteria(
            QueryCriteria::new().add_valued_filter("stripe_account_id", "=", account.id.clone()),
            self.pool,
        )
        .await
        {
            Ok(profiles) => {
                for mut profile in profiles {
                    profile.stripe_account_synced_at = Some(get_current_timestamp());
                    if let Err(err) = profile.update(self.pool).await {
                        tracing::warn!(
                            "[handle_account_updated] Failed to refresh profile for {}: {}",
                            account.id,
                            err
                        );
                    }
                }
            }
            Err(err) => {
                tracing::warn!(
                    "[handle_account_updated] Failed to load profiles for {}: {}",
                    account.id,
                    err
                );
            }
        }

        Ok(())
    }

    pub(super) async fn handle_account_deauthorized(
        &self,
        account_id: Option<&str>,
    ) -> Result<(), ReconcileError> {
        let Some(account_id) = account_id else {
            return Err(ReconcileError::Payload(
                "account.application.deauthorized event without a connected account id".to_string(),
            ));
        };

        let removed = StripeAccount::delete_by_criteria(
            QueryCriteria::new().add_valued_filter(
                "stripe_account_id",
                "=",
                account_id.to_string(),
            ),
            self.pool,
        )
        .await?;
        tracing::info!(
            "[handle_account_deauthorized] Removed {} mirror row(s) for {}",
            removed,
            account_id
        );

        let profiles = Profile::find_by_criteria(
            QueryCriteria::new().add_valued_filter(
                "stripe_account_id",
                "=",
                account_id.to_string(),
            ),
            self.pool,
        )
        .await?;
        for mut profile in profiles {
            let profile_id = profile.id;
            profile.stripe_account_id = None;
            if let Err(err) = profile.update(self.pool).await {
                tracing::warn!(
                    "[handle_account_deauthorized] Failed to unlink profile {}: {}",
                    profile_id,
                    err
                );
            }
        }

        Ok(())
    }
}
