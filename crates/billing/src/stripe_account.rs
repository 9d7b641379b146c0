use annpale_database::SqlxObject;
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

use crate::events::Account;

/// Local cache of a Stripe Connect account's capability flags. Upserted
/// on every account-update event; removed when the account deauthorizes
/// the platform.
#[derive(Debug, Serialize, Deserialize, Clone, Default, SqlxObject)]
#[table_name = "stripe_accounts"]
pub struct StripeAccount {
    pub id: Uuid,

    #[unique]
    pub stripe_account_id: String,

    pub charges_enabled: bool,
    pub payouts_enabled: bool,
    pub onboarding_complete: bool,

    pub requirements_currently_due: Vec<String>,
    pub requirements_eventually_due: Vec<String>,
    pub requirements_past_due: Vec<String>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl StripeAccount {
    pub fn for_account(account: &Account) -> Self {
        let mut mirror = Self {
            stripe_account_id: account.id.clone(),
            ..Default::default()
        };
        mirror.apply(account);
        mirror
    }

    /// Overwrites the mirrored flags from a provider account snapshot.
    pub fn apply(&mut self, account: &Account) {
        self.charges_enabled = account.charges_enabled;
        self.payouts_enabled = account.payouts_enabled;
        self.onboarding_complete = account.details_submitted;

        let requirements = account.requirements.clone().unwrap_or_default();
        self.requirements_currently_due = requirements.currently_due;
        self.requirements_eventually_due = requirements.eventually_due;
        self.requirements_past_due = requirements.past_due;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::AccountRequirements;

    #[test]
    fn mirrors_capability_flags_and_requirements() {
        let account = Account {
            id: "acct_1".into(),
            charges_enabled: true,
            payouts_enabled: false,
            details_submitted: true,
            requirements: Some(AccountRequirements {
                currently_due: vec!["external_account".into()],
                eventually_due: vec!["individual.id_number".into()],
                past_due: vec![],
            }),
        };

        let mirror = StripeAccount::for_account(&account);
        assert_eq!(mirror.stripe_account_id, "acct_1");
        assert!(mirror.charges_enabled);
        assert!(!mirror.payouts_enabled);
        assert!(mirror.onboarding_complete);
        assert_eq!(mirror.requirements_currently_due, vec!["external_account"]);
        assert!(mirror.requirements_past_due.is_empty());
    }

    #[test]
    fn missing_requirements_clear_the_arrays() {
        let account = Account {
            id: "acct_2".into(),
            charges_enabled: false,
            payouts_enabled: false,
            details_submitted: false,
            requirements: None,
        };

        let mut mirror = StripeAccount::for_account(&account);
        mirror.requirements_past_due = vec!["stale".into()];
        mirror.apply(&account);
        assert!(mirror.requirements_past_due.is_empty());
    }
}
