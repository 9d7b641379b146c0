use std::sync::Arc;

use annpale_common::{define_module_client, ModuleClient};
use annpale_database::init_databases;
use sqlx::PgPool;

// Table creation order follows the foreign-key graph.
init_databases!(
    default: [
        annpale_billing::Profile,
        annpale_billing::VideoRequest,
        annpale_billing::Order,
        annpale_billing::SubscriptionOrder,
        annpale_billing::StripeAccount,
        annpale_billing::TransactionRecord,
        annpale_billing::WebhookEventLog,
        annpale_billing::Notification,
    ]
);

define_module_client! {
    (struct PostgresClient, "postgres")
    client_type: Arc<&'static PgPool>,
    env: ["DATABASE_URL"],
    setup: async {
        Arc::new(connect(false, true).await)
    }
}

impl PostgresClient {
    /// The process-wide pool behind this client.
    pub fn pool(&self) -> &'static PgPool {
        ***self.get_client()
    }
}
