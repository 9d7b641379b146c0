use std::sync::Arc;

use annpale_billing::{DbNotificationSink, EventVerifier, NotificationSink, WebhookProcessor};
use annpale_clients::PostgresClient;
use annpale_common::{EnvVars, ModuleClient};
use anyhow::Result;
use stripe::Client as StripeClient;

use crate::env::ApiServerEnv;

/// Process-wide dependency container. Every collaborator is constructed
/// once here and handed to the routes through axum state; nothing is
/// reached as an ambient singleton.
#[derive(Clone)]
pub struct GlobalState {
    pub db: PostgresClient,
    pub stripe_client: StripeClient,
    pub verifier: EventVerifier,
    pub processor: Arc<WebhookProcessor>,
}

impl GlobalState {
    pub async fn new() -> Result<Self> {
        let env = ApiServerEnv::load();

        let db = PostgresClient::setup_connection().await;
        let stripe_client = StripeClient::new(env.stripe_secret_key.clone());
        let verifier = EventVerifier::new(env.stripe_webhook_secret.clone());

        let notifier: Arc<dyn NotificationSink> = Arc::new(DbNotificationSink::new(db.pool()));
        let processor = Arc::new(WebhookProcessor::new(
            db.pool(),
            stripe_client.clone(),
            notifier,
        ));

        Ok(Self {
            db,
            stripe_client,
            verifier,
            processor,
        })
    }
}
