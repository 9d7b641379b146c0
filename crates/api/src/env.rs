use annpale_common::EnvVars;

pub struct ApiServerEnv {
    pub stripe_secret_key: String,
    /// Absent secret means the webhook endpoint runs unverified; the
    /// verifier logs that relaxation loudly.
    pub stripe_webhook_secret: Option<String>,
}

impl EnvVars for ApiServerEnv {
    fn load() -> Self {
        Self {
            stripe_secret_key: std::env::var("STRIPE_SECRET_KEY")
                .expect("STRIPE_SECRET_KEY is not set"),
            stripe_webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET").ok(),
        }
    }

    fn get_env_var(&self, key: &str) -> String {
        match key {
            "STRIPE_SECRET_KEY" => self.stripe_secret_key.clone(),
            "STRIPE_WEBHOOK_SECRET" => self.stripe_webhook_secret.clone().unwrap_or_default(),
            _ => panic!("{} is not set", key),
        }
    }
}
