use thiserror::Error;

/// Failures that reject a webhook request before any business logic runs.
/// These are the only errors the payment provider ever sees.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing stripe-signature header")]
    MissingSignature,

    #[error("webhook signature verification failed")]
    InvalidSignature,

    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),
}

/// Failures inside the reconcilers. Every variant is caught at the
/// dispatch level and converted into a log line; the provider always
/// receives a successful acknowledgement for a verified event.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The event's metadata does not carry this platform's source marker
    /// or required ids.
    #[error("event is not ours: {0}")]
    NotOurs(String),

    /// A lookup found no matching local row. Delivery ordering can put an
    /// event ahead of the row it refers to, so this is never fatal.
    #[error("{entity} not found for {key}")]
    RecordNotFound {
        entity: &'static str,
        key: String,
    },

    #[error("datastore write failed: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("provider lookup failed: {0}")]
    Provider(String),

    #[error("malformed event payload: {0}")]
    Payload(String),
}
