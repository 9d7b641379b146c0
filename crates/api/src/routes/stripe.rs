use std::collections::HashMap;

use anyhow::anyhow;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::types::Uuid;
use stripe::{
    CheckoutSession, CheckoutSessionMode, CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionLineItemsPriceData, CreateCheckoutSessionLineItemsPriceDataProductData,
    CreateCheckoutSessionPaymentIntentData, CreateCheckoutSessionPaymentMethodTypes, Currency,
};

use annpale_billing::{Profile, ORDER_SOURCE_MARKER, SIGNATURE_HEADER};
use annpale_database::{QueryCriteria, SqlxFilterQuery};

use crate::{
    response::{AppError, AppSuccess},
    GlobalState,
};

pub fn stripe_routes() -> Router<GlobalState> {
    Router::new()
        .route(
            "/stripe/checkout/video-request",
            post(create_video_request_checkout),
        )
        .route("/stripe/webhook", post(stripe_webhook))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRequestCheckout {
    pub creator_id: Uuid,
    pub user_id: Uuid,
    /// Price in minor units.
    pub amount: i64,
    pub occasion: Option<String>,
    pub recipient_name: Option<String>,
    pub instructions: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

/// Creates the provider checkout session for a video request, stamping
/// the metadata contract the webhook reconcilers consume. The order row
/// itself is only created when the charge-succeeded event arrives.
async fn create_video_request_checkout(
    State(state): State<GlobalState>,
    Json(payload): Json<VideoRequestCheckout>,
) -> Result<AppSuccess, AppError> {
    if payload.amount <= 0 {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            anyhow!("amount must be positive"),
        ));
    }

    let creator = Profile::find_one_by_criteria(
        QueryCriteria::new().add_valued_filter("id", "=", payload.creator_id),
        state.db.pool(),
    )
    .await?
    .ok_or_else(|| {
        AppError::new(
            StatusCode::NOT_FOUND,
            anyhow!("[create_video_request_checkout] Creator not found"),
        )
    })?;

    let mut metadata = HashMap::from([
        ("source".to_string(), ORDER_SOURCE_MARKER.to_string()),
        ("creatorId".to_string(), payload.creator_id.to_string()),
        ("userId".to_string(), payload.user_id.to_string()),
    ]);
    if let Some(occasion) = &payload.occasion {
        metadata.insert("occasion".to_string(), occasion.clone());
    }
    if let Some(recipient_name) = &payload.recipient_name {
        metadata.insert("recipientName".to_string(), recipient_name.clone());
    }
    if let Some(instructions) = &payload.instructions {
        metadata.insert("instructions".to_string(), instructions.clone());
    }

    let user_id_str = payload.user_id.to_string();
    let product_name = format!("Video message from {}", creator.display_name);

    let params = CreateCheckoutSession {
        client_reference_id: Some(&user_id_str),
        payment_method_types: Some(vec![CreateCheckoutSessionPaymentMethodTypes::Card]),
        line_items: Some(vec![CreateCheckoutSessionLineItems {
            price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                currency: Currency::USD,
                unit_amount: Some(payload.amount),
                product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: product_name,
                    ..Default::default()
                }),
                ..Default::default()
            }),
            quantity: Some(1),
            ..Default::default()
        }]),
        mode: Some(CheckoutSessionMode::Payment),
        success_url: Some(&payload.success_url),
        cancel_url: Some(&payload.cancel_url),
        metadata: Some(metadata.clone()),
        payment_intent_data: Some(CreateCheckoutSessionPaymentIntentData {
            metadata: Some(metadata),
            ..Default::default()
        }),
        ..Default::default()
    };

    let session = CheckoutSession::create(&state.stripe_client, params)
        .await
        .map_err(|e| {
            AppError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                anyhow!("Stripe error: {}", e),
            )
        })?;
    let url = session.url.ok_or_else(|| {
        AppError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            anyhow!("Stripe error: no session url"),
        )
    })?;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Checkout session created",
        json!({ "url": url, "sessionId": session.id }),
    ))
}

/// The inbound webhook endpoint. Signature failures answer 400 before any
/// business logic; everything after verification is acknowledged with
/// `{received: true}` no matter how reconciliation went, so the provider
/// does not retry conditions retrying cannot fix.
async fn stripe_webhook(
    State(state): State<GlobalState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<AppSuccess, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let event = state
        .verifier
        .verify(&body, signature)
        .map_err(|err| AppError::new(StatusCode::BAD_REQUEST, anyhow!(err)))?;

    state.processor.process(&event).await;

    Ok(AppSuccess::new(
        StatusCode::OK,
        "Webhook received",
        json!({ "received": true }),
    ))
}
