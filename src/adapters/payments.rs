use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::{
            error::PipelineError,
            id::PaymentId,
            payment::{PaymentStatus, PaymentUpdate},
            provider::{CreatePaymentRequest, CreatedPayment, NewCharge},
            user::{Identity, resolve_identity},
        },
    },
    axum::{
        Json,
        extract::{Query, State, rejection::JsonRejection},
    },
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Serialize)]
pub struct CreatePaymentResponse {
    pub id: String,
    pub status: PaymentStatus,
    pub status_detail: Option<String>,
    pub payment_method_id: String,
    pub transaction_amount: f64,
    pub external_reference: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_of_expiration: Option<DateTime<Utc>>,
    pub qr_code: Option<String>,
    pub qr_code_base64: Option<String>,
    pub ticket_url: Option<String>,
    pub barcode: Option<String>,
}

impl From<CreatedPayment> for CreatePaymentResponse {
    fn from(p: CreatedPayment) -> Self {
        Self {
            id: p.payment_id.into_inner(),
            status: p.status,
            status_detail: p.status_detail,
            payment_method_id: p.payment_method,
            transaction_amount: p.amount.to_f64(),
            external_reference: p.external_reference,
            date_created: p.date_created,
            date_of_expiration: p.date_of_expiration,
            qr_code: p.qr_code,
            qr_code_base64: p.qr_code_base64,
            ticket_url: p.ticket_url,
            barcode: p.barcode,
        }
    }
}

/// What we already know about a payment we just created, so the record exists
/// before the first webhook arrives.
fn placeholder_update(charge: &NewCharge, created: &CreatedPayment) -> PaymentUpdate {
    let mut update = PaymentUpdate {
        status: Some(created.status.clone()),
        status_detail: created.status_detail.clone(),
        amount: Some(created.amount),
        date_created: created.date_created,
        external_reference: created
            .external_reference
            .clone()
            .or_else(|| charge.external_reference.clone()),
        payment_method: Some(charge.kind.method_id().to_string()),
        payer_email: Some(charge.payer_email.clone()),
        description: Some(charge.description.clone()),
        ..Default::default()
    };
    match resolve_identity(
        update.external_reference.as_deref(),
        update.payer_email.as_deref(),
    ) {
        Some(Identity::Email(email)) => update.user_email = Some(email),
        Some(Identity::UserId(id)) => update.user_id = Some(id),
        None => {}
    }
    update
}

#[tracing::instrument(name = "create_payment", skip_all, fields(payment_id = tracing::field::Empty))]
pub async fn create_payment_handler(
    State(state): State<AppState>,
    body: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Result<Json<CreatePaymentResponse>, ApiError> {
    let Json(request) = body.map_err(|e| PipelineError::Validation(e.body_text()))?;
    let charge = NewCharge::try_from(request)?;

    let created = state.gateway.create_payment(&charge).await?;
    tracing::Span::current().record("payment_id", tracing::field::display(&created.payment_id));
    tracing::info!(
        kind = charge.kind.method_id(),
        amount = %created.amount,
        status = %created.status,
        "payment created"
    );

    let update = placeholder_update(&charge, &created);
    if let Err(e) = state.payments.merge(&created.payment_id, &update).await {
        tracing::error!(error = %e, "failed to store new payment record");
    }

    Ok(Json(created.into()))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "paymentId")]
    pub payment_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub id: String,
    /// `null` when the gateway did not report one.
    pub status: Option<PaymentStatus>,
    pub status_detail: Option<String>,
}

pub async fn payment_status_handler(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<PaymentStatusResponse>, ApiError> {
    let raw = query
        .payment_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| PipelineError::Validation("paymentId is required".into()))?;
    let payment_id = PaymentId::new(raw)?;

    let fetched = state.fetcher.fetch(&payment_id).await?;
    Ok(Json(PaymentStatusResponse {
        id: fetched.payment_id.into_inner(),
        status: fetched.update.status,
        status_detail: fetched.update.status_detail,
    }))
}
