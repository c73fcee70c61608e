use {
    crate::domain::{
        error::PipelineError,
        id::PaymentId,
        money::MoneyAmount,
        payment::{PaymentStatus, PaymentUpdate},
        provider::{
            ChargeItem, CreatedPayment, FetchedPayment, NewCharge, Payer, PaymentGateway,
            PaymentTransport,
        },
    },
    chrono::{DateTime, Utc},
    futures::future::BoxFuture,
    reqwest::{Client, StatusCode},
    serde::{Deserialize, Serialize},
    std::{sync::Arc, time::Duration},
    uuid::Uuid,
};

pub const DEFAULT_API_BASE: &str = "https://api.mercadopago.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Thin Mercado Pago REST client. Lookups are exposed to the fetcher through
/// [`RestLookup`] and [`SearchLookup`].
pub struct MercadoPagoClient {
    http: Client,
    base_url: String,
    access_token: String,
    notification_url: Option<String>,
}

// ── Wire types ──────────────────────────────────────────────────────────────

/// Payment ids are numbers in API responses and strings everywhere else.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WireId {
    Number(u64),
    Text(String),
}

impl WireId {
    fn into_payment_id(self) -> Result<PaymentId, PipelineError> {
        match self {
            Self::Number(n) => PaymentId::new(n.to_string()),
            Self::Text(s) => PaymentId::new(s),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WirePayer {
    email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WireTransactionData {
    qr_code: Option<String>,
    qr_code_base64: Option<String>,
    ticket_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WirePointOfInteraction {
    transaction_data: Option<WireTransactionData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WireTransactionDetails {
    external_resource_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WireBarcode {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct MpPayment {
    id: WireId,
    status: Option<String>,
    status_detail: Option<String>,
    transaction_amount: Option<f64>,
    date_created: Option<String>,
    date_approved: Option<String>,
    date_of_expiration: Option<String>,
    external_reference: Option<String>,
    payment_method_id: Option<String>,
    description: Option<String>,
    payer: Option<WirePayer>,
    point_of_interaction: Option<WirePointOfInteraction>,
    transaction_details: Option<WireTransactionDetails>,
    barcode: Option<WireBarcode>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<MpPayment>,
}

#[derive(Debug, Serialize)]
struct AdditionalInfo<'a> {
    items: &'a [ChargeItem],
}

#[derive(Debug, Serialize)]
struct CreateBody<'a> {
    transaction_amount: f64,
    description: &'a str,
    payment_method_id: &'static str,
    payer: &'a Payer,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_reference: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    statement_descriptor: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    additional_info: Option<AdditionalInfo<'a>>,
}

fn parse_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(value = raw, error = %e, "unparseable gateway date, ignoring");
            None
        }
    }
}

fn parse_amount(raw: Option<f64>) -> Option<MoneyAmount> {
    let raw = raw?;
    match MoneyAmount::try_from(raw) {
        Ok(amount) => Some(amount),
        Err(e) => {
            tracing::warn!(value = raw, error = %e, "unusable gateway amount, ignoring");
            None
        }
    }
}

fn blank_to_none(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

impl MpPayment {
    fn into_fetched(self) -> Result<FetchedPayment, PipelineError> {
        let payment_id = self.id.into_payment_id()?;
        let update = PaymentUpdate {
            status: self.status.as_deref().map(PaymentStatus::from),
            status_detail: blank_to_none(self.status_detail),
            amount: parse_amount(self.transaction_amount),
            date_created: parse_date(self.date_created.as_deref()),
            date_approved: parse_date(self.date_approved.as_deref()),
            external_reference: blank_to_none(self.external_reference),
            payment_method: blank_to_none(self.payment_method_id),
            payer_email: blank_to_none(self.payer.and_then(|p| p.email)),
            description: blank_to_none(self.description),
            user_id: None,
            user_email: None,
        };
        Ok(FetchedPayment { payment_id, update })
    }

    fn into_created(self) -> Result<CreatedPayment, PipelineError> {
        let data = self
            .point_of_interaction
            .and_then(|p| p.transaction_data)
            .unwrap_or_default();
        let ticket_url = data.ticket_url.or_else(|| {
            self.transaction_details
                .and_then(|d| d.external_resource_url)
        });

        Ok(CreatedPayment {
            payment_id: self.id.into_payment_id()?,
            status: self
                .status
                .as_deref()
                .map(PaymentStatus::from)
                .unwrap_or(PaymentStatus::Pending),
            status_detail: self.status_detail,
            payment_method: self.payment_method_id.unwrap_or_default(),
            amount: parse_amount(self.transaction_amount)
                .ok_or_else(|| PipelineError::Provider("payment without amount".into()))?,
            external_reference: self.external_reference,
            date_created: parse_date(self.date_created.as_deref()),
            date_of_expiration: parse_date(self.date_of_expiration.as_deref()),
            qr_code: data.qr_code,
            qr_code_base64: data.qr_code_base64,
            ticket_url,
            barcode: self.barcode.and_then(|b| b.content),
        })
    }
}

// ── Client ──────────────────────────────────────────────────────────────────

impl MercadoPagoClient {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        notification_url: Option<String>,
    ) -> Result<Self, PipelineError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            notification_url,
        })
    }

    async fn error_text(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        format!("Mercado Pago returned {status}: {body}")
    }

    /// `GET /v1/payments/{id}`. A 404 is a definitive answer.
    pub async fn get_payment(&self, id: &PaymentId) -> Result<FetchedPayment, PipelineError> {
        let response = self
            .http
            .get(format!("{}/v1/payments/{}", self.base_url, id))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(PipelineError::NotFound(format!("payment {id}")));
        }
        if !response.status().is_success() {
            return Err(PipelineError::Provider(Self::error_text(response).await));
        }

        let payment: MpPayment = response.json().await?;
        payment.into_fetched()
    }

    /// `GET /v1/payments/search?id=`. An empty result set is `Ok(None)`.
    pub async fn search_payment(
        &self,
        id: &PaymentId,
    ) -> Result<Option<FetchedPayment>, PipelineError> {
        let response = self
            .http
            .get(format!("{}/v1/payments/search", self.base_url))
            .query(&[("id", id.as_str())])
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::Provider(Self::error_text(response).await));
        }

        let search: SearchResponse = response.json().await?;
        search
            .results
            .into_iter()
            .next()
            .map(MpPayment::into_fetched)
            .transpose()
    }

    async fn post_payment(&self, charge: &NewCharge) -> Result<CreatedPayment, PipelineError> {
        let body = CreateBody {
            transaction_amount: charge.amount.to_f64(),
            description: &charge.description,
            payment_method_id: charge.kind.method_id(),
            payer: &charge.payer,
            external_reference: charge.external_reference.as_deref(),
            statement_descriptor: charge.statement_descriptor.as_deref(),
            notification_url: self.notification_url.as_deref(),
            additional_info: (!charge.items.is_empty()).then_some(AdditionalInfo {
                items: &charge.items,
            }),
        };

        let response = self
            .http
            .post(format!("{}/v1/payments", self.base_url))
            .bearer_auth(&self.access_token)
            .header("X-Idempotency-Key", Uuid::now_v7().to_string())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::Provider(Self::error_text(response).await));
        }

        let payment: MpPayment = response.json().await?;
        payment.into_created()
    }
}

impl PaymentGateway for MercadoPagoClient {
    fn create_payment<'a>(
        &'a self,
        charge: &'a NewCharge,
    ) -> BoxFuture<'a, Result<CreatedPayment, PipelineError>> {
        Box::pin(self.post_payment(charge))
    }
}

/// Direct REST lookup by id.
pub struct RestLookup(pub Arc<MercadoPagoClient>);

impl PaymentTransport for RestLookup {
    fn name(&self) -> &'static str {
        "rest"
    }

    fn fetch<'a>(
        &'a self,
        id: &'a PaymentId,
    ) -> BoxFuture<'a, Result<Option<FetchedPayment>, PipelineError>> {
        Box::pin(async move { self.0.get_payment(id).await.map(Some) })
    }
}

/// Lookup through the search endpoint, which can lag right after creation.
pub struct SearchLookup(pub Arc<MercadoPagoClient>);

impl PaymentTransport for SearchLookup {
    fn name(&self) -> &'static str {
        "search"
    }

    fn fetch<'a>(
        &'a self,
        id: &'a PaymentId,
    ) -> BoxFuture<'a, Result<Option<FetchedPayment>, PipelineError>> {
        Box::pin(self.0.search_payment(id))
    }
}
