use {
    super::error::PipelineError,
    super::id::PaymentId,
    super::money::MoneyAmount,
    super::payment::{PaymentStatus, PaymentUpdate},
    super::user::is_email,
    chrono::{DateTime, Utc},
    futures::future::BoxFuture,
    rust_decimal::Decimal,
    serde::{Deserialize, Serialize},
};

/// What the service layer gets back after fetching from the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPayment {
    pub payment_id: PaymentId,
    pub update: PaymentUpdate,
}

/// One way of looking a payment up at the gateway.
///
/// `Ok(None)` means the transport answered but had no data for the id;
/// `Err(PipelineError::NotFound)` means the gateway positively does not
/// know it.
pub trait PaymentTransport: Send + Sync {
    fn name(&self) -> &'static str;

    fn fetch<'a>(
        &'a self,
        id: &'a PaymentId,
    ) -> BoxFuture<'a, Result<Option<FetchedPayment>, PipelineError>>;
}

pub trait PaymentGateway: Send + Sync {
    fn create_payment<'a>(
        &'a self,
        charge: &'a NewCharge,
    ) -> BoxFuture<'a, Result<CreatedPayment, PipelineError>>;
}

/// Minimum boleto amount the gateway accepts, in BRL.
pub fn boleto_minimum() -> Decimal {
    Decimal::new(300, 2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Pix,
    Boleto,
}

impl PaymentKind {
    /// Gateway `payment_method_id`.
    pub fn method_id(&self) -> &'static str {
        match self {
            Self::Pix => "pix",
            Self::Boleto => "bolbradesco",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerIdentification {
    #[serde(rename = "type")]
    pub kind: String,
    pub number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerAddress {
    pub zip_code: Option<String>,
    pub street_name: Option<String>,
    pub street_number: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub federal_unit: Option<String>,
}

impl PayerAddress {
    /// Names of required boleto fields that are absent or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("zip_code", &self.zip_code),
            ("street_name", &self.street_name),
            ("street_number", &self.street_number),
            ("neighborhood", &self.neighborhood),
            ("city", &self.city),
            ("federal_unit", &self.federal_unit),
        ]
        .into_iter()
        .filter(|(_, v)| v.as_deref().is_none_or(|s| s.trim().is_empty()))
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payer {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub identification: Option<PayerIdentification>,
    pub address: Option<PayerAddress>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeItem {
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub quantity: u32,
    pub unit_price: f64,
}

/// Checkout request as the app sends it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub payment_type: PaymentKind,
    pub transaction_amount: f64,
    pub description: String,
    pub payer: Payer,
    pub external_reference: Option<String>,
    pub statement_descriptor: Option<String>,
    pub items: Option<Vec<ChargeItem>>,
}

/// A checkout that passed validation and can go to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCharge {
    pub kind: PaymentKind,
    pub amount: MoneyAmount,
    pub description: String,
    pub payer: Payer,
    pub payer_email: String,
    pub external_reference: Option<String>,
    pub statement_descriptor: Option<String>,
    pub items: Vec<ChargeItem>,
}

impl TryFrom<CreatePaymentRequest> for NewCharge {
    type Error = PipelineError;

    fn try_from(req: CreatePaymentRequest) -> Result<Self, PipelineError> {
        if !req.transaction_amount.is_finite() || req.transaction_amount <= 0.0 {
            return Err(PipelineError::Validation(
                "transactionAmount must be greater than zero".into(),
            ));
        }
        let amount = MoneyAmount::try_from(req.transaction_amount)?;

        let description = req.description.trim().to_string();
        if description.is_empty() {
            return Err(PipelineError::Validation("description is required".into()));
        }

        let payer_email = req
            .payer
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| is_email(e))
            .ok_or_else(|| PipelineError::Validation("payer.email is required".into()))?
            .to_lowercase();

        if req.payment_type == PaymentKind::Boleto {
            let missing = req
                .payer
                .address
                .as_ref()
                .map(PayerAddress::missing_fields)
                .unwrap_or_else(|| PayerAddress::default().missing_fields());
            if !missing.is_empty() {
                return Err(PipelineError::Validation(format!(
                    "boleto requires payer address fields: {}",
                    missing.join(", ")
                )));
            }
            if amount.value() < boleto_minimum() {
                return Err(PipelineError::Validation(format!(
                    "boleto minimum amount is {}",
                    boleto_minimum()
                )));
            }
        }

        Ok(Self {
            kind: req.payment_type,
            amount,
            description,
            payer: req.payer,
            payer_email,
            external_reference: req.external_reference.filter(|r| !r.trim().is_empty()),
            statement_descriptor: req.statement_descriptor,
            items: req.items.unwrap_or_default(),
        })
    }
}

/// Normalized gateway answer to a checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedPayment {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    pub status_detail: Option<String>,
    pub payment_method: String,
    pub amount: MoneyAmount,
    pub external_reference: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub date_of_expiration: Option<DateTime<Utc>>,
    pub qr_code: Option<String>,
    pub qr_code_base64: Option<String>,
    pub ticket_url: Option<String>,
    pub barcode: Option<String>,
}
