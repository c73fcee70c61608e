use {
    super::error::PipelineError,
    rust_decimal::{Decimal, prelude::ToPrimitive},
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Non-negative amount in BRL, as the gateway reports it (`150.00`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoneyAmount(Decimal);

impl MoneyAmount {
    pub fn new(value: Decimal) -> Result<Self, PipelineError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(PipelineError::Validation(format!(
                "MoneyAmount cannot be negative, got: {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn from_cents(cents: i64) -> Result<Self, PipelineError> {
        Self::new(Decimal::new(cents, 2))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Gateway request bodies carry amounts as JSON numbers.
    pub fn to_f64(&self) -> f64 {
        self.0.round_dp(2).to_f64().unwrap_or_default()
    }

    /// `R$ 150,00`
    pub fn to_brl(&self) -> String {
        format!("R$ {:.2}", self.0).replace('.', ",")
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<f64> for MoneyAmount {
    type Error = PipelineError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let decimal = Decimal::try_from(value).map_err(|e| {
            PipelineError::Validation(format!("invalid amount {value}: {e}"))
        })?;
        Self::new(decimal.round_dp(2))
    }
}
