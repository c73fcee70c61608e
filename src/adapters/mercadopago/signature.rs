use {
    crate::domain::error::PipelineError,
    axum::http::HeaderMap,
    hmac::{Hmac, Mac},
    sha2::Sha256,
    std::sync::Arc,
    subtle::ConstantTimeEq,
};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-signature";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Checks the `x-signature` header Mercado Pago puts on every webhook.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Arc<str>,
}

struct SignatureParts<'a> {
    ts: &'a str,
    v1: &'a str,
}

fn parse_header(raw: &str) -> Option<SignatureParts<'_>> {
    let mut ts = None;
    let mut v1 = None;
    for part in raw.split(',') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        match key.trim() {
            "ts" => ts = Some(value.trim()),
            "v1" => v1 = Some(value.trim()),
            _ => {}
        }
    }
    Some(SignatureParts {
        ts: ts.filter(|s| !s.is_empty())?,
        v1: v1.filter(|s| !s.is_empty())?,
    })
}

/// `data.id` from the webhook body; the gateway sends it as a string or a
/// bare number depending on the topic.
pub fn data_id(body: &serde_json::Value) -> Option<String> {
    match body.get("data")?.get("id")? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `id:{id};request-id:{rid};ts:{ts};`, without the request-id segment when
/// the delivery carried none.
pub fn canonical_manifest(data_id: &str, request_id: Option<&str>, ts: &str) -> String {
    match request_id {
        Some(rid) => format!("id:{data_id};request-id:{rid};ts:{ts};"),
        None => format!("id:{data_id};ts:{ts};"),
    }
}

/// Lowercase hex HMAC-SHA256 of `manifest`.
pub fn expected_signature(secret: &str, manifest: &str) -> String {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(manifest.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), PipelineError> {
        let raw = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| PipelineError::WebhookSignature("missing x-signature header".into()))?;
        let parts = parse_header(raw).ok_or_else(|| {
            PipelineError::WebhookSignature("x-signature lacks ts or v1".into())
        })?;

        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let payload: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| PipelineError::WebhookSignature(format!("unparseable body: {e}")))?;
        let id = data_id(&payload)
            .ok_or_else(|| PipelineError::WebhookSignature("body has no data.id".into()))?;

        let manifest = canonical_manifest(&id, request_id, parts.ts);
        let expected = expected_signature(&self.secret, &manifest);
        let provided = parts.v1.to_ascii_lowercase();

        if expected.is_empty() || !bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
            return Err(PipelineError::WebhookSignature("signature mismatch".into()));
        }
        Ok(())
    }
}
