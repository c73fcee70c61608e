mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use common::*;
use mp_sync::domain::code::VerificationCode;
use mp_sync::domain::payment::PaymentStatus;
use mp_sync::domain::provider::PaymentKind;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn send(h: &Harness, request: Request<Body>) -> (StatusCode, Value) {
    let response = h.router().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn pix_checkout() -> Value {
    json!({
        "paymentType": "pix",
        "transactionAmount": 150.0,
        "description": "Honda CG 160",
        "externalReference": "user_bob@example.com",
        "payer": { "email": "bob@example.com", "first_name": "Bob" }
    })
}

fn boleto_checkout(amount: f64, with_address: bool) -> Value {
    let mut body = json!({
        "paymentType": "boleto",
        "transactionAmount": amount,
        "description": "Honda CG 160",
        "payer": {
            "email": "bob@example.com",
            "first_name": "Bob",
            "last_name": "Silva",
            "identification": { "type": "CPF", "number": "19119119100" }
        }
    });
    if with_address {
        body["payer"]["address"] = json!({
            "zip_code": "01310-100",
            "street_name": "Av. Paulista",
            "street_number": "1000",
            "neighborhood": "Bela Vista",
            "city": "São Paulo",
            "federal_unit": "SP"
        });
    }
    body
}

#[tokio::test]
async fn health_check() {
    let h = Harness::new();
    let response = h.router().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"ok");
}

// ── Payment creation ───────────────────────────────────────────────────────

#[tokio::test]
async fn pix_checkout_creates_payment_and_placeholder_record() {
    let h = Harness::new();
    let (status, body) = send(&h, post_json("/payments", pix_checkout())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "900001");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["payment_method_id"], "pix");
    assert_eq!(body["qr_code"], "00020126580014br.gov.bcb.pix");

    let charges = h.gateway.charges();
    assert_eq!(charges.len(), 1);
    assert_eq!(charges[0].kind, PaymentKind::Pix);
    assert_eq!(charges[0].payer_email, "bob@example.com");

    let record = h.payments.record("900001").expect("placeholder stored");
    assert_eq!(record.status, PaymentStatus::Pending);
    assert_eq!(record.user_email.as_deref(), Some("bob@example.com"));
    assert_eq!(record.payment_method.as_deref(), Some("pix"));
    assert!(!record.notifications_sent.pending);
}

#[tokio::test]
async fn boleto_without_address_is_rejected() {
    let h = Harness::new();
    let (status, body) = send(&h, post_json("/payments", boleto_checkout(150.0, false))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(body["details"].as_str().unwrap().contains("zip_code"));
    assert!(h.gateway.charges().is_empty());
}

#[tokio::test]
async fn boleto_below_minimum_is_rejected() {
    let h = Harness::new();
    let (status, body) = send(&h, post_json("/payments", boleto_checkout(2.5, true))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"].as_str().unwrap().contains("minimum"));
    assert!(h.gateway.charges().is_empty());
}

#[tokio::test]
async fn boleto_with_address_goes_through() {
    let h = Harness::new();
    let (status, _) = send(&h, post_json("/payments", boleto_checkout(3.0, true))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.gateway.charges()[0].kind, PaymentKind::Boleto);
}

#[tokio::test]
async fn zero_amount_is_rejected() {
    let h = Harness::new();
    let mut body = pix_checkout();
    body["transactionAmount"] = json!(0);

    let (status, _) = send(&h, post_json("/payments", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.gateway.charges().is_empty());
}

#[tokio::test]
async fn missing_payer_email_is_rejected() {
    let h = Harness::new();
    let mut body = pix_checkout();
    body["payer"] = json!({ "first_name": "Bob" });

    let (status, body) = send(&h, post_json("/payments", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"].as_str().unwrap().contains("payer.email"));
}

#[tokio::test]
async fn malformed_body_is_a_validation_error() {
    let h = Harness::new();
    let (status, body) = send(&h, post_json("/payments", json!({ "paymentType": "cash" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn gateway_refusal_is_a_gateway_error() {
    let h = Harness::new();
    *h.gateway.reply.lock().unwrap() = Err("400 invalid payer".into());

    let (status, body) = send(&h, post_json("/payments", pix_checkout())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "gateway_error");
    assert_eq!(h.payments.len(), 0);
}

// ── Payment status ─────────────────────────────────────────────────────────

#[tokio::test]
async fn status_requires_an_id() {
    let h = Harness::new();
    let (status, body) = send(&h, get("/payments/status")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn status_of_unknown_payment_is_404() {
    let h = Harness::new();
    h.rest.always(StubReply::NotFound);

    let (status, body) = send(&h, get("/payments/status?paymentId=PAYX")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn status_of_known_payment() {
    let h = Harness::new();
    h.rest.always(StubReply::Found(fetched(
        "PAYS",
        "approved",
        None,
        None,
        Duration::minutes(1),
    )));

    let (status, body) = send(&h, get("/payments/status?paymentId=PAYS")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "PAYS");
    assert_eq!(body["status"], "approved");
}

#[tokio::test]
async fn status_the_gateway_did_not_report_is_null() {
    let h = Harness::new();
    let mut payment = fetched("PAYN", "pending", None, None, Duration::minutes(1));
    payment.update.status = None;
    h.rest.always(StubReply::Found(payment));

    let (status, body) = send(&h, get("/payments/status?paymentId=PAYN")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "PAYN");
    assert!(body["status"].is_null());
}

// ── Verification codes ─────────────────────────────────────────────────────

#[tokio::test]
async fn send_code_rejects_invalid_email() {
    let h = Harness::new();
    let (status, _) = send(&h, post_json("/codes/send", json!({ "email": "not-an-email" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.emails.all().is_empty());
}

#[tokio::test]
async fn send_code_stores_and_queues_the_code() {
    let h = Harness::new();
    let (status, body) = send(
        &h,
        post_json("/codes/send", json!({ "email": " Bob@Example.com " })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let stored = h.codes.stored("bob@example.com").expect("code stored");
    assert_eq!(stored.code.len(), 6);
    assert!(stored.expires_at > Utc::now());

    let queued = h.emails.to("bob@example.com");
    assert_eq!(queued.len(), 1);
    assert!(queued[0].html.contains(&stored.code));
}

#[tokio::test]
async fn verify_code_outcomes() {
    let h = Harness::new();
    h.codes.insert(VerificationCode {
        email: "bob@example.com".into(),
        code: "123456".into(),
        expires_at: Utc::now() + Duration::minutes(5),
    });

    let (status, body) = send(
        &h,
        post_json("/codes/verify", json!({ "email": "bob@example.com", "codigo": "000000" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_code");
    assert!(h.codes.stored("bob@example.com").is_some());

    let (status, body) = send(
        &h,
        post_json("/codes/verify", json!({ "email": "bob@example.com", "codigo": "123456" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "valid": true }));
    assert!(h.codes.stored("bob@example.com").is_none(), "codes are single use");

    let (status, body) = send(
        &h,
        post_json("/codes/verify", json!({ "email": "bob@example.com", "codigo": "123456" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn expired_code_is_refused_and_dropped() {
    let h = Harness::new();
    h.codes.insert(VerificationCode {
        email: "bob@example.com".into(),
        code: "654321".into(),
        expires_at: Utc::now() - Duration::seconds(1),
    });

    let (status, body) = send(
        &h,
        post_json("/codes/verify", json!({ "email": "bob@example.com", "codigo": "654321" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "code_expired");
    assert!(h.codes.stored("bob@example.com").is_none());
}
