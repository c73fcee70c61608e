use {
    super::signature::data_id,
    crate::{
        AppState,
        domain::{error::PipelineError, id::PaymentId},
        services::payment_pipeline::ProcessReport,
    },
    axum::{body::Bytes, extract::State, http::HeaderMap, http::StatusCode},
};

/// How a single delivery ended. The HTTP answer is the same in every case.
#[derive(Debug)]
pub enum WebhookOutcome {
    /// Signature check failed; nothing was read or written.
    Rejected(PipelineError),
    /// Not a payment event, or no usable id.
    Ignored(&'static str),
    /// Dashboard connectivity test.
    TestEvent,
    /// The gateway does not know the payment.
    NotFound,
    Processed(ProcessReport),
    Failed(PipelineError),
}

#[tracing::instrument(
    name = "webhook",
    skip_all,
    fields(payment_id = tracing::field::Empty, event_type = tracing::field::Empty)
)]
pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let budget = state.webhook_budget;
    match tokio::time::timeout(budget, handle_delivery(&state, &headers, &body)).await {
        Ok(WebhookOutcome::Rejected(e)) => {
            tracing::warn!(error = %e, "webhook rejected");
        }
        Ok(WebhookOutcome::Ignored(reason)) => {
            tracing::info!(reason, "webhook ignored");
        }
        Ok(WebhookOutcome::TestEvent) => {
            tracing::info!("connectivity test acknowledged");
        }
        Ok(WebhookOutcome::NotFound) => {
            tracing::warn!("payment unknown to the gateway");
        }
        Ok(WebhookOutcome::Processed(report)) => {
            tracing::info!(
                status = %report.current,
                user_notice = ?report.user_notice,
                admin_status_change = report.admin_status_change,
                "webhook processed"
            );
        }
        Ok(WebhookOutcome::Failed(e)) => {
            tracing::error!(error = %e, "webhook processing failed");
        }
        Err(_) => {
            tracing::error!(budget_secs = budget.as_secs(), "webhook processing timed out");
        }
    }

    (StatusCode::OK, "OK")
}

/// Verify, fetch, merge and notify for one delivery.
pub async fn handle_delivery(state: &AppState, headers: &HeaderMap, body: &[u8]) -> WebhookOutcome {
    if let Err(e) = state.verifier.verify(headers, body) {
        return WebhookOutcome::Rejected(e);
    }

    let payload: serde_json::Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return WebhookOutcome::Failed(e.into()),
    };

    let event_type = payload
        .get("type")
        .or_else(|| payload.get("topic"))
        .and_then(|v| v.as_str())
        .unwrap_or("payment");
    tracing::Span::current().record("event_type", tracing::field::display(event_type));
    if event_type != "payment" {
        return WebhookOutcome::Ignored("not a payment event");
    }

    let Some(payment_id) = data_id(&payload).and_then(|raw| PaymentId::new(raw).ok()) else {
        return WebhookOutcome::Ignored("unusable data.id");
    };
    tracing::Span::current().record("payment_id", tracing::field::display(&payment_id));

    let live_mode = payload.get("live_mode").and_then(|v| v.as_bool());
    if payment_id.is_test_sentinel() || live_mode == Some(false) {
        return WebhookOutcome::TestEvent;
    }

    let fetched = match state.fetcher.fetch(&payment_id).await {
        Ok(fetched) => fetched,
        Err(PipelineError::NotFound(_)) => return WebhookOutcome::NotFound,
        Err(e) => return WebhookOutcome::Failed(e),
    };

    match state.pipeline.process(fetched).await {
        Ok(report) => WebhookOutcome::Processed(report),
        Err(e) => WebhookOutcome::Failed(e),
    }
}
