use {
    crate::domain::error::PipelineError,
    crate::domain::id::PaymentId,
    crate::domain::provider::{FetchedPayment, PaymentTransport},
    std::{sync::Arc, time::Duration},
};

/// Pause before the second client lookup; the search index lags the
/// payment API by about a second.
pub const CLIENT_RETRY_DELAY: Duration = Duration::from_secs(1);

pub const DEFAULT_FETCH_BUDGET: Duration = Duration::from_secs(10);

/// When an attempt is allowed to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunWhen {
    /// After any earlier failure or empty answer.
    Always,
    /// Only if the attempt right before it answered with no data.
    AfterEmpty,
}

struct FetchAttempt {
    transport: Arc<dyn PaymentTransport>,
    delay: Duration,
    when: RunWhen,
    /// A positive "not found" from this transport ends the sequence.
    not_found_is_final: bool,
}

enum Miss {
    Empty,
    Failed(PipelineError),
}

/// Ordered list of lookup strategies sharing one timeout budget.
pub struct PaymentFetcher {
    attempts: Vec<FetchAttempt>,
    budget: Duration,
}

impl PaymentFetcher {
    pub fn new(budget: Duration) -> Self {
        Self {
            attempts: Vec::new(),
            budget,
        }
    }

    /// Primary transport: tried first, its "not found" is trusted.
    pub fn primary(mut self, transport: Arc<dyn PaymentTransport>) -> Self {
        self.attempts.push(FetchAttempt {
            transport,
            delay: Duration::ZERO,
            when: RunWhen::Always,
            not_found_is_final: true,
        });
        self
    }

    pub fn fallback(
        mut self,
        transport: Arc<dyn PaymentTransport>,
        delay: Duration,
        when: RunWhen,
    ) -> Self {
        self.attempts.push(FetchAttempt {
            transport,
            delay,
            when,
            not_found_is_final: false,
        });
        self
    }

    /// REST lookup, then the client lookup, then the client once more after
    /// `CLIENT_RETRY_DELAY` if it came back empty.
    pub fn mercado_pago(
        rest: Arc<dyn PaymentTransport>,
        client: Arc<dyn PaymentTransport>,
        budget: Duration,
    ) -> Self {
        Self::new(budget)
            .primary(rest)
            .fallback(client.clone(), Duration::ZERO, RunWhen::Always)
            .fallback(client, CLIENT_RETRY_DELAY, RunWhen::AfterEmpty)
    }

    pub async fn fetch(&self, id: &PaymentId) -> Result<FetchedPayment, PipelineError> {
        tokio::time::timeout(self.budget, self.run(id))
            .await
            .map_err(|_| PipelineError::Timeout(self.budget))?
    }

    async fn run(&self, id: &PaymentId) -> Result<FetchedPayment, PipelineError> {
        let mut last: Option<Miss> = None;

        for (attempt, step) in self.attempts.iter().enumerate() {
            if step.when == RunWhen::AfterEmpty && !matches!(last, Some(Miss::Empty)) {
                continue;
            }
            if !step.delay.is_zero() {
                tracing::debug!(
                    payment_id = %id,
                    transport = step.transport.name(),
                    delay_ms = step.delay.as_millis() as u64,
                    "waiting before retry"
                );
                tokio::time::sleep(step.delay).await;
            }

            match step.transport.fetch(id).await {
                Ok(Some(found)) => {
                    if attempt > 0 {
                        tracing::info!(
                            payment_id = %id,
                            transport = step.transport.name(),
                            attempt,
                            "payment fetched via fallback"
                        );
                    }
                    return Ok(found);
                }
                Ok(None) => {
                    tracing::warn!(
                        payment_id = %id,
                        transport = step.transport.name(),
                        attempt,
                        "transport returned no data"
                    );
                    last = Some(Miss::Empty);
                }
                Err(PipelineError::NotFound(msg)) if step.not_found_is_final => {
                    return Err(PipelineError::NotFound(msg));
                }
                Err(e) => {
                    tracing::warn!(
                        payment_id = %id,
                        transport = step.transport.name(),
                        attempt,
                        error = %e,
                        "payment fetch failed"
                    );
                    last = Some(Miss::Failed(e));
                }
            }
        }

        Err(match last {
            Some(Miss::Failed(e)) => e,
            Some(Miss::Empty) => {
                PipelineError::Provider(format!("no data for payment {id} from any transport"))
            }
            None => PipelineError::Provider("no fetch transports configured".into()),
        })
    }
}
