//! Credit gate: pre-check balance, run the tool, deduct only on success.
//!
//! Deduction is keyed by `operation_id` so a retried or resumed step never
//! double-charges — the ledger service is expected to treat a repeated
//! `operation_id` as a no-op. `insufficient_credits` is intentionally not
//! one of [`agenticlaw_core::KernelError::is_retryable`]'s true cases: more
//! balance will not appear by retrying the same call.

use agenticlaw_core::KernelError;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

#[derive(Clone)]
pub struct CreditClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Deserialize)]
struct BalanceResponse {
    balance: f64,
}

impl CreditClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(20)
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client build should not fail with a static config");
        Self { client, base_url: base_url.into(), token: token.into() }
    }

    pub async fn get_balance(&self, user_id: &str) -> Result<f64, KernelError> {
        let url = format!("{}/balance/{user_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(map_transport_error)?;
        if !response.status().is_success() {
            return Err(KernelError::LedgerUnavailable(format!("ledger returned {}", response.status())));
        }
        let parsed: BalanceResponse = response
            .json()
            .await
            .map_err(|e| KernelError::LedgerUnavailable(e.to_string()))?;
        Ok(parsed.balance)
    }

    pub async fn deduct(&self, user_id: &str, amount: f64, operation_id: &str) -> Result<(), KernelError> {
        let url = format!("{}/deduct", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "user_id": user_id,
                "amount": amount,
                "operation_id": operation_id,
            }))
            .send()
            .await
            .map_err(map_transport_error)?;
        if !response.status().is_success() {
            return Err(KernelError::LedgerUnavailable(format!("ledger returned {}", response.status())));
        }
        Ok(())
    }
}

fn map_transport_error(err: reqwest::Error) -> KernelError {
    if err.is_timeout() {
        KernelError::LedgerUnavailable(format!("timeout: {err}"))
    } else {
        KernelError::LedgerUnavailable(err.to_string())
    }
}

pub struct CreditGate {
    client: CreditClient,
}

impl CreditGate {
    pub fn new(client: CreditClient) -> Self { Self { client } }

    /// Pre-check `user_id`'s balance against `cost`, run `op`, and deduct
    /// only if `op` succeeds. A zero or absent cost skips the ledger
    /// round-trips entirely — most tools are free.
    pub async fn run<F, Fut, T>(
        &self,
        user_id: &str,
        cost: Option<f64>,
        operation_id: &str,
        op: F,
    ) -> Result<T, KernelError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, KernelError>>,
    {
        let cost = cost.unwrap_or(0.0);
        if cost > 0.0 {
            let balance = self.client.get_balance(user_id).await?;
            if balance < cost {
                return Err(KernelError::InsufficientCredits { required: cost, available: balance });
            }
        }

        let result = op().await;

        if result.is_ok() && cost > 0.0 {
            if let Err(err) = self.client.deduct(user_id, cost, operation_id).await {
                tracing::warn!(
                    %user_id, %operation_id, cost, %err,
                    "credit deduction failed after a successful tool run; not unwinding the result"
                );
            }
        }

        result
    }
}
