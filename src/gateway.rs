//! Payment gateway client.
//!
//! Posts transfer requests to the configured Stripe and Paystack
//! transfer endpoints. The ledger only observes the boolean outcome;
//! recipient onboarding and checkout flows live elsewhere.

use anyhow::{Context, Result};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::ledger::models::{Currency, WithdrawalMethod};
use crate::ledger::traits::PaymentGateway;

#[derive(Debug, Clone)]
pub struct GatewayEndpoints {
    /// Stripe transfer endpoint (USD payouts)
    pub stripe_url: String,
    pub stripe_api_key: String,
    /// Paystack transfer endpoint (NGN payouts)
    pub paystack_url: String,
    pub paystack_api_key: String,
    /// Require HTTPS for gateway communications
    pub require_https: bool,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GatewayEndpoints {
    fn default() -> Self {
        Self {
            stripe_url: "https://api.stripe.com/v1/transfers".to_string(),
            stripe_api_key: String::new(),
            paystack_url: "https://api.paystack.co/transfer".to_string(),
            paystack_api_key: String::new(),
            require_https: true,
            timeout_secs: 30,
        }
    }
}

/// HTTP client for gateway transfers with HTTPS enforcement.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    endpoints: GatewayEndpoints,
}

#[derive(Deserialize)]
struct TransferResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

impl HttpPaymentGateway {
    pub fn new(endpoints: GatewayEndpoints) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(endpoints.timeout_secs))
            .user_agent("sa-ledger/0.1");

        if endpoints.require_https {
            builder = builder.https_only(true);
            info!("HTTPS enforcement enabled for gateway transfers");
        }

        let client = builder.build().context("Failed to create gateway HTTP client")?;

        for url in [&endpoints.stripe_url, &endpoints.paystack_url] {
            let parsed = Url::parse(url).context("Invalid gateway URL")?;
            if endpoints.require_https && parsed.scheme() != "https" {
                return Err(anyhow::anyhow!(
                    "HTTPS is required but gateway URL uses {}: {}",
                    parsed.scheme(),
                    url
                ));
            }
        }

        Ok(Self { client, endpoints })
    }

    fn route(&self, method: WithdrawalMethod) -> (&str, &str) {
        match method {
            WithdrawalMethod::Stripe => (
                self.endpoints.stripe_url.as_str(),
                self.endpoints.stripe_api_key.as_str(),
            ),
            WithdrawalMethod::Paystack => (
                self.endpoints.paystack_url.as_str(),
                self.endpoints.paystack_api_key.as_str(),
            ),
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn transfer(
        &self,
        user_id: &str,
        amount: Decimal,
        currency: Currency,
        method: WithdrawalMethod,
    ) -> Result<bool, String> {
        let (url, api_key) = self.route(method);

        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&json!({
                "user_id": user_id,
                "amount": amount,
                "currency": currency,
            }))
            .send()
            .await
            .map_err(|e| format!("Gateway request failed: {}", e))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Gateway returned error status");
            return Ok(false);
        }

        let body: TransferResponse = response
            .json()
            .await
            .map_err(|e| format!("Invalid gateway response: {}", e))?;

        if !body.success {
            if let Some(message) = body.message {
                warn!(message = %message, "Gateway declined transfer");
            }
        }

        Ok(body.success)
    }
}
