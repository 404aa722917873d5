use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::traits::RateStrategy;
use crate::errors::CoreError;
use crate::models::rate::RateResolution;

const PROVIDER: &str = "ExchangeRate-API";

pub const DEFAULT_BASE_URL: &str = "https://api.exchangerate-api.com/v4";

/// ExchangeRate-API provider for latest fiat rates.
///
/// - **Free**: No API key for the `/v4/latest/{base}` endpoint.
/// - **Response**: `{"base": "EUR", "rates": {"USD": 1.09, ...}}`
///
/// Only serves current rates; it is the second link of the EUR/USD chain.
pub struct ExchangeRateApiProvider {
    client: Client,
    base_url: String,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// All latest rates for `base`, keyed by target currency code.
    #[instrument(name = "ExchangeRateApiLatest", skip(self))]
    pub async fn latest_rates(&self, base: &str) -> Result<HashMap<String, f64>, CoreError> {
        let base = base.to_uppercase();
        let url = format!("{}/latest/{base}", self.base_url);
        debug!("Requesting rates from {}", url);

        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("HTTP {} for base {base}", resp.status()),
            });
        }

        let body: RatesResponse = resp.json().await.map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse response for base {base}: {e}"),
        })?;
        Ok(body.rates)
    }

    /// Single rate base → target.
    pub async fn latest_rate(&self, base: &str, target: &str) -> Result<f64, CoreError> {
        let target = target.to_uppercase();
        let rates = self.latest_rates(base).await?;
        rates.get(&target).copied().ok_or_else(|| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("No rate found for {} → {target}", base.to_uppercase()),
        })
    }
}

impl Default for ExchangeRateApiProvider {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, Duration::from_secs(10))
    }
}

#[derive(Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

#[async_trait]
impl RateStrategy for ExchangeRateApiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn current_rate(&self) -> RateResolution {
        match self.latest_rate("EUR", "USD").await {
            Ok(rate) if rate.is_finite() && rate > 0.0 => RateResolution::Resolved(rate),
            Ok(rate) => {
                warn!(rate, "Ignoring invalid EUR/USD rate from {}", PROVIDER);
                RateResolution::Unavailable
            }
            Err(e) => {
                warn!(error = %e, "EUR/USD rate unavailable from {}", PROVIDER);
                RateResolution::Unavailable
            }
        }
    }
}
