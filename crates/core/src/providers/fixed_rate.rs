use async_trait::async_trait;
use chrono::NaiveDate;

use super::traits::RateStrategy;
use crate::models::rate::{DegradedReason, RateResolution};

/// Last link of the chain: a hardcoded EUR/USD rate, always degraded.
pub struct FixedRateStrategy {
    rate: f64,
}

impl FixedRateStrategy {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

#[async_trait]
impl RateStrategy for FixedRateStrategy {
    fn name(&self) -> &str {
        "Fallback constant"
    }

    async fn current_rate(&self) -> RateResolution {
        RateResolution::Degraded {
            rate: self.rate,
            reason: DegradedReason::FallbackConstant,
        }
    }

    async fn historical_rate(&self, _date: NaiveDate) -> RateResolution {
        RateResolution::Unavailable
    }
}
