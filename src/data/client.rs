use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::core::types::{PriceBar, RawEvent};

#[async_trait]
pub trait PriceClient: Send + Sync + 'static {
    /// Fetch daily bars for `[start, end]`, sorted ascending. Fails with a
    /// descriptive error when the range is invalid or no data comes back.
    async fn fetch_daily(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>>;
}

#[async_trait]
pub trait NewsClient: Send + Sync + 'static {
    /// Fetch raw news items for a ticker. An empty list is a legitimate result.
    async fn fetch_news(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        max_items: usize,
    ) -> Result<Vec<RawEvent>>;
}
