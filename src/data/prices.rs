use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate};
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use crate::config::config::PriceCfg;
use crate::core::types::PriceBar;
use crate::data::client::PriceClient;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize, Default)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Daily OHLCV client backed by the Yahoo Finance v8 chart endpoint.
pub struct YahooPriceClient {
    client: Client,
    cfg: PriceCfg,
}

impl YahooPriceClient {
    pub fn new(cfg: PriceCfg, client: Client) -> Self {
        Self { client, cfg }
    }

    fn chart_url(&self, ticker: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.cfg.base_url, ticker)
    }
}

#[async_trait]
impl PriceClient for YahooPriceClient {
    async fn fetch_daily(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>> {
        anyhow::ensure!(
            start < end,
            "start ({start}) must be earlier than end ({end})"
        );

        // period2 is exclusive upstream; push it one day past `end` and filter
        // back down so the requested interval stays closed.
        let period1 = start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        let period2 = (end + Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();

        let resp = self
            .client
            .get(self.chart_url(ticker))
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await
            .context("requesting daily prices")?;

        if !resp.status().is_success() {
            anyhow::bail!("price API error for {}: {}", ticker, resp.status());
        }

        let parsed: ChartResponse = resp.json().await.context("parsing price response")?;
        if let Some(err) = parsed.chart.error {
            anyhow::bail!("price API reported an error for {}: {}", ticker, err);
        }

        let result = parsed
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .with_context(|| format!("no chart result for {ticker}"))?;

        let timestamps = result.timestamp.unwrap_or_default();
        let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let Some(date) = DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()) else {
                warn!("skipping bar with invalid timestamp {} for {}", ts, ticker);
                continue;
            };
            if date < start || date > end {
                continue;
            }
            // Bars with a missing close are half-days or bad rows; drop them.
            let Some(close) = quote.close.get(i).copied().flatten() else {
                continue;
            };
            let field = |col: &[Option<f64>]| col.get(i).copied().flatten().unwrap_or(close);
            bars.push(PriceBar {
                date,
                open: to_decimal(field(&quote.open)),
                high: to_decimal(field(&quote.high)),
                low: to_decimal(field(&quote.low)),
                close: to_decimal(close),
                volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
            });
        }

        anyhow::ensure!(
            !bars.is_empty(),
            "no price data returned for {} between {} and {}",
            ticker,
            start,
            end
        );

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

fn to_decimal(v: f64) -> Decimal {
    Decimal::from_f64(v).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_range_is_rejected_before_any_request() {
        let cfg = PriceCfg::default();
        let client = Client::new();
        let prices = YahooPriceClient::new(cfg, client);

        let start = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        let err = prices.fetch_daily("PGR", start, end).await.unwrap_err();
        assert!(err.to_string().contains("must be earlier than"));
    }

    #[test]
    fn test_chart_response_parses_nullable_rows() {
        let body = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1725235200, 1725321600],
                    "indicators": {
                        "quote": [{
                            "open": [99.5, null],
                            "high": [101.0, 103.0],
                            "low": [99.0, 100.5],
                            "close": [100.0, null],
                            "volume": [120000, null]
                        }]
                    }
                }],
                "error": null
            }
        }"#;
        let parsed: ChartResponse = serde_json::from_str(body).unwrap();
        let result = &parsed.chart.result.as_ref().unwrap()[0];
        assert_eq!(result.timestamp.as_ref().unwrap().len(), 2);
        assert_eq!(result.indicators.quote[0].close[1], None);
    }
}
