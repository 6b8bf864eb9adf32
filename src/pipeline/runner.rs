//! Sequences the per-ticker pipeline: prices -> run detection -> news ->
//! correlation -> optional explanations.
//!
//! Failure policy: anything up to and including correlation input is a hard
//! error (the report carries only the message), while explanation failures are
//! soft (the report is complete except for the explanation fields).

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::core::types::{ExplainedRun, PriceField, Run, TickerReport};
use crate::data::client::{NewsClient, PriceClient};
use crate::detect::runs::detect_runs;
use crate::events::correlate::correlate_runs_with_events;
use crate::events::normalize::normalize_events;
use crate::explain::client::ExplanationClient;
use crate::explain::prompt::build_run_explanation_prompt;

#[derive(Debug, Clone)]
pub struct TickerRequest {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub window_days: i64,
    pub max_news_items: usize,
    pub fetch_events: bool,
    pub generate_explanations: bool,
    pub max_explained_runs: usize,
}

pub struct Pipeline {
    prices: Arc<dyn PriceClient>,
    news: Arc<dyn NewsClient>,
    explainer: Arc<dyn ExplanationClient>,
    /// Global cap on explained runs per ticker; dominates any requested count.
    explained_runs_cap: usize,
}

impl Pipeline {
    pub fn new(
        prices: Arc<dyn PriceClient>,
        news: Arc<dyn NewsClient>,
        explainer: Arc<dyn ExplanationClient>,
        explained_runs_cap: usize,
    ) -> Self {
        Self {
            prices,
            news,
            explainer,
            explained_runs_cap,
        }
    }

    pub async fn run_for_ticker(&self, req: &TickerRequest) -> TickerReport {
        let ticker = req.ticker.to_uppercase();
        let mut report = TickerReport {
            ticker: ticker.clone(),
            ..Default::default()
        };

        match self.prices.fetch_daily(&ticker, req.start, req.end).await {
            Ok(bars) => report.prices = bars,
            Err(e) => {
                return TickerReport::failed(&ticker, format!("Failed to fetch prices for {ticker}: {e:#}"));
            }
        }

        match detect_runs(&report.prices, PriceField::Close) {
            Ok(runs) => report.runs = runs,
            Err(e) => {
                return TickerReport::failed(&ticker, format!("Failed to detect runs for {ticker}: {e}"));
            }
        }

        if req.fetch_events {
            match self
                .news
                .fetch_news(&ticker, req.start, req.end, req.max_news_items)
                .await
            {
                Ok(raw) => {
                    report.events =
                        normalize_events(&raw, req.start, req.end, req.max_news_items, &ticker);
                }
                Err(e) => {
                    return TickerReport::failed(
                        &ticker,
                        format!("Failed to fetch events for {ticker}: {e:#}"),
                    );
                }
            }
        }

        report.correlations =
            correlate_runs_with_events(&report.runs, &report.events, req.window_days);

        if req.generate_explanations && !report.runs.is_empty() {
            match self
                .explain_selected_runs(&report, req.max_explained_runs)
                .await
            {
                Ok(explanations) => report.explanations = explanations,
                Err(msg) => report.explanation_error = Some(msg),
            }
        }

        report
    }

    /// Explain the largest runs by absolute percent change, up to
    /// `min(requested, cap)`. A quota error aborts the batch and becomes the
    /// soft error; any other per-run failure degrades to empty text.
    async fn explain_selected_runs(
        &self,
        report: &TickerReport,
        requested: usize,
    ) -> Result<Vec<ExplainedRun>, String> {
        let selected = select_runs_for_explanation(
            &report.runs,
            requested.min(self.explained_runs_cap),
        );

        let mut explanations = Vec::with_capacity(selected.len());
        for run in selected {
            let empty = Vec::new();
            let events = report.correlations.get(&run.run_id).unwrap_or(&empty);
            let prompt = build_run_explanation_prompt(run, events);

            let text = match self.explainer.generate(&prompt).await {
                Ok(text) => text,
                Err(e) if e.is_quota() => return Err(e.to_string()),
                Err(e) => {
                    warn!(
                        "explanation skipped for {} run_id={}: {}",
                        report.ticker, run.run_id, e
                    );
                    String::new()
                }
            };

            info!(
                "explained {} run_id={} ({} chars)",
                report.ticker,
                run.run_id,
                text.len()
            );
            explanations.push(ExplainedRun {
                run_id: run.run_id,
                start: run.start,
                end: run.end,
                direction: run.direction,
                duration_bars: run.duration_bars,
                pct_change: run.pct_change,
                max_drawdown_pct: run.max_drawdown_pct,
                explanation: text,
            });
        }
        Ok(explanations)
    }
}

/// Largest absolute percent change first, run_id breaking exact ties so
/// selection stays deterministic.
fn select_runs_for_explanation(runs: &[Run], limit: usize) -> Vec<&Run> {
    let mut sorted: Vec<&Run> = runs.iter().collect();
    sorted.sort_by(|a, b| {
        b.pct_change
            .abs()
            .partial_cmp(&a.pct_change.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.run_id.cmp(&b.run_id))
    });
    sorted.truncate(limit);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{PriceBar, RawEvent};
    use crate::explain::client::ExplainError;
    use anyhow::Result;
    use async_trait::async_trait;
    use rust_decimal::prelude::FromPrimitive;
    use rust_decimal::Decimal;

    struct StubPriceClient {
        closes: Vec<f64>,
    }

    #[async_trait]
    impl crate::data::client::PriceClient for StubPriceClient {
        async fn fetch_daily(
            &self,
            _ticker: &str,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<PriceBar>> {
            Ok(self
                .closes
                .iter()
                .enumerate()
                .map(|(i, &c)| {
                    let d = Decimal::from_f64(c).unwrap();
                    PriceBar {
                        date: start + chrono::Duration::days(i as i64),
                        open: d,
                        high: d,
                        low: d,
                        close: d,
                        volume: 0,
                    }
                })
                .collect())
        }
    }

    struct FailingPriceClient;

    #[async_trait]
    impl crate::data::client::PriceClient for FailingPriceClient {
        async fn fetch_daily(
            &self,
            ticker: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<PriceBar>> {
            anyhow::bail!("no price data returned for {ticker}")
        }
    }

    struct StubNewsClient {
        items: Vec<RawEvent>,
    }

    #[async_trait]
    impl crate::data::client::NewsClient for StubNewsClient {
        async fn fetch_news(
            &self,
            _ticker: &str,
            _start: NaiveDate,
            _end: NaiveDate,
            _max_items: usize,
        ) -> Result<Vec<RawEvent>> {
            Ok(self.items.clone())
        }
    }

    struct StubExplainer;

    #[async_trait]
    impl ExplanationClient for StubExplainer {
        async fn generate(&self, _prompt: &str) -> Result<String, ExplainError> {
            Ok("Historically, the stock moved.".to_string())
        }
    }

    struct QuotaExplainer;

    #[async_trait]
    impl ExplanationClient for QuotaExplainer {
        async fn generate(&self, _prompt: &str) -> Result<String, ExplainError> {
            Err(ExplainError::QuotaExceeded("429 too many requests".to_string()))
        }
    }

    fn request(explain: bool, max_explained: usize) -> TickerRequest {
        TickerRequest {
            ticker: "pgr".to_string(),
            start: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
            window_days: 2,
            max_news_items: 50,
            fetch_events: true,
            generate_explanations: explain,
            max_explained_runs: max_explained,
        }
    }

    fn pipeline_with(
        prices: Arc<dyn crate::data::client::PriceClient>,
        explainer: Arc<dyn ExplanationClient>,
        cap: usize,
    ) -> Pipeline {
        let news = Arc::new(StubNewsClient {
            items: vec![RawEvent {
                date: Some("2024-09-02".to_string()),
                headline: "Sample headline".to_string(),
                ..Default::default()
            }],
        });
        Pipeline::new(prices, news, explainer, cap)
    }

    #[tokio::test]
    async fn test_happy_path_fills_all_fields() {
        let prices = Arc::new(StubPriceClient {
            closes: vec![100.0, 102.0, 101.0, 105.0],
        });
        let pipeline = pipeline_with(prices, Arc::new(StubExplainer), 2);

        let report = pipeline.run_for_ticker(&request(true, 3)).await;
        assert!(report.error.is_none());
        assert!(report.explanation_error.is_none());
        assert_eq!(report.ticker, "PGR");
        assert_eq!(report.prices.len(), 4);
        assert_eq!(report.runs.len(), 3);
        assert_eq!(report.correlations.len(), report.runs.len());
        // Requested 3 but the global cap of 2 dominates.
        assert_eq!(report.explanations.len(), 2);
        assert!(report.explanations.iter().all(|e| !e.explanation.is_empty()));
    }

    #[tokio::test]
    async fn test_hard_error_leaves_downstream_fields_empty() {
        let pipeline = pipeline_with(Arc::new(FailingPriceClient), Arc::new(StubExplainer), 2);

        let report = pipeline.run_for_ticker(&request(true, 3)).await;
        let err = report.error.expect("hard error expected");
        assert!(err.contains("Failed to fetch prices for PGR"));
        assert!(report.prices.is_empty());
        assert!(report.runs.is_empty());
        assert!(report.correlations.is_empty());
        assert!(report.explanations.is_empty());
    }

    #[tokio::test]
    async fn test_detection_failure_is_a_hard_error() {
        let prices = Arc::new(StubPriceClient { closes: vec![100.0] });
        let pipeline = pipeline_with(prices, Arc::new(StubExplainer), 2);

        let report = pipeline.run_for_ticker(&request(false, 0)).await;
        let err = report.error.expect("hard error expected");
        assert!(err.contains("Failed to detect runs for PGR"));
        assert!(report.runs.is_empty());
    }

    #[tokio::test]
    async fn test_quota_failure_is_soft_and_preserves_results() {
        let prices = Arc::new(StubPriceClient {
            closes: vec![100.0, 102.0, 101.0],
        });
        let pipeline = pipeline_with(prices, Arc::new(QuotaExplainer), 2);

        let report = pipeline.run_for_ticker(&request(true, 2)).await;
        assert!(report.error.is_none());
        let soft = report.explanation_error.expect("soft error expected");
        assert!(soft.contains("quota"));
        assert_eq!(report.runs.len(), 2);
        assert_eq!(report.correlations.len(), 2);
        assert!(report.explanations.is_empty());
    }

    #[tokio::test]
    async fn test_events_can_be_skipped() {
        let prices = Arc::new(StubPriceClient {
            closes: vec![100.0, 102.0],
        });
        let pipeline = pipeline_with(prices, Arc::new(StubExplainer), 2);

        let mut req = request(false, 0);
        req.fetch_events = false;
        let report = pipeline.run_for_ticker(&req).await;
        assert!(report.error.is_none());
        assert!(report.events.is_empty());
        // Total mapping still holds with no events.
        assert_eq!(report.correlations.len(), report.runs.len());
    }

    #[test]
    fn test_selection_orders_by_abs_pct_change() {
        let mk = |run_id: u32, pct: f64| Run {
            run_id,
            direction: crate::core::types::Direction::Up,
            start: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
            duration_bars: 1,
            pct_change: pct,
            max_drawdown_pct: 0.0,
        };
        let runs = vec![mk(0, 1.0), mk(1, -5.0), mk(2, 3.0), mk(3, -5.0)];
        let selected = select_runs_for_explanation(&runs, 3);
        let ids: Vec<u32> = selected.iter().map(|r| r.run_id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }
}
