//! Built-in deterministic news source.
//!
//! Ships a small curated headline table per ticker so the correlation path
//! works offline and reproducibly. Real feeds plug in behind the same
//! `NewsClient` trait.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::core::types::RawEvent;
use crate::data::client::NewsClient;

pub struct SampleNewsClient;

impl SampleNewsClient {
    pub fn new() -> Self {
        Self
    }

    fn items_for(ticker: &str) -> Vec<RawEvent> {
        let table: &[(&str, &str, &str)] = match ticker {
            "PGR" => &[
                (
                    "2024-09-03",
                    "Progressive announces monthly catastrophe loss estimate",
                    "Press release",
                ),
                (
                    "2024-09-12",
                    "Analyst notes steady auto claims trends at Progressive",
                    "Analyst",
                ),
                (
                    "2024-09-24",
                    "Progressive reports Q3 premium growth figures",
                    "Newswire",
                ),
            ],
            "AAPL" => &[
                (
                    "2024-09-10",
                    "Apple unveils new iPhone lineup at fall event",
                    "Newswire",
                ),
                (
                    "2024-09-20",
                    "Early reviews highlight camera upgrades",
                    "Blog",
                ),
            ],
            "NVDA" => &[
                (
                    "2024-09-05",
                    "NVIDIA announces new data center GPU roadmap",
                    "Newswire",
                ),
                (
                    "2024-09-18",
                    "Report: Cloud providers expand NVIDIA GPU orders",
                    "Analyst",
                ),
            ],
            "SCHW" => &[
                (
                    "2024-09-09",
                    "Charles Schwab reports client asset flows for August",
                    "Press release",
                ),
                (
                    "2024-09-27",
                    "Schwab completes platform migration milestone",
                    "Newswire",
                ),
            ],
            _ => &[],
        };

        table
            .iter()
            .map(|&(date, headline, source)| RawEvent {
                date: Some(date.to_string()),
                headline: headline.to_string(),
                source: Some(source.to_string()),
                url: None,
                summary: None,
            })
            .collect()
    }
}

impl Default for SampleNewsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NewsClient for SampleNewsClient {
    async fn fetch_news(
        &self,
        ticker: &str,
        _start: NaiveDate,
        _end: NaiveDate,
        _max_items: usize,
    ) -> Result<Vec<RawEvent>> {
        // Range filtering and truncation are the normalizer's job.
        Ok(Self::items_for(&ticker.to_uppercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_ticker_returns_items_regardless_of_case() {
        let client = SampleNewsClient::new();
        let start = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();

        let upper = client.fetch_news("PGR", start, end, 100).await.unwrap();
        let lower = client.fetch_news("pgr", start, end, 100).await.unwrap();
        assert_eq!(upper.len(), 3);
        assert_eq!(upper.len(), lower.len());
    }

    #[tokio::test]
    async fn test_unknown_ticker_returns_empty_list() {
        let client = SampleNewsClient::new();
        let start = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
        let items = client.fetch_news("ZZZZ", start, end, 100).await.unwrap();
        assert!(items.is_empty());
    }
}
