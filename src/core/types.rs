use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One daily OHLCV bar. Dates must be strictly ascending within a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

/// Which bar field the run detector reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceField {
    Open,
    High,
    Low,
    #[default]
    Close,
}

impl PriceField {
    pub fn of(&self, bar: &PriceBar) -> Decimal {
        match self {
            PriceField::Open => bar.open,
            PriceField::High => bar.high,
            PriceField::Low => bar.low,
            PriceField::Close => bar.close,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// A maximal streak of bars moving in one direction. Produced in one batch per
/// detector call and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: u32,
    pub direction: Direction,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub duration_bars: usize,
    pub pct_change: f64,
    pub max_drawdown_pct: f64,
}

/// A news item as delivered by a source, before any validation. The date stays
/// a raw string here; the normalizer decides whether it is usable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// A normalized public event tied to a ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub date: NaiveDate,
    pub headline: String,
    pub source: Option<String>,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub ticker: String,
}

/// An event matched to one run, with its signed distance from the run start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationEntry {
    #[serde(flatten)]
    pub event: Event,
    pub days_from_run_start: i64,
}

pub type CorrelationMap = BTreeMap<u32, Vec<CorrelationEntry>>;

/// One explained run, flattened for export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainedRun {
    pub run_id: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub direction: Direction,
    pub duration_bars: usize,
    pub pct_change: f64,
    pub max_drawdown_pct: f64,
    pub explanation: String,
}

/// Everything the pipeline produced for one ticker.
///
/// `error` is the hard failure slot: when set, every downstream field is left
/// at its empty default. `explanation_error` is the soft slot: the rest of the
/// report is complete and only explanations are missing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickerReport {
    pub ticker: String,
    pub prices: Vec<PriceBar>,
    pub runs: Vec<Run>,
    pub events: Vec<Event>,
    pub correlations: CorrelationMap,
    pub explanations: Vec<ExplainedRun>,
    pub error: Option<String>,
    pub explanation_error: Option<String>,
}

impl TickerReport {
    pub fn failed(ticker: &str, msg: String) -> Self {
        Self {
            ticker: ticker.to_string(),
            error: Some(msg),
            ..Default::default()
        }
    }
}
