//! runs.rs
//!
//! Detection of consecutive directional price runs:
//!   - classify each bar-over-bar move as up / down / flat
//!   - group same-sign moves into maximal segments
//!   - measure each segment's magnitude and worst adverse excursion
//!
//! Flat (zero-move) bars belong to no run. They are dropped from the filtered
//! sequence before grouping, so a flat day between two up days does not split
//! the up run.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

use crate::core::types::{Direction, PriceBar, PriceField, Run};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetectError {
    #[error("need at least two bars to compute price runs, got {got}")]
    TooFewBars { got: usize },
    #[error("bars must be sorted strictly ascending by date (violation at index {position})")]
    UnsortedDates { position: usize },
}

/// Detect consecutive up/down runs over `bars`, reading `price_field`.
///
/// Run ids are assigned sequentially from 0 in discovery order. A series with
/// no nonzero moves yields an empty vec, not an error. The output depends only
/// on the input, so repeated calls are byte-identical.
pub fn detect_runs(bars: &[PriceBar], price_field: PriceField) -> Result<Vec<Run>, DetectError> {
    if bars.len() < 2 {
        return Err(DetectError::TooFewBars { got: bars.len() });
    }
    for i in 1..bars.len() {
        if bars[i].date <= bars[i - 1].date {
            return Err(DetectError::UnsortedDates { position: i });
        }
    }

    // Ternary flags for bars 1..n; the first bar has no prior move. Decimal
    // comparison gives the exact sign of the bar-over-bar return.
    let mut flagged: Vec<(usize, i8)> = Vec::with_capacity(bars.len() - 1);
    for i in 1..bars.len() {
        let prev = price_field.of(&bars[i - 1]);
        let cur = price_field.of(&bars[i]);
        let flag = if cur > prev {
            1
        } else if cur < prev {
            -1
        } else {
            0
        };
        if flag != 0 {
            flagged.push((i, flag));
        }
    }

    if flagged.is_empty() {
        return Ok(Vec::new());
    }

    let mut runs: Vec<Run> = Vec::new();
    let mut segment: Vec<usize> = vec![flagged[0].0];
    let mut segment_flag = flagged[0].1;

    for &(idx, flag) in &flagged[1..] {
        if flag == segment_flag {
            segment.push(idx);
        } else {
            runs.push(build_run(runs.len() as u32, bars, &segment, segment_flag, price_field));
            segment = vec![idx];
            segment_flag = flag;
        }
    }
    runs.push(build_run(runs.len() as u32, bars, &segment, segment_flag, price_field));

    Ok(runs)
}

fn build_run(
    run_id: u32,
    bars: &[PriceBar],
    member_indices: &[usize],
    flag: i8,
    price_field: PriceField,
) -> Run {
    let direction = if flag > 0 { Direction::Up } else { Direction::Down };
    let first = member_indices[0];
    let last = member_indices[member_indices.len() - 1];

    let prices: Vec<f64> = member_indices
        .iter()
        .map(|&i| price_field.of(&bars[i]).to_f64().unwrap_or(0.0))
        .collect();

    let start_price = prices[0];
    let end_price = prices[prices.len() - 1];
    let pct_change = if start_price != 0.0 {
        (end_price / start_price - 1.0) * 100.0
    } else {
        0.0
    };

    Run {
        run_id,
        direction,
        start: member_date(bars, first),
        end: member_date(bars, last),
        duration_bars: member_indices.len(),
        pct_change,
        max_drawdown_pct: max_adverse_move(&prices, direction),
    }
}

fn member_date(bars: &[PriceBar], idx: usize) -> NaiveDate {
    bars[idx].date
}

/// Worst move against the run direction, relative to the run's own best point
/// so far, in percent. Negative for up-run pullbacks, positive for down-run
/// bounces.
fn max_adverse_move(prices: &[f64], direction: Direction) -> f64 {
    match direction {
        Direction::Up => {
            let mut running_max = f64::MIN;
            let mut worst: f64 = 0.0;
            for &p in prices {
                running_max = running_max.max(p);
                worst = worst.min(p / running_max - 1.0);
            }
            worst * 100.0
        }
        Direction::Down => {
            let mut running_min = f64::MAX;
            let mut worst: f64 = 0.0;
            for &p in prices {
                running_min = running_min.min(p);
                worst = worst.max(p / running_min - 1.0);
            }
            worst * 100.0
        }
    }
}
