//! Matches normalized events to detected runs within a symmetric calendar-day
//! window around each run's start date.

use chrono::Duration;

use crate::core::types::{CorrelationEntry, CorrelationMap, Event, Run};

/// Associate events with runs whose window `[start - window_days, start + window_days]`
/// (closed on both ends) contains the event date.
///
/// The mapping is total: every input `run_id` appears as a key, with an empty
/// vec when nothing matched. An event may be attached to any number of runs;
/// adjacent windows are allowed to overlap. Within one run, entries are sorted
/// by `(|days_from_run_start|, date, headline)` so output is reproducible.
pub fn correlate_runs_with_events(
    runs: &[Run],
    events: &[Event],
    window_days: i64,
) -> CorrelationMap {
    let mut correlations = CorrelationMap::new();

    for run in runs {
        let window_start = run.start - Duration::days(window_days);
        let window_end = run.start + Duration::days(window_days);

        let mut matched: Vec<CorrelationEntry> = events
            .iter()
            .filter(|e| window_start <= e.date && e.date <= window_end)
            .map(|e| CorrelationEntry {
                event: e.clone(),
                days_from_run_start: (e.date - run.start).num_days(),
            })
            .collect();

        matched.sort_by(|a, b| {
            a.days_from_run_start
                .abs()
                .cmp(&b.days_from_run_start.abs())
                .then_with(|| a.event.date.cmp(&b.event.date))
                .then_with(|| a.event.headline.cmp(&b.event.headline))
        });

        correlations.insert(run.run_id, matched);
    }

    correlations
}
