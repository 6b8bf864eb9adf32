//! Flat-file exports of the pipeline output: runs as CSV, events and
//! correlations as JSON (ISO-8601 dates), explanations as markdown.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::core::types::{CorrelationMap, Event, ExplainedRun, Run};

pub fn write_runs_csv(runs: &[Run], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for run in runs {
        writer.serialize(run).context("writing run row")?;
    }
    writer.flush().context("flushing runs csv")?;
    Ok(())
}

pub fn write_events_json(events: &[Event], path: &Path) -> Result<()> {
    let body = serde_json::to_string_pretty(events).context("serializing events")?;
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn write_correlations_json(correlations: &CorrelationMap, path: &Path) -> Result<()> {
    let body = serde_json::to_string_pretty(correlations).context("serializing correlations")?;
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn write_explanations_md(
    explanations: &[ExplainedRun],
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
    path: &Path,
) -> Result<()> {
    let mut body = format!("# Historical run explanations: {ticker} ({start} to {end})\n");
    for item in explanations {
        body.push_str(&format!(
            "\n## Run {} ({} {} to {}, {:.2}%)\n\n{}\n",
            item.run_id,
            item.direction,
            item.start,
            item.end,
            item.pct_change,
            if item.explanation.is_empty() {
                "(No explanation returned)"
            } else {
                &item.explanation
            }
        ));
    }
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CorrelationEntry, Direction};
    use std::collections::BTreeMap;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, d).unwrap()
    }

    fn sample_run() -> Run {
        Run {
            run_id: 0,
            direction: Direction::Up,
            start: day(2),
            end: day(4),
            duration_bars: 2,
            pct_change: 1.5,
            max_drawdown_pct: 0.0,
        }
    }

    fn sample_event() -> Event {
        Event {
            date: day(3),
            headline: "Sample headline".to_string(),
            source: Some("Newswire".to_string()),
            url: None,
            summary: None,
            ticker: "PGR".to_string(),
        }
    }

    #[test]
    fn test_runs_csv_has_header_and_iso_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.csv");
        write_runs_csv(&[sample_run()], &path).unwrap();

        let body = fs::read_to_string(&path).unwrap();
        let mut lines = body.lines();
        assert_eq!(
            lines.next().unwrap(),
            "run_id,direction,start,end,duration_bars,pct_change,max_drawdown_pct"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("0,up,2024-09-02,2024-09-04,2,1.5,"));
    }

    #[test]
    fn test_correlations_json_round_trips_with_string_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("correlations.json");

        let mut map: CorrelationMap = BTreeMap::new();
        map.insert(
            0,
            vec![CorrelationEntry {
                event: sample_event(),
                days_from_run_start: 1,
            }],
        );
        map.insert(1, vec![]);
        write_correlations_json(&map, &path).unwrap();

        let body = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["0"][0]["date"], "2024-09-03");
        assert_eq!(parsed["0"][0]["days_from_run_start"], 1);
        assert!(parsed["1"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_explanations_md_renders_placeholder_for_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("explanations.md");
        let explained = vec![ExplainedRun {
            run_id: 0,
            start: day(2),
            end: day(4),
            direction: Direction::Up,
            duration_bars: 2,
            pct_change: 1.5,
            max_drawdown_pct: 0.0,
            explanation: String::new(),
        }];
        write_explanations_md(&explained, "PGR", day(1), day(30), &path).unwrap();

        let body = fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("# Historical run explanations: PGR"));
        assert!(body.contains("(No explanation returned)"));
    }
}
