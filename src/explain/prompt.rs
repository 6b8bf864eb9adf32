use crate::core::types::{CorrelationEntry, Run};

/// Build a historical-only prompt describing one run and its correlated
/// events. The framing deliberately forbids forward-looking language.
pub fn build_run_explanation_prompt(run: &Run, events: &[CorrelationEntry]) -> String {
    let run_section = format!(
        "Run direction: {}\n\
         Start date: {}\n\
         End date: {}\n\
         Duration (bars): {}\n\
         Percent change: {:.4}%\n\
         Max adverse move: {:.4}%\n",
        run.direction, run.start, run.end, run.duration_bars, run.pct_change, run.max_drawdown_pct
    );

    let events_section = if events.is_empty() {
        "- No public events were linked to this run.".to_string()
    } else {
        events
            .iter()
            .map(|entry| match &entry.event.url {
                Some(url) => format!("- {}: {} ({})", entry.event.date, entry.event.headline, url),
                None => format!("- {}: {}", entry.event.date, entry.event.headline),
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let instructions = "You are a neutral financial historian. Summarize the historical run in 2-3 sentences.\n\
        Mention public events only as possible context, not guaranteed causes.\n\
        Do not provide predictions, outlook statements, or buy/sell/hold language.\n\
        Use phrases like 'during this period', 'historically', or 'the stock experienced...'.";

    format!(
        "Summarize the following historical price run:\n\n\
         {instructions}\n\n\
         Run details:\n{run_section}\n\
         Relevant public events:\n{events_section}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Direction, Event};
    use chrono::NaiveDate;

    fn sample_run() -> Run {
        Run {
            run_id: 0,
            direction: Direction::Up,
            start: NaiveDate::from_ymd_opt(2024, 9, 10).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 9, 13).unwrap(),
            duration_bars: 3,
            pct_change: 4.25,
            max_drawdown_pct: 0.0,
        }
    }

    fn entry(headline: &str, url: Option<&str>) -> CorrelationEntry {
        CorrelationEntry {
            event: Event {
                date: NaiveDate::from_ymd_opt(2024, 9, 11).unwrap(),
                headline: headline.to_string(),
                source: None,
                url: url.map(str::to_string),
                summary: None,
                ticker: "PGR".to_string(),
            },
            days_from_run_start: 1,
        }
    }

    #[test]
    fn test_prompt_contains_run_fields_and_guardrails() {
        let prompt = build_run_explanation_prompt(&sample_run(), &[]);
        assert!(prompt.contains("Run direction: up"));
        assert!(prompt.contains("Start date: 2024-09-10"));
        assert!(prompt.contains("Duration (bars): 3"));
        assert!(prompt.contains("neutral financial historian"));
        assert!(prompt.contains("Do not provide predictions"));
    }

    #[test]
    fn test_empty_events_get_placeholder_line() {
        let prompt = build_run_explanation_prompt(&sample_run(), &[]);
        assert!(prompt.contains("No public events were linked to this run."));
    }

    #[test]
    fn test_event_urls_rendered_in_parentheses() {
        let events = vec![
            entry("With url", Some("https://example.com/a")),
            entry("Without url", None),
        ];
        let prompt = build_run_explanation_prompt(&sample_run(), &events);
        assert!(prompt.contains("With url (https://example.com/a)"));
        assert!(prompt.contains("- 2024-09-11: Without url\n") || prompt.ends_with("Without url\n"));
    }
}
