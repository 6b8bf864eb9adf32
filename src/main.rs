mod config;
mod core;
mod data;
mod detect;
mod events;
mod explain;
mod pipeline;
mod report;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use reqwest::Client;
use tracing::{info, warn};

use crate::config::config::AppCfg;
use crate::core::types::Run;
use crate::data::news::SampleNewsClient;
use crate::data::prices::YahooPriceClient;
use crate::explain::client::LlmExplanationClient;
use crate::pipeline::runner::{Pipeline, TickerRequest};
use crate::report::export::{
    write_correlations_json, write_events_json, write_explanations_md, write_runs_csv,
};

/// Detect directional price runs for tickers and correlate them with public
/// events, with optional historical-only explanations.
#[derive(Debug, Parser)]
#[command(name = "runlens", version)]
struct Args {
    /// Ticker symbols, e.g. PGR AAPL
    #[arg(required = true)]
    tickers: Vec<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    start: NaiveDate,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    end: NaiveDate,

    /// Symmetric correlation window around each run start, in calendar days
    #[arg(long, default_value_t = 2)]
    window_days: i64,

    /// Maximum normalized news items per ticker
    #[arg(long, default_value_t = 50)]
    max_news_items: usize,

    /// Number of top runs (by absolute percent change) to print
    #[arg(long, default_value_t = 5)]
    top_n: usize,

    /// Generate LLM explanations for the largest runs
    #[arg(long)]
    explain: bool,

    /// Requested explanations per ticker (the configured global cap still wins)
    #[arg(long, default_value_t = 3)]
    max_explained_runs: usize,

    /// Skip the news fetch entirely
    #[arg(long)]
    no_events: bool,

    /// Directory for per-ticker export artifacts
    #[arg(long, default_value = "artifacts/eval")]
    output_dir: PathBuf,

    /// Config file path
    #[arg(long, default_value = "config.yml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    let args = Args::parse();
    let cfg = AppCfg::load(&args.config)?;

    let client = Client::builder()
        .user_agent(cfg.http.user_agent.clone())
        .pool_idle_timeout(cfg.http.pool_idle_timeout)
        .pool_max_idle_per_host(cfg.http.pool_max_idle_per_host)
        .tcp_keepalive(cfg.http.tcp_keep_alive)
        .timeout(cfg.http.timeout)
        .build()
        .context("building http client")?;

    let pipeline = Pipeline::new(
        Arc::new(YahooPriceClient::new(cfg.prices.clone(), client.clone())),
        Arc::new(SampleNewsClient::new()),
        Arc::new(LlmExplanationClient::new(cfg.llm.clone(), client)),
        cfg.llm.max_explained_runs,
    );

    for ticker in &args.tickers {
        let ticker = ticker.to_uppercase();
        info!("Evaluating {} from {} to {}", ticker, args.start, args.end);

        let req = TickerRequest {
            ticker: ticker.clone(),
            start: args.start,
            end: args.end,
            window_days: args.window_days,
            max_news_items: args.max_news_items,
            fetch_events: !args.no_events,
            generate_explanations: args.explain,
            max_explained_runs: args.max_explained_runs,
        };
        let result = pipeline.run_for_ticker(&req).await;

        if let Some(err) = &result.error {
            warn!("{}", err);
            continue;
        }

        print_top_runs(&result.ticker, &result.runs, args.top_n);

        let ticker_dir = args.output_dir.join(&ticker);
        fs::create_dir_all(&ticker_dir)
            .with_context(|| format!("creating {}", ticker_dir.display()))?;
        write_runs_csv(&result.runs, &ticker_dir.join("runs.csv"))?;
        write_events_json(&result.events, &ticker_dir.join("events.json"))?;
        write_correlations_json(&result.correlations, &ticker_dir.join("correlations.json"))?;
        if !result.explanations.is_empty() {
            write_explanations_md(
                &result.explanations,
                &ticker,
                args.start,
                args.end,
                &ticker_dir.join("explanations.md"),
            )?;
        }
        if let Some(soft) = &result.explanation_error {
            warn!("{}", soft);
        }
        info!("Completed {}. Artifacts in {}", ticker, ticker_dir.display());
    }

    Ok(())
}

fn print_top_runs(ticker: &str, runs: &[Run], top_n: usize) {
    if runs.is_empty() {
        println!("No qualifying up/down runs detected for {ticker} in the provided window.");
        return;
    }

    let mut sorted: Vec<&Run> = runs.iter().collect();
    sorted.sort_by(|a, b| {
        b.pct_change
            .abs()
            .partial_cmp(&a.pct_change.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.run_id.cmp(&b.run_id))
    });
    sorted.truncate(top_n);

    println!("Top runs for {ticker}");
    println!(
        "{:<6} {:<10} {:<12} {:<12} {:>6} {:>10} {:>12}",
        "id", "direction", "start", "end", "bars", "pct", "drawdown"
    );
    for run in sorted {
        println!(
            "{:<6} {:<10} {:<12} {:<12} {:>6} {:>10.2} {:>12.2}",
            run.run_id,
            run.direction.to_string(),
            run.start.to_string(),
            run.end.to_string(),
            run.duration_bars,
            run.pct_change,
            run.max_drawdown_pct
        );
    }
}
