//! `pdk run`: load data, build one agent per strategy, replay the days.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use pdk_agent::Simulation;
use pdk_audit::{AuditSink, JsonlAuditSink};
use pdk_config::DataSection;
use pdk_md::{load_bars_file, load_fundamentals_file, load_news_file, MarketDataStore};
use pdk_portfolio::micros_to_f64;

use super::{load_setup, parse_date};

pub struct RunArgs {
    pub config_paths: Vec<PathBuf>,
    pub bars: Option<PathBuf>,
    pub news: Option<PathBuf>,
    pub fundamentals: Option<PathBuf>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub out: Option<PathBuf>,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let setup = load_setup(&args.config_paths)?;
    let cfg = &setup.cfg;

    let sources = DataSection {
        bars_csv: args.bars.or_else(|| cfg.data.bars_csv.clone()),
        news_jsonl: args.news.or_else(|| cfg.data.news_jsonl.clone()),
        fundamentals_json: args
            .fundamentals
            .or_else(|| cfg.data.fundamentals_json.clone()),
    };
    let data = load_market_data(&sources)?;

    let start = parse_date("start", args.start.as_deref())?.or(cfg.run.start);
    let end = parse_date("end", args.end.as_deref())?.or(cfg.run.end);

    let audit: Option<Arc<dyn AuditSink>> = if cfg.audit.enabled {
        let sink = JsonlAuditSink::open(&cfg.audit.path, cfg.audit.hash_chain)?;
        println!("audit_path={}", sink.path().display());
        println!("run_id={}", sink.run_id());
        Some(Arc::new(sink))
    } else {
        None
    };

    let mut sim = Simulation::from_config(cfg, &setup.secrets, data, audit.clone())?;
    if let Some(sink) = &audit {
        sink.record_run_started(&setup.loaded.config_hash, &sim.strategies())
            .context("write run-start audit record failed")?;
    }
    println!("config_hash={}", setup.loaded.config_hash);

    let report = sim.run_window(start, end).await?;
    println!("days={}", report.days.len());
    for (strategy, p) in &report.performance {
        println!(
            "strategy={} value={:.2} pnl={:.2} return_pct={:.2} cash={:.2} positions={} trades={}",
            strategy,
            micros_to_f64(p.current_value_micros),
            micros_to_f64(p.total_pnl_micros),
            p.total_return_pct,
            micros_to_f64(p.cash_micros),
            p.num_positions,
            p.num_trades
        );
    }

    if let Some(out) = &args.out {
        if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("create report dir failed: {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(&report).context("serialize report failed")?;
        fs::write(out, json).with_context(|| format!("write report failed: {}", out.display()))?;
        println!("report_path={}", out.display());
    }

    Ok(())
}

fn load_market_data(sources: &DataSection) -> Result<MarketDataStore> {
    let bars_path = sources
        .bars_csv
        .as_ref()
        .context("no bars CSV: pass --bars or set data.bars_csv")?;
    let mut store = MarketDataStore::new();
    let bars = load_bars_file(bars_path)
        .with_context(|| format!("load bars failed: {}", bars_path.display()))?;
    store.insert_bars(bars);

    if let Some(p) = &sources.news_jsonl {
        store.insert_news(load_news_file(p)?);
    }
    if let Some(p) = &sources.fundamentals_json {
        store.insert_fundamentals(load_fundamentals_file(p)?);
    }

    tracing::info!(
        symbols = store.symbols().len(),
        bars = store.bar_count(),
        "market data loaded"
    );
    Ok(store)
}
