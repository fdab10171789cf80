/// hawk-draft-watch: Live Draft Watch
///
/// Co dělá (jeden průchod, spouští se z cronu):
///   1. Stáhne hawk.live (přímo → proxy → proxy s renderem → headless Chrome)
///   2. Vytáhne drafty živých map (5 v 5)
///   3. Spočítá win rate + matchup skóre obou týmů
///   4. Když projdou podmínky, pošle NTFY push a uloží výsledek
///
/// Spuštění:
///   cargo run --bin hawk-watch
///   HAWK_DEBUG=1 cargo run --bin hawk-watch   # přepočítá i uložené zápasy

mod config;
mod notify;
mod pipeline;
mod store;

use anyhow::{anyhow, Context, Result};
use config::RunConfig;
use dotenv::dotenv;
use draft_model::HeroData;
use hawk_scraper::{
    extract, AcquireError, Acquirer, ExtractOptions, ExtractionFailure, FetchAttempt, DEFAULT_CANDIDATE_URLS,
};
use logger::{now_iso, DraftSkippedEvent, EventLogger, FetchDiagnosticEvent};
use notify::{Notifier, NtfyNotifier};
use pipeline::{DraftOutcome, Pipeline};
use std::env;
use std::fs::File;
use store::FileResultStore;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

const FETCH_LOG: &str = "hawk_fetch.log";

#[tokio::main]
async fn main() {
    dotenv().ok();

    let cfg = RunConfig::from_env().context("invalid configuration");
    let default_level = cfg.as_ref().map(RunConfig::log_level).unwrap_or("info");
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level))
        )
        .init();

    let result = match cfg {
        Ok(cfg) => run(cfg).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        error!("{:#}", e);
        println!("{}", serde_json::json!({ "error": format!("{e:#}") }));
        std::process::exit(1);
    }
}

async fn run(cfg: RunConfig) -> Result<()> {
    info!("=== hawk.live draft watch ===");
    info!(
        "Mode: {} | proxy forced: {} | match dir: {}",
        if cfg.verbose { "VERBOSE" } else { "normal" },
        cfg.force_proxy,
        cfg.match_dir.display()
    );

    // Single instance lock
    let lock_file_path = env::temp_dir().join("hawk_draft_watch.lock");
    let lock_file = File::create(&lock_file_path)
        .with_context(|| format!("cannot create lock file {}", lock_file_path.display()))?;
    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => guard,
        Err(_) => {
            warn!("Another hawk-watch run is in progress! Exiting.");
            return Ok(());
        }
    };

    let data = HeroData::load(&cfg.hero_data)
        .with_context(|| format!("hero data {}", cfg.hero_data.display()))?;
    info!("Roster: {} heroes, {} matchups", data.roster.len(), data.matchups.len());

    let store = FileResultStore::new(&cfg.match_dir)?;
    let diagnostics = EventLogger::new(store.dir());
    let events = EventLogger::new("logs");

    let candidates: Vec<String> = DEFAULT_CANDIDATE_URLS.iter().map(|u| u.to_string()).collect();
    let acquirer = Acquirer::from_settings(&cfg.fallback);
    let acquisition = acquirer
        .acquire(&candidates, cfg.force_proxy, cfg.source_override.as_deref())
        .await;

    let (content, attempts) = match acquisition.into_content() {
        Ok(found) => found,
        Err(AcquireError::NoContent { attempts }) => {
            let count = attempts.len();
            write_diagnostic(&diagnostics, "FETCH_FAILED", attempts, None);
            return Err(anyhow!("Failed to load hawk.live ({count} attempts)"));
        }
    };
    info!("📥 Content: {} bytes after {} attempts", content.len(), attempts.len());

    let options = ExtractOptions { skip_leagues: cfg.skip_leagues.clone() };
    let extraction = match extract(&content, &data.roster, &options) {
        Ok(extraction) => extraction,
        Err(e) => {
            write_diagnostic(&diagnostics, "PARSE_FAILED", attempts, Some(e.to_string()));
            return Err(e.into());
        }
    };

    info!(
        "🔎 {:?}: {} live drafts, {} series skipped",
        extraction.path,
        extraction.drafts.len(),
        extraction.failures.len()
    );
    for failure in &extraction.failures {
        report_skip(failure, &events, cfg.verbose);
    }

    let notifier = cfg.notify_destination().map(NtfyNotifier::new);
    if notifier.is_none() {
        debug!("No NTFY destination configured");
    }
    let pipeline = Pipeline {
        data:     &data,
        gate:     &cfg.gate,
        store:    &store,
        notifier: notifier.as_ref().map(|n| n as &dyn Notifier),
        logger:   &events,
        verbose:  cfg.verbose,
    };

    let mut notified = 0;
    for draft in &extraction.drafts {
        match pipeline.process_draft(draft).await {
            Ok(DraftOutcome::Processed { notified: true, .. }) => notified += 1,
            Ok(_) => {}
            Err(e) => warn!("Processing {} failed: {:#}", draft.match_id, e),
        }
    }

    info!("✅ Done: {} drafts, {} notifications", extraction.drafts.len(), notified);
    Ok(())
}

fn write_diagnostic(logger: &EventLogger, event: &'static str, attempts: Vec<FetchAttempt>, reason: Option<String>) {
    let ev = FetchDiagnosticEvent { ts: now_iso(), event, attempts, reason };
    if let Err(e) = logger.log_to(FETCH_LOG, &ev) {
        warn!("Cannot write {}: {}", FETCH_LOG, e);
    }
}

/// Neúplné drafty jsou vidět jen v diagnostickém režimu.
fn skip_level(failure: &ExtractionFailure, verbose: bool) -> Level {
    match failure {
        ExtractionFailure::NotLive { .. } => Level::DEBUG,
        ExtractionFailure::Excluded { .. } => Level::INFO,
        ExtractionFailure::IncompletePicks { .. } if verbose => Level::WARN,
        ExtractionFailure::IncompletePicks { .. } => Level::DEBUG,
    }
}

fn report_skip(failure: &ExtractionFailure, events: &EventLogger, verbose: bool) {
    let level = skip_level(failure, verbose);
    if level == Level::WARN {
        warn!("⚠️  {}", failure);
    } else if level == Level::INFO {
        info!("🚫 {}", failure);
    } else {
        debug!("{}", failure);
    }

    let series = match failure {
        ExtractionFailure::NotLive { series } | ExtractionFailure::Excluded { series, .. } => series,
        ExtractionFailure::IncompletePicks { series, unresolved, .. } => {
            if verbose {
                for miss in unresolved {
                    warn!("   {}", miss);
                }
            }
            series
        }
    };

    if verbose {
        let ev = DraftSkippedEvent {
            ts:     now_iso(),
            event:  "DRAFT_SKIPPED",
            series: series.clone(),
            reason: failure.to_string(),
        };
        let _ = events.log(&ev);
    }
}
