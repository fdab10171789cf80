//! hawk-draft-watch: Logger
//! JSONL event stream (denní soubor + pojmenované diagnostické logy), NTFY push

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    /// Denní stream `<YYYY-MM-DD>.jsonl`
    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date = Utc::now().format("%Y-%m-%d").to_string();
        self.log_to(&format!("{date}.jsonl"), event)
    }

    /// Append one JSON line to a named file inside the log dir.
    pub fn log_to<T: Serialize>(&self, file_name: &str, event: &T) -> Result<()> {
        let path  = self.log_dir.join(file_name);
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("cannot open {}", path.display()))?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event typy ────────────────────────────────────────────────────────────────

/// Zapisuje se jen když se stránku nepodařilo získat nebo zparsovat.
#[derive(Serialize, Debug)]
pub struct FetchDiagnosticEvent<A: Serialize> {
    pub ts:       String,
    pub event:    &'static str,   // "FETCH_FAILED" | "PARSE_FAILED"
    pub attempts: Vec<A>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason:   Option<String>,
}

#[derive(Serialize, Debug)]
pub struct DraftSkippedEvent {
    pub ts:     String,
    pub event:  &'static str,     // "DRAFT_SKIPPED"
    pub series: String,
    pub reason: String,
}

#[derive(Serialize, Debug)]
pub struct DraftProcessedEvent {
    pub ts:       String,
    pub event:    &'static str,   // "DRAFT_PROCESSED"
    pub match_id: String,
    pub title:    String,
    pub total:    String,         // dvě desetinná místa, jak se zobrazuje
    pub met:      Vec<String>,
    pub notified: bool,
    pub verbose:  bool,
}

#[derive(Serialize, Debug)]
pub struct RangeDayEvent {
    pub ts:       String,
    pub event:    &'static str,   // "RANGE_DAY"
    pub date:     String,
    pub series:   usize,
    pub rows:     usize,
    pub excluded: usize,
}

// ── NTFY ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NtfyPriority {
    Default,
    High,
}

impl NtfyPriority {
    fn header(self) -> &'static str {
        match self {
            NtfyPriority::Default => "default",
            NtfyPriority::High    => "high",
        }
    }
}

/// Pošli push na ntfy topic URL. Chybu vrací volajícímu.
pub async fn send_ntfy(
    client:   &reqwest::Client,
    url:      &str,
    title:    &str,
    body:     &str,
    priority: NtfyPriority,
    tags:     &str,
) -> Result<()> {
    let resp = client
        .post(url)
        .header("Title", title)
        .header("Priority", priority.header())
        .header("Tags", tags)
        .body(body.to_string())
        .send()
        .await
        .with_context(|| format!("NTFY request to {url} failed"))?;

    resp.error_for_status()
        .with_context(|| format!("NTFY {url} rejected the message"))?;
    tracing::info!("NTFY sent: {}", title);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("hawk_logger_{tag}_{}", std::process::id()))
    }

    #[test]
    fn log_to_appends_json_lines() {
        let dir = temp_dir("append");
        let _ = fs::remove_dir_all(&dir);
        let logger = EventLogger::new(&dir);

        for reason in ["first", "second"] {
            let ev = FetchDiagnosticEvent::<String> {
                ts:       now_iso(),
                event:    "FETCH_FAILED",
                attempts: vec!["direct".into()],
                reason:   Some(reason.into()),
            };
            logger.log_to("hawk_fetch.log", &ev).unwrap();
        }

        let text = fs::read_to_string(dir.join("hawk_fetch.log")).unwrap();
        let lines: Vec<serde_json::Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["reason"], "second");
        assert_eq!(lines[0]["attempts"][0], "direct");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn daily_log_is_named_by_date() {
        let dir = temp_dir("daily");
        let logger = EventLogger::new(&dir);
        let ev = DraftSkippedEvent {
            ts:     now_iso(),
            event:  "DRAFT_SKIPPED",
            series: "DreamLeague".into(),
            reason: "no live map".into(),
        };
        logger.log(&ev).unwrap();
        let date = Utc::now().format("%Y-%m-%d").to_string();
        assert!(dir.join(format!("{date}.jsonl")).exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
