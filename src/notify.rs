use anyhow::Result;
use async_trait::async_trait;
use draft_scorer::ScoredDraft;
use logger::{send_ntfy, NtfyPriority};
use signal_gate::GateDecision;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub title:    String,
    pub body:     String,
    pub priority: NtfyPriority,
}

impl Alert {
    pub fn for_draft(scored: &ScoredDraft, decision: &GateDecision, verbose: bool) -> Self {
        let mut body = scored.summary();
        if !decision.met.is_empty() {
            let met: Vec<&str> = decision.met.iter().map(|c| c.key()).collect();
            body.push_str(&format!("Met: {}\n", met.join(", ")));
        }
        let title = if verbose && !decision.notify {
            format!("[debug] {}", scored.title())
        } else {
            scored.title()
        };
        Self {
            title,
            body,
            priority: if decision.notify { NtfyPriority::High } else { NtfyPriority::Default },
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &Alert) -> Result<()>;
}

pub struct NtfyNotifier {
    client: reqwest::Client,
    url:    String,
}

impl NtfyNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, url: url.into() }
    }
}

#[async_trait]
impl Notifier for NtfyNotifier {
    async fn notify(&self, alert: &Alert) -> Result<()> {
        send_ntfy(&self.client, &self.url, &alert.title, &alert.body, alert.priority, "crossed_swords").await
    }
}
