use anyhow::Result;
use draft_model::{Draft, HeroData};
use draft_scorer::ScoredDraft;
use logger::{now_iso, DraftProcessedEvent, EventLogger};
use serde::Serialize;
use signal_gate::{GateConfig, GateDecision};
use tracing::{info, warn};

use crate::notify::{Alert, Notifier};
use crate::store::ResultStore;

/// Co se ukládá do `hawk.<match_id>.json`.
#[derive(Debug, Serialize)]
pub struct DraftRecord<'a> {
    pub ts:          String,
    pub title:       String,
    pub total:       String,
    pub team1_score: String,
    pub team2_score: String,
    pub draft:       &'a ScoredDraft,
    pub gate:        &'a GateDecision,
    pub notified:    bool,
    pub verbose:     bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DraftOutcome {
    /// Záznam už existuje, bez verbose se nic nedělá
    AlreadyProcessed,
    Processed { notified: bool, decision: GateDecision },
}

pub struct Pipeline<'a, S: ResultStore> {
    pub data:     &'a HeroData,
    pub gate:     &'a GateConfig,
    pub store:    &'a S,
    pub notifier: Option<&'a dyn Notifier>,
    pub logger:   &'a EventLogger,
    pub verbose:  bool,
}

impl<'a, S: ResultStore> Pipeline<'a, S> {
    /// Score, gate, notify and store one draft.
    ///
    /// Without verbose mode a match id is processed at most once: the store
    /// claim happens before anything else. Notification failures never stop
    /// the record from being written.
    pub async fn process_draft(&self, draft: &Draft) -> Result<DraftOutcome> {
        if !self.verbose && !self.store.claim(&draft.match_id)? {
            info!("⏭️  {} already processed ({})", draft.title(), draft.match_id);
            return Ok(DraftOutcome::AlreadyProcessed);
        }
        if self.verbose && self.store.exists(&draft.match_id) {
            info!("🔁 Reprocessing {} (verbose)", draft.match_id);
        }

        let scored = draft_scorer::score(draft, &self.data.roster, &self.data.matchups);
        let decision = signal_gate::evaluate(&scored, self.gate);

        info!(
            match_id = %scored.match_id,
            total = %scored.total_display(),
            met = ?decision.met,
            notify = decision.notify,
            "{}",
            scored.title()
        );

        let mut notified = false;
        if decision.notify || self.verbose {
            match self.notifier {
                Some(notifier) => {
                    let alert = Alert::for_draft(&scored, &decision, self.verbose);
                    match notifier.notify(&alert).await {
                        Ok(()) => notified = true,
                        Err(e) => warn!("Notification for {} failed: {:#}", scored.match_id, e),
                    }
                }
                None => warn!("Gate open for {} but no notify destination configured", scored.match_id),
            }
        }

        let record = DraftRecord {
            ts:          now_iso(),
            title:       scored.title(),
            total:       scored.total_display(),
            team1_score: scored.team1_score_display(),
            team2_score: scored.team2_score_display(),
            draft:       &scored,
            gate:        &decision,
            notified,
            verbose:     self.verbose,
        };
        if let Err(e) = self.store.write(&scored.match_id, &record) {
            // Prázdný claim by zápas zablokoval napořád
            if !self.verbose {
                if let Err(release) = self.store.release(&scored.match_id) {
                    warn!("Cannot release claim for {}: {:#}", scored.match_id, release);
                }
            }
            return Err(e);
        }

        let ev = DraftProcessedEvent {
            ts:       now_iso(),
            event:    "DRAFT_PROCESSED",
            match_id: scored.match_id.clone(),
            title:    scored.title(),
            total:    scored.total_display(),
            met:      decision.met.iter().map(|c| c.key().to_string()).collect(),
            notified,
            verbose:  self.verbose,
        };
        if let Err(e) = self.logger.log(&ev) {
            warn!("Event log write failed: {}", e);
        }

        Ok(DraftOutcome::Processed { notified, decision })
    }
}
