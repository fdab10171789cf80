use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::roster::ResolutionFailure;

pub const TEAM_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub hero_id: usize,
    /// Jméno tak, jak ho poslal zdroj (alt text / JSON `name`)
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// One side of a draft. Five picks are guaranteed by the type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamDraft {
    pub name: String,
    pub picks: [Pick; TEAM_SIZE],
}

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{team}: {resolved} of 5 picks resolved ({} unresolved)", .failures.len())]
pub struct IncompletePicks {
    pub team: String,
    pub resolved: usize,
    pub failures: Vec<ResolutionFailure>,
}

impl TeamDraft {
    /// Builds the team from per-pick resolution results.
    ///
    /// Any count other than exactly five resolved picks is an error; the
    /// unresolved names travel along for diagnostics.
    pub fn from_results(
        name: impl Into<String>,
        results: impl IntoIterator<Item = Result<Pick, ResolutionFailure>>,
    ) -> Result<Self, IncompletePicks> {
        let name = name.into();
        let mut picks = Vec::with_capacity(TEAM_SIZE);
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(pick) => picks.push(pick),
                Err(failure) => failures.push(failure),
            }
        }

        let resolved = picks.len();
        match <[Pick; TEAM_SIZE]>::try_from(picks) {
            Ok(picks) => Ok(Self { name, picks }),
            Err(_) => Err(IncompletePicks { team: name, resolved, failures }),
        }
    }

    pub fn hero_ids(&self) -> [usize; TEAM_SIZE] {
        std::array::from_fn(|i| self.picks[i].hero_id)
    }
}

/// 5 v 5 draft of one live, undecided map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub series_name: String,
    /// Idempotency key for the result store
    pub match_id: String,
    pub team1: TeamDraft,
    pub team2: TeamDraft,
}

impl Draft {
    pub fn title(&self) -> String {
        format!("{} vs {} - {}", self.team1.name, self.team2.name, self.series_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick(id: usize) -> Result<Pick, ResolutionFailure> {
        Ok(Pick { hero_id: id, display_name: format!("hero{id}"), image_url: None })
    }

    fn unresolved(raw: &str) -> Result<Pick, ResolutionFailure> {
        Err(ResolutionFailure { raw: raw.into(), key: raw.into(), code: None, slug: None })
    }

    #[test]
    fn five_resolved_picks_make_a_team() {
        let team = TeamDraft::from_results("Radiant", (0..5).map(pick)).unwrap();
        assert_eq!(team.hero_ids(), [0, 1, 2, 3, 4]);
    }

    #[test]
    fn unresolved_pick_discards_team() {
        let results = (0..4).map(pick).chain(std::iter::once(unresolved("ringmaster")));
        let err = TeamDraft::from_results("Dire", results).unwrap_err();
        assert_eq!(err.resolved, 4);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].raw, "ringmaster");
    }

    #[test]
    fn more_than_five_is_rejected_too() {
        assert!(TeamDraft::from_results("X", (0..6).map(pick)).is_err());
    }
}
