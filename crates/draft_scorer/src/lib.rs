//! Draft Scorer
//! Heuristika: součet win rate hrdinů + matchup výhody proti 5 soupeřům.
//!
//! Tabulka matchupů je `(opponent, own) -> hodnota` z pohledu soupeře, proto
//! se delta picku počítá se záporným znaménkem. Kladná delta = pick je
//! v nevýhodě.

use draft_model::{Draft, HeroRoster, MatchupTable, Pick, TeamDraft, TEAM_SIZE};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickScore {
    pub hero_id:   usize,
    pub name:      String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub win_rate:  f64,
    /// `-Σ table[(opponent, own)]` přes všech 5 soupeřů
    pub delta:     f64,
    /// `delta <= 0`
    pub favorable: bool,
}

impl PickScore {
    /// Matchup advantage shown next to the hero.
    pub fn advantage(&self) -> f64 {
        -self.delta
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamScore {
    pub name:           String,
    pub picks:          [PickScore; TEAM_SIZE],
    pub positive_count: usize,
    pub negative_count: usize,
    /// Σ win_rate − Σ delta
    pub score:          f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDraft {
    pub series_name:        String,
    pub match_id:           String,
    pub team1:              TeamScore,
    pub team2:              TeamScore,
    /// team1.score − team2.score
    pub total_delta:        f64,
    pub total_favors_team1: bool,
}

impl ScoredDraft {
    pub fn title(&self) -> String {
        format!("{} vs {} - {}", self.team1.name, self.team2.name, self.series_name)
    }

    pub fn picks(&self) -> impl Iterator<Item = &PickScore> {
        self.team1.picks.iter().chain(self.team2.picks.iter())
    }

    pub fn team1_score_display(&self) -> String {
        format_cents(self.team1.score)
    }

    /// Druhý tým se zobrazuje s prefixem "- " (jen kosmetika).
    pub fn team2_score_display(&self) -> String {
        format!("- {}", format_cents(self.team2.score))
    }

    pub fn total_display(&self) -> String {
        format_cents(self.total_delta)
    }

    /// Plain-text rendering for push notifications.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        push_team(&mut out, &self.team1, self.team1_score_display());
        out.push('\n');
        push_team(&mut out, &self.team2, self.team2_score_display());
        out.push('\n');
        let mark = if self.total_favors_team1 { "🟢" } else { "🔴" };
        out.push_str(&format!("{mark} Total {}\n", self.total_display()));
        out
    }
}

fn push_team(out: &mut String, team: &TeamScore, score: String) {
    out.push_str(&format!(
        "{} [{}+ {}-]  {}\n",
        team.name, team.positive_count, team.negative_count, score
    ));
    for pick in &team.picks {
        let mark = if pick.favorable { "🟢" } else { "🔴" };
        out.push_str(&format!(
            "  {mark} {} {} + {}\n",
            pick.name,
            format_cents(pick.win_rate),
            format_cents(pick.advantage())
        ));
    }
}

/// Round half away from zero to two decimals; never yields `-0.0`.
pub fn round_cents(value: f64) -> f64 {
    let r = (value * 100.0).round() / 100.0;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

pub fn format_cents(value: f64) -> String {
    format!("{:.2}", round_cents(value))
}

/// Score both sides of a 5 v 5 draft.
pub fn score(draft: &Draft, roster: &HeroRoster, table: &MatchupTable) -> ScoredDraft {
    let team1 = score_team(&draft.team1, &draft.team2.hero_ids(), roster, table);
    let team2 = score_team(&draft.team2, &draft.team1.hero_ids(), roster, table);
    let total_delta = team1.score - team2.score;

    debug!(
        match_id = %draft.match_id,
        team1 = format!("{:.2}", team1.score),
        team2 = format!("{:.2}", team2.score),
        "draft scored"
    );

    ScoredDraft {
        series_name: draft.series_name.clone(),
        match_id: draft.match_id.clone(),
        total_favors_team1: total_delta > 0.0,
        total_delta,
        team1,
        team2,
    }
}

/// Delta of one hero against a set of opponents.
pub fn pick_delta(own: usize, opponents: &[usize], table: &MatchupTable) -> f64 {
    -opponents.iter().map(|&opp| table.get(opp, own)).sum::<f64>()
}

fn score_team(
    team: &TeamDraft,
    opponents: &[usize; TEAM_SIZE],
    roster: &HeroRoster,
    table: &MatchupTable,
) -> TeamScore {
    let picks: [PickScore; TEAM_SIZE] =
        std::array::from_fn(|i| score_pick(&team.picks[i], opponents, roster, table));

    let positive_count = picks.iter().filter(|p| p.favorable).count();
    let score = picks.iter().map(|p| p.win_rate - p.delta).sum();

    TeamScore {
        name: team.name.clone(),
        positive_count,
        negative_count: TEAM_SIZE - positive_count,
        score,
        picks,
    }
}

fn score_pick(pick: &Pick, opponents: &[usize], roster: &HeroRoster, table: &MatchupTable) -> PickScore {
    let delta = pick_delta(pick.hero_id, opponents, table);
    PickScore {
        hero_id: pick.hero_id,
        name: roster
            .get(pick.hero_id)
            .map(|h| h.name.clone())
            .unwrap_or_else(|| pick.display_name.clone()),
        image_url: pick.image_url.clone(),
        win_rate: roster.win_rate(pick.hero_id),
        delta,
        favorable: delta <= 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> HeroRoster {
        let names = [
            "Axe", "Crystal Maiden", "Lion", "Pudge", "Zeus",
            "Doom", "Io", "Tiny", "Lina", "Sven",
        ];
        let rates = vec![0.50, 0.48, 0.50, 0.50, 0.50, 0.52, 0.47, 0.49, 0.51, 0.50];
        HeroRoster::new(names.iter().map(|s| s.to_string()).collect(), rates)
    }

    fn team(name: &str, ids: [usize; 5]) -> TeamDraft {
        let picks = ids.map(|id| Ok(Pick { hero_id: id, display_name: format!("h{id}"), image_url: None }));
        TeamDraft::from_results(name, picks).unwrap()
    }

    fn draft() -> Draft {
        Draft {
            series_name: "DreamLeague".into(),
            match_id: "42".into(),
            team1: team("Spirit", [0, 1, 2, 3, 4]),
            team2: team("Tundra", [5, 6, 7, 8, 9]),
        }
    }

    #[test]
    fn empty_table_scores_are_win_rate_sums() {
        let scored = score(&draft(), &roster(), &MatchupTable::new());

        assert_eq!(scored.team1.picks[0].name, "Axe");
        assert_eq!(scored.team1.picks[0].win_rate, 0.50);
        assert_eq!(scored.team1.picks[1].win_rate, 0.48);
        assert!((scored.team1.score - 2.48).abs() < 1e-9);
        assert!((scored.team2.score - 2.49).abs() < 1e-9);
        assert_eq!(scored.team1.positive_count, 5);
        assert_eq!(scored.team2.positive_count, 5);
        assert!(scored.picks().all(|p| p.favorable && p.delta == 0.0));
        assert!(!scored.total_favors_team1);
        assert_eq!(scored.total_display(), "-0.01");
    }

    #[test]
    fn advantage_raises_score_and_counts() {
        let mut table = MatchupTable::new();
        // Axe (0) je proti Doom (5) v plusu, Lion (2) proti Io (6) v mínusu
        table.insert(5, 0, 1.25);
        table.insert(6, 2, -0.75);
        table.insert(7, 2, -0.5);

        let scored = score(&draft(), &roster(), &table);
        let axe = &scored.team1.picks[0];
        let lion = &scored.team1.picks[2];
        assert_eq!(axe.delta, -1.25);
        assert_eq!(axe.advantage(), 1.25);
        assert!(axe.favorable);
        assert_eq!(lion.delta, 1.25);
        assert!(!lion.favorable);
        assert_eq!((scored.team1.positive_count, scored.team1.negative_count), (4, 1));

        // 2.48 + 1.25 - 1.25
        assert!((scored.team1.score - 2.48).abs() < 1e-9);
        assert_eq!(scored.team2.negative_count, 0);
    }

    #[test]
    fn all_non_positive_deltas_give_five_positive() {
        let mut table = MatchupTable::new();
        for opp in 5..10 {
            for own in 0..5 {
                table.insert(opp, own, 0.1 * (own as f64));
            }
        }
        let scored = score(&draft(), &roster(), &table);
        assert!(scored.team1.picks.iter().all(|p| p.delta <= 0.0));
        assert_eq!((scored.team1.positive_count, scored.team1.negative_count), (5, 0));
    }

    #[test]
    fn total_favors_matches_score_comparison() {
        let mut table = MatchupTable::new();
        for (opp, own, v) in [(0, 5, 3.0), (1, 6, -0.4), (9, 4, 0.2), (8, 3, -2.5)] {
            table.insert(opp, own, v);
        }
        let scored = score(&draft(), &roster(), &table);
        assert_eq!(scored.total_favors_team1, scored.team1.score > scored.team2.score);
        assert!(!scored.total_favors_team1);
        assert_eq!(scored.team2_score_display(), format!("- {}", format_cents(scored.team2.score)));
    }

    #[test]
    fn cents_formatting() {
        assert_eq!(format_cents(1.005_000_1), "1.01");
        assert_eq!(format_cents(-2.346), "-2.35");
        assert_eq!(format_cents(-0.001), "0.00");
        assert_eq!(round_cents(2.004), 2.0);
    }

    #[test]
    fn summary_lists_every_pick() {
        let scored = score(&draft(), &roster(), &MatchupTable::new());
        let text = scored.summary();
        assert!(text.starts_with("Spirit [5+ 0-]  2.48"));
        assert!(text.contains("Tundra [5+ 0-]  - 2.49"));
        assert!(text.contains("🟢 Crystal Maiden 0.48 + 0.00"));
        assert!(text.ends_with("🔴 Total -0.01\n"));
        assert_eq!(scored.title(), "Spirit vs Tundra - DreamLeague");

        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["team1"]["picks"][0]["name"], "Axe");
    }
}
