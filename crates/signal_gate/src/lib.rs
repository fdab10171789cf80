//! Signal Gate
//! Rozhoduje, jestli ohodnocený draft stojí za notifikaci.
//!
//! Čtyři nezávislé podmínky; prázdný seznam u podmínky = podmínka splněna.
//! Do výsledku se počítají jen zapnuté podmínky (žádná zapnutá = všechny),
//! kombinované přes `all` / `any`.

use std::fmt;
use std::str::FromStr;

use draft_model::SignedValue;
use draft_scorer::{round_cents, ScoredDraft};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum GateConfigError {
    #[error("unknown notification condition {0:?} (expected delta, pattern, hero, anti_hero)")]
    UnknownCondition(String),

    #[error("unknown condition mode {0:?} (expected all or any)")]
    UnknownMode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Delta,
    Pattern,
    HeroPresence,
    AntiHeroThreshold,
}

impl Condition {
    pub const ALL: [Condition; 4] = [
        Condition::Delta,
        Condition::Pattern,
        Condition::HeroPresence,
        Condition::AntiHeroThreshold,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Condition::Delta => "delta",
            Condition::Pattern => "pattern",
            Condition::HeroPresence => "hero",
            Condition::AntiHeroThreshold => "anti_hero",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Condition {
    type Err = GateConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delta" => Ok(Condition::Delta),
            "pattern" | "pns" => Ok(Condition::Pattern),
            "hero" | "hh" => Ok(Condition::HeroPresence),
            "anti_hero" | "anh" => Ok(Condition::AntiHeroThreshold),
            other => Err(GateConfigError::UnknownCondition(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionMode {
    #[default]
    All,
    Any,
}

impl FromStr for ConditionMode {
    type Err = GateConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(ConditionMode::All),
            "any" => Ok(ConditionMode::Any),
            other => Err(GateConfigError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateConfig {
    pub delta_below:   f64,
    pub delta_above:   f64,
    /// Tokeny typu `3+2-`
    pub team_patterns: Vec<String>,
    pub watch_heroes:  Vec<usize>,
    pub anti_hero:     Vec<SignedValue>,
    /// Prázdné = všechny čtyři
    pub enabled:       Vec<Condition>,
    pub mode:          ConditionMode,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            delta_below:   -2.0,
            delta_above:   2.0,
            team_patterns: Vec::new(),
            watch_heroes:  Vec::new(),
            anti_hero:     Vec::new(),
            enabled:       Vec::new(),
            mode:          ConditionMode::All,
        }
    }
}

impl GateConfig {
    /// Conditions that take part in the final decision.
    pub fn participating(&self) -> Vec<Condition> {
        let enabled: Vec<Condition> = Condition::ALL
            .into_iter()
            .filter(|c| self.enabled.contains(c))
            .collect();
        if enabled.is_empty() {
            Condition::ALL.to_vec()
        } else {
            enabled
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateDecision {
    pub notify:        bool,
    pub mode:          ConditionMode,
    /// Všechny splněné podmínky, i ty vypnuté (pro záznam)
    pub met:           Vec<Condition>,
    pub participating: Vec<Condition>,
}

impl GateDecision {
    pub fn is_met(&self, condition: Condition) -> bool {
        self.met.contains(&condition)
    }
}

pub fn evaluate(scored: &ScoredDraft, config: &GateConfig) -> GateDecision {
    let met: Vec<Condition> = Condition::ALL
        .into_iter()
        .filter(|&c| condition_met(c, scored, config))
        .collect();
    let participating = config.participating();

    let notify = match config.mode {
        ConditionMode::All => participating.iter().all(|c| met.contains(c)),
        ConditionMode::Any => participating.iter().any(|c| met.contains(c)),
    };

    debug!(
        match_id = %scored.match_id,
        met = ?met,
        mode = ?config.mode,
        notify,
        "gate evaluated"
    );

    GateDecision { notify, mode: config.mode, met, participating }
}

fn condition_met(condition: Condition, scored: &ScoredDraft, config: &GateConfig) -> bool {
    match condition {
        Condition::Delta => delta_met(scored.total_delta, config),
        Condition::Pattern => pattern_met(scored, &config.team_patterns),
        Condition::HeroPresence => {
            config.watch_heroes.is_empty()
                || scored.picks().any(|p| config.watch_heroes.contains(&p.hero_id))
        }
        Condition::AntiHeroThreshold => anti_hero_met(scored, &config.anti_hero),
    }
}

/// Porovnává se zaokrouhlená hodnota, stejně jako se zobrazuje.
pub fn delta_met(total_delta: f64, config: &GateConfig) -> bool {
    let total = round_cents(total_delta);
    (total < 0.0 && total < config.delta_below) || total > config.delta_above
}

/// The six count tokens a draft can match, e.g. `3+2-`.
pub fn pattern_tokens(scored: &ScoredDraft) -> [String; 6] {
    let (p1, n1) = (scored.team1.positive_count, scored.team1.negative_count);
    let (p2, n2) = (scored.team2.positive_count, scored.team2.negative_count);
    [
        format!("{p1}+{n2}-"),
        format!("{p2}+{n1}-"),
        format!("{p1}+{p2}+"),
        format!("{p2}+{p1}+"),
        format!("{n1}-{n2}-"),
        format!("{n2}-{n1}-"),
    ]
}

fn pattern_met(scored: &ScoredDraft, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    pattern_tokens(scored)
        .iter()
        .any(|token| allowed.iter().any(|a| a.trim() == token))
}

fn anti_hero_met(scored: &ScoredDraft, thresholds: &[SignedValue]) -> bool {
    if thresholds.is_empty() {
        return true;
    }
    scored.picks().any(|pick| {
        let advantage = SignedValue::from_f64(round_cents(pick.advantage()));
        thresholds.iter().any(|t| t.exceeded_by(advantage))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use draft_scorer::{PickScore, TeamScore};

    fn pick(hero_id: usize, delta: f64) -> PickScore {
        PickScore {
            hero_id,
            name: format!("hero{hero_id}"),
            image_url: None,
            win_rate: 50.0,
            delta,
            favorable: delta <= 0.0,
        }
    }

    fn team(name: &str, ids: [usize; 5], deltas: [f64; 5]) -> TeamScore {
        let picks: [PickScore; 5] = std::array::from_fn(|i| pick(ids[i], deltas[i]));
        let positive_count = picks.iter().filter(|p| p.favorable).count();
        let score = picks.iter().map(|p| p.win_rate - p.delta).sum();
        TeamScore { name: name.into(), picks, positive_count, negative_count: 5 - positive_count, score }
    }

    /// team1: 3+ 2-, team2: 4+ 1-
    fn scored(total_delta: f64) -> ScoredDraft {
        let team1 = team("A", [0, 1, 2, 3, 4], [-1.0, -0.5, 0.0, 0.75, 1.2]);
        let team2 = team("B", [5, 6, 7, 8, 9], [-2.0, -0.1, -0.1, -0.3, 2.6]);
        ScoredDraft {
            series_name: "S".into(),
            match_id: "1".into(),
            team1,
            team2,
            total_favors_team1: total_delta > 0.0,
            total_delta,
        }
    }

    #[test]
    fn nothing_configured_all_mode_delta_decides() {
        let config = GateConfig::default();
        assert!(evaluate(&scored(2.5), &config).notify);
        assert!(evaluate(&scored(-2.01), &config).notify);
        assert!(!evaluate(&scored(1.99), &config).notify);
        assert!(!evaluate(&scored(-2.0), &config).notify);

        let decision = evaluate(&scored(0.3), &config);
        assert_eq!(decision.met, vec![Condition::Pattern, Condition::HeroPresence, Condition::AntiHeroThreshold]);
        assert_eq!(decision.participating.len(), 4);
    }

    #[test]
    fn delta_uses_rounded_total() {
        let config = GateConfig::default();
        // 2.004 se zaokrouhlí na 2.00, což není > 2.0
        assert!(!delta_met(2.004, &config));
        assert!(delta_met(2.006, &config));
        let positive_below = GateConfig { delta_below: 1.0, ..GateConfig::default() };
        assert!(!delta_met(0.5, &positive_below));
    }

    #[test]
    fn pattern_tokens_cover_six_combinations() {
        let s = scored(0.0);
        assert_eq!(pattern_tokens(&s), ["3+1-", "4+2-", "3+4+", "4+3+", "2-1-", "1-2-"]);

        let mut config = GateConfig { team_patterns: vec!["5+0-".into()], ..GateConfig::default() };
        assert!(!evaluate(&s, &config).is_met(Condition::Pattern));
        config.team_patterns.push(" 2-1- ".into());
        assert!(evaluate(&s, &config).is_met(Condition::Pattern));
    }

    #[test]
    fn hero_presence_checks_both_teams() {
        let s = scored(0.0);
        let config = GateConfig { watch_heroes: vec![42, 8], ..GateConfig::default() };
        assert!(evaluate(&s, &config).is_met(Condition::HeroPresence));
        let config = GateConfig { watch_heroes: vec![42], ..GateConfig::default() };
        assert!(!evaluate(&s, &config).is_met(Condition::HeroPresence));
    }

    #[test]
    fn anti_hero_matches_sign_and_magnitude() {
        let s = scored(0.0);
        // nejvyšší kladná výhoda je 2.00 (delta -2.0), nejhorší -2.60
        let th = |raw: &str| GateConfig { anti_hero: vec![raw.parse().unwrap()], ..GateConfig::default() };
        assert!(evaluate(&s, &th("+1.5")).is_met(Condition::AntiHeroThreshold));
        assert!(!evaluate(&s, &th("+2")).is_met(Condition::AntiHeroThreshold));
        assert!(evaluate(&s, &th("-2.5")).is_met(Condition::AntiHeroThreshold));
        assert!(!evaluate(&s, &th("-2.6")).is_met(Condition::AntiHeroThreshold));
    }

    #[test]
    fn enabled_subset_and_any_mode() {
        let s = scored(0.0);
        let config = GateConfig {
            watch_heroes: vec![42],
            enabled: vec![Condition::HeroPresence, Condition::Pattern],
            mode: ConditionMode::Any,
            ..GateConfig::default()
        };
        let decision = evaluate(&s, &config);
        assert_eq!(decision.participating, vec![Condition::Pattern, Condition::HeroPresence]);
        assert!(decision.notify);

        let all = GateConfig { mode: ConditionMode::All, ..config };
        assert!(!evaluate(&s, &all).notify);
    }

    #[test]
    fn condition_keys_and_aliases() {
        assert_eq!("pns".parse::<Condition>(), Ok(Condition::Pattern));
        assert_eq!("HH".parse::<Condition>(), Ok(Condition::HeroPresence));
        assert_eq!("anh".parse::<Condition>(), Ok(Condition::AntiHeroThreshold));
        assert_eq!("anti_hero".parse::<Condition>(), Ok(Condition::AntiHeroThreshold));
        assert!("tower".parse::<Condition>().is_err());
        assert_eq!("".parse::<ConditionMode>(), Ok(ConditionMode::All));
        assert_eq!("Any".parse::<ConditionMode>(), Ok(ConditionMode::Any));
    }
}
