use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::canon::{apply_display_alias, canonicalize, slug_key};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hero {
    /// Pozice v rosteru, stabilní po celý běh
    pub id: usize,
    /// Jméno tak, jak je v datovém souboru ("Anti-Mage")
    pub name: String,
    /// Kanonický klíč ("antimage")
    pub key: String,
    pub win_rate: f64,
}

/// Hero name that could not be mapped to a roster id.
///
/// Carries every derived key so unmatched names can be added to the alias
/// tables later.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("unresolved hero {raw:?} (key={key:?}, code={code:?}, slug={slug:?})")]
pub struct ResolutionFailure {
    pub raw: String,
    pub key: String,
    pub code: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HeroRoster {
    heroes: Vec<Hero>,
    by_key: HashMap<String, usize>,
}

impl HeroRoster {
    /// `names` and `win_rates` are positional; index = hero id.
    pub fn new(names: Vec<String>, win_rates: Vec<f64>) -> Self {
        let mut by_key = HashMap::new();
        let heroes = names
            .into_iter()
            .zip(win_rates)
            .enumerate()
            .map(|(id, (name, win_rate))| {
                let key = canonicalize(&name);
                // Při duplicitě vyhrává první výskyt
                by_key.entry(key.clone()).or_insert(id);
                Hero { id, name, key, win_rate }
            })
            .collect();
        Self { heroes, by_key }
    }

    pub fn len(&self) -> usize {
        self.heroes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heroes.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&Hero> {
        self.heroes.get(id)
    }

    pub fn win_rate(&self, id: usize) -> f64 {
        self.heroes.get(id).map(|h| h.win_rate).unwrap_or(0.0)
    }

    pub fn name(&self, id: usize) -> &str {
        self.heroes.get(id).map(|h| h.name.as_str()).unwrap_or("?")
    }

    pub fn id_for_key(&self, key: &str) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    /// Display-name path: canonicalize, apply the nickname aliases, look up.
    pub fn resolve_display(&self, raw: &str) -> Result<usize, ResolutionFailure> {
        let key = apply_display_alias(&canonicalize(raw));
        self.id_for_key(&key).ok_or_else(|| ResolutionFailure {
            raw: raw.to_string(),
            key,
            code: None,
            slug: None,
        })
    }

    /// Machine code path (`npc_dota_hero_<slug>`).
    pub fn resolve_code(&self, code: &str) -> Result<usize, ResolutionFailure> {
        let slug = slug_key(code);
        self.id_for_key(&slug).ok_or_else(|| ResolutionFailure {
            raw: code.to_string(),
            key: slug.clone(),
            code: Some(code.to_string()),
            slug: Some(slug),
        })
    }

    /// Display name first, slug of `code` as fallback.
    pub fn resolve(&self, raw: &str, code: Option<&str>) -> Result<usize, ResolutionFailure> {
        match self.resolve_display(raw) {
            Ok(id) => Ok(id),
            Err(mut failure) => {
                let Some(code) = code.filter(|c| !c.trim().is_empty()) else {
                    return Err(failure);
                };
                match self.resolve_code(code) {
                    Ok(id) => Ok(id),
                    Err(slug_failure) => {
                        failure.code = slug_failure.code;
                        failure.slug = slug_failure.slug;
                        Err(failure)
                    }
                }
            }
        }
    }
}

/// Sparse pairwise matchup values keyed by `(opponent_id, own_id)`.
#[derive(Debug, Clone, Default)]
pub struct MatchupTable {
    entries: HashMap<(usize, usize), f64>,
}

impl MatchupTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, opponent: usize, own: usize, value: f64) {
        self.entries.insert((opponent, own), value);
    }

    /// How the opponent's presence shifts this hero. Missing = 0.
    pub fn get(&self, opponent: usize, own: usize) -> f64 {
        self.entries.get(&(opponent, own)).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
