//! Načítání `cs.json`: seznam hrdinů, jejich win rate a matice matchupů.
//!
//! Soubor existuje ve dvou podobách: JS text (`var heroes = [...], heroes_wr =
//! [...], win_rates = [...], update_time ...`) nebo čistý JSON objekt se
//! stejnými klíči.

use std::path::Path;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::roster::{HeroRoster, MatchupTable};

/// Win rate used when the data file has `null` for a hero.
pub const DEFAULT_WIN_RATE: f64 = 50.0;

#[derive(Debug, Error)]
pub enum HeroDataError {
    #[error("hero data file {path} not readable: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("hero data: {0} missing")]
    Missing(&'static str),

    #[error("hero data: {section} malformed: {reason}")]
    Malformed { section: &'static str, reason: String },
}

/// Everything the scorer needs, loaded once per run.
#[derive(Debug, Clone)]
pub struct HeroData {
    pub roster: HeroRoster,
    pub matchups: MatchupTable,
}

impl HeroData {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HeroDataError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| HeroDataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, HeroDataError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(HeroDataError::Missing("heroes"));
        }

        let (heroes, heroes_wr, win_rates) = match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(mut obj)) => (
                obj.remove("heroes").ok_or(HeroDataError::Missing("heroes"))?,
                obj.remove("heroes_wr").ok_or(HeroDataError::Missing("heroes_wr"))?,
                obj.remove("win_rates").ok_or(HeroDataError::Missing("win_rates"))?,
            ),
            _ => split_script_sections(text)?,
        };

        let names = parse_names(&heroes)?;
        let rates = parse_win_rates(&heroes_wr)?;
        if rates.len() < names.len() {
            return Err(HeroDataError::Malformed {
                section: "heroes_wr",
                reason: format!("{} win rates for {} heroes", rates.len(), names.len()),
            });
        }
        let matchups = parse_matchups(&win_rates)?;

        debug!(heroes = names.len(), matchups = matchups.len(), "hero data loaded");
        Ok(Self { roster: HeroRoster::new(names, rates), matchups })
    }
}

fn split_script_sections(text: &str) -> Result<(Value, Value, Value), HeroDataError> {
    let heroes = capture_json(text, r"var\s+heroes\s*=\s*(\[[^\]]*\])", "heroes")?;
    let heroes_wr = capture_json(text, r"heroes_wr\s*=\s*(\[[^\]]*\])", "heroes_wr")?;
    let win_rates = capture_json(
        text,
        r"win_rates\s*=\s*(\[[\s\S]*?\])\s*(?:[,;]\s*)?(?:(?:var|let|const)\s+)?update_time",
        "win_rates",
    )?;
    Ok((heroes, heroes_wr, win_rates))
}

fn capture_json(text: &str, pattern: &str, section: &'static str) -> Result<Value, HeroDataError> {
    let re = Regex::new(pattern).map_err(|e| HeroDataError::Malformed {
        section,
        reason: e.to_string(),
    })?;
    let raw = re
        .captures(text)
        .and_then(|c| c.get(1))
        .ok_or(HeroDataError::Missing(section))?;
    serde_json::from_str(raw.as_str()).map_err(|e| HeroDataError::Malformed {
        section,
        reason: e.to_string(),
    })
}

fn parse_names(value: &Value) -> Result<Vec<String>, HeroDataError> {
    let list = value.as_array().ok_or(HeroDataError::Malformed {
        section: "heroes",
        reason: "not an array".into(),
    })?;
    if list.is_empty() {
        return Err(HeroDataError::Missing("heroes"));
    }
    list.iter()
        .map(|v| match v {
            Value::String(s) => Ok(s.clone()),
            other => Err(HeroDataError::Malformed {
                section: "heroes",
                reason: format!("non-string entry {other}"),
            }),
        })
        .collect()
}

fn parse_win_rates(value: &Value) -> Result<Vec<f64>, HeroDataError> {
    let list = value.as_array().ok_or(HeroDataError::Malformed {
        section: "heroes_wr",
        reason: "not an array".into(),
    })?;
    list.iter()
        .map(|v| match v {
            Value::Null => Ok(DEFAULT_WIN_RATE),
            other => number(other).ok_or_else(|| HeroDataError::Malformed {
                section: "heroes_wr",
                reason: format!("non-numeric entry {other}"),
            }),
        })
        .collect()
}

/// `win_rates[opponent][own]` is `null` or an array whose first element is
/// the matchup value.
fn parse_matchups(value: &Value) -> Result<MatchupTable, HeroDataError> {
    let rows = value.as_array().ok_or(HeroDataError::Malformed {
        section: "win_rates",
        reason: "not an array".into(),
    })?;
    let mut table = MatchupTable::new();
    for (opponent, row) in rows.iter().enumerate() {
        let Some(cells) = row.as_array() else {
            continue;
        };
        for (own, cell) in cells.iter().enumerate() {
            if let Some(v) = cell.get(0).and_then(number) {
                table.insert(opponent, own, v);
            }
        }
    }
    Ok(table)
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
