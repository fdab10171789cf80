//! Extrakce draftů z hawk.live.
//!
//! Primárně server-renderovaný seznam sérií (`div.series-list__item`), živá
//! mapa je ta s červenou tečkou. Když seznam chybí, čteme Inertia stav
//! z `#app[data-page]`. Obě cesty sdílí resolver hrdinů z `draft_model`.

use chrono::Utc;
use draft_model::{Draft, HeroRoster, IncompletePicks, Pick, ResolutionFailure, TeamDraft};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

const BASE_URL: &str = "https://hawk.live";
/// Stejný strop jako měl původní HTML parser.
pub const MAX_DOCUMENT_BYTES: usize = 120_000_000;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to parse hawk.live HTML: empty document")]
    Empty,

    #[error("Failed to parse hawk.live HTML: document of {0} bytes exceeds limit")]
    TooLarge(usize),

    #[error("invalid selector {0}")]
    Selector(String),
}

/// Why a series did not become a draft.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum ExtractionFailure {
    #[error("{series}: no live map")]
    NotLive { series: String },

    #[error("{series}: excluded by league filter {rule:?}")]
    Excluded { series: String, rule: String },

    #[error("{series}: incomplete picks {team1_resolved} vs {team2_resolved}")]
    IncompletePicks {
        series: String,
        match_id: String,
        team1_resolved: usize,
        team2_resolved: usize,
        unresolved: Vec<ResolutionFailure>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPath {
    Markup,
    EmbeddedState,
    /// Neither a series list nor a usable state blob
    Nothing,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Case-insensitive substrings of series names to ignore (embedded path)
    pub skip_leagues: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub path: ExtractionPath,
    pub drafts: Vec<Draft>,
    pub failures: Vec<ExtractionFailure>,
}

impl Extraction {
    fn new(path: ExtractionPath, results: Vec<Result<Draft, ExtractionFailure>>) -> Self {
        let mut drafts = Vec::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(draft) => drafts.push(draft),
                Err(failure) => failures.push(failure),
            }
        }
        Self { path, drafts, failures }
    }
}

struct MarkupSelectors {
    item: Selector,
    header: Selector,
    header_fallback: Selector,
    team_name: Selector,
    match_anchor: Selector,
    map_number: Selector,
    live_dot: Selector,
    team1_img: Selector,
    team2_img: Selector,
    app: Selector,
}

fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector(format!("{css}: {e:?}")))
}

impl MarkupSelectors {
    fn new() -> Result<Self, ParseError> {
        Ok(Self {
            item: selector("div.series-list__item")?,
            header: selector("div.series-list__item > span.text-body-2")?,
            header_fallback: selector("span.text-body-2")?,
            team_name: selector("span.series-teams-item__name")?,
            match_anchor: selector("a.series-list__match")?,
            map_number: selector("div.series-list__match-map-number")?,
            live_dot: selector(r#"i[class*="text-red"]"#)?,
            team1_img: selector("div.series-list__heroes--team1 img")?,
            team2_img: selector("div.series-list__heroes--team2 img")?,
            app: selector("#app")?,
        })
    }
}

/// Extract every live 5 v 5 draft from a fetched page.
///
/// Malformed markup or state yields zero drafts; only a document that cannot
/// be handled at all is a [`ParseError`].
pub fn extract(content: &str, roster: &HeroRoster, options: &ExtractOptions) -> Result<Extraction, ParseError> {
    if content.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    if content.len() > MAX_DOCUMENT_BYTES {
        return Err(ParseError::TooLarge(content.len()));
    }

    let sel = MarkupSelectors::new()?;
    let document = Html::parse_document(content);

    let items: Vec<ElementRef> = document.select(&sel.item).collect();
    if !items.is_empty() {
        let results = items.into_iter().map(|item| markup_series(item, &sel, roster)).collect();
        return Ok(Extraction::new(ExtractionPath::Markup, results));
    }

    debug!("No series-list__item found, trying #app[data-page]");
    match document_state(&document, &sel.app) {
        Some(state) => Ok(Extraction::new(
            ExtractionPath::EmbeddedState,
            embedded_series(&state, roster, options),
        )),
        None => {
            debug!("#app[data-page] missing or invalid");
            Ok(Extraction::new(ExtractionPath::Nothing, Vec::new()))
        }
    }
}

/// Inertia page state (`#app[data-page]`, entity-decoded) of any hawk.live page.
pub fn page_state(content: &str) -> Result<Option<Value>, ParseError> {
    let app = selector("#app")?;
    Ok(document_state(&Html::parse_document(content), &app))
}

fn document_state(document: &Html, app: &Selector) -> Option<Value> {
    let raw = document.select(app).next()?.value().attr("data-page")?;
    match serde_json::from_str::<Value>(raw) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!("data-page is not valid JSON: {}", e);
            None
        }
    }
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

/// Náhradní id když zdroj žádné nedá (nestabilní, jako původní uniqid).
fn generated_match_id() -> String {
    format!("hawk_{:x}", Utc::now().timestamp_micros())
}

/// First purely numeric path segment of a match link.
pub fn match_id_from_href(href: &str) -> Option<String> {
    href.trim()
        .split('/')
        .find(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
}

fn markup_series(item: ElementRef, sel: &MarkupSelectors, roster: &HeroRoster) -> Result<Draft, ExtractionFailure> {
    let series_name = item
        .select(&sel.header)
        .next()
        .or_else(|| item.select(&sel.header_fallback).next())
        .map(element_text)
        .unwrap_or_default();
    let series_name = non_empty_or(series_name, "Series");

    let team_names: Vec<String> = item.select(&sel.team_name).map(element_text).collect();
    let (team1_name, team2_name) = match team_names.as_slice() {
        [first, second, ..] => (first.clone(), second.clone()),
        _ => (String::new(), String::new()),
    };

    // Jen živá mapa (červená tečka), dohrané a nezačaté přeskakujeme
    let live_anchor = item.select(&sel.match_anchor).find(|anchor| {
        anchor
            .select(&sel.map_number)
            .next()
            .map(|num| num.select(&sel.live_dot).next().is_some())
            .unwrap_or(false)
    });
    let Some(anchor) = live_anchor else {
        return Err(ExtractionFailure::NotLive { series: series_name });
    };

    let match_id = anchor
        .value()
        .attr("href")
        .and_then(match_id_from_href)
        .unwrap_or_else(generated_match_id);

    let team1 = TeamDraft::from_results(
        non_empty_or(team1_name, "Team 1"),
        anchor.select(&sel.team1_img).filter_map(|img| markup_pick(img, roster)),
    );
    let team2 = TeamDraft::from_results(
        non_empty_or(team2_name, "Team 2"),
        anchor.select(&sel.team2_img).filter_map(|img| markup_pick(img, roster)),
    );

    assemble(series_name, match_id, team1, team2)
}

/// `None` for images with neither alt nor title (not a hero at all).
fn markup_pick(img: ElementRef, roster: &HeroRoster) -> Option<Result<Pick, ResolutionFailure>> {
    let attr = |name: &str| {
        img.value()
            .attr(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let name = attr("alt").or_else(|| attr("title"))?;
    let image_url = attr("src").map(|src| {
        if src.starts_with("http") {
            src
        } else {
            format!("{BASE_URL}{src}")
        }
    });

    Some(roster.resolve_display(&name).map(|hero_id| Pick {
        hero_id,
        display_name: name,
        image_url,
    }))
}

fn embedded_series(state: &Value, roster: &HeroRoster, options: &ExtractOptions) -> Vec<Result<Draft, ExtractionFailure>> {
    let Some(series_list) = state.pointer("/props/series").and_then(Value::as_array) else {
        debug!("data-page has no props.series");
        return Vec::new();
    };
    series_list
        .iter()
        .map(|series| embedded_one(series, roster, options))
        .collect()
}

fn str_field<'a>(v: &'a Value, pointer: &str) -> Option<&'a str> {
    v.pointer(pointer).and_then(Value::as_str)
}

fn excluded_by(series_name: &str, skip_leagues: &[String]) -> Option<String> {
    let lower = series_name.to_lowercase();
    skip_leagues
        .iter()
        .map(|rule| rule.trim())
        .find(|rule| !rule.is_empty() && lower.contains(&rule.to_lowercase()))
        .map(str::to_string)
}

fn embedded_one(series: &Value, roster: &HeroRoster, options: &ExtractOptions) -> Result<Draft, ExtractionFailure> {
    let series_name = str_field(series, "/championship_name").unwrap_or("Series").to_string();
    if let Some(rule) = excluded_by(&series_name, &options.skip_leagues) {
        return Err(ExtractionFailure::Excluded { series: series_name, rule });
    }

    let team1_name = str_field(series, "/team1/name").unwrap_or("Team 1").to_string();
    let team2_name = str_field(series, "/team2/name").unwrap_or("Team 2").to_string();

    // Živá mapa: is_radiant_won explicitně null a kompletních 10 hrdinů
    let live = series
        .get("matches")
        .and_then(Value::as_array)
        .and_then(|matches| {
            matches.iter().find(|m| {
                let undecided = m.get("is_radiant_won").map(Value::is_null).unwrap_or(false);
                let full = m.get("heroes").and_then(Value::as_array).map(|h| h.len() == 10).unwrap_or(false);
                undecided && full
            })
        });
    let Some(live) = live else {
        return Err(ExtractionFailure::NotLive { series: series_name });
    };

    let team1_radiant = live.get("is_team1_radiant").and_then(Value::as_bool).unwrap_or(true);
    let mut team1_results = Vec::new();
    let mut team2_results = Vec::new();
    for hero in live.get("heroes").and_then(Value::as_array).into_iter().flatten() {
        let Some(name) = hero.get("name").and_then(Value::as_str) else {
            continue;
        };
        let code = hero.get("code_name").and_then(Value::as_str).filter(|c| !c.is_empty());
        let result = roster.resolve(name, code).map(|hero_id| Pick {
            hero_id,
            display_name: name.to_string(),
            image_url: code.map(|c| format!("{BASE_URL}/images/heroes/{c}.png")),
        });
        let is_radiant = hero.get("is_radiant").and_then(Value::as_bool).unwrap_or(false);
        if is_radiant == team1_radiant {
            team1_results.push(result);
        } else {
            team2_results.push(result);
        }
    }

    let match_id = match live.get("id") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => generated_match_id(),
    };

    assemble(
        series_name,
        match_id,
        TeamDraft::from_results(team1_name, team1_results),
        TeamDraft::from_results(team2_name, team2_results),
    )
}

fn assemble(
    series_name: String,
    match_id: String,
    team1: Result<TeamDraft, IncompletePicks>,
    team2: Result<TeamDraft, IncompletePicks>,
) -> Result<Draft, ExtractionFailure> {
    match (team1, team2) {
        (Ok(team1), Ok(team2)) => Ok(Draft { series_name, match_id, team1, team2 }),
        (team1, team2) => {
            let (team1_resolved, mut unresolved) = incomplete_parts(team1);
            let (team2_resolved, more) = incomplete_parts(team2);
            unresolved.extend(more);
            Err(ExtractionFailure::IncompletePicks {
                series: series_name,
                match_id,
                team1_resolved,
                team2_resolved,
                unresolved,
            })
        }
    }
}

fn incomplete_parts(team: Result<TeamDraft, IncompletePicks>) -> (usize, Vec<ResolutionFailure>) {
    match team {
        Ok(t) => (t.picks.len(), Vec::new()),
        Err(e) => (e.resolved, e.failures),
    }
}
