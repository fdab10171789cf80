/// hawk-draft-watch: Historical Range Export
///
/// Projde hawk.live `matches/recent/<den>` pro každý den v rozsahu, stáhne
/// detail každé mapy a zapíše draft delta + výsledek + kurzy do CSV.
///
/// Spuštění:
///   cargo run --bin hawk-range -- 2022-01-01 2023-01-01 [out.csv]

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use dotenv::dotenv;
use draft_model::{Draft, HeroData, Pick, TeamDraft};
use logger::{now_iso, EventLogger, RangeDayEvent};
use rand::Rng;
use reqwest::StatusCode;
use serde_json::Value;
use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const EXCLUDE_KEYWORDS: [&str; 16] = [
    "ultras", "destiny", "mad", "dota 2", "ancients", "oq", "1xbet", "appl",
    "impacto", "evella", "xmas", "tdl", "radiant", "fastinvitational", "iesf", "dos",
];

const OUTPUT_HEADER: [&str; 16] = [
    "date", "championship", "series_id", "map_number", "hawk_match_id", "team1", "team2",
    "team1_heroes", "team2_heroes", "winner", "delta", "delta_favored_team", "team1_odds",
    "team2_odds", "game_time_seconds", "game_time_minutes",
];

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0 Safari/537.36";

const MAX_RETRIES: u32 = 4;

/// Základní pauza před requestem + náhodný jitter
#[derive(Debug, Clone, Copy)]
struct Pacing {
    delay:  Duration,
    jitter: Duration,
}

const PAGE_PACING: Pacing = Pacing { delay: Duration::from_millis(400), jitter: Duration::from_millis(200) };
const MATCH_PACING: Pacing = Pacing { delay: Duration::from_millis(300), jitter: Duration::from_millis(150) };

impl Pacing {
    fn before_request(&self) -> Duration {
        self.delay + random_up_to(self.jitter)
    }

    /// Lineární backoff: (attempt + 1) × delay + jitter
    fn backoff(&self, attempt: u32) -> Duration {
        self.delay * (attempt + 1) + random_up_to(self.jitter * (attempt + 1))
    }
}

fn random_up_to(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(rand::thread_rng().gen_range(0.0..=max.as_secs_f64()))
}

#[derive(Debug, Clone, PartialEq)]
struct RangeArgs {
    start:  NaiveDate,
    end:    NaiveDate,
    output: PathBuf,
}

fn parse_args(args: &[String]) -> Result<RangeArgs> {
    let date = |raw: Option<&String>, fallback: &str| -> Result<NaiveDate> {
        let raw = raw.map(String::as_str).unwrap_or(fallback);
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("invalid date {raw:?}"))
    };
    let start = date(args.first(), "2022-01-01")?;
    let end = date(args.get(1), "2023-01-01")?;
    if end < start {
        bail!("end date {end} is before start date {start}");
    }
    let output = args.get(2).map(PathBuf::from).unwrap_or_else(|| {
        PathBuf::from(format!("hawk_matches_{}_{}.csv", start.format("%Y%m%d"), end.format("%Y%m%d")))
    });
    Ok(RangeArgs { start, end, output })
}

fn is_excluded(championship: &str) -> bool {
    let lower = championship.to_lowercase();
    EXCLUDE_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

async fn fetch_with_retry(client: &reqwest::Client, url: &str, pacing: Pacing) -> Result<String> {
    for attempt in 1..=MAX_RETRIES {
        sleep(pacing.before_request()).await;
        let last = attempt == MAX_RETRIES;
        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => {
                return resp.text().await.with_context(|| format!("reading {url}"));
            }
            Ok(resp) if is_retryable(resp.status()) && !last => {
                warn!("{} → HTTP {}, retry {}/{}", url, resp.status().as_u16(), attempt, MAX_RETRIES);
            }
            Ok(resp) => bail!("{url}: HTTP {}", resp.status().as_u16()),
            Err(e) if (e.is_timeout() || e.is_connect() || e.is_request()) && !last => {
                warn!("{} → {}, retry {}/{}", url, e, attempt, MAX_RETRIES);
            }
            Err(e) => return Err(e).with_context(|| format!("fetching {url}")),
        }
        sleep(pacing.backoff(attempt)).await;
    }
    bail!("Failed to fetch {url} after {MAX_RETRIES} attempts")
}

// ── Parsování detailu zápasu ─────────────────────────────────────────────────

/// Jména hrdinů obou týmů; `picks` z detailu, jinak `heroes` ze série.
fn split_heroes(init_match: &Value, series_match: &Value) -> Option<(Vec<String>, Vec<String>)> {
    let team1_radiant = init_match.get("is_team1_radiant").and_then(Value::as_bool);

    let split = |entries: &[Value], name: fn(&Value) -> Option<&str>| {
        let mut team1 = Vec::new();
        let mut team2 = Vec::new();
        for entry in entries {
            let Some(hero) = name(entry) else { continue };
            let is_radiant = entry.get("is_radiant").and_then(Value::as_bool);
            if is_radiant == team1_radiant {
                team1.push(hero.to_string());
            } else {
                team2.push(hero.to_string());
            }
        }
        (team1, team2)
    };
    let five_each = |(t1, t2): &(Vec<String>, Vec<String>)| t1.len() == 5 && t2.len() == 5;

    let picks = init_match.get("picks").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
    let from_picks = split(picks, |p| p.pointer("/hero/name").and_then(Value::as_str));
    if five_each(&from_picks) {
        return Some(from_picks);
    }

    let heroes = series_match.get("heroes").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
    if heroes.len() == 10 {
        let from_series = split(heroes, |h| h.get("name").and_then(Value::as_str));
        if five_each(&from_series) {
            return Some(from_series);
        }
    }
    None
}

/// Delta týmu 1 proti týmu 2 přes sdílený scorer. `None` když se nějaký hrdina nenajde.
fn draft_delta(data: &HeroData, team1: &[String], team2: &[String]) -> Option<f64> {
    let roster = &data.roster;
    let team = |name: &str, heroes: &[String]| {
        let picks = heroes.iter().map(|h| {
            roster.resolve_display(h).map(|hero_id| Pick { hero_id, display_name: h.clone(), image_url: None })
        });
        TeamDraft::from_results(name, picks).ok()
    };
    let draft = Draft {
        series_name: String::new(),
        match_id: String::new(),
        team1: team("team1", team1)?,
        team2: team("team2", team2)?,
    };
    Some(draft_scorer::score(&draft, roster, &data.matchups).total_delta)
}

fn winner<'a>(init_match: &Value, team1: &'a str, team2: &'a str) -> &'a str {
    let radiant_won = init_match.get("is_radiant_won").and_then(Value::as_bool).unwrap_or(false);
    let team1_radiant = init_match.get("is_team1_radiant").and_then(Value::as_bool).unwrap_or(false);
    if radiant_won == team1_radiant {
        team1
    } else {
        team2
    }
}

fn favored<'a>(delta: f64, team1: &'a str, team2: &'a str) -> &'a str {
    if delta > 0.0 {
        team1
    } else if delta < 0.0 {
        team2
    } else {
        "Even"
    }
}

fn odds_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Nejstarší kurzy napříč providery, prohozené když provider má tým 2 první.
fn earliest_odds(props: &Value) -> (Option<String>, Option<String>) {
    struct Entry<'a> {
        first:          Option<String>,
        second:         Option<String>,
        created_at:     &'a str,
        is_team1_first: bool,
    }

    let mut earliest: Option<Entry> = None;
    for provider in props.get("match_odds_info_array").and_then(Value::as_array).into_iter().flatten() {
        let is_team1_first = provider.get("is_team1_first").and_then(Value::as_bool).unwrap_or(true);
        for odds in provider.get("odds").and_then(Value::as_array).into_iter().flatten() {
            let (Some(first), Some(second)) = (odds.get("first_team_winner"), odds.get("second_team_winner")) else {
                continue;
            };
            if first.is_null() || second.is_null() {
                continue;
            }
            let created_at = odds.get("created_at").and_then(Value::as_str).unwrap_or("");
            let replace = match &earliest {
                None => true,
                Some(current) => !created_at.is_empty() && created_at < current.created_at,
            };
            if replace {
                earliest = Some(Entry {
                    first: odds_text(first),
                    second: odds_text(second),
                    created_at,
                    is_team1_first,
                });
            }
        }
    }

    match earliest {
        None => (None, None),
        Some(e) if e.is_team1_first => (e.first, e.second),
        Some(e) => (e.second, e.first),
    }
}

/// Nejvyšší `game_time` ze všech stavů (stavy můžou přibývat i po konci).
fn final_game_time(props: &Value) -> Option<(i64, String)> {
    let states = props.pointer("/init_match/states").and_then(Value::as_array)?;
    let max = states
        .iter()
        .filter_map(|s| s.get("game_time"))
        .filter_map(|t| match t {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .max()?;
    Some((max, format!("{}:{:02}", max.div_euclid(60), max.rem_euclid(60))))
}

// ── CSV ──────────────────────────────────────────────────────────────────────

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    let line: Vec<String> = row
        .iter()
        .map(|cell| {
            if needs_quotes(cell) {
                format!("\"{}\"", cell.replace('"', "\"\""))
            } else {
                cell.clone()
            }
        })
        .collect();
    write!(w, "{}\r\n", line.join(","))
}

fn value_text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[derive(Debug, Default)]
struct Totals {
    rows:     usize,
    skipped:  usize,
    excluded: usize,
}

struct RangeExporter<'a, W: Write> {
    client: reqwest::Client,
    data:   &'a HeroData,
    out:    W,
    totals: Totals,
}

impl<'a, W: Write> RangeExporter<'a, W> {
    async fn export_day(&mut self, day: NaiveDate) -> Result<usize> {
        let url = format!("https://hawk.live/matches/recent/{}", day.format("%Y-%m-%d"));
        let page = fetch_with_retry(&self.client, &url, PAGE_PACING).await?;
        let Some(state) = hawk_scraper::page_state(&page)? else {
            bail!("No data-page found for {url}");
        };

        let series_list = state.pointer("/props/series").and_then(Value::as_array).cloned().unwrap_or_default();
        for series in &series_list {
            let championship = series.get("championship_name").and_then(Value::as_str).unwrap_or("");
            if is_excluded(championship) {
                self.totals.excluded += 1;
                continue;
            }
            let mut matches = series.get("matches").and_then(Value::as_array).cloned().unwrap_or_default();
            matches.sort_by_key(|m| m.get("number").and_then(Value::as_i64).unwrap_or(0));
            for series_match in &matches {
                self.export_match(day, championship, series, series_match).await?;
            }
        }
        Ok(series_list.len())
    }

    async fn export_match(&mut self, day: NaiveDate, championship: &str, series: &Value, series_match: &Value) -> Result<()> {
        let match_id = match series_match.get("id") {
            Some(Value::Number(n)) if n.as_i64() != Some(0) => n.to_string(),
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => return Ok(()),
        };

        let url = format!("https://hawk.live/matches/{match_id}");
        let props = match self.fetch_props(&url).await {
            Ok(props) => props,
            Err(e) => {
                warn!("Failed to parse match {}: {:#}", match_id, e);
                return Ok(());
            }
        };

        let init_match = props.get("init_match").cloned().unwrap_or(Value::Null);
        let Some((team1_heroes, team2_heroes)) = split_heroes(&init_match, series_match) else {
            self.totals.skipped += 1;
            return Ok(());
        };
        let Some(delta) = draft_delta(self.data, &team1_heroes, &team2_heroes) else {
            self.totals.skipped += 1;
            return Ok(());
        };

        let team1 = series.pointer("/team1/name").and_then(Value::as_str).unwrap_or("");
        let team2 = series.pointer("/team2/name").and_then(Value::as_str).unwrap_or("");
        let (team1_odds, team2_odds) = earliest_odds(&props);
        let (seconds, clock) = match final_game_time(&props) {
            Some((s, c)) => (s.to_string(), c),
            None => (String::new(), String::new()),
        };

        let row = vec![
            day.format("%Y-%m-%d").to_string(),
            championship.to_string(),
            value_text(series.get("id")),
            value_text(series_match.get("number")),
            match_id,
            team1.to_string(),
            team2.to_string(),
            team1_heroes.join("|"),
            team2_heroes.join("|"),
            winner(&init_match, team1, team2).to_string(),
            format!("{delta:.2}"),
            favored(delta, team1, team2).to_string(),
            team1_odds.unwrap_or_default(),
            team2_odds.unwrap_or_default(),
            seconds,
            clock,
        ];
        write_row(&mut self.out, &row)?;
        self.totals.rows += 1;
        Ok(())
    }

    async fn fetch_props(&self, url: &str) -> Result<Value> {
        let page = fetch_with_retry(&self.client, url, MATCH_PACING).await?;
        let state = hawk_scraper::page_state(&page)?.context("no data-page")?;
        state.get("props").cloned().context("data-page without props")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let range = parse_args(&args)?;
    let hero_path = env::var("HAWK_HERO_DATA").unwrap_or_else(|_| "cs.json".to_string());
    let data = HeroData::load(&hero_path).with_context(|| format!("hero data {hero_path}"))?;

    info!("=== hawk.live range export {} → {} ===", range.start, range.end);
    info!("Output: {}", range.output.display());

    let write_header = std::fs::metadata(&range.output).map(|m| m.len() == 0).unwrap_or(true);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&range.output)
        .with_context(|| format!("cannot open {}", range.output.display()))?;
    if write_header {
        write_row(&mut file, &OUTPUT_HEADER.map(String::from))?;
    }

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(25))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());
    let events = EventLogger::new("logs");

    let mut exporter = RangeExporter { client, data: &data, out: file, totals: Totals::default() };
    let total_days = (range.end - range.start).num_days() + 1;
    for (done, day) in range.start.iter_days().take_while(|d| *d <= range.end).enumerate() {
        let rows_before = exporter.totals.rows;
        let series = match exporter.export_day(day).await {
            Ok(series) => series,
            Err(e) => {
                warn!("Day {} failed: {:#}", day, e);
                continue;
            }
        };

        let t = &exporter.totals;
        info!(
            "📅 {} [{}/{}] rows total: {}, excluded: {}, skipped: {}",
            day, done + 1, total_days, t.rows, t.excluded, t.skipped
        );
        let ev = RangeDayEvent {
            ts:       now_iso(),
            event:    "RANGE_DAY",
            date:     day.to_string(),
            series,
            rows:     t.rows - rows_before,
            excluded: t.excluded,
        };
        let _ = events.log(&ev);
    }

    let t = &exporter.totals;
    info!(
        "✅ Done. Rows total: {}, excluded: {}, skipped: {}. Output → {}",
        t.rows, t.excluded, t.skipped, range.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use draft_model::{HeroRoster, MatchupTable};
    use serde_json::json;

    #[test]
    fn args_default_and_validate() {
        let r = parse_args(&[]).unwrap();
        assert_eq!(r.start, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert_eq!(r.output, PathBuf::from("hawk_matches_20220101_20230101.csv"));

        let r = parse_args(&["2024-03-01".into(), "2024-03-02".into(), "x.csv".into()]).unwrap();
        assert_eq!(r.end, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(r.output, PathBuf::from("x.csv"));

        assert!(parse_args(&["2024-03-02".into(), "2024-03-01".into()]).is_err());
        assert!(parse_args(&["yesterday".into()]).is_err());
    }

    #[test]
    fn championship_keywords_exclude() {
        assert!(is_excluded("Ultras Dota Pro League S3"));
        assert!(is_excluded("European Pro League: MAD Division"));
        assert!(!is_excluded("The International 2024"));
    }

    fn pick(name: &str, radiant: bool) -> Value {
        json!({ "is_radiant": radiant, "hero": { "name": name } })
    }

    #[test]
    fn heroes_split_by_side_with_series_fallback() {
        let names = ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"];
        let picks: Vec<Value> = names.iter().enumerate().map(|(i, n)| pick(n, i < 5)).collect();
        let init = json!({ "is_team1_radiant": false, "picks": picks });
        let (t1, t2) = split_heroes(&init, &Value::Null).unwrap();
        assert_eq!(t1, ["F", "G", "H", "I", "J"]);
        assert_eq!(t2, ["A", "B", "C", "D", "E"]);

        // neúplné picky → heroes ze série
        let init = json!({ "is_team1_radiant": true, "picks": [pick("A", true)] });
        let heroes: Vec<Value> = names.iter().enumerate().map(|(i, n)| json!({ "name": n, "is_radiant": i % 2 == 0 })).collect();
        let (t1, _) = split_heroes(&init, &json!({ "heroes": heroes })).unwrap();
        assert_eq!(t1, ["A", "C", "E", "G", "I"]);

        assert!(split_heroes(&init, &json!({ "heroes": [] })).is_none());
    }

    #[test]
    fn delta_uses_shared_scorer() {
        let names: Vec<String> = ["Axe", "Lion", "Zeus", "Doom", "Io", "Tiny", "Lina", "Sven", "Mirana", "Pudge"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut rates = vec![50.0; 10];
        rates[0] = 52.0;
        let mut matchups = MatchupTable::new();
        matchups.insert(5, 0, 1.0);
        matchups.insert(0, 5, -1.0);
        let data = HeroData { roster: HeroRoster::new(names.clone(), rates), matchups };

        let delta = draft_delta(&data, &names[..5], &names[5..]).unwrap();
        assert!((delta - 4.0).abs() < 1e-9);
        assert!(draft_delta(&data, &names[..5], &vec!["Ringmaster".to_string(); 5]).is_none());
    }

    #[test]
    fn winner_and_favored() {
        let init = json!({ "is_radiant_won": true, "is_team1_radiant": false });
        assert_eq!(winner(&init, "A", "B"), "B");
        let init = json!({ "is_radiant_won": false, "is_team1_radiant": false });
        assert_eq!(winner(&init, "A", "B"), "A");
        assert_eq!(favored(0.0, "A", "B"), "Even");
        assert_eq!(favored(-0.4, "A", "B"), "B");
    }

    #[test]
    fn earliest_odds_across_providers() {
        let props = json!({ "match_odds_info_array": [
            { "is_team1_first": true, "odds": [
                { "first_team_winner": 1.8, "second_team_winner": 2.0, "created_at": "2024-01-01T10:05:00" }
            ]},
            { "is_team1_first": false, "odds": [
                { "first_team_winner": null, "second_team_winner": 1.5, "created_at": "2024-01-01T09:00:00" },
                { "first_team_winner": "1.65", "second_team_winner": "2.25", "created_at": "2024-01-01T10:00:00" }
            ]}
        ]});
        assert_eq!(earliest_odds(&props), (Some("2.25".into()), Some("1.65".into())));
        assert_eq!(earliest_odds(&json!({})), (None, None));
    }

    #[test]
    fn game_time_is_max_state() {
        let props = json!({ "init_match": { "states": [
            { "game_time": 1800 }, { "game_time": "2405" }, { "game_time": null }, { "game_time": 2399 }
        ]}});
        assert_eq!(final_game_time(&props), Some((2405, "40:05".to_string())));
        assert_eq!(final_game_time(&json!({ "init_match": { "states": [] } })), None);
    }

    #[test]
    fn csv_rows_are_quoted_when_needed() {
        let mut buf = Vec::new();
        write_row(&mut buf, &["a".into(), "Team, Inc".into(), "say \"hi\"".into()]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "a,\"Team, Inc\",\"say \"\"hi\"\"\"\r\n");
    }
}
