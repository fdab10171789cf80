use anyhow::{bail, Context, Result};
use hawk_scraper::{FallbackSettings, DEFAULT_PROXY_ENDPOINT};
use signal_gate::{Condition, ConditionMode, GateConfig};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Všechno, co běh potřebuje z prostředí (`.env` + env vars).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub verbose:          bool,
    pub force_proxy:      bool,
    pub source_override:  Option<String>,
    pub fallback:         FallbackSettings,
    pub skip_leagues:     Vec<String>,
    pub gate:             GateConfig,
    pub notify_url:       Option<String>,
    pub debug_notify_url: Option<String>,
    pub hero_data:        PathBuf,
    pub match_dir:        PathBuf,
}

impl RunConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let text = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let flag = |key: &str| -> Result<bool> {
            match text(key) {
                None => Ok(false),
                Some(v) => parse_flag(&v).with_context(|| format!("{key}={v:?}")),
            }
        };

        let mut gate = GateConfig::default();
        if let Some(v) = text("HAWK_DELTA_BELOW") {
            gate.delta_below = parse_number(&v).context("HAWK_DELTA_BELOW")?;
        }
        if let Some(v) = text("HAWK_DELTA_ABOVE") {
            gate.delta_above = parse_number(&v).context("HAWK_DELTA_ABOVE")?;
        }
        gate.team_patterns = list(text("HAWK_TEAM_PATTERNS"));
        gate.watch_heroes  = parse_list(text("HAWK_WATCH_HEROES")).context("HAWK_WATCH_HEROES")?;
        gate.anti_hero     = parse_list(text("HAWK_ANTI_HERO")).context("HAWK_ANTI_HERO")?;
        gate.enabled       = parse_list::<Condition>(text("HAWK_ENABLED_CONDITIONS"))
            .context("HAWK_ENABLED_CONDITIONS")?;
        if let Some(v) = text("HAWK_CONDITION_MODE") {
            gate.mode = v.parse::<ConditionMode>().context("HAWK_CONDITION_MODE")?;
        }

        Ok(Self {
            verbose:          flag("HAWK_DEBUG")?,
            force_proxy:      flag("HAWK_USE_PROXY")?,
            source_override:  text("HAWK_SOURCE_URL"),
            fallback: FallbackSettings {
                proxy_endpoint: text("HAWK_PROXY_ENDPOINT").unwrap_or_else(|| DEFAULT_PROXY_ENDPOINT.to_string()),
                proxy_token:    text("HAWK_PROXY_TOKEN"),
                browser:        flag("HAWK_BROWSER_FALLBACK")?,
            },
            skip_leagues:     list(text("HAWK_SKIP_LEAGUES")),
            gate,
            notify_url:       text("HAWK_NOTIFY_URL"),
            debug_notify_url: text("HAWK_DEBUG_NOTIFY_URL"),
            hero_data:        text("HAWK_HERO_DATA").unwrap_or_else(|| "cs.json".into()).into(),
            match_dir:        text("HAWK_MATCH_DIR").unwrap_or_else(|| "matches_hawk".into()).into(),
        })
    }

    /// Výchozí úroveň logování, když není nastavené `RUST_LOG`.
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Verbose běhy jdou na debug topic, pokud je nastavený.
    pub fn notify_destination(&self) -> Option<&str> {
        if self.verbose {
            self.debug_notify_url.as_deref().or(self.notify_url.as_deref())
        } else {
            self.notify_url.as_deref()
        }
    }
}

fn parse_flag(v: &str) -> Result<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("expected a boolean flag"),
    }
}

fn parse_number(v: &str) -> Result<f64> {
    let n: f64 = v.parse().with_context(|| format!("{v:?} is not a number"))?;
    if !n.is_finite() {
        bail!("{v:?} is not finite");
    }
    Ok(n)
}

fn list(raw: Option<String>) -> Vec<String> {
    raw.map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn parse_list<T>(raw: Option<String>) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    list(raw)
        .iter()
        .map(|item| item.parse::<T>().with_context(|| format!("invalid entry {item:?}")))
        .collect()
}
