//! Kanonizace jmen hrdinů.
//!
//! hawk.live, alt texty obrázků a `npc_dota_hero_*` kódy používají každý jiný
//! zápis stejného hrdiny ("Anti-Mage", "anti mage", "antimage"). Vše se
//! převádí na jeden klíč, pod kterým hledáme v rosteru.

const APOSTROPHES: [char; 8] = [
    '\'',       // ASCII apostrophe
    '`',        // grave accent
    '\u{00B4}', // acute accent
    '\u{2019}', // right single quotation mark
    '\u{2018}', // left single quotation mark
    '\u{201A}', // single low-9 quotation mark
    '\u{02BC}', // modifier letter apostrophe
    '\u{2032}', // prime
];

const CODE_PREFIX: &str = "npc_dota_hero_";

/// Historické názvy / přezdívky z alt textů → aktuální jméno v rosteru.
const DISPLAY_ALIASES: &[(&str, &str)] = &[
    ("nevermore", "shadow fiend"),
    ("wisp", "io"),
    ("windrunner", "windranger"),
    ("outworld devourer", "outworld destroyer"),
    ("furion", "natures prophet"),
    ("nature prophet", "natures prophet"),
];

/// Slugy z interních kódů Valve, které se neshodují s jménem v rosteru.
const SLUG_ALIASES: &[(&str, &str)] = &[
    ("life stealer", "lifestealer"),
    ("queenofpain", "queen of pain"),
    ("doom bringer", "doom"),
    ("skeleton king", "wraith king"),
    ("rattletrap", "clockwerk"),
    ("nevermore", "shadow fiend"),
    ("windrunner", "windranger"),
    ("furion", "natures prophet"),
    ("nature prophet", "natures prophet"),
    ("zuus", "zeus"),
    ("magnataur", "magnus"),
    ("obsidian destroyer", "outworld destroyer"),
    ("vengefulspirit", "vengeful spirit"),
    ("shredder", "timbersaw"),
    ("necrolyte", "necrophos"),
];

/// Normalize an arbitrary hero name into the canonical lookup key.
///
/// Total and idempotent; returns an empty string when nothing usable is left.
pub fn canonicalize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !APOSTROPHES.contains(c))
        .map(|c| if c == '\u{00A0}' || c == '\u{202F}' { ' ' } else { c })
        .collect();

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    // Zdroj hrdinu přejmenoval, musí proběhnout ještě se mezerami
    let renamed = if collapsed.to_lowercase() == "outworld devourer" {
        "outworld destroyer".to_string()
    } else {
        collapsed
    };

    renamed
        .to_lowercase()
        .chars()
        .filter(|c| (c.is_alphabetic() || c.is_numeric()) && !c.is_ascii_digit())
        .collect()
}

/// Display-name alias layer, applied to an already canonical key.
pub fn apply_display_alias(key: &str) -> String {
    lookup_alias(DISPLAY_ALIASES, key).unwrap_or_else(|| key.to_string())
}

/// Canonical slug derived from a machine code like `npc_dota_hero_furion`,
/// with the slug alias table applied.
pub fn slug_key(code: &str) -> String {
    let short = code.trim().strip_prefix(CODE_PREFIX).unwrap_or(code.trim());
    let key = canonicalize(&short.replace('_', " "));
    lookup_alias(SLUG_ALIASES, &key).unwrap_or(key)
}

fn lookup_alias(table: &[(&str, &str)], key: &str) -> Option<String> {
    table
        .iter()
        .find(|(from, _)| canonicalize(from) == key)
        .map(|(_, to)| canonicalize(to))
}
