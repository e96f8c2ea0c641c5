//! Spoken-language normalization applied to answers before synthesis.
//!
//! Chat answers are written for a screen: currency figures, percent signs,
//! grouped digits, emoji, markdown rules. Read aloud verbatim they sound
//! broken, so this pass rewrites them the way a Brazilian Portuguese
//! speaker would say them ("R$ 1.500.000,00" becomes "um milhão e meio de
//! reais") and flattens layout into sentence flow.

use {once_cell::sync::Lazy, regex::Regex};

static CURRENCY_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"R\$\s*(\d{1,3}(?:\.\d{3})*|\d+)(?:,(\d{1,2}))?").expect("currency pattern")
});

static PERCENT_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(\d+)(?:,(\d+))?\s*%").expect("percent pattern")
});

static GROUPED_INT_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\b\d{1,3}(?:\.\d{3})+\b").expect("grouped integer pattern")
});

static RULE_RUN_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"[-_=*~─━═—–]{3,}").expect("rule run pattern")
});

/// Normalize `text` for speech synthesis and truncate to `max_chars`.
#[must_use]
pub fn normalize_for_speech(text: &str, max_chars: usize) -> String {
    let text = expand_currency(text);
    let text = expand_percentages(&text);
    let text = expand_grouped_integers(&text);
    let text = strip_emoji_and_rules(&text);
    let text = collapse_into_sentences(&text);
    truncate_chars(&text, max_chars)
}

// ── Currency ────────────────────────────────────────────────────────────────

fn expand_currency(text: &str) -> String {
    CURRENCY_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let int_digits: String = caps[1].chars().filter(char::is_ascii_digit).collect();
            let Ok(int) = int_digits.parse::<u64>() else {
                return caps[0].to_string();
            };
            let cents = caps.get(2).map_or(0, |m| parse_cents(m.as_str()));
            speak_currency(int, cents)
        })
        .into_owned()
}

fn parse_cents(digits: &str) -> u64 {
    let Ok(value) = digits.parse::<u64>() else {
        return 0;
    };
    // A single decimal digit means tenths: "R$ 4,5" is 50 centavos.
    if digits.len() == 1 { value * 10 } else { value }
}

fn speak_currency(int: u64, cents: u64) -> String {
    if int >= 1_000_000 {
        return format!("{} de reais", speak_magnitude(int));
    }
    let unit = if int == 1 { "real" } else { "reais" };
    let mut spoken = format!("{} {unit}", spell_integer(int));
    if cents > 0 {
        let cent_unit = if cents == 1 { "centavo" } else { "centavos" };
        spoken.push_str(&format!(" e {} {cent_unit}", spell_integer(cents)));
    }
    spoken
}

/// Speak a value of one million or more as a magnitude phrase:
/// "um milhão e meio", "dois milhões", "três vírgula dois bilhões".
fn speak_magnitude(value: u64) -> String {
    let (scale, singular, plural) = if value >= 1_000_000_000_000 {
        (1_000_000_000_000, "trilhão", "trilhões")
    } else if value >= 1_000_000_000 {
        (1_000_000_000, "bilhão", "bilhões")
    } else {
        (1_000_000, "milhão", "milhões")
    };

    let whole = value / scale;
    let rem = value % scale;
    let head = spell_integer(whole);

    if rem == 0 {
        let unit = if whole == 1 { singular } else { plural };
        return format!("{head} {unit}");
    }
    if rem * 2 == scale {
        let unit = if whole == 1 { singular } else { plural };
        return format!("{head} {unit} e meio");
    }

    // Other fractions are rounded down to one decimal digit and spoken as a
    // decimal phrase; a zero digit falls back to the whole magnitude.
    let tenth = rem * 10 / scale;
    if tenth == 0 {
        let unit = if whole == 1 { singular } else { plural };
        return format!("{head} {unit}");
    }
    format!("{head} vírgula {} {plural}", spell_integer(tenth))
}

// ── Percentages ─────────────────────────────────────────────────────────────

fn expand_percentages(text: &str) -> String {
    PERCENT_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let Ok(int) = caps[1].parse::<u64>() else {
                return caps[0].to_string();
            };
            let mut spoken = spell_integer(int);
            if let Some(frac) = caps.get(2) {
                spoken.push_str(" vírgula");
                for d in frac.as_str().chars().filter_map(|c| c.to_digit(10)) {
                    spoken.push(' ');
                    spoken.push_str(spell_digit(d));
                }
            }
            format!("{spoken} por cento")
        })
        .into_owned()
}

// ── Grouped integers ────────────────────────────────────────────────────────

fn expand_grouped_integers(text: &str) -> String {
    GROUPED_INT_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let digits: String = caps[0].chars().filter(char::is_ascii_digit).collect();
            let Ok(value) = digits.parse::<u64>() else {
                return caps[0].to_string();
            };
            if value >= 1_000_000 {
                speak_magnitude(value)
            } else {
                spell_integer(value)
            }
        })
        .into_owned()
}

// ── Number words ────────────────────────────────────────────────────────────

const UNITS: [&str; 20] = [
    "zero",
    "um",
    "dois",
    "três",
    "quatro",
    "cinco",
    "seis",
    "sete",
    "oito",
    "nove",
    "dez",
    "onze",
    "doze",
    "treze",
    "catorze",
    "quinze",
    "dezesseis",
    "dezessete",
    "dezoito",
    "dezenove",
];

const TENS: [&str; 10] = [
    "", "", "vinte", "trinta", "quarenta", "cinquenta", "sessenta", "setenta", "oitenta",
    "noventa",
];

const HUNDREDS: [&str; 10] = [
    "",
    "cento",
    "duzentos",
    "trezentos",
    "quatrocentos",
    "quinhentos",
    "seiscentos",
    "setecentos",
    "oitocentos",
    "novecentos",
];

fn spell_digit(d: u32) -> &'static str {
    UNITS[d as usize]
}

fn spell_under_1000(n: u64) -> String {
    debug_assert!(n < 1000);
    if n == 100 {
        return "cem".into();
    }
    if n < 20 {
        return UNITS[n as usize].into();
    }

    let mut parts: Vec<&str> = Vec::with_capacity(3);
    let hundreds = (n / 100) as usize;
    let rest = n % 100;
    if hundreds > 0 {
        parts.push(HUNDREDS[hundreds]);
    }
    if rest >= 20 {
        parts.push(TENS[(rest / 10) as usize]);
        let unit = rest % 10;
        if unit > 0 {
            parts.push(UNITS[unit as usize]);
        }
    } else if rest > 0 {
        parts.push(UNITS[rest as usize]);
    }
    parts.join(" e ")
}

/// Spell out an integer below one million in Brazilian Portuguese.
/// Larger values keep their digits; callers route those through
/// [`speak_magnitude`] instead.
fn spell_integer(n: u64) -> String {
    if n >= 1_000_000 {
        return n.to_string();
    }
    if n < 1000 {
        return spell_under_1000(n);
    }

    let thousands = n / 1000;
    let rem = n % 1000;
    let head = if thousands == 1 {
        "mil".to_string()
    } else {
        format!("{} mil", spell_under_1000(thousands))
    };
    if rem == 0 {
        return head;
    }
    // "e" joins the remainder when it is small or a round hundred:
    // "mil e quinhentos", but "dois mil trezentos e quarenta".
    if rem < 100 || rem % 100 == 0 {
        format!("{head} e {}", spell_under_1000(rem))
    } else {
        format!("{head} {}", spell_under_1000(rem))
    }
}

// ── Emoji and layout ────────────────────────────────────────────────────────

fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F000..=0x1FAFF   // pictographs, emoticons, transport, symbols
        | 0x2600..=0x27BF   // misc symbols and dingbats
        | 0x2B00..=0x2BFF   // arrows and stars
        | 0xFE00..=0xFE0F   // variation selectors
        | 0x200D            // zero-width joiner
    )
}

fn strip_emoji_and_rules(text: &str) -> String {
    let without_rules = RULE_RUN_RE.replace_all(text, " ");
    without_rules.chars().filter(|c| !is_emoji(*c)).collect()
}

/// Flatten line structure into sentence flow: blank lines vanish, line
/// breaks become sentence breaks unless punctuation is already present.
fn collapse_into_sentences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !out.is_empty() {
            if out.ends_with(['.', '!', '?', '…', ':', ';', ',']) {
                out.push(' ');
            } else {
                out.push_str(". ");
            }
        }
        out.push_str(line);
    }

    let mut collapsed = String::with_capacity(out.len());
    let mut prev_space = false;
    for c in out.chars() {
        if c == ' ' {
            if prev_space {
                continue;
            }
            prev_space = true;
        } else {
            prev_space = false;
        }
        collapsed.push(c);
    }
    collapsed.trim().to_string()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}
