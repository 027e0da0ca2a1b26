//! Date helper functions

use chrono::{DateTime, FixedOffset, Locale, TimeZone};

/// Month names for a display language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLocale {
    PtBr,
    En,
}

impl DateLocale {
    /// Pick the locale for a language tag like `pt-BR`, defaulting to English
    pub fn from_language(language: &str) -> Self {
        if language.to_ascii_lowercase().starts_with("pt") {
            DateLocale::PtBr
        } else {
            DateLocale::En
        }
    }

    fn chrono_locale(self) -> Locale {
        match self {
            DateLocale::PtBr => Locale::pt_BR,
            DateLocale::En => Locale::en_US,
        }
    }
}

/// Parse a CMS publication timestamp
///
/// Accepts RFC 3339 as well as offsets without a colon
/// (`2021-03-25T12:00:00+0000`), which is what the CMS emits.
pub fn parse_publication_date(s: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z"))
}

/// Format a date with a Unicode (date-fns style) pattern
///
/// Supported tokens: `yyyy`, `yy`, `MMMM`, `MMM`, `MM`, `M`, `dd`, `d`,
/// `HH`, `mm`, `ss`. Month names come from chrono's locale data for
/// `locale`; anything else is copied verbatim.
///
/// # Examples
/// ```ignore
/// format_date(&date, "dd MMM yyyy", DateLocale::PtBr) // -> "25 mar 2021"
/// ```
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, pattern: &str, locale: DateLocale) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let chrono_format = pattern_to_chrono_format(pattern);
    date.format_localized(&chrono_format, locale.chrono_locale())
        .to_string()
}

/// Convert a date-fns pattern to a chrono format string
fn pattern_to_chrono_format(pattern: &str) -> String {
    // Longest tokens first within each letter
    const TOKENS: [(&str, &str); 11] = [
        ("yyyy", "%Y"),
        ("yy", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("M", "%-m"),
        ("dd", "%d"),
        ("d", "%-d"),
        ("HH", "%H"),
        ("mm", "%M"),
        ("ss", "%S"),
    ];

    let mut result = String::new();
    let mut rest = pattern;

    'outer: while !rest.is_empty() {
        for (token, replacement) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                result.push_str(replacement);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                result.push_str("%%");
            } else {
                result.push(c);
            }
        }
        rest = chars.as_str();
    }

    result
}
