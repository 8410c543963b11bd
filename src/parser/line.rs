//! Single-line classification.
//!
//! Untrusted lines go through an ordered cascade of list formats; the
//! first format whose pattern matches decides the line. Trusted lines are
//! either glob patterns or `name [@restriction]` pairs.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{DOMAIN_PATTERN, MIN_NAME_LEN};
use crate::pattern::is_glob;

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#|$)").unwrap());
static INLINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*#\s*[a-z0-9-].*$").unwrap());

static TRUSTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([*a-z0-9.-]+)\s*(@\S+)?$").unwrap());
static TIMED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.+\s*@\S+$").unwrap());

/// Build a format pattern by substituting the domain grammar for `{d}`.
fn format_regex(template: &str) -> Regex {
    Regex::new(&template.replace("{d}", &format!("({})", DOMAIN_PATTERN))).unwrap()
}

static ADBLOCK_BLOCK: Lazy<Regex> =
    Lazy::new(|| format_regex(r"^@*\|\|{d}\^?(\$(popup|third-party))?$"));
static PLAIN: Lazy<Regex> = Lazy::new(|| format_regex(r"^{d}$"));
static WILDCARD_PREFIX: Lazy<Regex> = Lazy::new(|| format_regex(r"^[*][.]{d}$"));
static HOSTS: Lazy<Regex> = Lazy::new(|| {
    format_regex(r"^[0-9]{1,3}[.][0-9]{1,3}[.][0-9]{1,3}[.][0-9]{1,3}\s+{d}$")
});
static QUOTED_CSV: Lazy<Regex> = Lazy::new(|| format_regex(r#"^"[^"]+","{d}","#));
static DATED_CSV: Lazy<Regex> = Lazy::new(|| format_regex(r"^{d},.+,[0-9: /-]+,"));
static DNSMASQ: Lazy<Regex> = Lazy::new(|| format_regex(r"^address=/{d}/."));
static ADBLOCK_COSMETIC: Lazy<Regex> =
    Lazy::new(|| format_regex(r"^[|@]?[|@]?{d}[#@]?[#@]?.*$"));
static LOOSE_WILDCARD: Lazy<Regex> = Lazy::new(|| format_regex(r"^[*]?{d}[*]?$"));
static EMBEDDED: Lazy<Regex> = Lazy::new(|| format_regex("{d}"));

/// Known list line formats, in cascade priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineFormat {
    /// `||example.com^` with optional `$popup` / `$third-party`
    AdblockBlock,
    /// `example.com`
    Plain,
    /// `*.example.com`
    WildcardPrefix,
    /// `0.0.0.0 example.com`
    Hosts,
    /// `"...","example.com",...`
    QuotedCsv,
    /// `example.com,...,2020-01-01 00:00,...`
    DatedCsv,
    /// `address=/example.com/0.0.0.0`
    Dnsmasq,
    /// `||example.com##.banner`, `@@example.com#@#...`
    AdblockCosmetic,
    /// `*example.com*`
    LooseWildcard,
    /// Any substring matching the domain grammar
    Embedded,
}

impl LineFormat {
    /// Formats tried in order before falling back to [`LineFormat::Embedded`].
    pub const CASCADE: [LineFormat; 9] = [
        LineFormat::AdblockBlock,
        LineFormat::Plain,
        LineFormat::WildcardPrefix,
        LineFormat::Hosts,
        LineFormat::QuotedCsv,
        LineFormat::DatedCsv,
        LineFormat::Dnsmasq,
        LineFormat::AdblockCosmetic,
        LineFormat::LooseWildcard,
    ];

    fn regex(self) -> &'static Regex {
        match self {
            LineFormat::AdblockBlock => &ADBLOCK_BLOCK,
            LineFormat::Plain => &PLAIN,
            LineFormat::WildcardPrefix => &WILDCARD_PREFIX,
            LineFormat::Hosts => &HOSTS,
            LineFormat::QuotedCsv => &QUOTED_CSV,
            LineFormat::DatedCsv => &DATED_CSV,
            LineFormat::Dnsmasq => &DNSMASQ,
            LineFormat::AdblockCosmetic => &ADBLOCK_COSMETIC,
            LineFormat::LooseWildcard => &LOOSE_WILDCARD,
            LineFormat::Embedded => &EMBEDDED,
        }
    }

    /// Extract the candidate name if the line is in this format.
    pub fn extract(self, line: &str) -> Option<&str> {
        self.regex()
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Short identifier used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            LineFormat::AdblockBlock => "adblock",
            LineFormat::Plain => "plain",
            LineFormat::WildcardPrefix => "wildcard-prefix",
            LineFormat::Hosts => "hosts",
            LineFormat::QuotedCsv => "quoted-csv",
            LineFormat::DatedCsv => "dated-csv",
            LineFormat::Dnsmasq => "dnsmasq",
            LineFormat::AdblockCosmetic => "adblock-cosmetic",
            LineFormat::LooseWildcard => "loose-wildcard",
            LineFormat::Embedded => "embedded",
        }
    }
}

/// Outcome of classifying one normalized line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    /// Self-declared `format:` marker
    UnsupportedFormat,
    /// Name extracted from an untrusted line
    Listed { name: &'a str, format: LineFormat },
    /// A format matched but the name is too short to be a domain
    Fragment { name: &'a str, format: LineFormat },
    /// Wildcard pattern from a trusted list
    Glob(&'a str),
    /// Name from a trusted list, with its optional schedule label
    Trusted {
        name: &'a str,
        restriction: Option<&'a str>,
    },
    /// Nothing usable on the line
    Unrecognized,
}

/// Lower-case and trim a raw line and strip inline comments.
///
/// Returns `None` for blank lines and comment lines.
pub fn normalize(raw: &str) -> Option<String> {
    let line = raw.trim().to_lowercase();
    if COMMENT.is_match(&line) {
        return None;
    }
    let line = INLINE_COMMENT.replace(&line, "");
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(line.to_string())
}

/// Classify a normalized line from an untrusted (remote) list.
pub fn classify_untrusted(line: &str) -> Line<'_> {
    if line.contains("format:") {
        return Line::UnsupportedFormat;
    }

    for format in LineFormat::CASCADE {
        if let Some(name) = format.extract(line) {
            if name.len() < MIN_NAME_LEN {
                return Line::Fragment { name, format };
            }
            return Line::Listed { name, format };
        }
    }

    match LineFormat::Embedded.extract(line) {
        Some(name) if name.len() >= MIN_NAME_LEN => Line::Listed {
            name,
            format: LineFormat::Embedded,
        },
        _ => Line::Unrecognized,
    }
}

/// Classify a normalized line from a trusted (local) list.
pub fn classify_trusted(line: &str) -> Line<'_> {
    if is_glob(line) && !TIMED.is_match(line) {
        return Line::Glob(line);
    }

    match TRUSTED.captures(line) {
        Some(caps) => match caps.get(1) {
            Some(name) => Line::Trusted {
                name: name.as_str(),
                restriction: caps.get(2).map(|m| m.as_str()),
            },
            None => Line::Unrecognized,
        },
        None => Line::Unrecognized,
    }
}
