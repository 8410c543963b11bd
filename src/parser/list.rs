//! Whole-list parsing.

use ahash::{AHashMap, AHashSet};
use std::collections::BTreeSet;

use super::line::{classify_trusted, classify_untrusted, normalize, Line};
use crate::pattern::GlobSet;

/// Number of unparsed lines kept for the operator.
pub const SKIPPED_SAMPLE: usize = 10;

/// Whether a list may carry glob patterns and schedule labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trust {
    /// Remote list in any of the known formats
    Untrusted,
    /// Locally supplied list
    Trusted,
}

/// Per-line problems found while parsing one list. Never fatal.
#[derive(Debug, Clone, Default)]
pub struct ParseDiagnostics {
    /// Non-comment lines seen
    pub lines_processed: usize,
    /// Distinct `format:` declarations that were skipped
    pub unsupported_formats: BTreeSet<String>,
    /// First lines that matched no known format
    pub skipped_sample: Vec<String>,
    /// Total lines that matched no known format
    pub skipped_total: usize,
    /// Lines whose extracted name was too short to be a domain
    pub fragments: usize,
}

impl ParseDiagnostics {
    fn record_skipped(&mut self, line: &str) {
        if self.skipped_sample.len() < SKIPPED_SAMPLE {
            self.skipped_sample.push(line.to_string());
        }
        self.skipped_total += 1;
    }

    /// True when nothing needs to be reported.
    pub fn is_clean(&self) -> bool {
        self.unsupported_formats.is_empty() && self.skipped_total == 0
    }

    /// Surface the diagnostics on the operator channel.
    pub fn report(&self, location: &str, names: usize) {
        if self.is_clean() {
            return;
        }
        log::warn!(
            "Processing summary for [{}]: {} lines processed, {} domains extracted",
            location,
            self.lines_processed,
            names
        );
        for declaration in &self.unsupported_formats {
            log::warn!("  unsupported format declaration: {}", declaration);
        }
        if self.skipped_total > 0 {
            log::warn!(
                "  skipped lines that couldn't be parsed (showing first {}):",
                SKIPPED_SAMPLE
            );
            for line in &self.skipped_sample {
                log::warn!("    {}", line);
            }
            if self.skipped_total > self.skipped_sample.len() {
                log::warn!(
                    "    ... and {} more",
                    self.skipped_total - self.skipped_sample.len()
                );
            }
        }
    }
}

/// Names, schedule labels and patterns extracted from one list.
#[derive(Debug, Clone, Default)]
pub struct ParsedList {
    pub names: AHashSet<String>,
    /// Schedule label per name (trusted lists only)
    pub restrictions: AHashMap<String, String>,
    /// Wildcard patterns (trusted lists only); each is also in `names`
    pub globs: GlobSet,
    pub diagnostics: ParseDiagnostics,
}

impl ParsedList {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Parser for blocklist, allowlist and time-restricted list text.
#[derive(Debug, Clone, Copy)]
pub struct ListParser {
    trust: Trust,
}

impl ListParser {
    pub fn new(trust: Trust) -> Self {
        Self { trust }
    }

    /// Parse the full text of a list. Line order does not affect the result.
    pub fn parse(&self, content: &str) -> ParsedList {
        let mut list = ParsedList::default();

        for raw in content.lines() {
            let line = match normalize(raw) {
                Some(l) => l,
                None => continue,
            };
            list.diagnostics.lines_processed += 1;

            let classified = match self.trust {
                Trust::Untrusted => classify_untrusted(&line),
                Trust::Trusted => classify_trusted(&line),
            };

            match classified {
                Line::UnsupportedFormat => {
                    list.diagnostics.unsupported_formats.insert(line.clone());
                }
                Line::Listed { name, .. } => {
                    list.names.insert(name.to_string());
                }
                Line::Fragment { name, format } => {
                    log::trace!("dropping fragment {:?} ({})", name, format.name());
                    list.diagnostics.fragments += 1;
                }
                Line::Glob(pattern) => {
                    if let Err(e) = list.globs.insert(pattern) {
                        log::debug!("{}", e);
                        list.diagnostics.record_skipped(&line);
                        continue;
                    }
                    list.names.insert(pattern.to_string());
                }
                Line::Trusted { name, restriction } => {
                    list.names.insert(name.to_string());
                    if let Some(label) = restriction {
                        list.restrictions.insert(name.to_string(), label.to_string());
                    }
                }
                Line::Unrecognized => list.diagnostics.record_skipped(&line),
            }
        }

        list
    }
}

/// Parse a list with the given trust level.
pub fn parse_list(content: &str, trust: Trust) -> ParsedList {
    ListParser::new(trust).parse(content)
}
