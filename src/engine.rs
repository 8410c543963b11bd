//! Redundancy elimination across sources.
//!
//! The engine holds the state of one aggregation run: every name any
//! parsed source listed, the names accepted so far, the patterns from
//! trusted sources and the names that must never be blocked. Sources are
//! merged one at a time; the first source to contribute a name keeps it.

use ahash::AHashSet;

use crate::domain::{parents, sort_names};
use crate::parser::ParsedList;
use crate::pattern::GlobSet;

/// Decision for one candidate name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// New name, kept in the output
    Accepted,
    /// Matched by a pattern from a trusted source
    GlobRedundant,
    /// Already accepted from an earlier source
    Duplicate,
    /// A parent domain is listed somewhere
    SuffixRedundant,
    /// The name or a parent is allow-listed or time-restricted
    AllowListed,
}

/// Rejection counters for one source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RejectionCounts {
    pub duplicates: usize,
    pub suffix_redundant: usize,
    pub glob_redundant: usize,
    pub allow_listed: usize,
}

impl RejectionCounts {
    fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Accepted => {}
            Verdict::GlobRedundant => self.glob_redundant += 1,
            Verdict::Duplicate => self.duplicates += 1,
            Verdict::SuffixRedundant => self.suffix_redundant += 1,
            Verdict::AllowListed => self.allow_listed += 1,
        }
    }

    /// Exact duplicates and suffix-covered names together.
    pub fn ignored_duplicates(&self) -> usize {
        self.duplicates + self.suffix_redundant
    }

    pub fn total(&self) -> usize {
        self.ignored_duplicates() + self.glob_redundant + self.allow_listed
    }
}

/// Outcome of merging one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceResult {
    pub location: String,
    /// Accepted names in output order
    pub accepted: Vec<String>,
    pub counts: RejectionCounts,
}

/// Aggregation state for a single run.
#[derive(Debug, Clone, Default)]
pub struct RedundancyEngine {
    /// Union of the names of every registered source
    listed: AHashSet<String>,
    /// Names emitted so far
    accepted: AHashSet<String>,
    globs: GlobSet,
    allowed: AHashSet<String>,
}

impl RedundancyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a parsed source's names and patterns visible to every merge.
    ///
    /// All sources should be registered before the first merge so that a
    /// parent listed anywhere shadows its subdomains.
    pub fn register(&mut self, list: &ParsedList) {
        self.listed.extend(list.names.iter().cloned());
        self.globs.extend(&list.globs);
    }

    /// Never block these names or their subdomains.
    pub fn allow<'a, I>(&mut self, names: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        self.allowed.extend(names.into_iter().cloned());
    }

    /// Check whether the name or one of its parents is allowed.
    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowed.contains(name) || parents(name).any(|p| self.allowed.contains(p))
    }

    fn has_listed_parent(&self, name: &str) -> bool {
        parents(name).any(|p| self.listed.contains(p) || self.accepted.contains(p))
    }

    /// Decide what to do with a name without changing any state.
    pub fn evaluate(&self, name: &str) -> Verdict {
        if self.globs.covers(name) {
            Verdict::GlobRedundant
        } else if self.accepted.contains(name) {
            Verdict::Duplicate
        } else if self.has_listed_parent(name) {
            Verdict::SuffixRedundant
        } else if self.is_allowed(name) {
            Verdict::AllowListed
        } else {
            Verdict::Accepted
        }
    }

    /// Evaluate a name and record it as accepted when it passes.
    pub fn admit(&mut self, name: &str) -> Verdict {
        let verdict = self.evaluate(name);
        if verdict == Verdict::Accepted {
            self.accepted.insert(name.to_string());
        }
        verdict
    }

    /// Run every name of one source through the engine.
    pub fn merge_source<'a, I>(&mut self, location: &str, names: I) -> SourceResult
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut accepted = Vec::new();
        let mut counts = RejectionCounts::default();

        for name in names {
            let verdict = self.admit(name);
            if verdict == Verdict::Accepted {
                accepted.push(name.clone());
            } else {
                counts.record(verdict);
            }
        }

        sort_names(&mut accepted);
        log::debug!(
            "[{}] accepted {}, duplicates {}, suffix-redundant {}, glob-redundant {}, allow-listed {}",
            location,
            accepted.len(),
            counts.duplicates,
            counts.suffix_redundant,
            counts.glob_redundant,
            counts.allow_listed
        );

        SourceResult {
            location: location.to_string(),
            accepted,
            counts,
        }
    }

    /// Number of distinct names accepted across all merged sources.
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }
}
