//! domain-blocklist - aggregate domain blocklists for DNS filtering.
//!
//! This crate merges domain blocklists published in many formats (hosts
//! files, Adblock rules, dnsmasq configs, CSV dumps, plain lists) into one
//! deduplicated list that a filtering resolver can load.
//!
//! # Features
//!
//! - **Format detection**: each line is matched against an ordered cascade
//!   of known list formats, with a last-resort domain search
//! - **Redundancy elimination**: exact duplicates, subdomains of listed
//!   domains and names covered by local glob patterns are dropped
//! - **Allowlist and time-restricted names**: never blocked by the output
//! - **Deterministic output**: sections follow the configured source order,
//!   names are sorted by reversed label sequence
//! - **Parallel retrieval**: sources are downloaded concurrently, merged
//!   sequentially
//! - **Atomic output**: the list file is replaced in one rename
//!
//! # Quick Start
//!
//! ```ignore
//! use domain_blocklist::{output, AggregateOptions, Aggregator, Location, SourceList};
//!
//! let sources = SourceList::load("domains-blocklist.conf")?;
//! let options = AggregateOptions::new()
//!     .with_allowlist(Location::parse("domains-allowlist.txt")?)
//!     .with_ignore_retrieval_failure(true);
//!
//! let blocklist = Aggregator::with_http(options)?.run(&sources)?;
//! output::write_atomic(&blocklist, "blocklist.txt")?;
//! ```
//!
//! # Trusted Sources
//!
//! Local files are trusted. Besides plain names they may contain glob
//! patterns (`ads*.example.com`, `*.cdn.example.com`) and schedule labels
//! (`games.example.com @evenings`). Remote lists only contribute names.
//!
//! # Precedence
//!
//! Each candidate name is checked in this order:
//! 1. Covered by a local glob pattern
//! 2. Already accepted from an earlier source
//! 3. A parent domain is listed by any source
//! 4. The name or a parent is allow-listed or time-restricted
//!
//! The first check that applies rejects the name; otherwise it is kept.

mod error;

pub mod aggregate;
pub mod config;
pub mod domain;
pub mod engine;
pub mod output;
pub mod parser;
pub mod pattern;
pub mod source;

// Re-export core types
pub use error::{Error, Result};

pub use aggregate::{Aggregator, Blocklist, RestrictedName, RunSummary};
pub use config::{AggregateOptions, SourceList};
pub use engine::{RedundancyEngine, RejectionCounts, SourceResult, Verdict};
pub use parser::{parse_list, ListParser, ParsedList, Trust};
pub use pattern::GlobSet;
pub use source::{Fetch, HttpFetcher, Location};
