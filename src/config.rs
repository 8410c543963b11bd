//! Aggregation configuration.

use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::source::{Location, DEFAULT_TIMEOUT};

/// Ordered list of blocklist sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceList {
    locations: Vec<Location>,
}

impl SourceList {
    /// Read a sources file: one identifier per line, `#` comments and
    /// blank lines ignored.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read sources file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse sources from text. Repeated identifiers keep their first position.
    pub fn parse(content: &str) -> Result<Self> {
        let mut list = SourceList::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let location = Location::parse(line)?;
            if list.locations.contains(&location) {
                log::warn!("Source listed more than once, keeping the first: {}", location);
                continue;
            }
            list.locations.push(location);
        }
        Ok(list)
    }

    /// Build a list from already-resolved locations.
    pub fn from_locations(locations: impl IntoIterator<Item = Location>) -> Self {
        let mut list = SourceList::default();
        for location in locations {
            if !list.locations.contains(&location) {
                list.locations.push(location);
            }
        }
        list
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// Options for one aggregation run.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Names that must never be blocked
    pub allowlist: Option<Location>,
    /// Names blocked on a schedule by the resolver; allowed here
    pub time_restricted: Option<Location>,
    /// Skip sources that fail instead of aborting the run
    pub ignore_retrieval_failure: bool,
    /// Per-request retrieval timeout
    pub timeout: Duration,
    /// Number of parallel fetch workers
    pub jobs: NonZeroUsize,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            allowlist: None,
            time_restricted: None,
            ignore_retrieval_failure: false,
            timeout: DEFAULT_TIMEOUT,
            jobs: std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl AggregateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allowlist(mut self, location: Location) -> Self {
        self.allowlist = Some(location);
        self
    }

    pub fn with_time_restricted(mut self, location: Location) -> Self {
        self.time_restricted = Some(location);
        self
    }

    pub fn with_ignore_retrieval_failure(mut self, ignore: bool) -> Self {
        self.ignore_retrieval_failure = ignore;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of fetch workers. Zero is treated as one.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = NonZeroUsize::new(jobs).unwrap_or(NonZeroUsize::MIN);
        self
    }
}
