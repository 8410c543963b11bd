//! Aggregation driver.
//!
//! A run has two phases. Collect: every configured source is fetched and
//! parsed, in parallel, each result stored at its configured position.
//! Fold: the results are fed to the [`RedundancyEngine`] strictly in
//! configured order, so which source keeps a shared name never depends on
//! download timing.

use ahash::AHashSet;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use crate::config::{AggregateOptions, SourceList};
use crate::domain::sort_names;
use crate::engine::{RedundancyEngine, SourceResult};
use crate::error::{Error, Result};
use crate::parser::{ListParser, ParsedList, Trust};
use crate::source::{Fetch, HttpFetcher, Location};

/// Entry of the time-restricted list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictedName {
    pub name: String,
    /// Schedule label, `None` when the entry had no usable label
    pub restriction: Option<String>,
}

/// Statistics for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sources_configured: usize,
    pub sources_loaded: usize,
    /// Sources skipped because retrieval failed (tolerated failures only)
    pub failed_sources: Vec<String>,
    /// Distinct names across all sections
    pub total_domains: usize,
}

/// Result of an aggregation run, ready to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blocklist {
    pub time_restricted: Vec<RestrictedName>,
    /// One section per loaded source, in configured order
    pub sections: Vec<SourceResult>,
    pub summary: RunSummary,
}

impl Blocklist {
    /// Every accepted name, section by section.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .flat_map(|s| s.accepted.iter().map(String::as_str))
    }
}

type Slot = Option<Result<ParsedList>>;

/// Drives one aggregation over a set of sources.
pub struct Aggregator<F: Fetch> {
    fetcher: F,
    options: AggregateOptions,
}

impl Aggregator<HttpFetcher> {
    /// Aggregator that downloads remote lists over HTTP.
    pub fn with_http(options: AggregateOptions) -> Result<Self> {
        let fetcher = HttpFetcher::new(options.timeout)?;
        Ok(Self::new(fetcher, options))
    }
}

impl<F: Fetch> Aggregator<F> {
    pub fn new(fetcher: F, options: AggregateOptions) -> Self {
        Self { fetcher, options }
    }

    /// Aggregate `sources` into a single blocklist.
    ///
    /// Fails without producing anything when the allowlist or the
    /// time-restricted list cannot be loaded, or when a source fails and
    /// retrieval failures are not ignored.
    pub fn run(&self, sources: &SourceList) -> Result<Blocklist> {
        let mut engine = RedundancyEngine::new();

        let time_restricted = match &self.options.time_restricted {
            Some(location) => self.load_time_restricted(location, &mut engine)?,
            None => Vec::new(),
        };
        if let Some(location) = &self.options.allowlist {
            let allowed = self.load_allowlist(location)?;
            log::debug!("{} allow-listed names", allowed.len());
            engine.allow(&allowed);
        }

        let slots = self.collect(sources);

        let mut loaded = Vec::new();
        let mut failed_sources = Vec::new();
        for (location, slot) in sources.iter().zip(slots) {
            match slot {
                Some(Ok(list)) => loaded.push((location.to_string(), list)),
                Some(Err(e)) => {
                    let err = Error::for_source(location.to_string(), e);
                    if !self.options.ignore_retrieval_failure {
                        return Err(err);
                    }
                    log::warn!("{}", err);
                    log::warn!("Skipping source due to error: {}", location);
                    failed_sources.push(location.to_string());
                }
                // only left empty once a fatal failure stopped the workers
                None => {}
            }
        }

        for (_, list) in &loaded {
            engine.register(list);
        }
        let sections: Vec<SourceResult> = loaded
            .iter()
            .map(|(location, list)| engine.merge_source(location, &list.names))
            .collect();

        let summary = RunSummary {
            sources_configured: sources.len(),
            sources_loaded: loaded.len(),
            failed_sources,
            total_domains: engine.accepted_count(),
        };
        log::info!(
            "Processing complete. Total unique domains in blocklist: {}",
            summary.total_domains
        );
        if !summary.failed_sources.is_empty() {
            log::warn!(
                "{} of {} sources could not be loaded",
                summary.failed_sources.len(),
                summary.sources_configured
            );
        }

        Ok(Blocklist {
            time_restricted,
            sections,
            summary,
        })
    }

    /// Fetch and parse one list with the trust its location implies.
    fn load(&self, location: &Location, trust: Trust) -> Result<ParsedList> {
        log::info!("Loading data from [{}]", location);
        let content = self.fetcher.fetch(location)?;
        let list = ListParser::new(trust).parse(&content);
        list.diagnostics.report(&location.to_string(), list.names.len());
        Ok(list)
    }

    /// Fetch every source with up to `jobs` workers.
    fn collect(&self, sources: &SourceList) -> Vec<Slot> {
        let locations: Vec<&Location> = sources.iter().collect();
        let slots: Mutex<Vec<Slot>> = Mutex::new(locations.iter().map(|_| None).collect());
        let next = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        let workers = self.options.jobs.get().min(locations.len());

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    if abort.load(Ordering::Relaxed) {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(location) = locations.get(index) else {
                        break;
                    };
                    let result = self.load(location, location.trust());
                    if result.is_err() && !self.options.ignore_retrieval_failure {
                        abort.store(true, Ordering::Relaxed);
                    }
                    slots.lock()[index] = Some(result);
                });
            }
        });

        slots.into_inner()
    }

    /// Load the time-restricted list and allow every name in it.
    fn load_time_restricted(
        &self,
        location: &Location,
        engine: &mut RedundancyEngine,
    ) -> Result<Vec<RestrictedName>> {
        let list = self
            .load(location, Trust::Trusted)
            .map_err(|e| Error::Config(format!("cannot load time-restricted list [{}]: {}", location, e)))?;

        let mut names: Vec<String> = list.names.iter().cloned().collect();
        sort_names(&mut names);

        let entries: Vec<RestrictedName> = names
            .into_iter()
            .map(|name| {
                let restriction = list.restrictions.get(&name).cloned();
                if restriction.is_none() {
                    log::warn!(
                        "[{}] was in the time-restricted list, but without a time restriction label",
                        name
                    );
                }
                RestrictedName { name, restriction }
            })
            .collect();

        engine.allow(&list.names);
        Ok(entries)
    }

    /// Load the allowlist. Local allowlists may use the trusted format.
    fn load_allowlist(&self, location: &Location) -> Result<AHashSet<String>> {
        let list = self
            .load(location, location.trust())
            .map_err(|e| Error::Config(format!("cannot load allowlist [{}]: {}", location, e)))?;
        Ok(list.names)
    }
}
