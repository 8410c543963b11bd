//! End-to-end aggregation tests.

use domain_blocklist::domain::parents;
use domain_blocklist::{
    output, AggregateOptions, Aggregator, Error, Fetch, HttpFetcher, Location, Result, SourceList,
};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::time::Duration;

struct MemoryFetcher {
    lists: HashMap<Location, String>,
}

impl MemoryFetcher {
    fn new(lists: &[(&str, &str)]) -> Self {
        Self {
            lists: lists
                .iter()
                .map(|(id, body)| (Location::parse(id).unwrap(), body.to_string()))
                .collect(),
        }
    }
}

impl Fetch for MemoryFetcher {
    fn fetch(&self, location: &Location) -> Result<String> {
        self.lists.get(location).cloned().ok_or_else(|| Error::HttpStatus {
            location: location.to_string(),
            status: 503,
        })
    }
}

const HOSTS: &str = "\
# hosts style
127.0.0.1 localhost.localdomain
0.0.0.0 ads.example.com
0.0.0.0 tracker.ads.example.com
0.0.0.0 metrics.example.net
0.0.0.0 safe.example.com
0.0.0.0 static.cdn.example.org
";

const ADBLOCK: &str = "\
! Title: adblock style
! format: adblock
||ads.example.com^
||popups.example.net^$popup
||pixel.metrics.example.net^$third-party
news.example.us##.banner
not a domain !!!
";

const MIXED: &str = "\
address=/miner.example.io/0.0.0.0
\"1\",\"phish.example.info\",\"2021-01-01\"
*.wild.example.biz
deep.sub.miner.example.io
";

const LOCAL: &str = "\
# local patterns
*.cdn.example.org
telemetry*.example.net
kids.example.com @bedtime
";

fn fixture() -> MemoryFetcher {
    MemoryFetcher::new(&[
        ("local.txt", LOCAL),
        ("https://hosts.example.net/hosts", HOSTS),
        ("https://abp.example.net/list.txt", ADBLOCK),
        ("https://mixed.example.net/list.csv", MIXED),
        ("allow.txt", "safe.example.com\n"),
        ("time.txt", "games.example.com @evenings\nvideo.example.com\n"),
    ])
}

fn fixture_sources() -> SourceList {
    SourceList::parse(
        "\
# sources
file:local.txt
https://hosts.example.net/hosts
https://abp.example.net/list.txt
https://mixed.example.net/list.csv
",
    )
    .unwrap()
}

fn fixture_options() -> AggregateOptions {
    AggregateOptions::new()
        .with_allowlist(Location::parse("allow.txt").unwrap())
        .with_time_restricted(Location::parse("time.txt").unwrap())
}

#[test]
fn test_fixture_sections() {
    let blocklist = Aggregator::new(fixture(), fixture_options())
        .run(&fixture_sources())
        .unwrap();

    assert_eq!(blocklist.sections.len(), 4);
    let local = &blocklist.sections[0];
    assert_eq!(local.location, "file:local.txt");
    assert_eq!(
        local.accepted,
        vec!["kids.example.com", "telemetry*.example.net", "*.cdn.example.org"]
    );

    let hosts = &blocklist.sections[1];
    assert_eq!(
        hosts.accepted,
        vec![
            "ads.example.com",
            "localhost.localdomain",
            "metrics.example.net",
        ]
    );
    assert_eq!(hosts.counts.suffix_redundant, 1);
    assert_eq!(hosts.counts.glob_redundant, 1);
    assert_eq!(hosts.counts.allow_listed, 1);

    let adblock = &blocklist.sections[2];
    assert_eq!(adblock.accepted, vec!["popups.example.net", "news.example.us"]);
    assert_eq!(adblock.counts.duplicates, 1);
    assert_eq!(adblock.counts.suffix_redundant, 1);

    let mixed = &blocklist.sections[3];
    assert_eq!(
        mixed.accepted,
        vec!["wild.example.biz", "phish.example.info", "miner.example.io"]
    );
    assert_eq!(mixed.counts.suffix_redundant, 1);

    assert_eq!(blocklist.summary.total_domains, 11);
    assert_eq!(blocklist.names().count(), 11);
}

#[test]
fn test_no_accepted_name_is_suffix_of_another() {
    let blocklist = Aggregator::new(fixture(), fixture_options())
        .run(&fixture_sources())
        .unwrap();

    let names: HashSet<&str> = blocklist.names().collect();
    assert_eq!(names.len(), blocklist.summary.total_domains);
    for name in &names {
        for parent in parents(name) {
            assert!(!names.contains(parent), "{} shadowed by {}", name, parent);
        }
    }
}

#[test]
fn test_allowed_names_never_emitted() {
    let blocklist = Aggregator::new(fixture(), fixture_options())
        .run(&fixture_sources())
        .unwrap();

    let names: HashSet<&str> = blocklist.names().collect();
    for allowed in ["safe.example.com", "games.example.com", "video.example.com"] {
        assert!(!names.contains(allowed));
    }
    assert_eq!(blocklist.time_restricted.len(), 2);
}

#[test]
fn test_output_is_deterministic() {
    let sources = fixture_sources();
    let first = Aggregator::new(fixture(), fixture_options().with_jobs(1))
        .run(&sources)
        .unwrap();
    let second = Aggregator::new(fixture(), fixture_options().with_jobs(8))
        .run(&sources)
        .unwrap();

    assert_eq!(
        output::render_to_string(&first),
        output::render_to_string(&second)
    );
}

#[test]
fn test_output_fed_back_is_stable() {
    let blocklist = Aggregator::new(fixture(), AggregateOptions::new())
        .run(&fixture_sources())
        .unwrap();
    let rendered = output::render_to_string(&blocklist);

    let again = Aggregator::new(
        MemoryFetcher::new(&[("previous.txt", rendered.as_str())]),
        AggregateOptions::new(),
    )
    .run(&SourceList::parse("previous.txt\n").unwrap())
    .unwrap();

    let before: HashSet<&str> = blocklist.names().collect();
    let after: HashSet<&str> = again.names().collect();
    assert_eq!(before, after);
}

#[test]
fn test_abort_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("blocklist.txt");
    let sources = SourceList::parse("https://down.example.net/list\n").unwrap();

    let result = Aggregator::new(fixture(), AggregateOptions::new()).run(&sources);
    assert!(matches!(result, Err(Error::Source { .. })));
    if let Ok(blocklist) = result {
        output::write_atomic(&blocklist, &out).unwrap();
    }
    assert!(!out.exists());
}

#[test]
fn test_local_files_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("local.txt");
    let allow = dir.path().join("allow.txt");
    let conf = dir.path().join("domains-blocklist.conf");
    let out = dir.path().join("blocklist.txt");

    fs::write(&local, "ads.example.com\ntracker.ads.example.com\nsafe.example.com\n").unwrap();
    fs::write(&allow, "safe.example.com\n").unwrap();
    fs::write(&conf, format!("# local only\n{}\n", local.display())).unwrap();

    let options = AggregateOptions::new()
        .with_timeout(Duration::from_secs(5))
        .with_allowlist(Location::local(allow));
    let fetcher = HttpFetcher::new(options.timeout).unwrap();
    let blocklist = Aggregator::new(fetcher, options)
        .run(&SourceList::load(&conf).unwrap())
        .unwrap();
    output::write_atomic(&blocklist, &out).unwrap();

    let written = fs::read_to_string(&out).unwrap();
    let header = format!("########## Blocklist from file:{} ##########", local.display());
    assert!(written.contains(&header));
    assert!(written.contains("# Ignored duplicates: 1\n"));
    assert!(written.contains("# Ignored entries due to the allowlist: 1\n"));
    assert!(written.contains("\nads.example.com\n"));
    assert!(!written.contains("tracker.ads.example.com"));
    assert!(written.ends_with("# Total unique domains in blocklist: 1\n"));
}
