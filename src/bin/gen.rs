//! domain-blocklist-gen: build a unified blocklist from local and remote lists.

use clap::{CommandFactory, Parser};
use domain_blocklist::{output, AggregateOptions, Aggregator, Location, SourceList};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG: &str = "domains-blocklist.conf";
const DEFAULT_ALLOWLIST: &str = "domains-allowlist.txt";
const DEFAULT_TIME_RESTRICTED: &str = "domains-time-restricted.txt";

#[derive(Parser)]
#[command(name = "domain-blocklist-gen")]
#[command(version)]
#[command(about = "Create a unified blocklist from a set of local and remote files", long_about = None)]
struct Cli {
    /// File containing blocklist sources
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// File or URL containing a set of names to exclude from the blocklist
    /// [default: domains-allowlist.txt, if present]
    #[arg(short, long)]
    allowlist: Option<String>,

    /// File or URL containing a set of names to be time restricted
    /// [default: domains-time-restricted.txt, if present]
    #[arg(short = 'r', long)]
    time_restricted: Option<String>,

    /// Generate the list even if some sources couldn't be retrieved
    #[arg(short, long)]
    ignore_retrieval_failure: bool,

    /// Save the generated blocklist to this file instead of stdout
    #[arg(short, long)]
    output_file: Option<PathBuf>,

    /// Retrieval timeout in seconds
    #[arg(short, long, default_value_t = 30)]
    timeout: u64,

    /// Number of sources downloaded in parallel
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Verbose output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Replaced by --allowlist
    #[arg(short, long, hide = true)]
    whitelist: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if cli.whitelist.is_some() {
        eprintln!(
            "The option to provide a set of names to exclude from the blocklist has been changed from -w to -a\n"
        );
        let _ = Cli::command().print_help();
        std::process::exit(1);
    }

    if let Err(e) = generate(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Resolve an optional list argument, falling back to `default` only when
/// that file exists.
fn resolve_list(arg: Option<&str>, default: &str) -> domain_blocklist::Result<Option<Location>> {
    match arg {
        Some(identifier) => Location::parse(identifier).map(Some),
        None if Path::new(default).exists() => Ok(Some(Location::local(default))),
        None => {
            log::debug!("{} not found, continuing without it", default);
            Ok(None)
        }
    }
}

fn generate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let sources = SourceList::load(&cli.config)?;
    log::debug!("{} sources configured in {:?}", sources.len(), cli.config);

    let mut options = AggregateOptions::new()
        .with_ignore_retrieval_failure(cli.ignore_retrieval_failure)
        .with_timeout(Duration::from_secs(cli.timeout));
    if let Some(jobs) = cli.jobs {
        options = options.with_jobs(jobs);
    }
    if let Some(location) = resolve_list(cli.allowlist.as_deref(), DEFAULT_ALLOWLIST)? {
        options = options.with_allowlist(location);
    }
    if let Some(location) = resolve_list(cli.time_restricted.as_deref(), DEFAULT_TIME_RESTRICTED)? {
        options = options.with_time_restricted(location);
    }

    let blocklist = Aggregator::with_http(options)?.run(&sources)?;

    match &cli.output_file {
        Some(path) => output::write_atomic(&blocklist, path)?,
        None => {
            let stdout = io::stdout();
            let mut out = io::BufWriter::new(stdout.lock());
            output::render(&blocklist, &mut out)?;
            out.flush()?;
        }
    }

    Ok(())
}
