//! List retrieval.
//!
//! Sources are identified by a URL or a local path. Local files are
//! trusted: they may carry glob patterns and schedule labels, and no HTTP
//! status applies to them. Retrieval sits behind the [`Fetch`] trait so
//! the aggregation driver can be run against in-memory lists.

use flate2::read::GzDecoder;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::parser::Trust;

/// User agent sent with remote requests. Some list hosts refuse unknown
/// clients.
pub const USER_AGENT: &str = "dnscrypt-proxy";

/// Default retrieval timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a list lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// `http://` or `https://` URL
    Remote(String),
    /// Local file, given as a path or a `file:` URL. `identifier` is the
    /// text the list was configured with.
    Local { path: PathBuf, identifier: String },
}

impl Location {
    /// Resolve a source identifier.
    ///
    /// Identifiers without a scheme are local paths.
    ///
    /// # Example
    /// ```
    /// use domain_blocklist::source::Location;
    ///
    /// assert!(Location::parse("https://lists.example.net/hosts").unwrap().is_remote());
    /// assert!(!Location::parse("file:/etc/local-blocklist.txt").unwrap().is_remote());
    /// assert!(!Location::parse("local-blocklist.txt").unwrap().is_remote());
    /// assert!(Location::parse("ftp://lists.example.net/hosts").is_err());
    /// ```
    pub fn parse(identifier: &str) -> Result<Self> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(Error::Config("empty source identifier".to_string()));
        }

        let lower = identifier.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(Location::Remote(identifier.to_string()));
        }
        let file_path = strip_prefix_ignore_case(identifier, "file://")
            .or_else(|| strip_prefix_ignore_case(identifier, "file:"));
        if let Some(rest) = file_path {
            return Ok(Location::Local {
                path: PathBuf::from(rest),
                identifier: identifier.to_string(),
            });
        }
        if has_scheme(&lower) {
            return Err(Error::Config(format!(
                "unsupported source scheme: {}",
                identifier
            )));
        }
        Ok(Location::local(identifier))
    }

    /// Local file given by path. It is shown as `file:<path>`.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let identifier = format!("file:{}", path.display());
        Location::Local { path, identifier }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Remote(_))
    }

    /// Local lists are trusted, remote lists are not.
    pub fn trust(&self) -> Trust {
        match self {
            Location::Remote(_) => Trust::Untrusted,
            Location::Local { .. } => Trust::Trusted,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Remote(url) => write!(f, "{}", url),
            Location::Local { identifier, .. } => write!(f, "{}", identifier),
        }
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// `scheme:` prefix made of letters and digits, as in `ftp:`. A single
/// letter is taken as a Windows drive, not a scheme.
fn has_scheme(lower: &str) -> bool {
    match lower.find(':') {
        Some(pos) if pos > 1 => lower[..pos].chars().all(|c| c.is_ascii_alphanumeric()),
        _ => false,
    }
}

/// Retrieves the raw text of a list.
///
/// Implementations are shared between fetch workers. A timeout or a
/// non-success answer must surface as an error.
pub trait Fetch: Send + Sync {
    fn fetch(&self, location: &Location) -> Result<String>;
}

/// Default fetcher: blocking HTTP for remote lists, the filesystem for
/// local ones. Gzip bodies are decompressed transparently.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    fn fetch_remote(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send()?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(Error::HttpStatus {
                location: url.to_string(),
                status,
            });
        }
        Ok(response.bytes()?.to_vec())
    }

    fn fetch_local(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(path)?)
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, location: &Location) -> Result<String> {
        let raw = match location {
            Location::Remote(url) => self.fetch_remote(url)?,
            Location::Local { path, .. } => self.fetch_local(path)?,
        };
        decode_body(raw)
    }
}

/// Check if data is gzip compressed.
fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}

/// Decompress if needed and decode as UTF-8, replacing invalid sequences.
pub fn decode_body(raw: Vec<u8>) -> Result<String> {
    let bytes = if is_gzip(&raw) {
        let mut decoder = GzDecoder::new(&raw[..]);
        let mut data = Vec::new();
        decoder.read_to_end(&mut data)?;
        log::debug!(
            "decompressed list: {} bytes (compressed: {} bytes)",
            data.len(),
            raw.len()
        );
        data
    } else {
        raw
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Answer a single request on a loopback port after `delay`, then
    /// return the URL of the served list.
    fn serve_once(response: Vec<u8>, delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request = [0u8; 4096];
                let _ = stream.read(&mut request);
                thread::sleep(delay);
                let _ = stream.write_all(&response);
                let _ = stream.flush();
            }
        });
        format!("http://{}/list.txt", addr)
    }

    fn http_response(status: &str, body: &[u8]) -> Vec<u8> {
        let mut response = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(body);
        response
    }

    #[test]
    fn test_parse_locations() {
        assert_eq!(
            Location::parse("https://lists.example.net/ads.txt").unwrap(),
            Location::Remote("https://lists.example.net/ads.txt".to_string())
        );
        assert_eq!(
            Location::parse("file:local.txt").unwrap(),
            Location::local("local.txt")
        );
        assert_eq!(
            Location::parse("file:///etc/lists/local.txt").unwrap(),
            Location::Local {
                path: PathBuf::from("/etc/lists/local.txt"),
                identifier: "file:///etc/lists/local.txt".to_string(),
            }
        );
        assert_eq!(
            Location::parse("  lists/local.txt ").unwrap(),
            Location::local("lists/local.txt")
        );
        assert!(Location::parse("").is_err());
        assert!(Location::parse("gopher://old.example.net/").is_err());
    }

    #[test]
    fn test_trust() {
        assert_eq!(Location::parse("http://a.example.com/x").unwrap().trust(), Trust::Untrusted);
        assert_eq!(Location::parse("local.txt").unwrap().trust(), Trust::Trusted);
    }

    #[test]
    fn test_display() {
        let local = Location::local("local.txt");
        assert_eq!(local.to_string(), "file:local.txt");
        assert_eq!(Location::parse("local.txt").unwrap().to_string(), "file:local.txt");
        assert_eq!(
            Location::parse("file:///etc/x.txt").unwrap().to_string(),
            "file:///etc/x.txt"
        );
        assert_eq!(Location::parse("file://x").unwrap().to_string(), "file://x");
        let remote = Location::Remote("https://a.example.com/l".to_string());
        assert_eq!(remote.to_string(), "https://a.example.com/l");
    }

    #[test]
    fn test_decode_plain_and_gzip() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let text = "ads.example.com\ntracker.example.net\n";
        assert_eq!(decode_body(text.as_bytes().to_vec()).unwrap(), text);

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();
        assert!(is_gzip(&compressed));
        assert_eq!(decode_body(compressed).unwrap(), text);
    }

    #[test]
    fn test_decode_replaces_invalid_utf8() {
        let raw = vec![b'a', b'.', b'i', b'o', 0xff, b'\n'];
        let decoded = decode_body(raw).unwrap();
        assert!(decoded.starts_with("a.io"));
        assert!(decoded.contains('\u{fffd}'));
    }

    #[test]
    fn test_fetch_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.txt");
        fs::write(&path, "ads*.example.com\n").unwrap();

        let fetcher = HttpFetcher::new(DEFAULT_TIMEOUT).unwrap();
        let content = fetcher.fetch(&Location::local(path)).unwrap();
        assert_eq!(content, "ads*.example.com\n");

        let missing = fetcher.fetch(&Location::local(dir.path().join("missing.txt")));
        assert!(matches!(missing, Err(Error::Io(_))));
    }

    #[test]
    fn test_fetch_remote_ok() {
        let url = serve_once(
            http_response("200 OK", b"0.0.0.0 ads.example.com\n"),
            Duration::ZERO,
        );
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let content = fetcher.fetch(&Location::parse(&url).unwrap()).unwrap();
        assert_eq!(content, "0.0.0.0 ads.example.com\n");
    }

    #[test]
    fn test_fetch_remote_bad_status() {
        let url = serve_once(http_response("404 Not Found", b"gone"), Duration::ZERO);
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let err = fetcher.fetch(&Location::parse(&url).unwrap()).unwrap_err();
        match err {
            Error::HttpStatus { location, status } => {
                assert_eq!(status, 404);
                assert_eq!(location, url);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_fetch_remote_timeout() {
        let url = serve_once(
            http_response("200 OK", b"late.example.com\n"),
            Duration::from_secs(3),
        );
        let fetcher = HttpFetcher::new(Duration::from_millis(200)).unwrap();
        let err = fetcher.fetch(&Location::parse(&url).unwrap()).unwrap_err();
        assert!(matches!(err, Error::Download(_)), "unexpected error: {}", err);
    }
}
