//! Domain name grammar, suffix walking and output ordering.

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

/// Grammar every extracted name must satisfy (without anchors).
pub const DOMAIN_PATTERN: &str = r"[a-z0-9][a-z0-9.-]*[.][a-z]{2,}";

/// Names shorter than this are fragments, not domains.
pub const MIN_NAME_LEN: usize = 5;

static DOMAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{}$", DOMAIN_PATTERN)).unwrap());

/// Check whether `name` is a normalized domain (lowercase, at least one
/// dot, alphabetic TLD of two or more letters).
///
/// # Example
/// ```
/// use domain_blocklist::domain::is_domain;
///
/// assert!(is_domain("ads.example.com"));
/// assert!(!is_domain("Example.com"));
/// assert!(!is_domain("localhost"));
/// ```
pub fn is_domain(name: &str) -> bool {
    DOMAIN_RE.is_match(name)
}

/// Iterator over the strict parent suffixes of a name, most specific first.
///
/// `a.b.example.com` yields `b.example.com`, `example.com`, `com`.
#[derive(Debug, Clone)]
pub struct Parents<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Parents<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let pos = self.rest.find('.')?;
        self.rest = &self.rest[pos + 1..];
        if self.rest.is_empty() {
            None
        } else {
            Some(self.rest)
        }
    }
}

/// Walk the parents of `name` by repeatedly dropping the leftmost label.
pub fn parents(name: &str) -> Parents<'_> {
    Parents { rest: name }
}

/// Sort key that reverses the label sequence: `www.example.com` becomes
/// `com.example.www`, so names sharing a suffix end up adjacent.
pub fn order_key(name: &str) -> String {
    let mut labels: Vec<&str> = name.split('.').collect();
    labels.reverse();
    labels.join(".")
}

/// Compare two names by their reversed label sequence.
pub fn cmp_names(a: &str, b: &str) -> Ordering {
    order_key(a).cmp(&order_key(b))
}

/// Sort names in output order.
pub fn sort_names(names: &mut [String]) {
    names.sort_by_cached_key(|name| order_key(name));
}
