//! Shell-style wildcard patterns from trusted lists.
//!
//! Patterns use filesystem glob semantics (`*`, `?`, `[...]`) through the
//! `glob` crate. `*` crosses label boundaries, so `ads*.example.com`
//! matches `ads.cdn.example.com` as well as `ads1.example.com`.

use glob::Pattern;
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Check whether a trusted line uses wildcard syntax.
///
/// `?` and `[` always count. A `*` counts when it is inside the name, or
/// trails a dot (`ads.*`), or opens a `*.suffix` pattern. A lone trailing
/// star glued to a label (`ads*`) or a bare leading star (`*ads`) does not.
fn has_wildcard_syntax(line: &str) -> bool {
    let chars: Vec<char> = line.chars().collect();
    if chars.len() > 2 && chars[0] == '*' && chars[1] == '.' {
        return true;
    }
    chars.iter().enumerate().any(|(i, &c)| match c {
        '?' | '[' => true,
        '*' if i != 0 => i < chars.len() - 1 || chars[i - 1] == '.',
        _ => false,
    })
}

/// Rewrite fnmatch-style text into something `glob::Pattern` accepts
/// with the same meaning.
///
/// Runs of `*` collapse to one `*`, since `glob` only allows `**` as a
/// whole path component. A `[` with no closing `]` is a literal bracket
/// and becomes `[[]`.
fn normalize(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                out.push('*');
                while i + 1 < chars.len() && chars[i + 1] == '*' {
                    i += 1;
                }
            }
            '[' => {
                // a `]` right after `[` or `[!` belongs to the class
                let mut j = i + 1;
                if j < chars.len() && chars[j] == '!' {
                    j += 1;
                }
                if j < chars.len() && chars[j] == ']' {
                    j += 1;
                }
                match chars[j..].iter().position(|&c| c == ']') {
                    Some(offset) => {
                        let end = j + offset;
                        out.extend(&chars[i..=end]);
                        i = end;
                    }
                    None => out.push_str("[[]"),
                }
            }
            c => out.push(c),
        }
        i += 1;
    }
    out
}

fn compile(raw: &str) -> Result<Pattern> {
    Pattern::new(&normalize(raw)).map_err(|e| Error::InvalidGlob(format!("{}: {}", raw, e)))
}

/// Check whether a trusted line is a usable glob pattern.
pub fn is_glob(line: &str) -> bool {
    has_wildcard_syntax(line) && compile(line).is_ok()
}

/// Compiled set of glob patterns, keyed by their literal text.
#[derive(Debug, Clone, Default)]
pub struct GlobSet {
    patterns: BTreeMap<String, Pattern>,
}

impl GlobSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and add a pattern. Returns `false` if it was already present.
    pub fn insert(&mut self, raw: &str) -> Result<bool> {
        if self.patterns.contains_key(raw) {
            return Ok(false);
        }
        let pattern = compile(raw)?;
        self.patterns.insert(raw.to_string(), pattern);
        Ok(true)
    }

    /// Merge another set into this one.
    pub fn extend(&mut self, other: &GlobSet) {
        for (raw, pattern) in &other.patterns {
            self.patterns
                .entry(raw.clone())
                .or_insert_with(|| pattern.clone());
        }
    }

    /// Check whether a literal pattern text is in the set.
    pub fn contains(&self, raw: &str) -> bool {
        self.patterns.contains_key(raw)
    }

    /// Check whether `name` is matched by some pattern of the set.
    ///
    /// A pattern never covers its own literal text.
    pub fn covers(&self, name: &str) -> bool {
        if self.patterns.contains_key(name) {
            return false;
        }
        self.patterns.values().any(|p| p.matches(name))
    }

    /// Pattern texts in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.patterns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
