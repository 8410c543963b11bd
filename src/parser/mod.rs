//! Parsers for blocklist text.

mod line;
mod list;

pub use line::{classify_trusted, classify_untrusted, normalize, Line, LineFormat};
pub use list::{parse_list, ListParser, ParseDiagnostics, ParsedList, Trust, SKIPPED_SAMPLE};
