//! Rendering of the aggregated blocklist.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::aggregate::{Blocklist, RestrictedName};
use crate::error::Result;

/// Write the blocklist document.
pub fn render<W: Write>(blocklist: &Blocklist, out: &mut W) -> io::Result<()> {
    if !blocklist.time_restricted.is_empty() {
        writeln!(out, "########## Time-based blocklist ##########")?;
        writeln!(out)?;
        for entry in &blocklist.time_restricted {
            render_restricted(entry, out)?;
        }
    }

    for section in &blocklist.sections {
        writeln!(out)?;
        writeln!(out)?;
        writeln!(out, "########## Blocklist from {} ##########", section.location)?;
        writeln!(out)?;

        let counts = &section.counts;
        if counts.ignored_duplicates() > 0 {
            writeln!(out, "# Ignored duplicates: {}", counts.ignored_duplicates())?;
        }
        if counts.glob_redundant > 0 {
            writeln!(
                out,
                "# Ignored due to overlapping local patterns: {}",
                counts.glob_redundant
            )?;
        }
        if counts.allow_listed > 0 {
            writeln!(
                out,
                "# Ignored entries due to the allowlist: {}",
                counts.allow_listed
            )?;
        }
        if counts.total() > 0 {
            writeln!(out)?;
        }
        for name in &section.accepted {
            writeln!(out, "{}", name)?;
        }
    }

    writeln!(out)?;
    writeln!(
        out,
        "# Total unique domains in blocklist: {}",
        blocklist.summary.total_domains
    )?;
    Ok(())
}

fn render_restricted<W: Write>(entry: &RestrictedName, out: &mut W) -> io::Result<()> {
    match &entry.restriction {
        Some(label) => writeln!(out, "{}\t{}", entry.name, label),
        None => writeln!(
            out,
            "# ignored: [{}] was in the time-restricted list, but without a time restriction label",
            entry.name
        ),
    }
}

/// Render the blocklist into a string.
pub fn render_to_string(blocklist: &Blocklist) -> String {
    let mut buf = Vec::new();
    // writing into a Vec cannot fail
    let _ = render(blocklist, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Write the blocklist to `path` atomically.
///
/// The document goes to a temporary file next to `path` and is renamed
/// over it only once fully written, so readers never see a partial list.
pub fn write_atomic(blocklist: &Blocklist, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    fs::create_dir_all(&dir)?;

    let mut temp = NamedTempFile::new_in(&dir)?;
    {
        let mut writer = io::BufWriter::new(temp.as_file_mut());
        render(blocklist, &mut writer)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path)?;

    log::info!("Blocklist written to {}", path.display());
    Ok(())
}
