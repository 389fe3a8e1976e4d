//! CSV output formatting
//!
//! The word-frequency report: a `word,frequency` header followed by one row
//! per distinct word, ascending by the bytes of the word. Words are
//! alphanumeric, so no field ever needs quoting.

use crate::stats::histogram::{Histogram, WordFreq};
use crate::Result;
use anyhow::Context;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const CSV_HEADER: &str = "word,frequency";

/// Write the report for `histogram` to `writer`
pub fn write_csv<W: Write>(mut writer: W, histogram: &Histogram) -> Result<()> {
    let mut rows: Vec<&WordFreq> = histogram.iter().collect();
    rows.sort_unstable_by(|a, b| a.word.as_bytes().cmp(b.word.as_bytes()));

    writeln!(writer, "{}", CSV_HEADER)?;
    for row in rows {
        writeln!(writer, "{},{}", row.word, row.frequency)?;
    }
    writer.flush()?;
    Ok(())
}

/// Render the report into a string
pub fn render_csv(histogram: &Histogram) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(&mut buf, histogram)?;
    String::from_utf8(buf).context("CSV output is not UTF-8")
}

/// Write the report to `path`, replacing any previous file
pub fn write_report(path: &Path, histogram: &Histogram) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    write_csv(BufWriter::new(file), histogram)
        .with_context(|| format!("Failed to write output file {}", path.display()))?;
    log::info!("Wrote {} rows to {}", histogram.len(), path.display());
    Ok(())
}
