//! Output helpers: JSON, CSV and XML writers, flattened rows and record sinks.

mod delimited;
mod rows;
mod sink;
mod xml;

pub use delimited::write_csv;
pub use rows::{flatten_records, write_json_lines, FlatRow, RowType};
pub use sink::{JsonFileSink, MemorySink, RecordSink};
pub use xml::write_xml;

use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

use crate::core::SearchRecord;
use crate::errors::SerpResult;

/// A file format [`export_all`] can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutputFormat {
    /// Pretty JSON array of records.
    Json,
    /// One CSV row per result item.
    Csv,
    /// `<searchResults>` document.
    Xml,
}

impl OutputFormat {
    /// File extension, without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Xml => "xml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "xml" => Ok(Self::Xml),
            other => Err(other.to_string()),
        }
    }
}

fn create_file(path: &Path) -> SerpResult<std::io::BufWriter<std::fs::File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(std::io::BufWriter::new(std::fs::File::create(path)?))
}

/// Writes `records` once per requested format into `dir`, naming each file
/// `<base_filename>.<extension>`.
///
/// Format names are case-insensitive and duplicates collapse. Unknown names are
/// logged and skipped. CSV is skipped when there are no rows. Returns the paths
/// written, in [`OutputFormat`] order.
pub fn export_all<S: AsRef<str>>(
    records: &[SearchRecord],
    dir: impl AsRef<Path>,
    formats: &[S],
    base_filename: &str,
) -> SerpResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut selected = BTreeSet::new();
    for name in formats {
        match name.as_ref().parse::<OutputFormat>() {
            Ok(format) => {
                selected.insert(format);
            }
            Err(unknown) => warn!(format = %unknown, "Unknown output format requested and ignored"),
        }
    }

    let mut written = Vec::new();
    for format in selected {
        let path = dir.join(format!("{base_filename}.{}", format.extension()));
        match format {
            OutputFormat::Json => write_json_file(&path, records)?,
            OutputFormat::Csv => {
                let rows = flatten_records(records);
                if rows.is_empty() {
                    warn!(path = %path.display(), "No rows to export to CSV");
                    continue;
                }
                let mut file = create_file(&path)?;
                write_csv(&mut file, &rows)?;
                file.flush()?;
                info!(path = %path.display(), rows = rows.len(), "Wrote CSV output");
            }
            OutputFormat::Xml => {
                let mut file = create_file(&path)?;
                write_xml(&mut file, records)?;
                file.flush()?;
                info!(path = %path.display(), records = records.len(), "Wrote XML output");
            }
        }
        written.push(path);
    }
    Ok(written)
}

/// Writes records as a pretty-printed JSON array.
pub fn write_json<W: Write>(writer: W, records: &[SearchRecord]) -> SerpResult<()> {
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

/// Writes records as a pretty-printed JSON array to a file, creating parent
/// directories as needed.
pub fn write_json_file(path: impl AsRef<Path>, records: &[SearchRecord]) -> SerpResult<()> {
    let path = path.as_ref();
    let mut file = create_file(path)?;
    write_json(&mut file, records)?;
    file.flush()?;
    info!(path = %path.display(), records = records.len(), "Wrote JSON output");
    Ok(())
}
