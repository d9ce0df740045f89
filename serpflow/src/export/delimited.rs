//! CSV output over flattened rows.

use std::io::Write;

use super::rows::FlatRow;
use crate::errors::SerpResult;

/// Writes rows as CSV with a header line taken from the row field names.
///
/// Nothing is written for an empty slice, not even the header.
pub fn write_csv<W: Write>(writer: W, rows: &[FlatRow]) -> SerpResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}
