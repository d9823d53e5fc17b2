//! CSV load/save collaborators for point lists and match results.
//!
//! Point files are `ID,x,y,z` with a header row; match files are
//! `ID_A,ID_B,Distance`. All parsing failures carry the 1-based data row
//! index so the offending line can be reported to the user.

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use log::debug;

use crate::error::MatchError;
use crate::matching::Match;
use crate::point::{Point, PointSet};

/// Load a point set from a CSV file, preserving row order.
///
/// The header row is skipped. Each data row needs at least four fields
/// (`id`, `x`, `y`, `z`); extra trailing fields are ignored. Duplicate ids
/// within one file are rejected, since they would make the matched output
/// ambiguous.
///
/// # Errors
/// * `MatchError::MalformedRecord` - short row, unparseable field, or
///   duplicate id, with the 1-based data row index.
/// * `MatchError::Csv` / `MatchError::Io` - unreadable file.
pub fn load_points<P: AsRef<Path>>(path: P) -> Result<PointSet, MatchError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path.as_ref())?;

    let mut points = Vec::new();
    let mut seen_ids: HashSet<i64> = HashSet::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 1;
        if record.len() < 4 {
            return Err(MatchError::MalformedRecord {
                row,
                reason: format!("expected 4 fields, found {}", record.len()),
            });
        }

        let id: i64 = parse_field(&record, 0, "id", row)?;
        let x: f64 = parse_field(&record, 1, "x", row)?;
        let y: f64 = parse_field(&record, 2, "y", row)?;
        let z: f64 = parse_field(&record, 3, "z", row)?;

        if !seen_ids.insert(id) {
            return Err(MatchError::MalformedRecord {
                row,
                reason: format!("duplicate id {id}"),
            });
        }
        points.push(Point::new(id, x, y, z));
    }

    debug!(
        "loaded {} points from {}",
        points.len(),
        path.as_ref().display()
    );
    Ok(PointSet::new(points))
}

fn parse_field<T: FromStr>(
    record: &StringRecord,
    index: usize,
    name: &str,
    row: usize,
) -> Result<T, MatchError> {
    let raw = &record[index];
    raw.parse().map_err(|_| MatchError::MalformedRecord {
        row,
        reason: format!("field {name} is not a valid number: {raw:?}"),
    })
}

/// Write matches as `ID_A,ID_B,Distance` rows, in sequence order.
///
/// Distances are written with Rust's shortest round-trip float formatting,
/// so reloading the file reproduces them bit-exactly. The header is written
/// even for an empty match list.
pub fn save_matches<P: AsRef<Path>>(path: P, matches: &[Match]) -> Result<(), MatchError> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path.as_ref())?;

    writer.write_record(["ID_A", "ID_B", "Distance"])?;
    for m in matches {
        writer.serialize(m)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a match file written by [`save_matches`] back into memory.
pub fn load_matches<P: AsRef<Path>>(path: P) -> Result<Vec<Match>, MatchError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path.as_ref())?;

    let mut matches = Vec::new();
    for record in reader.deserialize() {
        matches.push(record?);
    }
    Ok(matches)
}
