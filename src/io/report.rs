use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::domain::Catalog;
use crate::error::MatchError;
use crate::matcher::{MatchParams, MatchTable};

/// Run metadata echoed in the report header.
#[derive(Debug, Clone)]
pub struct ReportInfo {
    pub primary_input: PathBuf,
    pub secondary_input: PathBuf,
    pub grid_resolution: u64,
    pub params: MatchParams,
}

/// One matched pair as it appears in the ASCII table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub primary_index: usize,
    pub primary_id: i64,
    pub primary_mass: f64,
    pub secondary_index: usize,
    pub secondary_id: i64,
    pub secondary_mass: f64,
    pub goodness: f64,
}

const COLUMNS: &str =
    "primary_index primary_id primary_mass secondary_index secondary_id secondary_mass goodness";

pub fn save_match_report(
    path: &Path,
    info: &ReportInfo,
    primary: &Catalog,
    secondary: &Catalog,
    table: &MatchTable,
) -> Result<(), MatchError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_match_report(&mut writer, info, primary, secondary, table)?;
    writer.flush()?;
    log::info!("Wrote {} matches to {}", table.matched_count(), path.display());
    Ok(())
}

/// Writes `#`-prefixed run metadata followed by one space-separated row per
/// matched primary halo.
pub fn write_match_report<W: Write>(
    mut writer: W,
    info: &ReportInfo,
    primary: &Catalog,
    secondary: &Catalog,
    table: &MatchTable,
) -> Result<(), MatchError> {
    writeln!(writer, "# Generated: {}", chrono::Local::now().to_rfc3339())?;
    writeln!(writer, "# Primary input: {}", info.primary_input.display())?;
    writeln!(writer, "# Secondary input: {}", info.secondary_input.display())?;
    writeln!(writer, "# Mass offset: {}", info.params.mass_offset)?;
    writeln!(writer, "# Maximum halo displacement: {}", info.params.max_displacement)?;
    writeln!(writer, "# Initial volume grid: {}", info.grid_resolution)?;
    writeln!(writer, "# Halos in primary input: {}", primary.len())?;
    writeln!(writer, "# Halos in secondary input: {}", secondary.len())?;
    writeln!(writer, "# Found matches: {}", table.matched_count())?;
    writeln!(writer, "#{}", COLUMNS)?;

    let mut csv = csv::WriterBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .from_writer(writer);

    for (i, m) in table.iter_matches() {
        let (p, s) = match (primary.halos.get(i), secondary.halos.get(m.secondary)) {
            (Some(p), Some(s)) => (p, s),
            _ => continue,
        };
        csv.write_record(&[
            i.to_string(),
            p.id.unwrap_or(-1).to_string(),
            format!("{:.15e}", p.mass),
            m.secondary.to_string(),
            s.id.unwrap_or(-1).to_string(),
            format!("{:.15e}", s.mass),
            format!("{:.2}", m.goodness),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Parses the rows of a report written by [`write_match_report`].
pub fn read_match_report<R: Read>(reader: R) -> Result<Vec<ReportRow>, MatchError> {
    let mut csv = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut rows = Vec::new();
    for row in csv.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
