//! Import of runner name lists and CSV export of the lap log.

use std::io::Write;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{RaceError, Result};
use crate::format::format_time;
use crate::ranking::standings;
use crate::runner::{RunnerId, RunnerStore};

pub const EXPORT_HEADER: [&str; 6] = [
    "Peringkat",
    "Nama Pelari",
    "Lap #",
    "Waktu Lap",
    "Waktu Total",
    "Status",
];

/// First-line token marking an import header.
const NAME_HEADER_TOKEN: &str = "nama";
const NAME_LIST_HEADER: &str = "Nama Pelari";
const TEMPLATE_NAMES: [&str; 4] = ["Budi Santoso", "Siti Aminah", "Ahmad Yani", "Dewi Sartika"];
const UNRANKED: &str = "-";

/// Runner names from a one-name-per-line text, header and blanks dropped.
pub fn parse_names(text: &str) -> Vec<String> {
    let mut lines = text.lines().peekable();
    if lines
        .peek()
        .is_some_and(|first| first.to_lowercase().contains(NAME_HEADER_TOKEN))
    {
        lines.next();
    }
    lines.filter_map(clean_name).collect()
}

fn clean_name(line: &str) -> Option<String> {
    let mut name = line.trim();
    for quote in ['"', '\''] {
        name = name.strip_prefix(quote).unwrap_or(name);
        name = name.strip_suffix(quote).unwrap_or(name);
    }
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Appends one unfinished runner per valid name and returns the new ids.
pub fn import_names(store: &mut RunnerStore, text: &str) -> Result<Vec<RunnerId>> {
    let names = parse_names(text);
    if names.is_empty() {
        return Err(RaceError::NoValidNames);
    }
    let ids = names
        .iter()
        .map(|name| store.add_named(name))
        .collect::<Result<Vec<_>>>()?;
    debug!(count = ids.len(), "runners imported");
    Ok(ids)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub rank: Option<usize>,
    pub name: String,
    pub lap_number: u32,
    pub lap_time: String,
    pub total_time: String,
    pub is_finish: bool,
}

impl ExportRow {
    fn record(&self) -> [String; 6] {
        [
            self.rank.map_or_else(|| UNRANKED.to_string(), |r| r.to_string()),
            self.name.clone(),
            self.lap_number.to_string(),
            self.lap_time.clone(),
            self.total_time.clone(),
            if self.is_finish { "Finish" } else { "Split" }.to_string(),
        ]
    }
}

/// One row per split in runner-then-lap order.
pub fn export_rows(store: &RunnerStore) -> Vec<ExportRow> {
    let table = standings(store);
    store
        .runners()
        .iter()
        .flat_map(|runner| {
            let rank = table
                .iter()
                .find(|s| s.runner_id == runner.id)
                .map(|s| s.rank);
            runner.splits().iter().map(move |split| ExportRow {
                rank,
                name: runner.name.clone(),
                lap_number: split.index,
                lap_time: format_time(split.lap),
                total_time: format_time(split.total),
                is_finish: split.is_finish,
            })
        })
        .collect()
}

pub fn write_csv<W: Write>(store: &RunnerStore, out: W) -> Result<usize> {
    let rows = export_rows(store);
    if rows.is_empty() {
        return Err(RaceError::NothingToExport);
    }
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(EXPORT_HEADER)?;
    for row in &rows {
        writer.write_record(row.record())?;
    }
    writer.flush()?;
    Ok(rows.len())
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("hasil_lomba_{}.csv", date.format("%Y-%m-%d"))
}

/// Writes the sample import file.
pub fn write_template<W: Write>(mut out: W) -> Result<()> {
    writeln!(out, "{NAME_LIST_HEADER}")?;
    for name in TEMPLATE_NAMES {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

/// Writes the current runner names in the import shape.
pub fn write_name_list<W: Write>(store: &RunnerStore, mut out: W) -> Result<()> {
    writeln!(out, "{NAME_LIST_HEADER}")?;
    for runner in store.runners() {
        writeln!(out, "{}", runner.name)?;
    }
    Ok(())
}
