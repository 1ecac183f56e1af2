//! Tabular input/output: the file collaborator the core reads from and
//! writes to.
//!
//! RULE: delimiter and byte-order-mark handling lives here only.
//! Everything downstream receives a `Table` of named string cells.

use crate::error::EtlResult;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One input row: column name to raw cell text.
/// A missing key and a blank cell both mean null.
pub type Row = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub name:    String,
    pub columns: Vec<String>,
    pub rows:    Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row given positionally; extra values are ignored and
    /// missing trailing values are left out of the row.
    pub fn push(&mut self, values: &[&str]) -> &mut Self {
        let row = self
            .columns
            .iter()
            .zip(values)
            .map(|(c, v)| (c.clone(), v.to_string()))
            .collect();
        self.rows.push(row);
        self
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read a delimited text file into a `Table` named after the file stem.
pub fn read_csv(path: &Path) -> EtlResult<Table> {
    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_delimited(&name, &content)
}

/// Parse already-loaded text, sniffing the delimiter.
pub fn parse_delimited(name: &str, content: &str) -> EtlResult<Table> {
    let content = content.trim_start_matches('\u{feff}');
    let delimiter = sniff_delimiter(content);
    log::debug!("{name}: delimiter {:?}", delimiter as char);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_matches('"').to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Row = columns
            .iter()
            .zip(record.iter())
            .map(|(c, v)| (c.clone(), v.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(Table { name: name.to_string(), columns, rows })
}

/// Detect the most likely field delimiter by checking consistency across
/// the first few lines. The candidate giving the most consistent field
/// count (more than one field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b';', b',', b'\t', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = counts.first().copied().unwrap_or(0);
        if target <= 1 {
            continue;
        }

        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read rows this crate wrote earlier with `write_csv`.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> EtlResult<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
    Ok(rows)
}

/// Write typed rows with a header line. An empty slice still produces a
/// file so downstream loaders find it.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> EtlResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write an untyped table, e.g. the result of an analysis query.
pub fn write_table(path: &Path, table: &Table) -> EtlResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(
            table.columns.iter().map(|c| row.get(c).map(String::as_str).unwrap_or("")),
        )?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_semicolon_and_comma() {
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3\n"), b';');
        assert_eq!(sniff_delimiter("a,b,c\n1,2,\"3,5\"\n"), b',');
        assert_eq!(sniff_delimiter("a\tb\n1\t2\n"), b'\t');
    }

    #[test]
    fn single_column_falls_back_to_comma() {
        assert_eq!(sniff_delimiter("header\nvalue\n"), b',');
    }

    #[test]
    fn parse_strips_bom_and_trims_headers() {
        let table = parse_delimited("t", "\u{feff} Cell ;\"Name\"\n0825550001;Thandi\n").unwrap();
        assert_eq!(table.columns, vec!["Cell", "Name"]);
        assert_eq!(table.rows[0]["Cell"], "0825550001");
    }
}
