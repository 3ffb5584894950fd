use anyhow::{Context, Result};
use std::{io::Write, path::Path};

use crate::io::{tsv_reader, tsv_writer};

/// A small, fully in-memory delimited table with a header row.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn read(filename: impl AsRef<Path>, delimiter: u8) -> Result<Table> {
        let filename = filename.as_ref();
        let mut reader = tsv_reader(filename, delimiter, true)?;
        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read header of {:?}", filename))?
            .iter()
            .map(|h| h.to_string())
            .collect();
        let rows = reader
            .records()
            .map(|record| {
                record
                    .map(|r| r.iter().map(|v| v.to_string()).collect())
                    .with_context(|| format!("Failed to read {:?}", filename))
            })
            .collect::<Result<Vec<Vec<String>>>>()?;
        Ok(Table { headers, rows })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell value, empty for short rows.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows[row].get(column).map(String::as_str).unwrap_or_default()
    }

    /// Used to name rows in diagnostics.
    pub fn row_key(&self, row: usize) -> &str {
        self.cell(row, 0)
    }

    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some((0..self.rows.len()).map(|row| self.cell(row, idx)).collect())
    }

    pub fn write(&self, out: impl Write) -> Result<()> {
        let mut writer = tsv_writer(out);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush().context("Failed to flush table")?;
        Ok(())
    }
}
