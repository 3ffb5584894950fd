//! Length and depth normalization: RPKM / TPM from raw counts, TPM from FPKM.
use anyhow::{Context, Result, bail};
use std::path::Path;

use crate::gtf::NA;
use crate::io::format_float;
use crate::table::Table;

pub const SAMPLE_SHEET_COLUMN: &str = "sampleName";

/// The `sampleName` column of a sample sheet.
pub fn read_sample_sheet(filename: impl AsRef<Path>, delimiter: u8) -> Result<Vec<String>> {
    let filename = filename.as_ref();
    let sheet = Table::read(filename, delimiter)?;
    let samples = sheet.column(SAMPLE_SHEET_COLUMN).with_context(|| {
        format!(
            "Sample sheet {:?} has no '{}' column. Columns found: {:?}",
            filename, SAMPLE_SHEET_COLUMN, sheet.headers
        )
    })?;
    Ok(samples
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect())
}

/// Gene lengths, None where the length is missing, `NA` or not positive.
/// Such rows come out as `NA`, and only rows with a length add to the TPM scaling.
fn parse_lengths(table: &Table, length_column: &str) -> Result<Vec<Option<f64>>> {
    let idx = table.column_index(length_column).with_context(|| {
        format!(
            "Length column '{}' not found. Columns found: {:?}",
            length_column, table.headers
        )
    })?;
    let lengths: Vec<Option<f64>> = (0..table.rows.len())
        .map(|row| {
            table
                .cell(row, idx)
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|length| *length > 0.0 && length.is_finite())
        })
        .collect();
    let unusable = lengths.iter().filter(|l| l.is_none()).count();
    if unusable > 0 {
        log::warn!(
            "{} of {} rows have no usable length in '{}', their values are written as NA",
            unusable,
            lengths.len(),
            length_column
        );
    }
    Ok(lengths)
}

/// Returns (rpkm, tpm) tables. Only the `samples` columns are replaced,
/// everything else is passed through.
///
/// The RPKM library size is the sample's full count total, rows without a
/// length included. The TPM scaling only sums rows with a length.
pub fn counts_to_rpkm_tpm(
    table: &Table,
    length_column: &str,
    samples: &[String],
) -> Result<(Table, Table)> {
    let missing: Vec<_> = samples
        .iter()
        .filter(|s| table.column_index(s).is_none())
        .collect();
    if !missing.is_empty() {
        bail!("Samples not found in input file: {:?}", missing);
    }
    let lengths = parse_lengths(table, length_column)?;

    let mut rpkm = table.clone();
    let mut tpm = table.clone();
    for (sample, idx) in samples
        .iter()
        .filter_map(|s| table.column_index(s).map(|idx| (s, idx)))
    {
        let counts = (0..table.rows.len())
            .map(|row| {
                let value = table.cell(row, idx);
                value.trim().parse::<f64>().ok().filter(|c| *c >= 0.0).with_context(|| {
                    format!(
                        "Sample {}: count '{}' for {} is not a non-negative number",
                        sample,
                        value,
                        table.row_key(row)
                    )
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        let total: f64 = counts.iter().sum();
        if total == 0.0 {
            bail!(
                "Sample {} has a total count of zero, cannot compute RPKM/TPM",
                sample
            );
        }
        let rpk: Vec<Option<f64>> = counts
            .iter()
            .zip(&lengths)
            .map(|(count, length)| length.map(|l| count / l))
            .collect();
        let rpk_total: f64 = rpk.iter().flatten().sum();
        if rpk_total == 0.0 {
            bail!(
                "Sample {} has no counts on rows with a usable length, cannot compute TPM",
                sample
            );
        }
        let total_millions = total / 1e6;

        for (row, value) in rpk.iter().enumerate() {
            let (rpkm_value, tpm_value) = match value {
                Some(value) => (
                    format_float(value / total_millions),
                    format_float(value / rpk_total * 1e6),
                ),
                None => (NA.to_string(), NA.to_string()),
            };
            set_cell(&mut rpkm, row, idx, rpkm_value);
            set_cell(&mut tpm, row, idx, tpm_value);
        }
    }
    Ok((rpkm, tpm))
}

fn set_cell(table: &mut Table, row: usize, column: usize, value: String) {
    let cells = &mut table.rows[row];
    if cells.len() <= column {
        cells.resize(column + 1, String::new());
    }
    cells[column] = value;
}

/// Append a `TPM` column to an RSeQC FPKM table:
/// TPM_i = FPKM_i / sum(FPKM) * 1e6. Non-numeric FPKM values count as 0.
pub fn fpkm_to_tpm(table: &mut Table) -> Result<()> {
    // RSeQC writes '#chrom'
    for header in table.headers.iter_mut() {
        *header = header.trim_start_matches('#').to_string();
    }
    let idx = table.column_index("FPKM").with_context(|| {
        format!(
            "Input file must contain a 'FPKM' column. Columns found: {:?}",
            table.headers
        )
    })?;
    let fpkm: Vec<f64> = (0..table.rows.len())
        .map(|row| {
            table
                .cell(row, idx)
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .unwrap_or(0.0)
        })
        .collect();
    let total: f64 = fpkm.iter().sum();
    if total == 0.0 {
        bail!("Total FPKM sum is zero. Cannot compute TPM.");
    }
    let tpm_column = table.headers.len();
    table.headers.push("TPM".to_string());
    for (row, value) in fpkm.iter().enumerate() {
        set_cell(table, row, tpm_column, format!("{:.6}", value / total * 1e6));
    }
    Ok(())
}
