use anyhow::{Context, Result, bail};
use std::{collections::HashMap, path::Path};

use crate::table::Table;

const KEY_COLUMNS: [&str; 4] = ["geneID", "chrom", "tx_start", "tx_end"];
const VALUE_COLUMN: &str = "TIN";
const STAR_SUFFIX: &str = ".Aligned.sortedByCoord.out.tin";

/// `KOS_8h_R1.Aligned.sortedByCoord.out.tin.xls` -> `KOS_8h_R1`
pub fn tin_sample_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    stem.replace(STAR_SUFFIX, "")
}

/// Outer join of RSeQC tin.py tables on gene and transcript coordinates,
/// one TIN column per input. Absent values stay empty.
pub fn aggregate_tin(files: &[impl AsRef<Path>]) -> Result<Table> {
    let mut headers: Vec<String> = KEY_COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut keys: Vec<[String; 4]> = Vec::new();
    let mut values: Vec<Vec<Option<String>>> = Vec::new();
    let mut index: HashMap<[String; 4], usize> = HashMap::new();

    for (sample_no, file) in files.iter().enumerate() {
        let file = file.as_ref();
        let table = Table::read(file, b'\t')?;
        let key_idx = KEY_COLUMNS
            .iter()
            .chain(std::iter::once(&VALUE_COLUMN))
            .map(|name| {
                table
                    .column_index(name)
                    .with_context(|| format!("TIN file {:?} lacks column '{}'", file, name))
            })
            .collect::<Result<Vec<usize>>>()?;
        headers.push(tin_sample_name(file));

        for row in 0..table.rows.len() {
            let key: [String; 4] = std::array::from_fn(|ii| table.cell(row, key_idx[ii]).to_string());
            let row_no = *index.entry(key).or_insert_with_key(|key| {
                keys.push(key.clone());
                values.push(vec![None; files.len()]);
                keys.len() - 1
            });
            if values[row_no][sample_no].is_some() {
                bail!(
                    "Transcript {} occurs more than once in {:?}",
                    keys[row_no].join(":"),
                    file
                );
            }
            values[row_no][sample_no] = Some(table.cell(row, key_idx[4]).to_string());
        }
    }

    let rows = keys
        .into_iter()
        .zip(values)
        .map(|(key, values)| {
            key.into_iter()
                .chain(values.into_iter().map(Option::unwrap_or_default))
                .collect()
        })
        .collect();
    Ok(Table { headers, rows })
}
