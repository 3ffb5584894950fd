//! Transcript level FPKM / TPM / fragment count matrices from per-sample
//! RSeQC tables with a TPM column.
use anyhow::{Context, Result, bail};
use std::{collections::HashMap, path::Path};

use crate::gtf::{NA, TranscriptAnnotation};
use crate::table::Table;

const KEY_COLUMNS: [&str; 6] = ["chrom", "st", "end", "accession", "mRNA_size", "gene_strand"];
const VALUE_COLUMNS: [&str; 3] = ["FPKM", "TPM", "Frag_count"];
const SAMPLE_SUFFIX: &str = ".rseqc_fpkm_tpm.tsv";

/// `x/KOS_R1.rseqc_fpkm_tpm.tsv` -> `KOS_R1`, otherwise the file stem.
pub fn transcript_sample_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    match name.strip_suffix(SAMPLE_SUFFIX) {
        Some(sample) => sample.to_string(),
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or(name),
    }
}

#[derive(Debug)]
pub struct TranscriptMatrices {
    pub fpkm: Table,
    pub tpm: Table,
    pub frag_count: Table,
}

/// Inner join of the per-sample tables on transcript coordinates.
/// Row order follows the first file, transcripts missing from any sample are dropped.
pub fn aggregate_transcripts(
    files: &[impl AsRef<Path>],
    annotation: &TranscriptAnnotation,
) -> Result<TranscriptMatrices> {
    let mut samples = Vec::new();
    // key -> FPKM, TPM, Frag_count per sample so far
    let mut rows: Vec<([String; 6], Vec<[String; 3]>)> = Vec::new();

    for (sample_no, file) in files.iter().enumerate() {
        let file = file.as_ref();
        let mut table = Table::read(file, b'\t')?;
        for header in table.headers.iter_mut() {
            *header = header.trim_start_matches('#').to_string();
        }
        let columns = KEY_COLUMNS
            .iter()
            .chain(VALUE_COLUMNS.iter())
            .map(|name| {
                table.column_index(name).with_context(|| {
                    format!(
                        "File {:?} lacks column '{}'. Columns found: {:?}",
                        file, name, table.headers
                    )
                })
            })
            .collect::<Result<Vec<usize>>>()?;

        let mut by_key: HashMap<[String; 6], [String; 3]> = HashMap::new();
        let mut order = Vec::new();
        for row in 0..table.rows.len() {
            let key: [String; 6] = std::array::from_fn(|ii| table.cell(row, columns[ii]).to_string());
            let values: [String; 3] =
                std::array::from_fn(|ii| table.cell(row, columns[KEY_COLUMNS.len() + ii]).to_string());
            if by_key.insert(key.clone(), values).is_some() {
                bail!(
                    "Transcript {} occurs more than once in {:?}",
                    key.join(":"),
                    file
                );
            }
            if sample_no == 0 {
                order.push(key);
            }
        }

        if sample_no == 0 {
            rows = order
                .into_iter()
                .map(|key| {
                    let values = by_key.remove(&key).unwrap_or_default();
                    (key, vec![values])
                })
                .collect();
        } else {
            rows = rows
                .into_iter()
                .filter_map(|(key, mut values)| {
                    values.push(by_key.remove(&key)?);
                    Some((key, values))
                })
                .collect();
        }
        samples.push(transcript_sample_name(file));
    }
    log::debug!(
        "{} transcripts present in all {} samples",
        rows.len(),
        samples.len()
    );

    let headers: Vec<String> = KEY_COLUMNS
        .iter()
        .map(|name| match *name {
            "accession" => "transcript_id".to_string(),
            name => name.to_string(),
        })
        .chain(["gene_id".to_string(), "gene_name".to_string()])
        .chain(samples.iter().cloned())
        .collect();
    let matrix = |value_no: usize| Table {
        headers: headers.clone(),
        rows: rows
            .iter()
            .map(|(key, values)| {
                let (gene_id, gene_name) = match annotation.get(&key[3]) {
                    Some(gene) => (gene.gene_id.clone(), gene.gene_name.clone()),
                    None => (NA.to_string(), NA.to_string()),
                };
                key.iter()
                    .cloned()
                    .chain([gene_id, gene_name])
                    .chain(values.iter().map(|v| v[value_no].clone()))
                    .collect()
            })
            .collect(),
    };
    Ok(TranscriptMatrices {
        fpkm: matrix(0),
        tpm: matrix(1),
        frag_count: matrix(2),
    })
}
