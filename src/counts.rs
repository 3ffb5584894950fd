//! Per-sample count loading and the gene x sample outer join.
use anyhow::{Context, Result, bail};
use itertools::Itertools;
use std::{
    collections::{HashMap, HashSet},
    io::Write,
    path::{Path, PathBuf},
};

use crate::gtf::{GeneAnnotation, NA};
use crate::io::{format_float, read_to_string, tsv_reader};
use crate::manifest::Manifest;
use crate::regions::ChromToSpecies;
use crate::strandedness::{
    Declared, InferenceSettings, SampleStrand, infer_from_report, reconcile,
};

/// Rows with this prefix are aligner bookkeeping (N_noFeature, N_ambiguous...), not genes.
pub const ACCOUNTING_PREFIX: &str = "N_";

#[derive(Debug, Clone)]
pub struct SampleInput {
    pub counts: PathBuf,
    pub strandedness: PathBuf,
}

/// `path/KOS_8h_R1.ReadsPerGene.out.tab` -> `KOS_8h_R1`
pub fn sample_name(count_file: &Path) -> String {
    count_file
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default()
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug)]
pub struct SampleCounts {
    pub name: String,
    pub counts: Vec<(String, u64)>,
}

/// Read gene id and one 0-based count column from a headerless, tab separated
/// per-gene count file.
pub fn read_count_column(filename: impl AsRef<Path>, column: usize) -> Result<Vec<(String, u64)>> {
    let filename = filename.as_ref();
    let mut reader = tsv_reader(filename, b'\t', false)?;
    let mut seen = HashSet::new();
    let mut res = Vec::new();
    for (line_no, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read {:?}", filename))?;
        let gene = record.get(0).unwrap_or_default();
        let Some(value) = record.get(column) else {
            bail!(
                "Line {} of {:?} has {} columns, count column {} requested",
                line_no + 1,
                filename,
                record.len(),
                column + 1
            );
        };
        let count: u64 = value.trim().parse().with_context(|| {
            format!(
                "Count '{}' on line {} of {:?} is not a non-negative integer",
                value,
                line_no + 1,
                filename
            )
        })?;
        if !seen.insert(gene.to_string()) {
            bail!("Gene {} occurs more than once in {:?}", gene, filename);
        }
        res.push((gene.to_string(), count));
    }
    Ok(res)
}

/// Resolve one sample's strandedness and load the matching count column.
/// Ok(None) if one of its input files is missing.
pub fn load_sample(
    input: &SampleInput,
    settings: &InferenceSettings,
    manifest: Option<&Manifest>,
) -> Result<Option<(SampleStrand, SampleCounts)>> {
    let name = sample_name(&input.counts);
    if !input.counts.exists() || !input.strandedness.exists() {
        log::warn!("Skipping {}, missing files", name);
        return Ok(None);
    }
    let report = read_to_string(&input.strandedness)?;
    let inference = infer_from_report(&report, settings);
    let declared = manifest
        .map(|m| m.declared(&name))
        .unwrap_or(Declared::NotConsulted);
    let strand = reconcile(&name, inference, declared);
    log::debug!(
        "{}: inferred {} ({}), using {}",
        name,
        strand.inferred,
        strand.fraction,
        strand.used
    );
    let counts = read_count_column(&input.counts, strand.used.count_column())
        .with_context(|| format!("Failed to load counts for sample {}", name))?;
    Ok(Some((strand, SampleCounts { name, counts })))
}

/// Genes x samples. Gene order is first appearance, sample order is input order.
#[derive(Debug)]
pub struct CountMatrix {
    samples: Vec<String>,
    genes: Vec<String>,
    rows: Vec<Vec<u64>>,
}

impl CountMatrix {
    /// Full outer join on gene id. Genes a sample does not list count 0 there.
    pub fn outer_join(columns: Vec<SampleCounts>) -> Result<CountMatrix> {
        let n_samples = columns.len();
        let mut samples = Vec::with_capacity(n_samples);
        let mut genes = Vec::new();
        let mut rows: Vec<Vec<u64>> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for (sample_no, column) in columns.into_iter().enumerate() {
            if samples.contains(&column.name) {
                bail!("Sample name {} occurs more than once", column.name);
            }
            samples.push(column.name);
            for (gene, count) in column.counts {
                let row_no = *index.entry(gene).or_insert_with_key(|gene| {
                    genes.push(gene.clone());
                    rows.push(vec![0; n_samples]);
                    genes.len() - 1
                });
                rows[row_no][sample_no] = count;
            }
        }
        Ok(CountMatrix {
            samples,
            genes,
            rows,
        })
    }

    pub fn drop_accounting_rows(&mut self) {
        let (genes, rows): (Vec<_>, Vec<_>) = std::mem::take(&mut self.genes)
            .into_iter()
            .zip(std::mem::take(&mut self.rows))
            .filter(|(gene, _)| !gene.starts_with(ACCOUNTING_PREFIX))
            .unzip();
        self.genes = genes;
        self.rows = rows;
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    #[cfg(test)]
    pub fn get(&self, gene: &str, sample: &str) -> Option<u64> {
        let row = self.genes.iter().position(|g| g == gene)?;
        let column = self.samples.iter().position(|s| s == sample)?;
        Some(self.rows[row][column])
    }

    pub fn write_annotated(
        &self,
        out: &mut impl Write,
        annotation: &GeneAnnotation,
        regions: &ChromToSpecies,
    ) -> Result<()> {
        out.write_all(
            format!(
                "gene\tspecies\tgene_chr\tgene_start\tgene_end\tgene_strand\tgene_length_kb\tgene_type\t{}\n",
                self.samples.iter().join("\t")
            )
            .as_bytes(),
        )
        .context("Failed to write header to count matrix")?;

        for (gene_id, counts) in self.genes.iter().zip(self.rows.iter()) {
            let annotation_columns = match annotation.get(gene_id) {
                Some(record) => {
                    let locus_columns = match &record.locus {
                        Some(locus) => [
                            regions.species(&locus.chromosome).unwrap_or(NA).to_string(),
                            locus.chromosome.clone(),
                            locus.start.to_string(),
                            locus.end.to_string(),
                            locus.strand.to_string(),
                        ],
                        None => std::array::from_fn(|_| NA.to_string()),
                    };
                    format!(
                        "{}|{}\t{}\t{}\t{}",
                        gene_id,
                        record.gene_name,
                        locus_columns.join("\t"),
                        record.length_kb.map(format_float).unwrap_or(NA.to_string()),
                        record.gene_type
                    )
                }
                None => format!("{}|{}\t{}", gene_id, gene_id, [NA; 7].join("\t")),
            };
            out.write_all(
                format!("{}\t{}\n", annotation_columns, counts.iter().join("\t")).as_bytes(),
            )
            .context("Failed to write counts to count matrix")?;
        }
        Ok(())
    }
}

pub fn write_strand_table(out: &mut impl Write, strands: &[SampleStrand]) -> Result<()> {
    out.write_all(b"sample\tinferred_strand\tused_strand\tinference_fraction\n")
        .context("Failed to write header to strand table")?;
    for strand in strands {
        out.write_all(
            format!(
                "{}\t{}\t{}\t{}\n",
                strand.sample,
                strand.inferred,
                strand.used,
                format_float(strand.fraction)
            )
            .as_bytes(),
        )
        .context("Failed to write strand table")?;
    }
    Ok(())
}
