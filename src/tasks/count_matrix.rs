use anyhow::{Context, Result, bail};
use measure_time::info_time;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::io::Write;

use super::{Step, check_inputs};
use crate::config::{Config, Input, Output};
use crate::counts::{CountMatrix as Matrix, load_sample, write_strand_table};
use crate::io::open_output;
use crate::manifest::Manifest;
use crate::strandedness::{Convention, InferenceSettings, Layout, Orientation};

fn default_fraction_threshold() -> f64 {
    0.8
}

fn default_infer_strandedness() -> bool {
    true
}

fn default_counts_filename() -> String {
    "counts_matrix.tsv".to_string()
}

fn default_strand_filename() -> String {
    "sample_strandedness.tsv".to_string()
}

/// Strand resolved, annotated gene x sample count matrix from STAR style
/// per-gene count files.
#[derive(Deserialize, Debug, Clone, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CountMatrix {
    #[serde(default = "default_fraction_threshold")]
    #[validate(minimum = 0.5)]
    #[validate(maximum = 1.0)]
    fraction_threshold: f64,
    /// false: take the declared strandedness from the manifest where usable
    #[serde(default = "default_infer_strandedness")]
    infer_strandedness: bool,
    strandinfo_column: Option<String>,
    #[serde(default)]
    layout: Layout,
    #[serde(default)]
    convention: Convention,
    #[serde(default)]
    orientation: Orientation,
    #[serde(default = "default_counts_filename")]
    counts_filename: String,
    #[serde(default = "default_strand_filename")]
    strand_filename: String,
}

impl CountMatrix {
    fn settings(&self) -> InferenceSettings {
        InferenceSettings {
            threshold: self.fraction_threshold,
            layout: self.layout,
            convention: self.convention,
            orientation: self.orientation,
        }
    }

    fn load_manifest(&self, input: &Input) -> Result<Option<Manifest>> {
        if self.infer_strandedness {
            return Ok(None);
        }
        let (Some(manifest), Some(column)) = (&input.manifest, &self.strandinfo_column) else {
            return Ok(None);
        };
        Manifest::load(manifest, column)
            .with_context(|| format!("Failed to read manifest {}", manifest))
    }
}

impl Step for CountMatrix {
    fn check(&self, config: &Config) -> Result<()> {
        check_inputs(
            config,
            &["gtf", "regions", "counts", "strandedness"],
            &["manifest"],
        )?;
        self.validate()
            .map_err(|e| anyhow::anyhow!("Invalid count_matrix settings: {}", e))?;
        config.input.sample_inputs()?;
        if !self.infer_strandedness {
            if self.strandinfo_column.is_none() {
                bail!("infer_strandedness = false requires strandinfo_column to be set.");
            }
            if config.input.manifest.is_none() {
                log::warn!(
                    "infer_strandedness = false, but no input.manifest given. Using inferred strandedness."
                );
            }
        }
        Ok(())
    }

    fn run(&mut self, input: &Input, output: &Output) -> Result<()> {
        info_time!("count matrix");
        let annotation = input.read_gtf()?;
        let regions = input.read_regions()?;
        log::info!("Loaded annotation for {} genes", annotation.len());
        let manifest = self.load_manifest(input)?;
        let settings = self.settings();
        let samples = input.sample_inputs()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .build()
            .context("Failed to build thread pool")?;
        // collect keeps input order, not completion order
        let loaded: Vec<_> = pool.install(|| {
            samples
                .par_iter()
                .map(|sample| load_sample(sample, &settings, manifest.as_ref()))
                .collect()
        });

        let mut strands = Vec::new();
        let mut columns = Vec::new();
        for sample in loaded {
            if let Some((strand, counts)) = sample? {
                strands.push(strand);
                columns.push(counts);
            }
        }
        if columns.is_empty() {
            bail!("None of the {} samples had both a count and a strandedness file.", samples.len());
        }

        let mut matrix = Matrix::outer_join(columns)?;
        matrix.drop_accounting_rows();

        let mut out_buffer = open_output(&output.directory, &self.counts_filename)?;
        matrix.write_annotated(&mut out_buffer, &annotation, &regions)?;
        out_buffer.flush().context("Failed to flush count matrix")?;

        let mut out_buffer = open_output(&output.directory, &self.strand_filename)?;
        write_strand_table(&mut out_buffer, &strands)?;
        out_buffer.flush().context("Failed to flush strand table")?;

        log::info!(
            "Wrote {} genes x {} samples to {}/{}",
            matrix.genes().len(),
            matrix.samples().len(),
            output.directory,
            self.counts_filename
        );
        Ok(())
    }
}
