use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{Step, check_inputs};
use crate::config::{Config, Input, Output};
use crate::gtf::parse_transcripts;
use crate::io::open_output;
use crate::transcripts::aggregate_transcripts;

fn default_fpkm_filename() -> String {
    "counts_matrix.transcript_level.fpkm.tsv".to_string()
}

fn default_tpm_filename() -> String {
    "counts_matrix.transcript_level.tpm.tsv".to_string()
}

fn default_fragcount_filename() -> String {
    "counts_matrix.transcript_level.fragcount.tsv".to_string()
}

/// FPKM, TPM and fragment count matrices over transcripts seen in every sample,
/// annotated with gene id and name from the GTF's transcript lines.
#[derive(Deserialize, Debug, Clone, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AggregateTranscripts {
    #[serde(default = "default_fpkm_filename")]
    fpkm_filename: String,
    #[serde(default = "default_tpm_filename")]
    tpm_filename: String,
    #[serde(default = "default_fragcount_filename")]
    fragcount_filename: String,
}

impl Step for AggregateTranscripts {
    fn check(&self, config: &Config) -> Result<()> {
        check_inputs(config, &["gtf", "fpkm_tpm"], &[])
    }

    fn run(&mut self, input: &Input, output: &Output) -> Result<()> {
        let gtf = input.gtf.as_ref().context("No GTF defined in input")?;
        let annotation = parse_transcripts(gtf)?;
        log::info!("Loaded {} transcripts from GTF", annotation.len());
        let matrices = aggregate_transcripts(&input.fpkm_tpm, &annotation)?;
        for (table, filename) in [
            (&matrices.fpkm, &self.fpkm_filename),
            (&matrices.tpm, &self.tpm_filename),
            (&matrices.frag_count, &self.fragcount_filename),
        ] {
            table
                .write(open_output(&output.directory, filename)?)
                .with_context(|| format!("Failed to write {}", filename))?;
        }
        log::info!(
            "Aggregated {} transcripts from {} samples",
            matrices.fpkm.rows.len(),
            input.fpkm_tpm.len()
        );
        Ok(())
    }
}
