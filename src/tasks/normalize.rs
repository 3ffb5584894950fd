use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{Step, check_inputs};
use crate::config::{Config, Input, Output, u8_from_char_or_number};
use crate::io::open_output;
use crate::normalize::{counts_to_rpkm_tpm, read_sample_sheet};
use crate::table::Table;

fn default_length_column() -> String {
    "gene_length_kb".to_string()
}

fn default_separator() -> u8 {
    b'\t'
}

fn default_rpkm_filename() -> String {
    "counts_matrix.rpkm.tsv".to_string()
}

fn default_tpm_filename() -> String {
    "counts_matrix.tpm.tsv".to_string()
}

/// RPKM and TPM from an annotated raw count matrix.
#[derive(Deserialize, Debug, Clone, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Normalize {
    #[serde(default = "default_length_column")]
    length_column: String,
    /// of both the matrix and the sample sheet
    #[serde(
        default = "default_separator",
        deserialize_with = "u8_from_char_or_number"
    )]
    separator: u8,
    #[serde(default = "default_rpkm_filename")]
    rpkm_filename: String,
    #[serde(default = "default_tpm_filename")]
    tpm_filename: String,
}

impl Step for Normalize {
    fn check(&self, config: &Config) -> Result<()> {
        check_inputs(config, &["matrix", "sample_sheet"], &[])
    }

    fn run(&mut self, input: &Input, output: &Output) -> Result<()> {
        let matrix_path = input.matrix.as_ref().context("No matrix defined in input")?;
        let sheet_path = input
            .sample_sheet
            .as_ref()
            .context("No sample_sheet defined in input")?;
        let matrix = Table::read(matrix_path, self.separator)?;
        let samples = read_sample_sheet(sheet_path, self.separator)?;
        log::info!(
            "Normalizing {} samples over {} genes",
            samples.len(),
            matrix.rows.len()
        );

        let (rpkm, tpm) = counts_to_rpkm_tpm(&matrix, &self.length_column, &samples)
            .with_context(|| format!("Failed to normalize {}", matrix_path))?;
        rpkm.write(open_output(&output.directory, &self.rpkm_filename)?)
            .context("Failed to write RPKM matrix")?;
        tpm.write(open_output(&output.directory, &self.tpm_filename)?)
            .context("Failed to write TPM matrix")?;
        Ok(())
    }
}
