use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{Step, check_inputs};
use crate::config::{Config, Input, Output};
use crate::io::open_output;
use crate::normalize::fpkm_to_tpm;
use crate::table::Table;

fn default_output_filename() -> String {
    "fpkm_tpm.tsv".to_string()
}

/// Append a TPM column to an RSeQC FPKM_count.py table.
#[derive(Deserialize, Debug, Clone, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FpkmToTpm {
    #[serde(default = "default_output_filename")]
    output_filename: String,
}

impl Step for FpkmToTpm {
    fn check(&self, config: &Config) -> Result<()> {
        check_inputs(config, &["fpkm"], &[])
    }

    fn run(&mut self, input: &Input, output: &Output) -> Result<()> {
        let fpkm = input.fpkm.as_ref().context("No fpkm defined in input")?;
        let mut table = Table::read(fpkm, b'\t')?;
        fpkm_to_tpm(&mut table).with_context(|| format!("Failed to add TPM to {}", fpkm))?;
        table
            .write(open_output(&output.directory, &self.output_filename)?)
            .context("Failed to write TPM table")?;
        log::info!(
            "Wrote TPM-appended file: {}/{}",
            output.directory,
            self.output_filename
        );
        Ok(())
    }
}
