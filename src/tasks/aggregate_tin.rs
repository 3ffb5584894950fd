use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{Step, check_inputs};
use crate::config::{Config, Input, Output};
use crate::io::open_output;
use crate::tin::aggregate_tin;

fn default_output_filename() -> String {
    "aggregate_tin.tsv".to_string()
}

/// One TIN column per sample, outer joined on transcript.
#[derive(Deserialize, Debug, Clone, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AggregateTin {
    #[serde(default = "default_output_filename")]
    output_filename: String,
}

impl Step for AggregateTin {
    fn check(&self, config: &Config) -> Result<()> {
        check_inputs(config, &["tin"], &[])
    }

    fn run(&mut self, input: &Input, output: &Output) -> Result<()> {
        let table = aggregate_tin(&input.tin)?;
        log::info!(
            "Aggregated {} transcripts from {} TIN files",
            table.rows.len(),
            input.tin.len()
        );
        table
            .write(open_output(&output.directory, &self.output_filename)?)
            .context("Failed to write TIN matrix")?;
        Ok(())
    }
}
