use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::io::Write;

use super::{Step, check_inputs};
use crate::config::{Config, Input, Output};
use crate::io::open_output;
use crate::strandedness::{Layout, Orientation, StrandCall, read_type_rule};
use crate::table::Table;

/// The RSeQC read type rule matching a sample's used strandedness,
/// looked up in a strand table written by `count_matrix`.
#[derive(Deserialize, Debug, Clone, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StrandRule {
    sample: String,
    layout: Layout,
    /// no default, the conventions in use disagree
    orientation: Orientation,
}

impl Step for StrandRule {
    fn check(&self, config: &Config) -> Result<()> {
        check_inputs(config, &["strand_table"], &[])?;
        if self.layout == Layout::Auto {
            bail!("strand_rule needs an explicit layout (Paired or Single).");
        }
        Ok(())
    }

    fn run(&mut self, input: &Input, output: &Output) -> Result<()> {
        let filename = input
            .strand_table
            .as_ref()
            .context("No strand_table defined in input")?;
        let table = Table::read(filename, b'\t')?;
        let (Some(sample_idx), Some(used_idx)) = (
            table.column_index("sample"),
            table.column_index("used_strand"),
        ) else {
            bail!(
                "{} must contain 'sample' and 'used_strand' columns.",
                filename
            );
        };
        let row = (0..table.rows.len())
            .find(|row| table.cell(*row, sample_idx) == self.sample)
            .with_context(|| format!("Sample '{}' not found in {}.", self.sample, filename))?;
        let used = table.cell(row, used_idx);
        let call = StrandCall::parse(used).with_context(|| {
            format!(
                "Unknown used_strand '{}' for sample '{}'.",
                used, self.sample
            )
        })?;
        let rule = read_type_rule(call, self.layout, self.orientation)
            .context("No read type rule without a layout")?;

        println!("{}", rule);
        let mut out_buffer =
            open_output(&output.directory, &format!("{}.strand_rule.txt", self.sample))?;
        out_buffer
            .write_all(format!("{}\n", rule).as_bytes())
            .context("Failed to write strand rule")?;
        out_buffer.flush()?;
        Ok(())
    }
}
