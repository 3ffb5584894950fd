use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer, Serialize};

use crate::counts::SampleInput;
use crate::gtf::GeneAnnotation;
use crate::regions::ChromToSpecies;
use crate::tasks::{Step, Task};

#[derive(Deserialize, Debug, Clone, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub input: Input,
    #[serde(alias = "step")]
    pub task: Task,
    pub output: Output,
}

#[derive(Deserialize, Debug, Clone, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Input {
    pub gtf: Option<String>,
    pub regions: Option<String>,
    /// per-gene count files, one per sample
    #[serde(default)]
    pub counts: Vec<String>,
    /// infer_experiment.py reports, matched to `counts` by position
    #[serde(default)]
    pub strandedness: Vec<String>,
    pub manifest: Option<String>,
    pub matrix: Option<String>,
    pub sample_sheet: Option<String>,
    pub fpkm: Option<String>,
    #[serde(default)]
    pub tin: Vec<String>,
    /// per-sample FPKM tables with a TPM column, see fpkm_to_tpm
    #[serde(default)]
    pub fpkm_tpm: Vec<String>,
    pub strand_table: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Output {
    pub directory: String,
}

impl Config {
    pub fn check(&self) -> Result<()> {
        self.task.check(self)?;
        Ok(())
    }
}

impl Input {
    /// Names of the inputs that were set in the configuration.
    pub fn provided(&self) -> Vec<&'static str> {
        [
            ("gtf", self.gtf.is_some()),
            ("regions", self.regions.is_some()),
            ("counts", !self.counts.is_empty()),
            ("strandedness", !self.strandedness.is_empty()),
            ("manifest", self.manifest.is_some()),
            ("matrix", self.matrix.is_some()),
            ("sample_sheet", self.sample_sheet.is_some()),
            ("fpkm", self.fpkm.is_some()),
            ("tin", !self.tin.is_empty()),
            ("fpkm_tpm", !self.fpkm_tpm.is_empty()),
            ("strand_table", self.strand_table.is_some()),
        ]
        .into_iter()
        .filter(|(_, set)| *set)
        .map(|(name, _)| name)
        .collect()
    }

    pub fn read_gtf(&self) -> Result<GeneAnnotation> {
        crate::gtf::parse_gtf(
            self.gtf
                .as_ref()
                .context("No GTF defined in input, but required")?,
        )
    }

    pub fn read_regions(&self) -> Result<ChromToSpecies> {
        crate::regions::parse_regions(
            self.regions
                .as_ref()
                .context("No regions file defined in input, but required")?,
        )
    }

    pub fn sample_inputs(&self) -> Result<Vec<SampleInput>> {
        if self.counts.len() != self.strandedness.len() {
            bail!(
                "input.counts lists {} files, but input.strandedness lists {}. They are paired by position.",
                self.counts.len(),
                self.strandedness.len()
            );
        }
        Ok(self
            .counts
            .iter()
            .zip(self.strandedness.iter())
            .map(|(counts, strandedness)| SampleInput {
                counts: PathBuf::from(counts),
                strandedness: PathBuf::from(strandedness),
            })
            .collect())
    }
}

/// Accept a column delimiter either as a one character string ("\t", ",")
/// or as its byte value.
pub fn u8_from_char_or_number<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;

    impl serde::de::Visitor<'_> for Visitor {
        type Value = u8;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("either a single character or a number 0..255")
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            u8::try_from(v).map_err(|_| E::custom("Number out of range for a delimiter byte"))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            u8::try_from(v).map_err(|_| E::custom("Number out of range for a delimiter byte"))
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            match v.as_bytes() {
                [] => Err(E::custom("empty delimiter")),
                [single] => Ok(*single),
                _ => Err(E::custom("delimiter should be exactly one (ascii) character long")),
            }
        }
    }

    deserializer.deserialize_any(Visitor)
}
