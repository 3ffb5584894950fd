use anyhow::{Context, Result};
use std::{collections::HashMap, path::Path};

use crate::io::{sniff_delimiter, tsv_reader};
use crate::strandedness::{Declared, StrandCall};

/// Declared strandedness per sample, keyed by the manifest's first column.
#[derive(Debug)]
pub struct Manifest {
    declared: HashMap<String, String>,
}

impl Manifest {
    /// Returns None (after warning) when the manifest lacks `strand_column`,
    /// in which case strandedness has to be inferred.
    pub fn load(filename: impl AsRef<Path>, strand_column: &str) -> Result<Option<Manifest>> {
        let filename = filename.as_ref();
        let delimiter = sniff_delimiter(filename)?;
        let mut reader = tsv_reader(filename, delimiter, true)?;
        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read manifest header {:?}", filename))?
            .clone();
        let Some(column) = headers.iter().position(|h| h.trim() == strand_column) else {
            log::warn!(
                "Column '{}' not found in manifest {:?}. Forcing inference.",
                strand_column,
                filename
            );
            return Ok(None);
        };

        let mut declared = HashMap::new();
        for record in reader.records() {
            let record =
                record.with_context(|| format!("Failed to read manifest {:?}", filename))?;
            let Some(sample) = record.get(0) else {
                continue;
            };
            // first row wins for duplicated samples
            declared
                .entry(sample.trim().to_string())
                .or_insert_with(|| record.get(column).unwrap_or_default().to_string());
        }
        log::debug!("Manifest lists {} samples", declared.len());
        Ok(Some(Manifest { declared }))
    }

    pub fn declared(&self, sample: &str) -> Declared {
        match self.declared.get(sample) {
            None => Declared::SampleMissing,
            Some(value) => match StrandCall::parse(value) {
                Some(call) => Declared::Valid(call),
                None => Declared::Invalid(value.trim().to_lowercase()),
            },
        }
    }
}
