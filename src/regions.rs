use crate::io::open_file;
use anyhow::{Context, Result, bail};
use std::{
    collections::HashMap,
    io::{BufRead, BufReader, Read},
    path::Path,
};

/// chromosome / contig name -> species (or region) label
#[derive(Debug, Default)]
pub struct ChromToSpecies {
    labels: HashMap<String, String>,
}

impl ChromToSpecies {
    pub fn species(&self, chromosome: &str) -> Option<&str> {
        self.labels.get(chromosome).map(String::as_str)
    }
}

pub fn parse_regions(filename: impl AsRef<Path>) -> Result<ChromToSpecies> {
    let filename = filename.as_ref();
    parse_regions_from_reader(open_file(filename)?)
        .with_context(|| format!("Failed to parse regions file {:?}", filename))
}

/// `species<TAB>chrA chrB ...`, one species per line.
pub fn parse_regions_from_reader(reader: impl Read) -> Result<ChromToSpecies> {
    let mut labels = HashMap::new();
    for (line_no, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split('\t');
        let species = parts.next().unwrap_or_default();
        let Some(chromosomes) = parts.next() else {
            bail!("Regions line {} has no chromosome column", line_no + 1);
        };
        for chrom in chromosomes.split_whitespace() {
            labels.insert(chrom.to_string(), species.to_string());
        }
    }
    Ok(ChromToSpecies { labels })
}
