use crate::io::{open_file, round3};
use anyhow::{Context, Result, bail};
use std::{
    collections::HashMap,
    io::{BufRead, BufReader, Read},
    path::Path,
};

pub const NA: &str = "NA";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Strand {
    #[strum(to_string = "+")]
    Plus,
    #[strum(to_string = "-")]
    Minus,
    #[strum(to_string = ".")]
    Unstranded,
}

impl Strand {
    fn from_gtf(value: &str) -> Strand {
        match value {
            "+" => Strand::Plus,
            "-" => Strand::Minus,
            _ => Strand::Unstranded,
        }
    }
}

/// Where a gene sits, as given by its `gene` line. 1-based, inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct Locus {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneRecord {
    pub gene_id: String,
    pub gene_name: String,
    pub gene_type: String,
    /// None for genes that only occur on exon lines
    pub locus: Option<Locus>,
    /// None for genes without any attributable exon
    pub length_kb: Option<f64>,
}

impl GeneRecord {
    fn length_only(gene_id: &str, length_kb: f64) -> GeneRecord {
        GeneRecord {
            gene_id: gene_id.to_string(),
            gene_name: NA.to_string(),
            gene_type: NA.to_string(),
            locus: None,
            length_kb: Some(length_kb),
        }
    }
}

/// Gene id -> record lookup. Built once, read-only afterwards.
#[derive(Debug, Default)]
pub struct GeneAnnotation {
    genes: HashMap<String, GeneRecord>,
}

impl GeneAnnotation {
    pub fn get(&self, gene_id: &str) -> Option<&GeneRecord> {
        self.genes.get(gene_id)
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }
}

/// Merge inclusive intervals. An interval is folded into the running one
/// when it starts at or before the running end.
pub fn merge_intervals(mut intervals: Vec<(u64, u64)>) -> Vec<(u64, u64)> {
    intervals.sort_unstable();
    let mut merged: Vec<(u64, u64)> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(last) if start <= last.1 => {
                last.1 = last.1.max(end);
            }
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Number of bases covered by a transcript's exons.
pub fn transcript_span(exons: &[(u64, u64)]) -> u64 {
    merge_intervals(exons.to_vec())
        .iter()
        .map(|(start, end)| end - start + 1)
        .sum()
}

/// `key "value"; key value;` -> pairs. Tokens without a value are skipped.
fn parse_attributes(attributes: &str) -> HashMap<&str, &str> {
    attributes
        .split_terminator(';')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .filter_map(|attr_value| {
            let mut kv = attr_value.splitn(2, char::is_whitespace);
            let key = kv.next()?;
            let value = kv.next()?.trim().trim_matches('"');
            Some((key, value))
        })
        .collect()
}

/// One accepted GTF line. Coordinates 1-based, inclusive.
struct GtfRecord<'a> {
    chromosome: &'a str,
    feature: &'a str,
    start: u64,
    end: u64,
    strand: Strand,
    attributes: HashMap<&'a str, &'a str>,
}

/// Calls `handle` for every line whose feature is in `features`.
/// Every non-comment line must have 9 fields, accepted lines need start <= end.
fn for_each_record(
    reader: impl Read,
    features: &[&str],
    mut handle: impl FnMut(&GtfRecord<'_>) -> Result<()>,
) -> Result<()> {
    let f = BufReader::new(reader);
    for (line_no, line) in f.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.starts_with('#') || line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() != 9 {
            bail!(
                "Malformed GTF line {}: expected 9 tab separated fields, found {}",
                line_no + 1,
                parts.len()
            );
        }
        if !features.contains(&parts[2]) {
            continue;
        }
        let start: u64 = parts[3]
            .parse()
            .with_context(|| format!("Invalid start on GTF line {}", line_no + 1))?;
        let end: u64 = parts[4]
            .parse()
            .with_context(|| format!("Invalid end on GTF line {}", line_no + 1))?;
        if start > end {
            bail!(
                "Malformed GTF line {}: start {} is after end {}",
                line_no + 1,
                start,
                end
            );
        }
        handle(&GtfRecord {
            chromosome: parts[0],
            feature: parts[2],
            start,
            end,
            strand: Strand::from_gtf(parts[6]),
            attributes: parse_attributes(parts[8]),
        })?;
    }
    Ok(())
}

pub fn parse_gtf(filename: impl AsRef<Path>) -> Result<GeneAnnotation> {
    let filename = filename.as_ref();
    parse_gtf_from_reader(open_file(filename)?)
        .with_context(|| format!("Failed to parse GTF file {:?}", filename))
}

pub fn parse_gtf_from_reader(reader: impl Read) -> Result<GeneAnnotation> {
    let mut genes: HashMap<String, GeneRecord> = HashMap::new();
    // gene_id -> transcript_id -> exons
    let mut exons: HashMap<String, HashMap<String, Vec<(u64, u64)>>> = HashMap::new();

    for_each_record(reader, &["gene", "exon"], |record| {
        let attributes = &record.attributes;
        let Some(gene_id) = attributes.get("gene_id") else {
            return Ok(());
        };
        if record.feature == "gene" {
            genes.insert(
                gene_id.to_string(),
                GeneRecord {
                    gene_id: gene_id.to_string(),
                    gene_name: attributes.get("gene_name").unwrap_or(&NA).to_string(),
                    gene_type: attributes.get("gene_type").unwrap_or(&NA).to_string(),
                    locus: Some(Locus {
                        chromosome: record.chromosome.to_string(),
                        start: record.start,
                        end: record.end,
                        strand: record.strand,
                    }),
                    length_kb: None,
                },
            );
        } else if let Some(transcript_id) = attributes.get("transcript_id") {
            exons
                .entry(gene_id.to_string())
                .or_default()
                .entry(transcript_id.to_string())
                .or_default()
                .push((record.start, record.end));
        }
        Ok(())
    })?;

    for (gene_id, transcripts) in exons {
        let longest = transcripts
            .values()
            .map(|t| transcript_span(t))
            .max()
            .unwrap_or(0);
        let length_kb = round3(longest as f64 / 1000.0);
        genes
            .entry(gene_id)
            .and_modify(|record| record.length_kb = Some(length_kb))
            .or_insert_with_key(|gene_id| GeneRecord::length_only(gene_id, length_kb));
    }
    log::debug!("Parsed {} genes from GTF", genes.len());

    Ok(GeneAnnotation { genes })
}

/// The gene a transcript belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptGene {
    pub gene_id: String,
    /// falls back to the gene id
    pub gene_name: String,
}

/// transcript_id -> gene, from the `transcript` lines of a GTF.
#[derive(Debug, Default)]
pub struct TranscriptAnnotation {
    transcripts: HashMap<String, TranscriptGene>,
}

impl TranscriptAnnotation {
    pub fn get(&self, transcript_id: &str) -> Option<&TranscriptGene> {
        self.transcripts.get(transcript_id)
    }

    pub fn len(&self) -> usize {
        self.transcripts.len()
    }
}

pub fn parse_transcripts(filename: impl AsRef<Path>) -> Result<TranscriptAnnotation> {
    let filename = filename.as_ref();
    parse_transcripts_from_reader(open_file(filename)?)
        .with_context(|| format!("Failed to parse GTF file {:?}", filename))
}

pub fn parse_transcripts_from_reader(reader: impl Read) -> Result<TranscriptAnnotation> {
    let mut transcripts = HashMap::new();
    for_each_record(reader, &["transcript"], |record| {
        let Some(transcript_id) = record.attributes.get("transcript_id") else {
            return Ok(());
        };
        let gene_id = record.attributes.get("gene_id").unwrap_or(&NA).to_string();
        let gene_name = record
            .attributes
            .get("gene_name")
            .map(|name| name.to_string())
            .unwrap_or_else(|| gene_id.clone());
        // later lines win
        transcripts.insert(
            transcript_id.to_string(),
            TranscriptGene { gene_id, gene_name },
        );
        Ok(())
    })?;
    log::debug!("Parsed {} transcripts from GTF", transcripts.len());
    Ok(TranscriptAnnotation { transcripts })
}

#[cfg(test)]
mod test {
    use super::*;

    const GTF: &str = "#!genome-build test
chr1\ttest\tgene\t100\t300\t.\t+\t.\tgene_id \"G1\"; gene_name \"Alpha\"; gene_type \"protein_coding\";
chr1\ttest\ttranscript\t100\t300\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
chr1\ttest\texon\t100\t150\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
chr1\ttest\texon\t140\t200\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
chr1\ttest\texon\t250\t300\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
chr1\ttest\texon\t100\t120\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T2\";
chr2\ttest\tgene\t5\t50\t.\t-\t.\tgene_id G2;
chr2\ttest\texon\t10\t20\t.\t-\t.\tgene_id \"G3\"; transcript_id \"T3\";
chr2\ttest\texon\t10\t20\t.\t-\t.\tgene_id \"G4\";
";

    #[test]
    fn test_merge_intervals() {
        let merged = merge_intervals(vec![(9, 12), (2, 5), (3, 4), (5, 7), (10, 15), (16, 21)]);
        assert_eq!(merged, vec![(2, 7), (9, 15), (16, 21)]);
        // idempotent
        assert_eq!(merge_intervals(merged.clone()), merged);
        assert_eq!(merge_intervals(Vec::new()), Vec::new());
    }

    #[test]
    fn test_adjacent_intervals_stay_separate() {
        assert_eq!(merge_intervals(vec![(1, 10), (11, 20)]), vec![(1, 10), (11, 20)]);
        assert_eq!(transcript_span(&[(1, 10), (11, 20)]), 20);
        assert_eq!(transcript_span(&[(1, 10), (10, 20)]), 20);
    }

    #[test]
    fn test_parse_gtf() {
        let annotation = parse_gtf_from_reader(GTF.as_bytes()).unwrap();
        assert_eq!(annotation.len(), 3);

        let g1 = annotation.get("G1").unwrap();
        assert_eq!(g1.gene_name, "Alpha");
        assert_eq!(g1.gene_type, "protein_coding");
        let locus = g1.locus.as_ref().unwrap();
        assert_eq!(locus.chromosome, "chr1");
        assert_eq!((locus.start, locus.end), (100, 300));
        assert_eq!(locus.strand, Strand::Plus);
        // T1: [100,200] + [250,300] = 101 + 51; T2 = 21
        assert_eq!(g1.length_kb, Some(0.152));

        // unquoted attributes, no exons, no name
        let g2 = annotation.get("G2").unwrap();
        assert_eq!(g2.gene_name, NA);
        assert_eq!(g2.gene_type, NA);
        assert_eq!(g2.locus.as_ref().unwrap().strand, Strand::Minus);
        assert_eq!(g2.length_kb, None);

        // exon only
        let g3 = annotation.get("G3").unwrap();
        assert_eq!(g3.locus, None);
        assert_eq!(g3.gene_name, NA);
        assert_eq!(g3.length_kb, Some(0.011));

        // exon without transcript_id is dropped
        assert!(annotation.get("G4").is_none());
    }

    #[test]
    fn test_longest_transcript_not_sum() {
        let gtf = "chr1\tt\texon\t100\t150\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
chr1\tt\texon\t160\t200\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T2\";
";
        let annotation = parse_gtf_from_reader(gtf.as_bytes()).unwrap();
        assert_eq!(annotation.get("G1").unwrap().length_kb, Some(0.051));
    }

    #[test]
    fn test_malformed_line_is_fatal() {
        let gtf = "chr1\tt\tgene\t100\t150\t.\t+\tgene_id \"G1\";\n";
        let err = parse_gtf_from_reader(gtf.as_bytes()).unwrap_err();
        assert!(format!("{:?}", err).contains("line 1"));
    }

    #[test]
    fn test_reversed_coordinates_are_fatal() {
        let gtf = "chr1\tt\texon\t200\t100\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";\n";
        let err = parse_gtf_from_reader(gtf.as_bytes()).unwrap_err();
        assert!(format!("{:?}", err).contains("line 1: start 200 is after end 100"));
        let gtf = format!("{}chr1\tt\tgene\t9\t8\t.\t+\t.\tgene_id \"G2\";\n", GTF);
        let err = parse_gtf_from_reader(gtf.as_bytes()).unwrap_err();
        assert!(format!("{:?}", err).contains("line 11"));
        // single base features are fine
        let gtf = "chr1\tt\texon\t7\t7\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";\n";
        let annotation = parse_gtf_from_reader(gtf.as_bytes()).unwrap();
        assert_eq!(annotation.get("G1").unwrap().length_kb, Some(0.001));
    }

    #[test]
    fn test_parse_transcripts() {
        let gtf = format!(
            "{}chr3\ttest\ttranscript\t1\t9\t.\t+\t.\tgene_id \"G5\"; transcript_id \"T5\";
chr3\ttest\ttranscript\t1\t9\t.\t+\t.\ttranscript_id \"T6\";
chr3\ttest\ttranscript\t1\t9\t.\t+\t.\tgene_id \"G7\";
",
            GTF
        );
        let transcripts = parse_transcripts_from_reader(gtf.as_bytes()).unwrap();
        assert_eq!(transcripts.len(), 3);
        assert_eq!(
            transcripts.get("T1"),
            Some(&TranscriptGene {
                gene_id: "G1".to_string(),
                gene_name: "G1".to_string()
            })
        );
        assert_eq!(transcripts.get("T5").unwrap().gene_name, "G5");
        assert_eq!(transcripts.get("T6").unwrap().gene_id, NA);
        assert_eq!(transcripts.get("T6").unwrap().gene_name, NA);
        // only transcript lines count
        assert!(transcripts.get("T3").is_none());
    }

    #[test]
    fn test_parse_attributes() {
        let attrs = parse_attributes("gene_id \"A\"; lonely; gene_name B ;  tag \"x y\";");
        assert_eq!(attrs.get("gene_id"), Some(&"A"));
        assert_eq!(attrs.get("gene_name"), Some(&"B"));
        assert_eq!(attrs.get("tag"), Some(&"x y"));
        assert!(!attrs.contains_key("lonely"));
    }
}
