use anyhow::{Context, Result, bail};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

pub fn open_file(filename: impl AsRef<Path>) -> Result<Box<dyn Read + Send>> {
    let fh = ex::fs::File::open(filename.as_ref())
        .context(format!("Could not open file {:?}", filename.as_ref()))?;
    let wrapped = niffler::send::get_reader(Box::new(fh))?;
    Ok(wrapped.0)
}

pub fn read_to_string(filename: impl AsRef<Path>) -> Result<String> {
    let mut out = String::new();
    open_file(filename.as_ref())?
        .read_to_string(&mut out)
        .with_context(|| format!("Could not read {:?} as utf-8 text", filename.as_ref()))?;
    Ok(out)
}

/// Create `directory` (if necessary) and a buffered writer for `filename` inside it.
pub fn open_output(
    directory: impl AsRef<Path>,
    filename: &str,
) -> Result<std::io::BufWriter<ex::fs::File>> {
    ex::fs::create_dir_all(directory.as_ref())?;
    let output_file = ex::fs::File::create(directory.as_ref().join(filename))?;
    Ok(std::io::BufWriter::new(output_file))
}

/// A tab separated csv reader, optionally with a header row.
pub fn tsv_reader(
    filename: impl AsRef<Path>,
    delimiter: u8,
    has_headers: bool,
) -> Result<csv::Reader<Box<dyn Read + Send>>> {
    Ok(csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(open_file(filename)?))
}

pub fn tsv_writer<W: Write>(out: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(out)
}

/// Guess the delimiter of a small delimited table from its header line.
/// Picks the most frequent of `,` `\t` `;` `|`.
pub fn sniff_delimiter(filename: impl AsRef<Path>) -> Result<u8> {
    let mut header = String::new();
    BufReader::new(open_file(filename.as_ref())?)
        .read_line(&mut header)
        .with_context(|| format!("Failed to read header of {:?}", filename.as_ref()))?;
    if header.trim().is_empty() {
        bail!("File {:?} is empty, no header found", filename.as_ref());
    }
    let best = [b',', b'\t', b';', b'|']
        .into_iter()
        .map(|candidate| (candidate, header.bytes().filter(|b| *b == candidate).count()))
        .max_by_key(|(_, count)| *count)
        .filter(|(_, count)| *count > 0)
        .map(|(candidate, _)| candidate);
    // single column tables have no delimiter at all
    Ok(best.unwrap_or(b','))
}

/// Python-ish float formatting: shortest round-trip representation,
/// but integral values keep a trailing `.0`.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
