mod common;
use common::{TestDir, exists, pe_report};

const STRAND_TABLE: &str = "sample\tinferred_strand\tused_strand\tinference_fraction
s1\treverse\treverse\t0.95
s2\tforward\tunstranded\t0.1
";

fn strand_rule(td: &TestDir, sample: &str, layout: &str, orientation: &str) -> anyhow::Result<()> {
    let table = td.write("sample_strandedness.tsv", STRAND_TABLE);
    td.run(&format!(
        r#"
[input]
strand_table = "{table}"

[task]
mode = "strand_rule"
sample = "{sample}"
layout = "{layout}"
orientation = "{orientation}"

[output]
directory = "{out}"
"#,
        out = td.output_dir(),
    ))
}

#[test]
fn test_strand_rule() {
    let td = TestDir::new();
    strand_rule(&td, "s1", "Paired", "Standard").unwrap();
    assert_eq!(td.read_output("s1.strand_rule.txt"), "1+-,1-+,2++,2--\n");

    let td = TestDir::new();
    strand_rule(&td, "s1", "single", "swapped").unwrap();
    assert_eq!(td.read_output("s1.strand_rule.txt"), "++,--\n");

    let td = TestDir::new();
    strand_rule(&td, "s2", "PE", "standard").unwrap();
    assert_eq!(td.read_output("s2.strand_rule.txt"), "none\n");
}

#[test]
fn test_strand_rule_errors() {
    let td = TestDir::new();
    let err = strand_rule(&td, "s9", "Paired", "Standard").unwrap_err();
    assert!(format!("{:?}", err).contains("Sample 's9' not found"));

    let td = TestDir::new();
    let err = strand_rule(&td, "s1", "Auto", "Standard").unwrap_err();
    assert!(format!("{:?}", err).contains("explicit layout"));
    assert!(!exists(&td.path("output/s1.strand_rule.txt")));

    let td = TestDir::new();
    let err = strand_rule(&td, "s1", "Paired", "upside_down").unwrap_err();
    assert!(format!("{:?}", err).contains("Could not parse toml file"));
}

#[test]
fn test_aggregate_tin() {
    let td = TestDir::new();
    let a = td.write(
        "KOS_R1.Aligned.sortedByCoord.out.tin.xls",
        "geneID\tchrom\ttx_start\ttx_end\tTIN\nT1\tchr1\t0\t100\t80.5\nT2\tchr1\t200\t300\t0.0\n",
    );
    let b = td.write(
        "KOS_R2.Aligned.sortedByCoord.out.tin.xls",
        "geneID\tchrom\ttx_start\ttx_end\tTIN\nT2\tchr1\t200\t300\t11.0\n",
    );
    td.run(&format!(
        r#"
[input]
tin = ["{a}", "{b}"]

[task]
mode = "aggregate_tin"

[output]
directory = "{out}"
"#,
        out = td.output_dir(),
    ))
    .unwrap();
    assert_eq!(
        td.read_output("aggregate_tin.tsv"),
        "geneID\tchrom\ttx_start\ttx_end\tKOS_R1\tKOS_R2
T1\tchr1\t0\t100\t80.5\t
T2\tchr1\t200\t300\t0.0\t11.0
"
    );
}

fn count_matrix_config(td: &TestDir, task_extra: &str, input_extra: &str) -> String {
    let gtf = td.write(
        "ref.gtf",
        "chr1\tt\tgene\t1\t10\t.\t+\t.\tgene_id \"G1\";\n",
    );
    let regions = td.write("regions.tsv", common::REGIONS);
    let counts = td.write("a.tab", "G1\t5\t3\t2\n");
    let report = td.write("a.txt", &pe_report(0.5, 0.5));
    format!(
        r#"
[input]
gtf = "{gtf}"
regions = "{regions}"
counts = ["{counts}"]
strandedness = ["{report}"]
{input_extra}

[task]
mode = "count_matrix"
{task_extra}

[output]
directory = "{out}"
"#,
        out = td.output_dir(),
    )
}

#[test]
fn test_config_superfluous_input() {
    let td = TestDir::new();
    let err = td
        .run(&count_matrix_config(&td, "", "fpkm = \"x.xls\""))
        .unwrap_err();
    assert!(format!("{:?}", err).contains("input.fpkm is not used by mode CountMatrix"));
}

#[test]
fn test_config_missing_input() {
    let td = TestDir::new();
    let err = td
        .run(&format!(
            r#"
[task]
mode = "fpkm_to_tpm"

[output]
directory = "{out}"
"#,
            out = td.output_dir(),
        ))
        .unwrap_err();
    assert!(format!("{:?}", err).contains("input.fpkm is required"));
}

#[test]
fn test_config_unpaired_sample_files() {
    let td = TestDir::new();
    let gtf = td.write(
        "ref.gtf",
        "chr1\tt\tgene\t1\t10\t.\t+\t.\tgene_id \"G1\";\n",
    );
    let regions = td.write("regions.tsv", common::REGIONS);
    let err = td
        .run(&format!(
            r#"
[input]
gtf = "{gtf}"
regions = "{regions}"
counts = ["a.tab", "b.tab"]
strandedness = ["a.txt"]

[task]
mode = "count_matrix"

[output]
directory = "{out}"
"#,
            out = td.output_dir(),
        ))
        .unwrap_err();
    assert!(format!("{:?}", err).contains("input.counts lists 2 files"));
}

#[test]
fn test_config_threshold_out_of_range() {
    let td = TestDir::new();
    let err = td
        .run(&count_matrix_config(&td, "fraction_threshold = 0.3", ""))
        .unwrap_err();
    assert!(format!("{:?}", err).contains("Error in configuration"));
    assert!(!exists(&td.path("output/counts_matrix.tsv")));
}

#[test]
fn test_config_manifest_column_required() {
    let td = TestDir::new();
    let err = td
        .run(&count_matrix_config(&td, "infer_strandedness = false", ""))
        .unwrap_err();
    assert!(format!("{:?}", err).contains("strandinfo_column"));
}

#[test]
fn test_config_unknown_mode() {
    let td = TestDir::new();
    let err = td
        .run(&count_matrix_config(&td, "", "").replace("count_matrix", "quantify"))
        .unwrap_err();
    assert!(format!("{:?}", err).contains("Could not parse toml file"));
}

#[test]
fn test_aggregate_transcripts_after_fpkm_to_tpm() {
    let td = TestDir::new();
    let gtf = td.write(
        "ref.gtf",
        "chr1\tt\ttranscript\t1\t100\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\"; gene_name \"Alpha\";
chr1\tt\ttranscript\t201\t300\t.\t-\t.\tgene_id \"G2\"; transcript_id \"T2\";
",
    );
    let mut tables = Vec::new();
    for (sample, t1, t2) in [("S1", "3.0", "1.0"), ("S2", "1.0", "1.0")] {
        let fpkm = td.write(
            &format!("{}.FPKM.xls", sample),
            &format!(
                "#chrom\tst\tend\taccession\tmRNA_size\tgene_strand\tFrag_count\tFPMK\tFPKM
chr1\t0\t100\tT1\t100\t+\t3\t1.5\t{t1}
chr1\t200\t300\tT2\t100\t-\t1\t0.5\t{t2}
"
            ),
        );
        td.run(&format!(
            r#"
[input]
fpkm = "{fpkm}"

[task]
mode = "fpkm_to_tpm"
output_filename = "{sample}.rseqc_fpkm_tpm.tsv"

[output]
directory = "{out}"
"#,
            out = td.output_dir(),
        ))
        .unwrap();
        tables.push(
            td.path("output")
                .join(format!("{}.rseqc_fpkm_tpm.tsv", sample))
                .to_string_lossy()
                .to_string(),
        );
    }

    td.run(&format!(
        r#"
[input]
gtf = "{gtf}"
fpkm_tpm = {tables}

[task]
mode = "aggregate_transcripts"

[output]
directory = "{out}"
"#,
        tables = common::toml_list(&[&tables[0], &tables[1]]),
        out = td.output_dir(),
    ))
    .unwrap();
    let header = "chrom\tst\tend\ttranscript_id\tmRNA_size\tgene_strand\tgene_id\tgene_name\tS1\tS2\n";
    assert_eq!(
        td.read_output("counts_matrix.transcript_level.tpm.tsv"),
        format!(
            "{header}chr1\t0\t100\tT1\t100\t+\tG1\tAlpha\t750000.000000\t500000.000000
chr1\t200\t300\tT2\t100\t-\tG2\tG2\t250000.000000\t500000.000000
"
        )
    );
    assert_eq!(
        td.read_output("counts_matrix.transcript_level.fragcount.tsv"),
        format!("{header}chr1\t0\t100\tT1\t100\t+\tG1\tAlpha\t3\t3\nchr1\t200\t300\tT2\t100\t-\tG2\tG2\t1\t1\n")
    );
    assert!(exists(&td.path("output/counts_matrix.transcript_level.fpkm.tsv")));
}
