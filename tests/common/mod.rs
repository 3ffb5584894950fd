#![allow(dead_code)]
use std::path::{Path, PathBuf};

pub struct TestDir {
    pub dir: tempfile::TempDir,
}

impl TestDir {
    pub fn new() -> TestDir {
        TestDir {
            dir: tempfile::tempdir().expect("make tempdir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `content` to `name`, return the absolute path as string for the toml.
    pub fn write(&self, name: &str, content: &str) -> String {
        let path = self.path(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path.to_string_lossy().to_string()
    }

    pub fn output_dir(&self) -> String {
        self.path("output").to_string_lossy().to_string()
    }

    pub fn read_output(&self, name: &str) -> String {
        std::fs::read_to_string(self.path("output").join(name))
            .unwrap_or_else(|_| panic!("output {} missing", name))
    }

    pub fn run(&self, toml: &str) -> anyhow::Result<()> {
        let config = self.path("input.toml");
        std::fs::write(&config, toml).unwrap();
        mbf_count_matrix::run(&config)
    }
}

pub fn toml_list(paths: &[&str]) -> String {
    format!(
        "[{}]",
        paths
            .iter()
            .map(|p| format!("{:?}", p))
            .collect::<Vec<_>>()
            .join(", ")
    )
}

pub fn exists(path: &Path) -> bool {
    path.exists()
}

pub fn pe_report(sense: f64, antisense: f64) -> String {
    format!(
        "\nThis is PairEnd Data
Fraction of reads failed to determine: {:.4}
Fraction of reads explained by \"1++,1--,2+-,2-+\": {:.4}
Fraction of reads explained by \"1+-,1-+,2++,2--\": {:.4}
",
        (1.0 - sense - antisense).max(0.0),
        sense,
        antisense
    )
}

pub const REGIONS: &str = "Homo_sapiens\tchr1 chr2\nERCC\tERCC-00002\n";
