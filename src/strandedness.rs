//! Library strandedness: inference from RSeQC `infer_experiment.py` reports and
//! reconciliation with a declared (manifest) value.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::io::round3;

const MARKER: &str = "Fraction of reads explained by";

static FRACTION_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r#"Fraction of reads explained by "(.*?)": (\d+\.\d+)"#)
        .expect("static regex is valid")
});

const PE_SENSE: &str = "1++,1--,2+-,2-+";
const PE_ANTISENSE: &str = "1+-,1-+,2++,2--";
const SE_SENSE: &str = "++,--";
const SE_ANTISENSE: &str = "+-,-+";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum StrandCall {
    Forward,
    Reverse,
    Unstranded,
}

impl StrandCall {
    /// Accepts forward/reverse/unstranded in any case, surrounding whitespace ignored.
    pub fn parse(text: &str) -> Option<StrandCall> {
        match text.trim().to_lowercase().as_str() {
            "forward" => Some(StrandCall::Forward),
            "reverse" => Some(StrandCall::Reverse),
            "unstranded" => Some(StrandCall::Unstranded),
            _ => None,
        }
    }

    /// 0-based column of a STAR style ReadsPerGene file holding this strand's counts.
    pub fn count_column(&self) -> usize {
        match self {
            StrandCall::Unstranded => 1,
            StrandCall::Forward => 2,
            StrandCall::Reverse => 3,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    #[serde(alias = "auto")]
    Auto,
    #[serde(alias = "paired")]
    #[serde(alias = "PE")]
    #[serde(alias = "pe")]
    Paired,
    #[serde(alias = "single")]
    #[serde(alias = "SE")]
    #[serde(alias = "se")]
    Single,
}

impl Layout {
    /// (sense, antisense) read type keys. Auto has none.
    fn keys(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Layout::Auto => None,
            Layout::Paired => Some((PE_SENSE, PE_ANTISENSE)),
            Layout::Single => Some((SE_SENSE, SE_ANTISENSE)),
        }
    }
}

/// How the fractions are turned into a call.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Convention {
    /// Threshold the antisense fraction only: above t is reverse,
    /// below 1 - t is forward, anything in between unstranded.
    #[default]
    #[serde(alias = "antisense_threshold")]
    AntisenseThreshold,
    /// Threshold sense and antisense independently, the one above t wins.
    #[serde(alias = "higher_fraction")]
    HigherFraction,
}

/// Which label the antisense key gets.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// antisense dominated libraries (e.g. dUTP) are `reverse`
    #[default]
    #[serde(alias = "standard")]
    Standard,
    /// forward and reverse exchanged
    #[serde(alias = "swapped")]
    Swapped,
}

impl Orientation {
    fn apply(&self, call: StrandCall) -> StrandCall {
        match (self, call) {
            (Orientation::Swapped, StrandCall::Forward) => StrandCall::Reverse,
            (Orientation::Swapped, StrandCall::Reverse) => StrandCall::Forward,
            _ => call,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceSettings {
    pub threshold: f64,
    pub layout: Layout,
    pub convention: Convention,
    pub orientation: Orientation,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        InferenceSettings {
            threshold: 0.8,
            layout: Layout::Auto,
            convention: Convention::AntisenseThreshold,
            orientation: Orientation::Standard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inference {
    pub call: StrandCall,
    /// the fraction that drove the call
    pub fraction: f64,
}

impl Inference {
    fn no_evidence() -> Inference {
        Inference {
            call: StrandCall::Unstranded,
            fraction: 0.0,
        }
    }
}

pub fn infer_from_report(report: &str, settings: &InferenceSettings) -> Inference {
    if !report.contains(MARKER) {
        return Inference::no_evidence();
    }
    let fractions: HashMap<&str, f64> = FRACTION_RE
        .captures_iter(report)
        .filter_map(|caps| {
            let read_type = caps.get(1)?.as_str();
            let fraction = caps.get(2)?.as_str().parse().ok()?;
            Some((read_type, fraction))
        })
        .collect();
    if fractions.is_empty() {
        return Inference::no_evidence();
    }

    let layout = match settings.layout {
        Layout::Auto => {
            // a layout is detected by its antisense key alone
            let has = |layout: Layout| {
                layout
                    .keys()
                    .is_some_and(|(_, antisense)| fractions.contains_key(antisense))
            };
            if has(Layout::Paired) {
                Layout::Paired
            } else if has(Layout::Single) {
                Layout::Single
            } else {
                return Inference::no_evidence();
            }
        }
        layout => layout,
    };
    let Some((sense_key, antisense_key)) = layout.keys() else {
        return Inference::no_evidence();
    };
    let t = settings.threshold;

    let (call, fraction) = match settings.convention {
        Convention::AntisenseThreshold => {
            let fraction = fractions.get(antisense_key).copied().unwrap_or(0.5);
            let call = if fraction > t {
                StrandCall::Reverse
            } else if fraction < (1.0 - t) {
                StrandCall::Forward
            } else {
                StrandCall::Unstranded
            };
            (call, fraction)
        }
        Convention::HigherFraction => {
            let sense = fractions.get(sense_key).copied().unwrap_or(0.0);
            let antisense = fractions.get(antisense_key).copied().unwrap_or(0.0);
            if antisense > t && antisense >= sense {
                (StrandCall::Reverse, antisense)
            } else if sense > t {
                (StrandCall::Forward, sense)
            } else {
                (StrandCall::Unstranded, sense.max(antisense))
            }
        }
    };
    Inference {
        call: settings.orientation.apply(call),
        fraction,
    }
}

/// The RSeQC read type rule (`-d` of FPKM_count.py and friends) for a call.
/// `Layout::Auto` has no rule.
pub fn read_type_rule(
    call: StrandCall,
    layout: Layout,
    orientation: Orientation,
) -> Option<&'static str> {
    let (sense, antisense) = layout.keys()?;
    Some(match orientation.apply(call) {
        StrandCall::Unstranded => "none",
        StrandCall::Forward => sense,
        StrandCall::Reverse => antisense,
    })
}

/// What a manifest says about one sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Declared {
    /// inference only mode, or no usable manifest
    NotConsulted,
    SampleMissing,
    Invalid(String),
    Valid(StrandCall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleStrand {
    pub sample: String,
    pub inferred: StrandCall,
    pub used: StrandCall,
    /// rounded to 3 decimals
    pub fraction: f64,
}

/// Declared beats inferred. Anything unusable falls back to the inferred call.
pub fn reconcile(sample: &str, inference: Inference, declared: Declared) -> SampleStrand {
    let used = match declared {
        Declared::NotConsulted => inference.call,
        Declared::Valid(call) => call,
        Declared::Invalid(value) => {
            log::warn!(
                "Invalid strandedness '{}' in manifest for {}. Using inferred ({}) instead.",
                value,
                sample,
                inference.call
            );
            inference.call
        }
        Declared::SampleMissing => {
            log::warn!(
                "Sample {} not found in manifest. Using inferred ({}) instead.",
                sample,
                inference.call
            );
            inference.call
        }
    };
    SampleStrand {
        sample: sample.to_string(),
        inferred: inference.call,
        used,
        fraction: round3(inference.fraction),
    }
}
