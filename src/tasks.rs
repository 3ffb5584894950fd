mod aggregate_tin;
mod aggregate_transcripts;
mod count_matrix;
mod fpkm_to_tpm;
mod normalize;
mod strand_rule;

use anyhow::bail;
use enum_dispatch::enum_dispatch;

use crate::config::{Config, Input, Output};

#[enum_dispatch(Task)]
pub trait Step {
    fn run(&mut self, input: &Input, output: &Output) -> anyhow::Result<()>;
    fn check(&self, _config: &Config) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(serde::Deserialize, Debug, Clone, strum_macros::Display, serde::Serialize)]
#[serde(tag = "mode")]
#[enum_dispatch]
pub enum Task {
    #[serde(alias = "count_matrix")]
    CountMatrix(count_matrix::CountMatrix),
    #[serde(alias = "normalize")]
    Normalize(normalize::Normalize),
    #[serde(alias = "fpkm_to_tpm")]
    FpkmToTpm(fpkm_to_tpm::FpkmToTpm),
    #[serde(alias = "strand_rule")]
    StrandRule(strand_rule::StrandRule),
    #[serde(alias = "aggregate_tin")]
    AggregateTin(aggregate_tin::AggregateTin),
    #[serde(alias = "aggregate_transcripts")]
    AggregateTranscripts(aggregate_transcripts::AggregateTranscripts),
}

/// Every `required` input must be set, and nothing beyond `required` and `optional`.
fn check_inputs(config: &Config, required: &[&str], optional: &[&str]) -> anyhow::Result<()> {
    let provided = config.input.provided();
    for name in required {
        if !provided.contains(name) {
            bail!(
                "input.{} is required for mode {}, but not set.",
                name,
                config.task
            );
        }
    }
    for name in provided {
        if !required.contains(&name) && !optional.contains(&name) {
            bail!(
                "input.{} is not used by mode {}, do not set it.",
                name,
                config.task
            );
        }
    }
    Ok(())
}
