use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use pipeline_defence_core::RunTuning;

/// Loads tuning overrides from a TOML file, or the defaults when no file is given.
pub(crate) fn load_tuning(path: Option<&Path>) -> Result<RunTuning> {
    let Some(path) = path else {
        return Ok(RunTuning::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read tuning file {}", path.display()))?;
    parse_tuning(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

fn parse_tuning(contents: &str) -> Result<RunTuning> {
    let tuning: RunTuning =
        toml::from_str(contents).context("tuning file is not valid TOML for a run")?;
    if let Some(knob) = tuning.first_non_finite() {
        bail!("tuning knob {knob} must be a finite number");
    }
    Ok(tuning)
}
