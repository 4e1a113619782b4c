pub mod check;
pub mod grade;
pub mod migrate;
pub mod score;
pub mod status;
pub mod train;

use std::path::Path;

use anyhow::{Context, Result};
use grading_core::model::RubricDefinition;
use serde::de::DeserializeOwned;

pub(crate) fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = read_text(path)?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

pub(crate) fn read_rubric(path: &Path) -> Result<RubricDefinition> {
    let value: serde_json::Value = read_json(path)?;
    RubricDefinition::from_value(value).with_context(|| format!("rubric {}", path.display()))
}
