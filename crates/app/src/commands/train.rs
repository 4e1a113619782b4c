//! The `grader train` command.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use grading_core::model::TrainingExample;
use grading_core::scorer::algorithm_by_id;
use services::train_classifiers;

use super::{read_json, read_rubric};

pub fn execute(rubric: &Path, examples: &Path, algorithm: &str, out: &Path) -> Result<()> {
    let rubric = read_rubric(rubric)?;
    let examples: Vec<TrainingExample> = read_json(examples)?;
    let algorithm =
        algorithm_by_id(algorithm).ok_or_else(|| anyhow!("unknown algorithm: {algorithm}"))?;

    let set = train_classifiers(algorithm.as_ref(), &rubric, &examples)?;
    let json = serde_json::to_string_pretty(&set)?;
    std::fs::write(out, json).with_context(|| format!("writing {}", out.display()))?;

    println!(
        "Trained {} classifier(s) with {} into {}",
        set.classifiers.len(),
        set.algorithm,
        out.display()
    );
    Ok(())
}
