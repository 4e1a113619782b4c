//! The `grader check-rubric` and `grader check-examples` commands.

use std::path::Path;

use anyhow::{Result, bail};
use grading_core::model::{RubricIndex, TrainingExample, validate_training_examples};

use super::{read_json, read_rubric};

pub fn rubric(path: &Path) -> Result<()> {
    let index = RubricIndex::new(&read_rubric(path)?)?;

    for criterion in index.rubric().criteria() {
        if criterion.is_feedback_only() {
            println!("{}: feedback only", criterion.name());
        } else {
            println!(
                "{}: {} options, up to {} points",
                criterion.name(),
                criterion.options().len(),
                criterion.max_points()
            );
        }
    }
    println!("Points possible: {}", index.points_possible());
    Ok(())
}

pub fn examples(rubric_path: &Path, examples_path: &Path) -> Result<()> {
    let rubric = read_rubric(rubric_path)?;
    let examples: Vec<TrainingExample> = read_json(examples_path)?;

    let errors = validate_training_examples(&rubric, &examples);
    if errors.is_empty() {
        println!("{} examples valid.", examples.len());
        return Ok(());
    }
    for e in &errors {
        println!("  {e}");
    }
    bail!("{} problem(s) found", errors.len())
}
