//! The `grader score` command: offline scoring, nothing is persisted.

use std::path::Path;

use anyhow::Result;
use grading_core::Clock;
use grading_core::model::{Assessment, RubricIndex, ScoreType, SubmissionId};
use grading_core::scorer::ClassifierCache;
use services::ClassifierSet;

use super::{read_json, read_rubric, read_text};

pub fn execute(rubric: &Path, classifiers: &Path, text: &Path) -> Result<()> {
    let index = RubricIndex::new(&read_rubric(rubric)?)?;
    let set: ClassifierSet = read_json(classifiers)?;
    let answer = read_text(text)?;

    let mut cache = ClassifierCache::new();
    let points = set.score(&index, &answer, &mut cache)?;

    let mut assessment = Assessment::create(
        &index,
        set.algorithm.clone(),
        SubmissionId::generate(),
        ScoreType::Example,
        Clock::system().now(),
    );
    assessment.add_parts_from_option_points(&index, &points)?;

    for part in assessment.parts() {
        if let Some(option) = &part.option {
            println!("{}: {} ({} points)", part.criterion, option.name, option.points);
        }
    }
    let score = assessment.score();
    println!("Total: {}/{}", score.points_earned, score.points_possible);
    Ok(())
}
