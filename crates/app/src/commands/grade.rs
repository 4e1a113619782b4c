//! The `grader submit` and `grader grade` commands.

use std::path::Path;

use anyhow::{Context, Result};
use grading_core::Clock;
use grading_core::model::{Submission, SubmissionId};
use grading_core::scorer::ClassifierCache;
use services::{ClassifierSet, GradingServices};
use storage::repository::SubmissionRepository;

use super::{read_json, read_rubric, read_text};
use crate::db;

pub async fn submit(db_url: &str, text: &Path) -> Result<()> {
    let answer = read_text(text)?;
    let (_, storage) = db::open(db_url).await?;

    let submission = Submission::new(answer, Clock::system().now());
    storage
        .submissions
        .insert_submission(&submission)
        .await
        .context("storing submission")?;

    println!("{}", submission.id);
    Ok(())
}

pub async fn execute(
    db_url: &str,
    submission: &str,
    rubric: &Path,
    classifiers: &Path,
) -> Result<()> {
    let submission_id: SubmissionId = submission.parse()?;
    let rubric = read_rubric(rubric)?;
    let set: ClassifierSet = read_json(classifiers)?;
    let (_, storage) = db::open(db_url).await?;

    let services = GradingServices::from_storage(&storage, Clock::system());
    let mut cache = ClassifierCache::new();
    let stored = services
        .example_grader()
        .grade(submission_id, &rubric, &set, &mut cache)
        .await?;

    let score = stored.assessment.score();
    println!(
        "Assessment {} for {}: {}/{}",
        stored.id, submission_id, score.points_earned, score.points_possible
    );
    Ok(())
}
