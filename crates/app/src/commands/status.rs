use anyhow::Result;
use grading_core::Clock;
use grading_core::model::{SubmissionId, TrainingStatus};
use services::GradingServices;

use crate::db;

pub async fn execute(db_url: &str, submission: &str) -> Result<()> {
    let submission_id: SubmissionId = submission.parse()?;
    let (_, storage) = db::open(db_url).await?;
    let calibration = GradingServices::from_storage(&storage, Clock::system()).calibration();

    let status = match calibration.status(submission_id).await? {
        TrainingStatus::NotStarted => "not started",
        TrainingStatus::InProgress => "in progress",
        TrainingStatus::Complete => "complete",
    };
    println!("Status: {status}");
    println!("Examples completed: {}", calibration.num_completed(submission_id).await?);

    for item in calibration.completed_items(submission_id).await? {
        let seconds = (item.completed_at - item.started_at).num_seconds();
        println!("  #{} matched after {seconds}s", item.order_num + 1);
    }
    Ok(())
}
