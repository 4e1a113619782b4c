use grading_core::model::{
    Assessment, AssessmentId, AssessmentPart, CurrentExample, OptionSelections, ScoreType,
    SelectedOption, Submission, SubmissionId, TrainingItem, TrainingWorkflow,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn assessment_id_from_i64(v: i64) -> Result<AssessmentId, StorageError> {
    u64::try_from(v)
        .map(AssessmentId::new)
        .map_err(|_| StorageError::Serialization("assessment_id sign overflow".into()))
}

pub(crate) fn submission_id_to_text(id: SubmissionId) -> String {
    id.value().to_string()
}

pub(crate) fn submission_id_from_row(
    row: &SqliteRow,
    column: &str,
) -> Result<SubmissionId, StorageError> {
    let raw: String = row.try_get(column).map_err(ser)?;
    raw.parse().map_err(ser)
}

pub(crate) fn map_submission_row(row: &SqliteRow) -> Result<Submission, StorageError> {
    Ok(Submission {
        id: submission_id_from_row(row, "id")?,
        answer: row.try_get("answer").map_err(ser)?,
        submitted_at: row.try_get("submitted_at").map_err(ser)?,
    })
}

pub(crate) fn map_part_row(row: &SqliteRow) -> Result<AssessmentPart, StorageError> {
    let name: Option<String> = row.try_get("option_name").map_err(ser)?;
    let points: Option<i64> = row.try_get("option_points").map_err(ser)?;
    let option = match (name, points) {
        (Some(name), Some(points)) => Some(SelectedOption {
            name,
            points: u32_from_i64("option_points", points)?,
        }),
        (None, None) => None,
        _ => {
            return Err(StorageError::Serialization(
                "option_name and option_points must be set together".into(),
            ));
        }
    };
    Ok(AssessmentPart {
        criterion: row.try_get("criterion").map_err(ser)?,
        option,
        feedback: row.try_get("feedback").map_err(ser)?,
    })
}

/// Builds an assessment from its header row and its part rows (already in
/// position order).
pub(crate) fn map_assessment_row(
    row: &SqliteRow,
    parts: Vec<AssessmentPart>,
) -> Result<Assessment, StorageError> {
    let score_type: String = row.try_get("score_type").map_err(ser)?;
    let score_type: ScoreType = score_type.parse().map_err(ser)?;
    Ok(Assessment::from_persisted(
        submission_id_from_row(row, "submission_id")?,
        row.try_get("scorer_id").map_err(ser)?,
        score_type,
        row.try_get("scored_at").map_err(ser)?,
        row.try_get("feedback").map_err(ser)?,
        parts,
        u32_from_i64("points_earned", row.try_get("points_earned").map_err(ser)?)?,
        u32_from_i64("points_possible", row.try_get("points_possible").map_err(ser)?)?,
    ))
}

pub(crate) fn map_workflow_row(row: &SqliteRow) -> Result<TrainingWorkflow, StorageError> {
    let order_num: Option<i64> = row.try_get("current_order_num").map_err(ser)?;
    let current = match order_num {
        None => None,
        Some(order_num) => {
            let answer: Option<String> = row.try_get("current_answer").map_err(ser)?;
            let options: Option<String> = row.try_get("current_options").map_err(ser)?;
            let started_at: Option<chrono::DateTime<chrono::Utc>> =
                row.try_get("current_started_at").map_err(ser)?;
            let missing = || StorageError::Serialization("incomplete current example".into());
            let options: OptionSelections =
                serde_json::from_str(&options.ok_or_else(missing)?).map_err(ser)?;
            Some(CurrentExample {
                order_num: u32_from_i64("current_order_num", order_num)?,
                answer: answer.ok_or_else(missing)?,
                options_selected: options,
                started_at: started_at.ok_or_else(missing)?,
            })
        }
    };

    Ok(TrainingWorkflow::from_persisted(
        submission_id_from_row(row, "submission_id")?,
        u32_from_i64("num_completed", row.try_get("num_completed").map_err(ser)?)?,
        u32_from_i64("num_examples", row.try_get("num_examples").map_err(ser)?)?,
        current,
        row.try_get("created_at").map_err(ser)?,
    ))
}

pub(crate) fn map_item_row(row: &SqliteRow) -> Result<TrainingItem, StorageError> {
    Ok(TrainingItem {
        order_num: u32_from_i64("order_num", row.try_get("order_num").map_err(ser)?)?,
        started_at: row.try_get("started_at").map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
}
