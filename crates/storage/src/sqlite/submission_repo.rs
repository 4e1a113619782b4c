use grading_core::model::{Submission, SubmissionId};

use super::{
    SqliteRepository,
    mapping::{conn, map_submission_row, submission_id_to_text},
};
use crate::repository::{StorageError, SubmissionRepository};

#[async_trait::async_trait]
impl SubmissionRepository for SqliteRepository {
    async fn insert_submission(&self, submission: &Submission) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO submissions (id, answer, submitted_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO NOTHING
            ",
        )
        .bind(submission_id_to_text(submission.id))
        .bind(&submission.answer)
        .bind(submission.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }
        Ok(())
    }

    async fn get_submission(&self, id: SubmissionId) -> Result<Submission, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, answer, submitted_at
                FROM submissions
                WHERE id = ?1
            ",
        )
        .bind(submission_id_to_text(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_submission_row(&row)
    }
}
