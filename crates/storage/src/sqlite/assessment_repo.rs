use grading_core::model::{Assessment, AssessmentId, AssessmentPart, SubmissionId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::{
    SqliteRepository,
    mapping::{
        assessment_id_from_i64, conn, id_i64, map_assessment_row, map_part_row, ser,
        submission_id_to_text,
    },
};
use crate::repository::{AssessmentRepository, StorageError, StoredAssessment};

impl SqliteRepository {
    async fn parts_for(&self, assessment_id: i64) -> Result<Vec<AssessmentPart>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT criterion, option_name, option_points, feedback
                FROM assessment_parts
                WHERE assessment_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_part_row).collect()
    }

    async fn hydrate(&self, row: &SqliteRow) -> Result<StoredAssessment, StorageError> {
        let id: i64 = row.try_get("id").map_err(ser)?;
        let parts = self.parts_for(id).await?;
        Ok(StoredAssessment {
            id: assessment_id_from_i64(id)?,
            assessment: map_assessment_row(row, parts)?,
        })
    }
}

#[async_trait::async_trait]
impl AssessmentRepository for SqliteRepository {
    async fn insert_assessment(&self, assessment: &Assessment) -> Result<AssessmentId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
                INSERT INTO assessments (
                    submission_id, scorer_id, score_type, scored_at,
                    feedback, points_earned, points_possible
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(submission_id_to_text(assessment.submission_id()))
        .bind(assessment.scorer_id())
        .bind(assessment.score_type().as_str())
        .bind(assessment.scored_at())
        .bind(assessment.feedback())
        .bind(i64::from(assessment.points_earned()))
        .bind(i64::from(assessment.points_possible()))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        let assessment_id = res.last_insert_rowid();

        for (position, part) in assessment.parts().iter().enumerate() {
            sqlx::query(
                r"
                    INSERT INTO assessment_parts (
                        assessment_id, position, criterion,
                        option_name, option_points, feedback
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(assessment_id)
            .bind(i64::try_from(position).map_err(ser)?)
            .bind(&part.criterion)
            .bind(part.option.as_ref().map(|o| o.name.clone()))
            .bind(part.option.as_ref().map(|o| i64::from(o.points)))
            .bind(&part.feedback)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        assessment_id_from_i64(assessment_id)
    }

    async fn get_assessment(&self, id: AssessmentId) -> Result<Assessment, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    id, submission_id, scorer_id, score_type, scored_at,
                    feedback, points_earned, points_possible
                FROM assessments
                WHERE id = ?1
            ",
        )
        .bind(id_i64("assessment_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        Ok(self.hydrate(&row).await?.assessment)
    }

    async fn list_assessments(
        &self,
        submission_id: SubmissionId,
    ) -> Result<Vec<StoredAssessment>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, submission_id, scorer_id, score_type, scored_at,
                    feedback, points_earned, points_possible
                FROM assessments
                WHERE submission_id = ?1
                ORDER BY scored_at ASC, id ASC
            ",
        )
        .bind(submission_id_to_text(submission_id))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(self.hydrate(row).await?);
        }
        Ok(out)
    }

    async fn delete_assessment(&self, id: AssessmentId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM assessments WHERE id = ?1")
            .bind(id_i64("assessment_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
