use chrono::{DateTime, Utc};
use grading_core::model::{CurrentExample, SubmissionId, TrainingItem, TrainingWorkflow};
use sqlx::{Sqlite, Transaction};

use super::{
    SqliteRepository,
    mapping::{conn, map_item_row, map_workflow_row, ser, submission_id_to_text},
};
use crate::repository::{StorageError, TrainingWorkflowRepository};

const WORKFLOW_COLUMNS: &str = r"
    SELECT
        submission_id, num_completed, num_examples,
        current_order_num, current_answer, current_options, current_started_at,
        created_at
    FROM training_workflows
    WHERE submission_id = ?1
";

async fn fetch_workflow(
    tx: &mut Transaction<'_, Sqlite>,
    submission_id: &str,
) -> Result<Option<TrainingWorkflow>, StorageError> {
    sqlx::query(WORKFLOW_COLUMNS)
        .bind(submission_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(conn)?
        .as_ref()
        .map(map_workflow_row)
        .transpose()
}

#[async_trait::async_trait]
impl TrainingWorkflowRepository for SqliteRepository {
    async fn get_workflow(
        &self,
        submission_id: SubmissionId,
    ) -> Result<Option<TrainingWorkflow>, StorageError> {
        sqlx::query(WORKFLOW_COLUMNS)
            .bind(submission_id_to_text(submission_id))
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .as_ref()
            .map(map_workflow_row)
            .transpose()
    }

    async fn get_or_create_workflow(
        &self,
        submission_id: SubmissionId,
        created_at: DateTime<Utc>,
    ) -> Result<TrainingWorkflow, StorageError> {
        let key = submission_id_to_text(submission_id);
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
                INSERT INTO training_workflows (
                    submission_id, num_completed, num_examples, created_at
                )
                VALUES (?1, 0, 0, ?2)
                ON CONFLICT(submission_id) DO NOTHING
            ",
        )
        .bind(&key)
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let workflow = fetch_workflow(&mut tx, &key)
            .await?
            .ok_or(StorageError::NotFound)?;
        tx.commit().await.map_err(conn)?;
        Ok(workflow)
    }

    async fn set_current_example(
        &self,
        submission_id: SubmissionId,
        expected_num_completed: u32,
        num_examples: u32,
        current: &CurrentExample,
    ) -> Result<TrainingWorkflow, StorageError> {
        let key = submission_id_to_text(submission_id);
        let options = serde_json::to_string(&current.options_selected).map_err(ser)?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
                UPDATE training_workflows
                SET num_examples = ?3,
                    current_order_num = ?4,
                    current_answer = ?5,
                    current_options = ?6,
                    current_started_at = ?7
                WHERE submission_id = ?1 AND num_completed = ?2
            ",
        )
        .bind(&key)
        .bind(i64::from(expected_num_completed))
        .bind(i64::from(num_examples))
        .bind(i64::from(current.order_num))
        .bind(&current.answer)
        .bind(options)
        .bind(current.started_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let workflow = fetch_workflow(&mut tx, &key)
            .await?
            .ok_or(StorageError::NotFound)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }
        tx.commit().await.map_err(conn)?;
        Ok(workflow)
    }

    async fn complete_current_example(
        &self,
        submission_id: SubmissionId,
        expected_num_completed: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<TrainingWorkflow, StorageError> {
        let key = submission_id_to_text(submission_id);
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let before = fetch_workflow(&mut tx, &key)
            .await?
            .ok_or(StorageError::NotFound)?;
        let current = match before.current() {
            Some(c) if before.num_completed() == expected_num_completed => c.clone(),
            _ => return Err(StorageError::Conflict),
        };

        let res = sqlx::query(
            r"
                UPDATE training_workflows
                SET num_completed = num_completed + 1,
                    current_order_num = NULL,
                    current_answer = NULL,
                    current_options = NULL,
                    current_started_at = NULL
                WHERE submission_id = ?1
                  AND num_completed = ?2
                  AND current_order_num IS NOT NULL
            ",
        )
        .bind(&key)
        .bind(i64::from(expected_num_completed))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        sqlx::query(
            r"
                INSERT INTO training_items (submission_id, order_num, started_at, completed_at)
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(&key)
        .bind(i64::from(current.order_num))
        .bind(current.started_at)
        .bind(completed_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let workflow = fetch_workflow(&mut tx, &key)
            .await?
            .ok_or(StorageError::NotFound)?;
        tx.commit().await.map_err(conn)?;
        Ok(workflow)
    }

    async fn list_items(
        &self,
        submission_id: SubmissionId,
    ) -> Result<Vec<TrainingItem>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT order_num, started_at, completed_at
                FROM training_items
                WHERE submission_id = ?1
                ORDER BY order_num ASC
            ",
        )
        .bind(submission_id_to_text(submission_id))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_item_row).collect()
    }
}
