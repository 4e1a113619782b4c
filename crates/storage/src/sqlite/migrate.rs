use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned migrations that have not been applied yet.
///
/// Version 1 creates submissions, assessments with their parts, and the
/// calibration tables.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS submissions (
                    id TEXT PRIMARY KEY,
                    answer TEXT NOT NULL,
                    submitted_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS assessments (
                    id INTEGER PRIMARY KEY,
                    submission_id TEXT NOT NULL,
                    scorer_id TEXT NOT NULL,
                    score_type TEXT NOT NULL CHECK (score_type IN ('PE', 'SE', 'AI', 'ST')),
                    scored_at TEXT NOT NULL,
                    feedback TEXT NOT NULL,
                    points_earned INTEGER NOT NULL CHECK (points_earned >= 0),
                    points_possible INTEGER NOT NULL CHECK (points_possible >= 0)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS assessment_parts (
                    assessment_id INTEGER NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    criterion TEXT NOT NULL,
                    option_name TEXT,
                    option_points INTEGER CHECK (option_points >= 0),
                    feedback TEXT NOT NULL,
                    PRIMARY KEY (assessment_id, position),
                    UNIQUE (assessment_id, criterion),
                    FOREIGN KEY (assessment_id) REFERENCES assessments(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS training_workflows (
                    submission_id TEXT PRIMARY KEY,
                    num_completed INTEGER NOT NULL CHECK (num_completed >= 0),
                    num_examples INTEGER NOT NULL CHECK (num_examples >= 0),
                    current_order_num INTEGER,
                    current_answer TEXT,
                    current_options TEXT,
                    current_started_at TEXT,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (submission_id) REFERENCES submissions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS training_items (
                    id INTEGER PRIMARY KEY,
                    submission_id TEXT NOT NULL,
                    order_num INTEGER NOT NULL CHECK (order_num >= 0),
                    started_at TEXT NOT NULL,
                    completed_at TEXT NOT NULL,
                    UNIQUE (submission_id, order_num),
                    FOREIGN KEY (submission_id)
                        REFERENCES training_workflows(submission_id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_assessments_submission_scored_at
                    ON assessments (submission_id, scored_at, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
