use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grading_core::model::{
    Assessment, AssessmentId, CurrentExample, Submission, SubmissionId, TrainingItem,
    TrainingWorkflow,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A persisted assessment together with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAssessment {
    pub id: AssessmentId,
    pub assessment: Assessment,
}

/// Read/write access to learner submissions.
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id is already taken.
    async fn insert_submission(&self, submission: &Submission) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_submission(&self, id: SubmissionId) -> Result<Submission, StorageError>;
}

#[async_trait]
pub trait AssessmentRepository: Send + Sync {
    /// Persist an assessment and all of its parts in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any row cannot be written; nothing is kept
    /// in that case.
    async fn insert_assessment(&self, assessment: &Assessment) -> Result<AssessmentId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_assessment(&self, id: AssessmentId) -> Result<Assessment, StorageError>;

    /// Assessments of a submission, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_assessments(
        &self,
        submission_id: SubmissionId,
    ) -> Result<Vec<StoredAssessment>, StorageError>;

    /// Delete an assessment and its parts.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_assessment(&self, id: AssessmentId) -> Result<(), StorageError>;
}

/// Calibration progress, one row per submission.
#[async_trait]
pub trait TrainingWorkflowRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn get_workflow(
        &self,
        submission_id: SubmissionId,
    ) -> Result<Option<TrainingWorkflow>, StorageError>;

    /// Fetch the workflow, creating a zero-progress one if absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be read or created.
    async fn get_or_create_workflow(
        &self,
        submission_id: SubmissionId,
        created_at: DateTime<Utc>,
    ) -> Result<TrainingWorkflow, StorageError>;

    /// Record the example being served.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if `num_completed` is no longer
    /// `expected_num_completed`, `NotFound` if there is no workflow.
    async fn set_current_example(
        &self,
        submission_id: SubmissionId,
        expected_num_completed: u32,
        num_examples: u32,
        current: &CurrentExample,
    ) -> Result<TrainingWorkflow, StorageError>;

    /// Advance past the current example: bump `num_completed`, clear the
    /// marker and append a history item, all at once.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the workflow moved on since it was
    /// read or has no current example, `NotFound` if there is no workflow.
    async fn complete_current_example(
        &self,
        submission_id: SubmissionId,
        expected_num_completed: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<TrainingWorkflow, StorageError>;

    /// Completed examples in order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_items(&self, submission_id: SubmissionId)
    -> Result<Vec<TrainingItem>, StorageError>;
}

//
// ─── IN MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct AssessmentTable {
    last_id: u64,
    rows: BTreeMap<AssessmentId, Assessment>,
}

struct WorkflowRow {
    workflow: TrainingWorkflow,
    items: Vec<TrainingItem>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    submissions: Arc<Mutex<HashMap<SubmissionId, Submission>>>,
    assessments: Arc<Mutex<AssessmentTable>>,
    workflows: Arc<Mutex<HashMap<SubmissionId, WorkflowRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl SubmissionRepository for InMemoryRepository {
    async fn insert_submission(&self, submission: &Submission) -> Result<(), StorageError> {
        let mut guard = self.submissions.lock().map_err(poisoned)?;
        if guard.contains_key(&submission.id) {
            return Err(StorageError::Conflict);
        }
        guard.insert(submission.id, submission.clone());
        Ok(())
    }

    async fn get_submission(&self, id: SubmissionId) -> Result<Submission, StorageError> {
        let guard = self.submissions.lock().map_err(poisoned)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl AssessmentRepository for InMemoryRepository {
    async fn insert_assessment(&self, assessment: &Assessment) -> Result<AssessmentId, StorageError> {
        let mut guard = self.assessments.lock().map_err(poisoned)?;
        guard.last_id += 1;
        let id = AssessmentId::new(guard.last_id);
        guard.rows.insert(id, assessment.clone());
        Ok(id)
    }

    async fn get_assessment(&self, id: AssessmentId) -> Result<Assessment, StorageError> {
        let guard = self.assessments.lock().map_err(poisoned)?;
        guard.rows.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_assessments(
        &self,
        submission_id: SubmissionId,
    ) -> Result<Vec<StoredAssessment>, StorageError> {
        let guard = self.assessments.lock().map_err(poisoned)?;
        Ok(guard
            .rows
            .iter()
            .filter(|(_, a)| a.submission_id() == submission_id)
            .map(|(&id, a)| StoredAssessment {
                id,
                assessment: a.clone(),
            })
            .collect())
    }

    async fn delete_assessment(&self, id: AssessmentId) -> Result<(), StorageError> {
        let mut guard = self.assessments.lock().map_err(poisoned)?;
        guard.rows.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl TrainingWorkflowRepository for InMemoryRepository {
    async fn get_workflow(
        &self,
        submission_id: SubmissionId,
    ) -> Result<Option<TrainingWorkflow>, StorageError> {
        let guard = self.workflows.lock().map_err(poisoned)?;
        Ok(guard.get(&submission_id).map(|row| row.workflow.clone()))
    }

    async fn get_or_create_workflow(
        &self,
        submission_id: SubmissionId,
        created_at: DateTime<Utc>,
    ) -> Result<TrainingWorkflow, StorageError> {
        let mut guard = self.workflows.lock().map_err(poisoned)?;
        let row = guard.entry(submission_id).or_insert_with(|| WorkflowRow {
            workflow: TrainingWorkflow::new(submission_id, created_at),
            items: Vec::new(),
        });
        Ok(row.workflow.clone())
    }

    async fn set_current_example(
        &self,
        submission_id: SubmissionId,
        expected_num_completed: u32,
        num_examples: u32,
        current: &CurrentExample,
    ) -> Result<TrainingWorkflow, StorageError> {
        let mut guard = self.workflows.lock().map_err(poisoned)?;
        let row = guard.get_mut(&submission_id).ok_or(StorageError::NotFound)?;
        let wf = &row.workflow;
        if wf.num_completed() != expected_num_completed {
            return Err(StorageError::Conflict);
        }
        row.workflow = TrainingWorkflow::from_persisted(
            submission_id,
            wf.num_completed(),
            num_examples,
            Some(current.clone()),
            wf.created_at(),
        );
        Ok(row.workflow.clone())
    }

    async fn complete_current_example(
        &self,
        submission_id: SubmissionId,
        expected_num_completed: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<TrainingWorkflow, StorageError> {
        let mut guard = self.workflows.lock().map_err(poisoned)?;
        let row = guard.get_mut(&submission_id).ok_or(StorageError::NotFound)?;
        let wf = &row.workflow;
        let current = match wf.current() {
            Some(c) if wf.num_completed() == expected_num_completed => c.clone(),
            _ => return Err(StorageError::Conflict),
        };
        row.items.push(TrainingItem {
            order_num: current.order_num,
            started_at: current.started_at,
            completed_at,
        });
        row.workflow = TrainingWorkflow::from_persisted(
            submission_id,
            wf.num_completed() + 1,
            wf.num_examples(),
            None,
            wf.created_at(),
        );
        Ok(row.workflow.clone())
    }

    async fn list_items(
        &self,
        submission_id: SubmissionId,
    ) -> Result<Vec<TrainingItem>, StorageError> {
        let guard = self.workflows.lock().map_err(poisoned)?;
        Ok(guard
            .get(&submission_id)
            .map(|row| row.items.clone())
            .unwrap_or_default())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub submissions: Arc<dyn SubmissionRepository>,
    pub assessments: Arc<dyn AssessmentRepository>,
    pub training: Arc<dyn TrainingWorkflowRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let submissions: Arc<dyn SubmissionRepository> = Arc::new(repo.clone());
        let assessments: Arc<dyn AssessmentRepository> = Arc::new(repo.clone());
        let training: Arc<dyn TrainingWorkflowRepository> = Arc::new(repo);
        Self {
            submissions,
            assessments,
            training,
        }
    }
}
