//! Shared error types for the services crate.
//!
//! Every service error has two arms: `Request` for input the caller can fix,
//! and `Internal` for storage failures the caller may retry.

use thiserror::Error;
use tracing::warn;

use grading_core::model::{
    AssessmentId, RequirementsError, RubricError, SelectionError, SubmissionId,
};
use grading_core::scorer::{InvalidClassifier, TrainingError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// The caller supplied invalid input or called an operation out of order.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RequestError {
    #[error(transparent)]
    Rubric(#[from] RubricError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Requirements(#[from] RequirementsError),
    #[error(transparent)]
    Training(#[from] TrainingError),
    #[error(transparent)]
    Classifier(#[from] InvalidClassifier),
    #[error("submission {0} does not exist")]
    SubmissionNotFound(SubmissionId),
    #[error("assessment {0} does not exist")]
    AssessmentNotFound(AssessmentId),
    #[error("no training workflow for submission {0}")]
    NoWorkflow(SubmissionId),
    #[error("submission {0} has no current training example")]
    NoCurrentExample(SubmissionId),
    #[error("training is already complete for submission {0}")]
    WorkflowComplete(SubmissionId),
    #[error("invalid training examples: {}", .0.join("; "))]
    InvalidExamples(Vec<String>),
    #[error("unknown scoring algorithm \"{0}\"")]
    UnknownAlgorithm(String),
    #[error("no classifier for criterion \"{0}\"")]
    MissingClassifier(String),
}

/// Errors emitted by `CalibrationService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CalibrationError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("storage failure: {0}")]
    Internal(#[source] StorageError),
}

impl CalibrationError {
    pub(crate) fn internal(err: StorageError) -> Self {
        warn!(error = %err, "calibration storage failure");
        Self::Internal(err)
    }

    /// Only internal failures are worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

/// Errors emitted by `AssessmentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AssessmentServiceError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("storage failure: {0}")]
    Internal(#[source] StorageError),
}

impl AssessmentServiceError {
    pub(crate) fn internal(err: StorageError) -> Self {
        warn!(error = %err, "assessment storage failure");
        Self::Internal(err)
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

/// Errors emitted by example-based grading.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GradingError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("storage failure: {0}")]
    Internal(#[source] StorageError),
}

impl GradingError {
    pub(crate) fn internal(err: StorageError) -> Self {
        warn!(error = %err, "grading storage failure");
        Self::Internal(err)
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

/// Errors emitted while bootstrapping services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
