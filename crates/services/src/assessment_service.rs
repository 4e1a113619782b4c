use std::sync::Arc;

use grading_core::model::{
    Assessment, AssessmentId, CriterionFeedback, OptionSelections, PointSelections,
    RubricDefinition, RubricIndex, ScoreType, SubmissionId,
};
use storage::repository::{AssessmentRepository, StorageError, StoredAssessment};
use tracing::info;

use crate::Clock;
use crate::error::{AssessmentServiceError, RequestError};

/// Who is grading what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentRequest {
    pub submission_id: SubmissionId,
    pub scorer_id: String,
    pub score_type: ScoreType,
    pub overall_feedback: String,
}

impl AssessmentRequest {
    #[must_use]
    pub fn new(
        submission_id: SubmissionId,
        scorer_id: impl Into<String>,
        score_type: ScoreType,
    ) -> Self {
        Self {
            submission_id,
            scorer_id: scorer_id.into(),
            score_type,
            overall_feedback: String::new(),
        }
    }

    #[must_use]
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.overall_feedback = feedback.into();
        self
    }
}

/// Validates rubric selections and persists the resulting assessments.
#[derive(Clone)]
pub struct AssessmentService {
    clock: Clock,
    assessments: Arc<dyn AssessmentRepository>,
}

impl AssessmentService {
    #[must_use]
    pub fn new(clock: Clock, assessments: Arc<dyn AssessmentRepository>) -> Self {
        Self { clock, assessments }
    }

    /// Grade with option names.
    ///
    /// Omitting `feedback` gives feedback-only criteria empty feedback;
    /// passing a map, even an empty one, requires a key for each of them.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentServiceError::Request` for a malformed rubric or an
    /// invalid or incomplete selection; nothing is persisted in that case.
    /// Returns `AssessmentServiceError::Internal` if persistence fails.
    pub async fn create_from_option_names(
        &self,
        rubric: &RubricDefinition,
        request: &AssessmentRequest,
        selections: &OptionSelections,
        feedback: Option<&CriterionFeedback>,
    ) -> Result<StoredAssessment, AssessmentServiceError> {
        let index = RubricIndex::new(rubric).map_err(RequestError::from)?;
        let mut assessment = self.start(&index, request);
        assessment
            .add_parts_from_option_names(&index, selections, feedback)
            .map_err(RequestError::from)?;
        self.persist(assessment).await
    }

    /// Grade with raw point values; feedback is never required.
    ///
    /// # Errors
    ///
    /// Same as [`AssessmentService::create_from_option_names`].
    pub async fn create_from_option_points(
        &self,
        rubric: &RubricDefinition,
        request: &AssessmentRequest,
        points: &PointSelections,
    ) -> Result<StoredAssessment, AssessmentServiceError> {
        let index = RubricIndex::new(rubric).map_err(RequestError::from)?;
        let mut assessment = self.start(&index, request);
        assessment
            .add_parts_from_option_points(&index, points)
            .map_err(RequestError::from)?;
        self.persist(assessment).await
    }

    /// # Errors
    ///
    /// Returns `AssessmentServiceError::Request` if the assessment does not
    /// exist, `AssessmentServiceError::Internal` if storage fails.
    pub async fn get_assessment(&self, id: AssessmentId) -> Result<Assessment, AssessmentServiceError> {
        match self.assessments.get_assessment(id).await {
            Ok(assessment) => Ok(assessment),
            Err(StorageError::NotFound) => Err(RequestError::AssessmentNotFound(id).into()),
            Err(e) => Err(AssessmentServiceError::internal(e)),
        }
    }

    /// # Errors
    ///
    /// Returns `AssessmentServiceError::Internal` if storage fails.
    pub async fn list_assessments(
        &self,
        submission_id: SubmissionId,
    ) -> Result<Vec<StoredAssessment>, AssessmentServiceError> {
        self.assessments
            .list_assessments(submission_id)
            .await
            .map_err(AssessmentServiceError::internal)
    }

    fn start(&self, index: &RubricIndex, request: &AssessmentRequest) -> Assessment {
        Assessment::create(
            index,
            request.scorer_id.clone(),
            request.submission_id,
            request.score_type,
            self.clock.now(),
        )
        .with_feedback(request.overall_feedback.clone())
    }

    async fn persist(&self, assessment: Assessment) -> Result<StoredAssessment, AssessmentServiceError> {
        let id = self
            .assessments
            .insert_assessment(&assessment)
            .await
            .map_err(AssessmentServiceError::internal)?;
        info!(
            assessment_id = %id,
            submission_id = %assessment.submission_id(),
            score_type = %assessment.score_type(),
            points_earned = assessment.points_earned(),
            points_possible = assessment.points_possible(),
            "assessment persisted"
        );
        Ok(StoredAssessment { id, assessment })
    }
}
