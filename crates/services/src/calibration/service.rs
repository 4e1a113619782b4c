use std::sync::Arc;

use grading_core::model::{
    Corrections, CurrentExample, OptionSelections, RubricDefinition, RubricIndex, Score,
    ServedExample, SubmissionId, TrainingExample, TrainingItem, TrainingRequirements,
    TrainingStatus, TrainingWorkflow,
};
use storage::repository::{StorageError, SubmissionRepository, TrainingWorkflowRepository};
use tracing::{debug, info};

use crate::Clock;
use crate::error::{CalibrationError, RequestError};

/// Serves calibration examples in order and advances a trainee past each one
/// only after an exact match.
#[derive(Clone)]
pub struct CalibrationService {
    clock: Clock,
    submissions: Arc<dyn SubmissionRepository>,
    training: Arc<dyn TrainingWorkflowRepository>,
}

impl CalibrationService {
    #[must_use]
    pub fn new(
        clock: Clock,
        submissions: Arc<dyn SubmissionRepository>,
        training: Arc<dyn TrainingWorkflowRepository>,
    ) -> Self {
        Self {
            clock,
            submissions,
            training,
        }
    }

    /// The example the trainee should assess next, with the rubric attached.
    ///
    /// Returns `Ok(None)` once every example has been assessed correctly.
    /// Viewing never advances progress; repeated calls return the same example.
    ///
    /// # Errors
    ///
    /// Returns `CalibrationError::Request` for a malformed rubric or unknown
    /// submission, `CalibrationError::Internal` if storage fails.
    pub async fn get_current_example(
        &self,
        submission_id: SubmissionId,
        rubric: &RubricDefinition,
        examples: &[TrainingExample],
    ) -> Result<Option<ServedExample>, CalibrationError> {
        RubricIndex::new(rubric).map_err(RequestError::from)?;

        let workflow = self.resolve_workflow(submission_id).await?;
        let num_examples = u32::try_from(examples.len()).unwrap_or(u32::MAX);
        let order_num = workflow.num_completed();
        let Some(example) = examples.get(order_num as usize) else {
            debug!(%submission_id, order_num, num_examples, "no calibration example left");
            return Ok(None);
        };

        let already_marked = workflow.num_examples() == num_examples
            && workflow
                .current()
                .is_some_and(|c| c.order_num == order_num && c.matches(example));
        if !already_marked {
            let current = CurrentExample::new(order_num, example, self.clock.now());
            self.training
                .set_current_example(submission_id, order_num, num_examples, &current)
                .await
                .map_err(CalibrationError::internal)?;
        }

        debug!(%submission_id, order_num, num_examples, "serving calibration example");
        Ok(Some(ServedExample::new(example, rubric)))
    }

    /// Compare the trainee's selections with the current example.
    ///
    /// Returns the corrections, criterion name to correct option name, for
    /// every criterion the trainee got wrong; an empty map is a full match.
    /// On a full match with `update_workflow` set the trainee moves on to the
    /// next example. With `update_workflow` unset nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `CalibrationError::Request` if the trainee has no workflow, no
    /// current example, or has already finished; `CalibrationError::Internal`
    /// if storage fails.
    pub async fn assess_current_example(
        &self,
        submission_id: SubmissionId,
        selections: &OptionSelections,
        update_workflow: bool,
    ) -> Result<Corrections, CalibrationError> {
        let workflow = self
            .training
            .get_workflow(submission_id)
            .await
            .map_err(CalibrationError::internal)?
            .ok_or(RequestError::NoWorkflow(submission_id))?;

        if workflow.is_complete() {
            return Err(RequestError::WorkflowComplete(submission_id).into());
        }
        let current = workflow
            .current()
            .ok_or(RequestError::NoCurrentExample(submission_id))?;

        let corrections = current.corrections(selections);
        if corrections.is_empty() && update_workflow {
            let updated = self
                .training
                .complete_current_example(submission_id, workflow.num_completed(), self.clock.now())
                .await
                .map_err(CalibrationError::internal)?;
            info!(
                %submission_id,
                num_completed = updated.num_completed(),
                "calibration example completed"
            );
        } else {
            debug!(
                %submission_id,
                order_num = current.order_num,
                wrong = corrections.len(),
                update_workflow,
                "calibration example assessed"
            );
        }
        Ok(corrections)
    }

    /// Number of examples assessed correctly so far; 0 before the first view.
    ///
    /// # Errors
    ///
    /// Returns `CalibrationError::Internal` if storage fails.
    pub async fn num_completed(&self, submission_id: SubmissionId) -> Result<u32, CalibrationError> {
        let workflow = self
            .training
            .get_workflow(submission_id)
            .await
            .map_err(CalibrationError::internal)?;
        Ok(workflow.as_ref().map_or(0, TrainingWorkflow::num_completed))
    }

    /// Whether the trainee has completed at least `num_required` examples.
    ///
    /// # Errors
    ///
    /// Returns `CalibrationError::Request` if `requirements` has no integer
    /// `num_required`; `CalibrationError::Internal` if storage fails.
    pub async fn submitter_is_finished(
        &self,
        submission_id: SubmissionId,
        requirements: &serde_json::Value,
    ) -> Result<bool, CalibrationError> {
        let requirements =
            TrainingRequirements::from_value(requirements).map_err(RequestError::from)?;
        Ok(self.num_completed(submission_id).await? >= requirements.num_required)
    }

    /// Calibration is never assessed by others.
    #[must_use]
    pub fn assessment_is_finished(
        &self,
        _submission_id: SubmissionId,
        _requirements: &serde_json::Value,
    ) -> bool {
        true
    }

    /// Calibration never contributes to a grade.
    #[must_use]
    pub fn get_score(
        &self,
        _submission_id: SubmissionId,
        _requirements: &serde_json::Value,
    ) -> Option<Score> {
        None
    }

    /// # Errors
    ///
    /// Returns `CalibrationError::Internal` if storage fails.
    pub async fn status(&self, submission_id: SubmissionId) -> Result<TrainingStatus, CalibrationError> {
        let workflow = self
            .training
            .get_workflow(submission_id)
            .await
            .map_err(CalibrationError::internal)?;
        Ok(workflow.map_or(TrainingStatus::NotStarted, |w| w.status()))
    }

    /// Examples completed so far, in order.
    ///
    /// # Errors
    ///
    /// Returns `CalibrationError::Internal` if storage fails.
    pub async fn completed_items(
        &self,
        submission_id: SubmissionId,
    ) -> Result<Vec<TrainingItem>, CalibrationError> {
        self.training
            .list_items(submission_id)
            .await
            .map_err(CalibrationError::internal)
    }

    async fn resolve_workflow(
        &self,
        submission_id: SubmissionId,
    ) -> Result<TrainingWorkflow, CalibrationError> {
        if let Some(workflow) = self
            .training
            .get_workflow(submission_id)
            .await
            .map_err(CalibrationError::internal)?
        {
            return Ok(workflow);
        }

        match self.submissions.get_submission(submission_id).await {
            Ok(_) => {}
            Err(StorageError::NotFound) => {
                return Err(RequestError::SubmissionNotFound(submission_id).into());
            }
            Err(e) => return Err(CalibrationError::internal(e)),
        }

        let workflow = self
            .training
            .get_or_create_workflow(submission_id, self.clock.now())
            .await
            .map_err(CalibrationError::internal)?;
        info!(%submission_id, "calibration workflow started");
        Ok(workflow)
    }
}
