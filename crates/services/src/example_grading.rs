//! Grading submissions with classifiers trained on calibration examples.

use std::collections::BTreeMap;
use std::sync::Arc;

use grading_core::model::{
    Assessment, PointSelections, RubricDefinition, RubricIndex, ScoreType, SelectionError,
    SubmissionId, TrainingExample, validate_training_examples,
};
use grading_core::scorer::{
    Classifier, ClassifierCache, ExampleEssay, ScoringAlgorithm, algorithm_by_id,
};
use serde::{Deserialize, Serialize};
use storage::repository::{AssessmentRepository, StorageError, StoredAssessment, SubmissionRepository};
use tracing::info;

use crate::Clock;
use crate::error::{GradingError, RequestError};

/// One trained classifier per scored criterion, all from the same algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierSet {
    pub algorithm: String,
    pub classifiers: BTreeMap<String, Classifier>,
}

impl ClassifierSet {
    /// Score `text` on every scored criterion of the rubric.
    ///
    /// # Errors
    ///
    /// Returns `RequestError` if the algorithm is unknown, a criterion has no
    /// classifier, or a classifier is invalid.
    pub fn score(
        &self,
        index: &RubricIndex,
        text: &str,
        cache: &mut ClassifierCache,
    ) -> Result<PointSelections, RequestError> {
        let algorithm = algorithm_by_id(&self.algorithm)
            .ok_or_else(|| RequestError::UnknownAlgorithm(self.algorithm.clone()))?;

        let mut points = PointSelections::new();
        for criterion in index.options_criteria() {
            let classifier = self
                .classifiers
                .get(criterion.name())
                .ok_or_else(|| RequestError::MissingClassifier(criterion.name().to_owned()))?;
            let score = algorithm.score(text, classifier, cache)?;
            points.insert(criterion.name().to_owned(), score);
        }
        Ok(points)
    }
}

/// Train one classifier per scored criterion, labelling each example answer
/// with the points of the option it selected.
///
/// # Errors
///
/// Returns `GradingError::Request` if the examples do not fit the rubric or
/// training fails.
pub fn train_classifiers(
    algorithm: &dyn ScoringAlgorithm,
    rubric: &RubricDefinition,
    examples: &[TrainingExample],
) -> Result<ClassifierSet, GradingError> {
    let errors = validate_training_examples(rubric, examples);
    if !errors.is_empty() {
        return Err(RequestError::InvalidExamples(errors).into());
    }
    let index = RubricIndex::new(rubric).map_err(RequestError::from)?;

    let mut classifiers = BTreeMap::new();
    for criterion in index.options_criteria() {
        let mut essays = Vec::with_capacity(examples.len());
        for example in examples {
            let option = example
                .options_selected
                .get(criterion.name())
                .ok_or_else(|| SelectionError::NotAssessed(vec![criterion.name().to_owned()]))
                .and_then(|option| index.find_option(criterion.name(), option))
                .map_err(RequestError::from)?;
            essays.push(ExampleEssay::new(example.answer.clone(), option.points()));
        }
        let classifier = algorithm.train(&essays).map_err(RequestError::from)?;
        classifiers.insert(criterion.name().to_owned(), classifier);
    }

    info!(
        algorithm = algorithm.id(),
        criteria = classifiers.len(),
        examples = examples.len(),
        "classifiers trained"
    );
    Ok(ClassifierSet {
        algorithm: algorithm.id().to_owned(),
        classifiers,
    })
}

/// Persists classifier-produced assessments for stored submissions.
#[derive(Clone)]
pub struct ExampleGrader {
    clock: Clock,
    submissions: Arc<dyn SubmissionRepository>,
    assessments: Arc<dyn AssessmentRepository>,
}

impl ExampleGrader {
    #[must_use]
    pub fn new(
        clock: Clock,
        submissions: Arc<dyn SubmissionRepository>,
        assessments: Arc<dyn AssessmentRepository>,
    ) -> Self {
        Self {
            clock,
            submissions,
            assessments,
        }
    }

    /// Score a submission with `classifiers` and persist the result as an
    /// `AI` assessment. Scores map to options by point value.
    ///
    /// # Errors
    ///
    /// Returns `GradingError::Request` for an unknown submission, a malformed
    /// rubric or an unusable classifier set; `GradingError::Internal` if
    /// storage fails.
    pub async fn grade(
        &self,
        submission_id: SubmissionId,
        rubric: &RubricDefinition,
        classifiers: &ClassifierSet,
        cache: &mut ClassifierCache,
    ) -> Result<StoredAssessment, GradingError> {
        let index = RubricIndex::new(rubric).map_err(RequestError::from)?;
        let submission = match self.submissions.get_submission(submission_id).await {
            Ok(submission) => submission,
            Err(StorageError::NotFound) => {
                return Err(RequestError::SubmissionNotFound(submission_id).into());
            }
            Err(e) => return Err(GradingError::internal(e)),
        };

        let points = classifiers.score(&index, &submission.answer, cache)?;
        let mut assessment = Assessment::create(
            &index,
            classifiers.algorithm.clone(),
            submission_id,
            ScoreType::Example,
            self.clock.now(),
        );
        assessment
            .add_parts_from_option_points(&index, &points)
            .map_err(RequestError::from)?;

        let id = self
            .assessments
            .insert_assessment(&assessment)
            .await
            .map_err(GradingError::internal)?;
        info!(
            assessment_id = %id,
            %submission_id,
            points_earned = assessment.points_earned(),
            points_possible = assessment.points_possible(),
            "example-based assessment persisted"
        );
        Ok(StoredAssessment { id, assessment })
    }
}
