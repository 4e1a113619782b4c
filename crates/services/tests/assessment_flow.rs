use std::sync::Arc;

use async_trait::async_trait;
use grading_core::model::{
    Assessment, AssessmentId, CriterionFeedback, OptionSelections, PointSelections,
    RubricDefinition, ScoreType, SelectionError, SubmissionId,
};
use grading_core::time::{fixed_clock, fixed_now};
use serde_json::json;
use services::{AssessmentRequest, AssessmentService, AssessmentServiceError, RequestError};
use storage::repository::{
    AssessmentRepository, InMemoryRepository, StorageError, StoredAssessment,
};

/// One scored criterion worth up to 2 points and one feedback-only criterion.
fn rubric() -> RubricDefinition {
    RubricDefinition::from_value(json!({
        "criteria": [
            {
                "order_num": 0,
                "name": "clarity",
                "prompt": "How clear is the answer?",
                "options": [
                    { "order_num": 0, "name": "unclear", "points": 0 },
                    { "order_num": 1, "name": "somewhat", "points": 1 },
                    { "order_num": 2, "name": "clear", "points": 2 },
                ]
            },
            {
                "order_num": 1,
                "name": "comments",
                "prompt": "General comments",
                "options": []
            }
        ]
    }))
    .unwrap()
}

fn service(repo: &InMemoryRepository) -> AssessmentService {
    AssessmentService::new(fixed_clock(), Arc::new(repo.clone()))
}

fn somewhat() -> OptionSelections {
    OptionSelections::from([("clarity".into(), "somewhat".into())])
}

#[tokio::test]
async fn omitted_feedback_defaults_feedback_only_criteria() {
    let repo = InMemoryRepository::new();
    let request = AssessmentRequest::new(SubmissionId::generate(), "peer-1", ScoreType::Peer)
        .with_feedback("Good start");

    let stored = service(&repo)
        .create_from_option_names(&rubric(), &request, &somewhat(), None)
        .await
        .unwrap();
    assert_eq!(stored.assessment.points_earned(), 1);
    assert_eq!(stored.assessment.points_possible(), 2);
    assert_eq!(stored.assessment.feedback(), "Good start");
    assert_eq!(stored.assessment.scored_at(), fixed_now());
    assert_eq!(stored.assessment.part("comments").unwrap().feedback, "");

    let fetched = repo.get_assessment(stored.id).await.unwrap();
    assert_eq!(fetched, stored.assessment);
}

#[tokio::test]
async fn supplied_feedback_must_cover_feedback_only_criteria() {
    let repo = InMemoryRepository::new();
    let sub = SubmissionId::generate();
    let request = AssessmentRequest::new(sub, "peer-1", ScoreType::Peer);
    let svc = service(&repo);

    let err = svc
        .create_from_option_names(&rubric(), &request, &somewhat(), Some(&CriterionFeedback::new()))
        .await
        .unwrap_err();
    match err {
        AssessmentServiceError::Request(RequestError::Selection(SelectionError::NotAssessed(
            names,
        ))) => assert_eq!(names, ["comments"]),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(svc.list_assessments(sub).await.unwrap().is_empty());

    let feedback = CriterionFeedback::from([("comments".into(), String::new())]);
    let stored = svc
        .create_from_option_names(&rubric(), &request, &somewhat(), Some(&feedback))
        .await
        .unwrap();
    assert_eq!(stored.assessment.points_earned(), 1);
    assert_eq!(svc.list_assessments(sub).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_names_are_rejected_without_persisting() {
    let repo = InMemoryRepository::new();
    let sub = SubmissionId::generate();
    let request = AssessmentRequest::new(sub, "self", ScoreType::SelfAssessed);
    let svc = service(&repo);

    let bad_option = OptionSelections::from([("clarity".into(), "dazzling".into())]);
    let err = svc
        .create_from_option_names(&rubric(), &request, &bad_option, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AssessmentServiceError::Request(RequestError::Selection(
            SelectionError::UnknownOption { .. }
        ))
    ));

    let nothing = OptionSelections::new();
    let err = svc
        .create_from_option_names(&rubric(), &request, &nothing, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AssessmentServiceError::Request(RequestError::Selection(SelectionError::NotAssessed(_)))
    ));
    assert!(svc.list_assessments(sub).await.unwrap().is_empty());
}

#[tokio::test]
async fn points_path_maps_to_options_and_ignores_feedback() {
    let repo = InMemoryRepository::new();
    let request = AssessmentRequest::new(SubmissionId::generate(), "staff", ScoreType::Staff);

    let stored = service(&repo)
        .create_from_option_points(
            &rubric(),
            &request,
            &PointSelections::from([("clarity".into(), 2)]),
        )
        .await
        .unwrap();
    let clarity = stored.assessment.part("clarity").unwrap();
    assert_eq!(clarity.option.as_ref().unwrap().name, "clear");
    assert_eq!(stored.assessment.score().points_earned, 2);
    assert_eq!(stored.assessment.score().points_possible, 2);
}

#[tokio::test]
async fn unknown_assessment_is_a_request_error() {
    let repo = InMemoryRepository::new();
    let err = service(&repo)
        .get_assessment(AssessmentId::new(42))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AssessmentServiceError::Request(RequestError::AssessmentNotFound(_))
    ));
}

struct ReadOnlyAssessments;

#[async_trait]
impl AssessmentRepository for ReadOnlyAssessments {
    async fn insert_assessment(&self, _assessment: &Assessment) -> Result<AssessmentId, StorageError> {
        Err(StorageError::Connection("read-only replica".into()))
    }

    async fn get_assessment(&self, _id: AssessmentId) -> Result<Assessment, StorageError> {
        Err(StorageError::NotFound)
    }

    async fn list_assessments(
        &self,
        _submission_id: SubmissionId,
    ) -> Result<Vec<StoredAssessment>, StorageError> {
        Ok(Vec::new())
    }

    async fn delete_assessment(&self, _id: AssessmentId) -> Result<(), StorageError> {
        Err(StorageError::NotFound)
    }
}

#[tokio::test]
async fn write_failures_are_internal_and_retryable() {
    let svc = AssessmentService::new(fixed_clock(), Arc::new(ReadOnlyAssessments));
    let request = AssessmentRequest::new(SubmissionId::generate(), "peer-1", ScoreType::Peer);

    let err = svc
        .create_from_option_names(&rubric(), &request, &somewhat(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AssessmentServiceError::Internal(_)));
    assert!(err.is_retryable());
}
