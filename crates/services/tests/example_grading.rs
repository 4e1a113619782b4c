use std::sync::Arc;

use grading_core::model::{
    OptionSelections, RubricDefinition, RubricIndex, ScoreType, Submission, SubmissionId,
    TrainingExample,
};
use grading_core::scorer::{BagOfWordsAlgorithm, ClassifierCache, LengthBucketAlgorithm};
use grading_core::time::{fixed_clock, fixed_now};
use serde_json::json;
use services::{ExampleGrader, GradingError, RequestError, train_classifiers};
use storage::repository::{AssessmentRepository, InMemoryRepository, SubmissionRepository};

fn rubric() -> RubricDefinition {
    RubricDefinition::from_value(json!({
        "criteria": [
            {
                "order_num": 0,
                "name": "ideas",
                "prompt": "How developed are the ideas?",
                "options": [
                    { "order_num": 0, "name": "none", "points": 0 },
                    { "order_num": 1, "name": "some", "points": 1 },
                    { "order_num": 2, "name": "lots", "points": 2 },
                ]
            },
            {
                "order_num": 1,
                "name": "notes",
                "prompt": "Notes for the author",
                "options": []
            }
        ]
    }))
    .unwrap()
}

fn example(answer: &str, ideas: &str) -> TrainingExample {
    TrainingExample {
        answer: answer.into(),
        options_selected: OptionSelections::from([("ideas".into(), ideas.into())]),
    }
}

fn grader(repo: &InMemoryRepository) -> ExampleGrader {
    ExampleGrader::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(repo.clone()))
}

#[tokio::test]
async fn trained_classifiers_grade_a_stored_submission() {
    let repo = InMemoryRepository::new();
    let submission = Submission::new("abc", fixed_now());
    repo.insert_submission(&submission).await.unwrap();

    let examples = [example("no", "none"), example("a longer one", "lots")];
    let classifiers = train_classifiers(&LengthBucketAlgorithm, &rubric(), &examples).unwrap();
    assert_eq!(classifiers.algorithm, "length-bucket");
    assert_eq!(classifiers.classifiers.keys().collect::<Vec<_>>(), ["ideas"]);

    let mut cache = ClassifierCache::new();
    let stored = grader(&repo)
        .grade(submission.id, &rubric(), &classifiers, &mut cache)
        .await
        .unwrap();

    // Buckets are [0, 2]; a three-character answer lands on 2.
    assert_eq!(stored.assessment.score_type(), ScoreType::Example);
    assert_eq!(stored.assessment.scorer_id(), "length-bucket");
    assert_eq!(
        stored.assessment.part("ideas").unwrap().option.as_ref().unwrap().name,
        "lots"
    );
    assert_eq!(stored.assessment.points_earned(), 2);
    assert_eq!(stored.assessment.points_possible(), 2);
    assert_eq!(repo.list_assessments(submission.id).await.unwrap().len(), 1);
    assert_eq!(cache.decodes(), 1);
}

#[test]
fn classifier_sets_survive_serialization() {
    let examples = [
        example("whales are mammals that breathe air", "lots"),
        example("whales swim", "some"),
        example("i like boats", "none"),
    ];
    let classifiers = train_classifiers(&BagOfWordsAlgorithm, &rubric(), &examples).unwrap();
    let restored: services::ClassifierSet =
        serde_json::from_str(&serde_json::to_string(&classifiers).unwrap()).unwrap();
    assert_eq!(restored, classifiers);

    let index = RubricIndex::new(&rubric()).unwrap();
    let text = "do whales breathe air";
    let a = classifiers
        .score(&index, text, &mut ClassifierCache::new())
        .unwrap();
    let b = restored
        .score(&index, text, &mut ClassifierCache::new())
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn invalid_examples_are_reported_together() {
    let examples = [
        example("first", "brilliant"),
        TrainingExample {
            answer: "second".into(),
            options_selected: OptionSelections::new(),
        },
    ];
    let err = train_classifiers(&LengthBucketAlgorithm, &rubric(), &examples).unwrap_err();
    match err {
        GradingError::Request(RequestError::InvalidExamples(errors)) => assert_eq!(
            errors,
            [
                "example 1 has an invalid option for \"ideas\": \"brilliant\"",
                "example 2 is missing an option for \"ideas\"",
            ]
        ),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn grading_an_unknown_submission_fails() {
    let repo = InMemoryRepository::new();
    let classifiers =
        train_classifiers(&LengthBucketAlgorithm, &rubric(), &[example("x", "some")]).unwrap();

    let err = grader(&repo)
        .grade(
            SubmissionId::generate(),
            &rubric(),
            &classifiers,
            &mut ClassifierCache::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GradingError::Request(RequestError::SubmissionNotFound(_))
    ));
}

#[tokio::test]
async fn unknown_algorithm_is_a_request_error() {
    let repo = InMemoryRepository::new();
    let submission = Submission::new("answer", fixed_now());
    repo.insert_submission(&submission).await.unwrap();

    let mut classifiers =
        train_classifiers(&LengthBucketAlgorithm, &rubric(), &[example("x", "some")]).unwrap();
    classifiers.algorithm = "ease".into();

    let err = grader(&repo)
        .grade(submission.id, &rubric(), &classifiers, &mut ClassifierCache::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GradingError::Request(RequestError::UnknownAlgorithm(_))
    ));
    assert!(repo.list_assessments(submission.id).await.unwrap().is_empty());
}
