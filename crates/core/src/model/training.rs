use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::ids::SubmissionId;
use crate::model::rubric::{Rubric, RubricDefinition};
use crate::model::rubric_index::OptionSelections;

/// Criterion name → the option the trainee should have chosen.
pub type Corrections = BTreeMap<String, String>;

//
// ─── EXAMPLES ──────────────────────────────────────────────────────────────────
//

/// An answer with the instructor's known-correct selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub answer: String,
    pub options_selected: OptionSelections,
}

/// An example as shown to a trainee, with the rubric to assess it against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServedExample {
    pub answer: String,
    pub options_selected: OptionSelections,
    pub rubric: RubricDefinition,
}

impl ServedExample {
    #[must_use]
    pub fn new(example: &TrainingExample, rubric: &RubricDefinition) -> Self {
        Self {
            answer: example.answer.clone(),
            options_selected: example.options_selected.clone(),
            rubric: rubric.clone(),
        }
    }
}

/// Criteria where `given` disagrees with `expected`, mapped to the expected option.
///
/// Criteria absent from `expected` are ignored.
#[must_use]
pub fn corrections(expected: &OptionSelections, given: &OptionSelections) -> Corrections {
    expected
        .iter()
        .filter(|(criterion, correct)| given.get(*criterion) != Some(*correct))
        .map(|(criterion, correct)| (criterion.clone(), correct.clone()))
        .collect()
}

/// Check an example set against a rubric before it is used for training.
///
/// Returns human-readable problems; an empty list means the set is usable.
/// Examples are numbered from 1.
#[must_use]
pub fn validate_training_examples(
    rubric: &RubricDefinition,
    examples: &[TrainingExample],
) -> Vec<String> {
    let rubric = match Rubric::from_definition(rubric) {
        Ok(rubric) => rubric,
        Err(err) => return vec![err.to_string()],
    };

    if examples.is_empty() {
        return vec!["at least one training example is required".to_owned()];
    }

    let scored: BTreeMap<&str, Vec<&str>> = rubric
        .criteria()
        .iter()
        .filter(|c| !c.is_feedback_only())
        .map(|c| (c.name(), c.options().iter().map(|o| o.name()).collect()))
        .collect();
    if scored.is_empty() {
        return vec!["the rubric must contain at least one criterion with options".to_owned()];
    }

    let mut errors = Vec::new();
    for (num, example) in examples.iter().enumerate().map(|(i, e)| (i + 1, e)) {
        for (criterion, option) in &example.options_selected {
            match scored.get(criterion.as_str()) {
                Some(valid) if valid.contains(&option.as_str()) => {}
                Some(_) => errors.push(format!(
                    "example {num} has an invalid option for \"{criterion}\": \"{option}\""
                )),
                None => errors.push(format!(
                    "example {num} has an extra option for \"{criterion}\""
                )),
            }
        }
        for criterion in scored.keys() {
            if !example.options_selected.contains_key(*criterion) {
                errors.push(format!(
                    "example {num} is missing an option for \"{criterion}\""
                ));
            }
        }
    }
    errors
}

//
// ─── REQUIREMENTS ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RequirementsError {
    #[error("training requirements must specify \"num_required\"")]
    MissingNumRequired,

    #[error("\"num_required\" must be a non-negative integer, got {0}")]
    InvalidNumRequired(String),
}

/// How many examples a trainee must assess correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRequirements {
    pub num_required: u32,
}

impl TrainingRequirements {
    /// # Errors
    ///
    /// Returns `RequirementsError` when `num_required` is absent or not an integer.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, RequirementsError> {
        let raw = value
            .get("num_required")
            .ok_or(RequirementsError::MissingNumRequired)?;
        raw.as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(|num_required| Self { num_required })
            .ok_or_else(|| RequirementsError::InvalidNumRequired(raw.to_string()))
    }
}

//
// ─── WORKFLOW STATE ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    NotStarted,
    InProgress,
    Complete,
}

/// The example a trainee was last shown and has not yet matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentExample {
    pub order_num: u32,
    pub answer: String,
    pub options_selected: OptionSelections,
    pub started_at: DateTime<Utc>,
}

impl CurrentExample {
    #[must_use]
    pub fn new(order_num: u32, example: &TrainingExample, started_at: DateTime<Utc>) -> Self {
        Self {
            order_num,
            answer: example.answer.clone(),
            options_selected: example.options_selected.clone(),
            started_at,
        }
    }

    #[must_use]
    pub fn corrections(&self, given: &OptionSelections) -> Corrections {
        corrections(&self.options_selected, given)
    }

    #[must_use]
    pub fn matches(&self, example: &TrainingExample) -> bool {
        self.answer == example.answer && self.options_selected == example.options_selected
    }
}

/// An example the trainee has assessed correctly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingItem {
    pub order_num: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Calibration progress for one submission.
///
/// `num_completed` only ever grows; the next example to serve is the one at
/// index `num_completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingWorkflow {
    submission_id: SubmissionId,
    num_completed: u32,
    num_examples: u32,
    current: Option<CurrentExample>,
    created_at: DateTime<Utc>,
}

impl TrainingWorkflow {
    #[must_use]
    pub fn new(submission_id: SubmissionId, created_at: DateTime<Utc>) -> Self {
        Self {
            submission_id,
            num_completed: 0,
            num_examples: 0,
            current: None,
            created_at,
        }
    }

    #[must_use]
    pub fn from_persisted(
        submission_id: SubmissionId,
        num_completed: u32,
        num_examples: u32,
        current: Option<CurrentExample>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            submission_id,
            num_completed,
            num_examples,
            current,
            created_at,
        }
    }

    #[must_use]
    pub fn submission_id(&self) -> SubmissionId {
        self.submission_id
    }

    #[must_use]
    pub fn num_completed(&self) -> u32 {
        self.num_completed
    }

    /// Size of the example set this workflow was last served from.
    #[must_use]
    pub fn num_examples(&self) -> u32 {
        self.num_examples
    }

    #[must_use]
    pub fn current(&self) -> Option<&CurrentExample> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.num_examples > 0 && self.num_completed >= self.num_examples
    }

    #[must_use]
    pub fn status(&self) -> TrainingStatus {
        if self.is_complete() {
            TrainingStatus::Complete
        } else {
            TrainingStatus::InProgress
        }
    }
}
