use chrono::{DateTime, Utc};

use crate::model::ids::SubmissionId;

/// The learner's answer as held by the submission store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: SubmissionId,
    pub answer: String,
    pub submitted_at: DateTime<Utc>,
}

impl Submission {
    #[must_use]
    pub fn new(answer: impl Into<String>, submitted_at: DateTime<Utc>) -> Self {
        Self {
            id: SubmissionId::generate(),
            answer: answer.into(),
            submitted_at,
        }
    }
}
