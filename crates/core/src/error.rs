use thiserror::Error;

use crate::model::{RequirementsError, RubricError, SelectionError};
use crate::scorer::{InvalidClassifier, TrainingError};

/// Umbrella over every domain-level failure in this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_domain_errors_transparently() {
        let err: Error = RubricError::NoCriteria.into();
        assert!(matches!(err, Error::Rubric(RubricError::NoCriteria)));
        assert_eq!(err.to_string(), RubricError::NoCriteria.to_string());

        let err: Error = TrainingError::NoExamples.into();
        assert_eq!(err.to_string(), TrainingError::NoExamples.to_string());
    }
}
