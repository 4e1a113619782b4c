mod assessment;
mod ids;
mod rubric;
mod rubric_index;
mod submission;
mod training;

pub use ids::{AssessmentId, ParseIdError, SubmissionId};

pub use assessment::{
    Assessment, AssessmentPart, ParseScoreTypeError, Score, ScoreType, SelectedOption,
};
pub use rubric::{
    Criterion, CriterionDefinition, CriterionKind, OptionDefinition, Rubric, RubricDefinition,
    RubricError, RubricOption,
};
pub use rubric_index::{
    CriterionFeedback, OptionSelections, PointSelections, ResolvedPart, RubricIndex,
    SelectionError,
};
pub use submission::Submission;
pub use training::{
    Corrections, CurrentExample, RequirementsError, ServedExample, TrainingExample, TrainingItem,
    TrainingRequirements, TrainingStatus, TrainingWorkflow, corrections,
    validate_training_examples,
};
