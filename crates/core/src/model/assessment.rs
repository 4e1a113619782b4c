use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::ids::SubmissionId;
use crate::model::rubric_index::{
    CriterionFeedback, OptionSelections, PointSelections, ResolvedPart, RubricIndex,
    SelectionError,
};

//
// ─── SCORE TYPE ────────────────────────────────────────────────────────────────
//

/// Who produced an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreType {
    #[serde(rename = "PE")]
    Peer,
    #[serde(rename = "SE")]
    SelfAssessed,
    /// Produced by a trained classifier.
    #[serde(rename = "AI")]
    Example,
    #[serde(rename = "ST")]
    Staff,
}

impl ScoreType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreType::Peer => "PE",
            ScoreType::SelfAssessed => "SE",
            ScoreType::Example => "AI",
            ScoreType::Staff => "ST",
        }
    }
}

impl fmt::Display for ScoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseScoreTypeError(pub String);

impl fmt::Display for ParseScoreTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown score type: {}", self.0)
    }
}

impl std::error::Error for ParseScoreTypeError {}

impl FromStr for ScoreType {
    type Err = ParseScoreTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PE" => Ok(Self::Peer),
            "SE" => Ok(Self::SelfAssessed),
            "AI" => Ok(Self::Example),
            "ST" => Ok(Self::Staff),
            other => Err(ParseScoreTypeError(other.to_owned())),
        }
    }
}

//
// ─── SCORE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub points_earned: u32,
    pub points_possible: u32,
}

//
// ─── PARTS ─────────────────────────────────────────────────────────────────────
//

/// Snapshot of the option chosen for a scored criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub points: u32,
}

/// The grader's answer for one criterion.
///
/// Scored criteria carry an option; feedback-only criteria carry `None`.
/// Either kind may carry feedback text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentPart {
    pub criterion: String,
    pub option: Option<SelectedOption>,
    pub feedback: String,
}

impl AssessmentPart {
    #[must_use]
    pub fn points_earned(&self) -> u32 {
        self.option.as_ref().map_or(0, |o| o.points)
    }
}

impl From<ResolvedPart<'_>> for AssessmentPart {
    fn from(part: ResolvedPart<'_>) -> Self {
        Self {
            criterion: part.criterion.name().to_owned(),
            option: part.option.map(|o| SelectedOption {
                name: o.name().to_owned(),
                points: o.points(),
            }),
            feedback: part.feedback,
        }
    }
}

//
// ─── ASSESSMENT ────────────────────────────────────────────────────────────────
//

/// One grading of one submission against a rubric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    submission_id: SubmissionId,
    scorer_id: String,
    score_type: ScoreType,
    scored_at: DateTime<Utc>,
    feedback: String,
    parts: Vec<AssessmentPart>,
    points_earned: u32,
    points_possible: u32,
}

impl Assessment {
    /// Start an assessment with no parts.
    #[must_use]
    pub fn create(
        index: &RubricIndex,
        scorer_id: impl Into<String>,
        submission_id: SubmissionId,
        score_type: ScoreType,
        scored_at: DateTime<Utc>,
    ) -> Self {
        Self {
            submission_id,
            scorer_id: scorer_id.into(),
            score_type,
            scored_at,
            feedback: String::new(),
            parts: Vec::new(),
            points_earned: 0,
            points_possible: index.points_possible(),
        }
    }

    /// Rebuild an assessment loaded from storage.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        submission_id: SubmissionId,
        scorer_id: String,
        score_type: ScoreType,
        scored_at: DateTime<Utc>,
        feedback: String,
        parts: Vec<AssessmentPart>,
        points_earned: u32,
        points_possible: u32,
    ) -> Self {
        Self {
            submission_id,
            scorer_id,
            score_type,
            scored_at,
            feedback,
            parts,
            points_earned,
            points_possible,
        }
    }

    #[must_use]
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = feedback.into();
        self
    }

    /// Attach one part per criterion from option names.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError` if the selections do not account for every
    /// criterion, name something outside the rubric, or parts were already
    /// added. The assessment is left untouched on error.
    pub fn add_parts_from_option_names(
        &mut self,
        index: &RubricIndex,
        selections: &OptionSelections,
        feedback: Option<&CriterionFeedback>,
    ) -> Result<(), SelectionError> {
        self.ensure_no_parts()?;
        let resolved = index.resolve_option_names(selections, feedback)?;
        self.set_parts(index, resolved);
        Ok(())
    }

    /// Attach one part per criterion from raw point values.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Assessment::add_parts_from_option_names`], except
    /// feedback is never required.
    pub fn add_parts_from_option_points(
        &mut self,
        index: &RubricIndex,
        points: &PointSelections,
    ) -> Result<(), SelectionError> {
        self.ensure_no_parts()?;
        let resolved = index.resolve_option_points(points)?;
        self.set_parts(index, resolved);
        Ok(())
    }

    fn ensure_no_parts(&self) -> Result<(), SelectionError> {
        if self.parts.is_empty() {
            Ok(())
        } else {
            Err(SelectionError::PartsAlreadyAdded)
        }
    }

    // Earned never exceeds possible, and possible fits in u32.
    fn set_parts(&mut self, index: &RubricIndex, resolved: Vec<ResolvedPart<'_>>) {
        self.parts = resolved.into_iter().map(AssessmentPart::from).collect();
        self.points_earned = self.parts.iter().map(AssessmentPart::points_earned).sum();
        self.points_possible = index.points_possible();
    }

    #[must_use]
    pub fn submission_id(&self) -> SubmissionId {
        self.submission_id
    }

    #[must_use]
    pub fn scorer_id(&self) -> &str {
        &self.scorer_id
    }

    #[must_use]
    pub fn score_type(&self) -> ScoreType {
        self.score_type
    }

    #[must_use]
    pub fn scored_at(&self) -> DateTime<Utc> {
        self.scored_at
    }

    #[must_use]
    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    #[must_use]
    pub fn parts(&self) -> &[AssessmentPart] {
        &self.parts
    }

    #[must_use]
    pub fn part(&self, criterion: &str) -> Option<&AssessmentPart> {
        self.parts.iter().find(|p| p.criterion == criterion)
    }

    #[must_use]
    pub fn points_earned(&self) -> u32 {
        self.points_earned
    }

    #[must_use]
    pub fn points_possible(&self) -> u32 {
        self.points_possible
    }

    #[must_use]
    pub fn score(&self) -> Score {
        Score {
            points_earned: self.points_earned,
            points_possible: self.points_possible,
        }
    }
}
