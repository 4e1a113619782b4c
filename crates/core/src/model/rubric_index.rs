use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

use crate::model::rubric::{Criterion, CriterionKind, Rubric, RubricDefinition, RubricError, RubricOption};

/// Criterion name → chosen option name.
pub type OptionSelections = BTreeMap<String, String>;

/// Criterion name → raw point value (used by automated graders).
pub type PointSelections = BTreeMap<String, u32>;

/// Criterion name → written feedback.
pub type CriterionFeedback = BTreeMap<String, String>;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// A selection that does not fit the rubric it is applied to.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SelectionError {
    #[error("rubric has no criterion named \"{0}\"")]
    UnknownCriterion(String),

    #[error("criterion \"{criterion}\" has no option named \"{option}\"")]
    UnknownOption { criterion: String, option: String },

    #[error("criterion \"{criterion}\" has no option for {points} points")]
    NoOptionForPoints { criterion: String, points: u32 },

    #[error("criteria were not assessed: {}", .0.join(", "))]
    NotAssessed(Vec<String>),

    #[error("assessment already has parts")]
    PartsAlreadyAdded,
}

//
// ─── INDEX ─────────────────────────────────────────────────────────────────────
//

/// One criterion of the rubric bound to what the grader chose for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPart<'a> {
    pub criterion: &'a Criterion,
    pub option: Option<&'a RubricOption>,
    pub feedback: String,
}

/// Lookup structures over a validated rubric.
#[derive(Debug, Clone)]
pub struct RubricIndex {
    rubric: Rubric,
    criteria_by_name: HashMap<String, usize>,
    options_by_name: Vec<HashMap<String, usize>>,
}

impl RubricIndex {
    /// Validate a definition and index it.
    ///
    /// # Errors
    ///
    /// Returns `RubricError` if the definition is malformed.
    pub fn new(definition: &RubricDefinition) -> Result<Self, RubricError> {
        Ok(Self::from_rubric(Rubric::from_definition(definition)?))
    }

    /// Decode and index a rubric given as a JSON record.
    ///
    /// # Errors
    ///
    /// Returns `RubricError` if the record is not a well-formed rubric.
    pub fn from_value(value: serde_json::Value) -> Result<Self, RubricError> {
        Self::new(&RubricDefinition::from_value(value)?)
    }

    #[must_use]
    pub fn from_rubric(rubric: Rubric) -> Self {
        let criteria_by_name = rubric
            .criteria()
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name().to_owned(), i))
            .collect();
        let options_by_name = rubric
            .criteria()
            .iter()
            .map(|c| {
                c.options()
                    .iter()
                    .enumerate()
                    .map(|(i, o)| (o.name().to_owned(), i))
                    .collect()
            })
            .collect();

        Self {
            rubric,
            criteria_by_name,
            options_by_name,
        }
    }

    #[must_use]
    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    #[must_use]
    pub fn criterion(&self, name: &str) -> Option<&Criterion> {
        self.criteria_by_name
            .get(name)
            .map(|&i| &self.rubric.criteria()[i])
    }

    /// Criteria that have at least one option, in order.
    pub fn options_criteria(&self) -> impl Iterator<Item = &Criterion> {
        self.rubric.criteria().iter().filter(|c| !c.is_feedback_only())
    }

    /// Feedback-only criteria, in order.
    pub fn zero_option_criteria(&self) -> impl Iterator<Item = &Criterion> {
        self.rubric.criteria().iter().filter(|c| c.is_feedback_only())
    }

    /// # Errors
    ///
    /// Returns `SelectionError` if the criterion or option is unknown.
    pub fn find_option(&self, criterion: &str, option: &str) -> Result<&RubricOption, SelectionError> {
        let idx = *self
            .criteria_by_name
            .get(criterion)
            .ok_or_else(|| SelectionError::UnknownCriterion(criterion.to_owned()))?;
        let opt_idx = self.options_by_name[idx].get(option).ok_or_else(|| {
            SelectionError::UnknownOption {
                criterion: criterion.to_owned(),
                option: option.to_owned(),
            }
        })?;
        Ok(&self.rubric.criteria()[idx].options()[*opt_idx])
    }

    /// Option worth `points`, or the one with the nearest value.
    ///
    /// Earlier options win ties. `None` for unknown or feedback-only criteria.
    #[must_use]
    pub fn find_option_for_points(&self, criterion: &str, points: u32) -> Option<&RubricOption> {
        self.criterion(criterion)?
            .options()
            .iter()
            .min_by_key(|o| o.points().abs_diff(points))
    }

    /// Names of criteria (in order) that do not appear in `selected`.
    pub fn find_missing_criteria<'a, I>(&self, selected: I) -> Vec<&str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let selected: HashSet<&str> = selected.into_iter().collect();
        self.rubric
            .criteria()
            .iter()
            .map(Criterion::name)
            .filter(|name| !selected.contains(name))
            .collect()
    }

    /// Sum of the best option of each scored criterion. Fits in `u32`, which
    /// [`Rubric::from_definition`] checks.
    #[must_use]
    pub fn points_possible(&self) -> u32 {
        self.options_criteria().map(Criterion::max_points).sum()
    }

    /// Validate option-name selections and bind every criterion to its choice.
    ///
    /// With `feedback: None` feedback-only criteria default to empty feedback.
    /// With `Some(map)` every feedback-only criterion needs a key in `map`.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError` for unknown names or unassessed criteria.
    pub fn resolve_option_names(
        &self,
        selections: &OptionSelections,
        feedback: Option<&CriterionFeedback>,
    ) -> Result<Vec<ResolvedPart<'_>>, SelectionError> {
        let mut chosen = HashMap::with_capacity(selections.len());
        for (criterion, option) in selections {
            chosen.insert(criterion.as_str(), self.find_option(criterion, option)?);
        }
        if let Some(feedback) = feedback {
            if let Some(unknown) = feedback.keys().find(|k| self.criterion(k).is_none()) {
                return Err(SelectionError::UnknownCriterion(unknown.clone()));
            }
        }

        let mut unassessed = Vec::new();
        for criterion in self.rubric.criteria() {
            let assessed = match criterion.kind() {
                CriterionKind::Scored(_) => chosen.contains_key(criterion.name()),
                CriterionKind::FeedbackOnly => {
                    feedback.is_none_or(|f| f.contains_key(criterion.name()))
                }
            };
            if !assessed {
                unassessed.push(criterion.name().to_owned());
            }
        }
        if !unassessed.is_empty() {
            return Err(SelectionError::NotAssessed(unassessed));
        }

        Ok(self
            .rubric
            .criteria()
            .iter()
            .map(|criterion| ResolvedPart {
                criterion,
                option: chosen.get(criterion.name()).copied(),
                feedback: feedback
                    .and_then(|f| f.get(criterion.name()))
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect())
    }

    /// Validate point-value selections; feedback is always empty.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError` for unknown criteria, points given to a
    /// feedback-only criterion, or scored criteria without a value.
    pub fn resolve_option_points(
        &self,
        points: &PointSelections,
    ) -> Result<Vec<ResolvedPart<'_>>, SelectionError> {
        let mut chosen = HashMap::with_capacity(points.len());
        for (criterion, &value) in points {
            if self.criterion(criterion).is_none() {
                return Err(SelectionError::UnknownCriterion(criterion.clone()));
            }
            let option = self.find_option_for_points(criterion, value).ok_or_else(|| {
                SelectionError::NoOptionForPoints {
                    criterion: criterion.clone(),
                    points: value,
                }
            })?;
            chosen.insert(criterion.as_str(), option);
        }

        let unassessed: Vec<String> = self
            .options_criteria()
            .filter(|c| !chosen.contains_key(c.name()))
            .map(|c| c.name().to_owned())
            .collect();
        if !unassessed.is_empty() {
            return Err(SelectionError::NotAssessed(unassessed));
        }

        Ok(self
            .rubric
            .criteria()
            .iter()
            .map(|criterion| ResolvedPart {
                criterion,
                option: chosen.get(criterion.name()).copied(),
                feedback: String::new(),
            })
            .collect())
    }
}
