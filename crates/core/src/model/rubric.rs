use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Reasons a rubric definition cannot be indexed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RubricError {
    #[error("malformed rubric: {0}")]
    Malformed(String),

    #[error("rubric must contain at least one criterion")]
    NoCriteria,

    #[error("criterion at position {position} is missing a name")]
    MissingCriterionName { position: usize },

    #[error("criterion \"{criterion}\" has an option without a name")]
    MissingOptionName { criterion: String },

    #[error("criterion name \"{0}\" is used more than once")]
    DuplicateCriterion(String),

    #[error("criterion order number {0} is used more than once")]
    DuplicateCriterionOrder(u32),

    #[error("criterion \"{criterion}\" has more than one option named \"{option}\"")]
    DuplicateOption { criterion: String, option: String },

    #[error("rubric is worth more than {} points in total", u32::MAX)]
    PointsOverflow,
}

//
// ─── DEFINITION (wire shape) ───────────────────────────────────────────────────
//

/// Rubric exactly as supplied by the caller.
///
/// Nothing is checked beyond the field types; use [`Rubric::from_definition`]
/// (or [`crate::model::RubricIndex`]) to get a validated view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub criteria: Vec<CriterionDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionDefinition {
    pub order_num: u32,
    pub name: String,
    pub prompt: String,
    pub options: Vec<OptionDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDefinition {
    pub order_num: u32,
    pub name: String,
    #[serde(default)]
    pub explanation: String,
    pub points: u32,
}

impl RubricDefinition {
    /// Decode a rubric from a loosely-typed JSON record.
    ///
    /// # Errors
    ///
    /// Returns `RubricError::Malformed` when the `criteria` list or any required
    /// criterion/option field is absent or has the wrong type.
    pub fn from_value(value: serde_json::Value) -> Result<Self, RubricError> {
        serde_json::from_value(value).map_err(|e| RubricError::Malformed(e.to_string()))
    }
}

//
// ─── VALIDATED RUBRIC ──────────────────────────────────────────────────────────
//

/// A selectable option of a scored criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RubricOption {
    order_num: u32,
    name: String,
    explanation: String,
    points: u32,
}

impl RubricOption {
    #[must_use]
    pub fn order_num(&self) -> u32 {
        self.order_num
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }
}

/// How a criterion is assessed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriterionKind {
    /// Assessed by selecting one of the options (kept in order-number order).
    Scored(Vec<RubricOption>),
    /// No options: assessed with written feedback, worth zero points.
    FeedbackOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    order_num: u32,
    name: String,
    prompt: String,
    kind: CriterionKind,
}

impl Criterion {
    #[must_use]
    pub fn order_num(&self) -> u32 {
        self.order_num
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn kind(&self) -> &CriterionKind {
        &self.kind
    }

    /// Options in order; empty for feedback-only criteria.
    #[must_use]
    pub fn options(&self) -> &[RubricOption] {
        match &self.kind {
            CriterionKind::Scored(options) => options,
            CriterionKind::FeedbackOnly => &[],
        }
    }

    #[must_use]
    pub fn is_feedback_only(&self) -> bool {
        matches!(self.kind, CriterionKind::FeedbackOnly)
    }

    /// Highest option value, or 0 for feedback-only criteria.
    #[must_use]
    pub fn max_points(&self) -> u32 {
        self.options().iter().map(RubricOption::points).max().unwrap_or(0)
    }
}

/// Validated rubric with criteria in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rubric {
    prompt: Option<String>,
    criteria: Vec<Criterion>,
}

impl Rubric {
    /// Validate a definition.
    ///
    /// # Errors
    ///
    /// Returns `RubricError` if there are no criteria, a name is blank, a
    /// criterion name or order number repeats, an option name repeats
    /// within its criterion, or the best options add up to more than
    /// `u32::MAX` points.
    pub fn from_definition(definition: &RubricDefinition) -> Result<Self, RubricError> {
        if definition.criteria.is_empty() {
            return Err(RubricError::NoCriteria);
        }

        let mut names = HashSet::new();
        let mut orders = HashSet::new();
        let mut criteria = Vec::with_capacity(definition.criteria.len());

        for (position, def) in definition.criteria.iter().enumerate() {
            if def.name.trim().is_empty() {
                return Err(RubricError::MissingCriterionName { position });
            }
            if !names.insert(def.name.as_str()) {
                return Err(RubricError::DuplicateCriterion(def.name.clone()));
            }
            if !orders.insert(def.order_num) {
                return Err(RubricError::DuplicateCriterionOrder(def.order_num));
            }

            let mut option_names = HashSet::new();
            let mut options = Vec::with_capacity(def.options.len());
            for opt in &def.options {
                if opt.name.trim().is_empty() {
                    return Err(RubricError::MissingOptionName {
                        criterion: def.name.clone(),
                    });
                }
                if !option_names.insert(opt.name.as_str()) {
                    return Err(RubricError::DuplicateOption {
                        criterion: def.name.clone(),
                        option: opt.name.clone(),
                    });
                }
                options.push(RubricOption {
                    order_num: opt.order_num,
                    name: opt.name.clone(),
                    explanation: opt.explanation.clone(),
                    points: opt.points,
                });
            }
            options.sort_by_key(RubricOption::order_num);

            let kind = if options.is_empty() {
                CriterionKind::FeedbackOnly
            } else {
                CriterionKind::Scored(options)
            };

            criteria.push(Criterion {
                order_num: def.order_num,
                name: def.name.clone(),
                prompt: def.prompt.clone(),
                kind,
            });
        }
        criteria.sort_by_key(Criterion::order_num);

        // Totals are summed as u32 everywhere downstream.
        criteria
            .iter()
            .try_fold(0_u32, |total, c| total.checked_add(c.max_points()))
            .ok_or(RubricError::PointsOverflow)?;

        Ok(Self {
            prompt: definition.prompt.clone(),
            criteria,
        })
    }

    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    #[must_use]
    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition() -> RubricDefinition {
        RubricDefinition::from_value(json!({
            "prompt": "Write about whales",
            "criteria": [
                {
                    "order_num": 1,
                    "name": "grammar",
                    "prompt": "How correct is the grammar?",
                    "options": [
                        { "order_num": 1, "name": "good", "points": 1 },
                        { "order_num": 0, "name": "poor", "points": 0 },
                    ]
                },
                {
                    "order_num": 0,
                    "name": "vocabulary",
                    "prompt": "How varied is the vocabulary?",
                    "options": [
                        { "order_num": 0, "name": "poor", "explanation": "Poor job!", "points": 0 },
                        { "order_num": 1, "name": "excellent", "points": 2 },
                    ]
                },
                {
                    "order_num": 2,
                    "name": "feedback",
                    "prompt": "only feedback, no points",
                    "options": []
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn orders_criteria_and_options_by_order_num() {
        let rubric = Rubric::from_definition(&definition()).unwrap();
        let names: Vec<_> = rubric.criteria().iter().map(Criterion::name).collect();
        assert_eq!(names, ["vocabulary", "grammar", "feedback"]);

        let grammar = &rubric.criteria()[1];
        let options: Vec<_> = grammar.options().iter().map(RubricOption::name).collect();
        assert_eq!(options, ["poor", "good"]);
        assert_eq!(rubric.criteria()[0].options()[0].explanation(), "Poor job!");
    }

    #[test]
    fn zero_options_means_feedback_only() {
        let rubric = Rubric::from_definition(&definition()).unwrap();
        let feedback = &rubric.criteria()[2];
        assert!(feedback.is_feedback_only());
        assert_eq!(feedback.max_points(), 0);
        assert_eq!(rubric.criteria()[0].max_points(), 2);
    }

    #[test]
    fn missing_criteria_list_is_malformed() {
        let err = RubricDefinition::from_value(json!({ "prompt": "no criteria" })).unwrap_err();
        assert!(matches!(err, RubricError::Malformed(_)));
    }

    #[test]
    fn criterion_missing_options_field_is_malformed() {
        let err = RubricDefinition::from_value(json!({
            "criteria": [{ "order_num": 0, "name": "a", "prompt": "?" }]
        }))
        .unwrap_err();
        assert!(matches!(err, RubricError::Malformed(_)));
    }

    #[test]
    fn empty_criteria_list_is_rejected() {
        let def = RubricDefinition {
            prompt: None,
            criteria: vec![],
        };
        assert_eq!(Rubric::from_definition(&def), Err(RubricError::NoCriteria));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut def = definition();
        def.criteria[1].name = "grammar".into();
        assert_eq!(
            Rubric::from_definition(&def),
            Err(RubricError::DuplicateCriterion("grammar".into()))
        );

        let mut def = definition();
        def.criteria[0].options[1].name = "good".into();
        assert_eq!(
            Rubric::from_definition(&def),
            Err(RubricError::DuplicateOption {
                criterion: "grammar".into(),
                option: "good".into()
            })
        );
    }

    #[test]
    fn duplicate_order_numbers_are_rejected() {
        let mut def = definition();
        def.criteria[2].order_num = 1;
        assert_eq!(
            Rubric::from_definition(&def),
            Err(RubricError::DuplicateCriterionOrder(1))
        );
    }

    #[test]
    fn blank_names_are_rejected() {
        let mut def = definition();
        def.criteria[2].name = "  ".into();
        assert_eq!(
            Rubric::from_definition(&def),
            Err(RubricError::MissingCriterionName { position: 2 })
        );
    }

    #[test]
    fn total_points_must_fit_in_u32() {
        let mut def = definition();
        def.criteria[0].options[0].points = 4_000_000_000;
        def.criteria[1].options[1].points = 4_000_000_000;
        assert_eq!(Rubric::from_definition(&def), Err(RubricError::PointsOverflow));

        def.criteria[1].options[1].points = u32::MAX - 4_000_000_000;
        let rubric = Rubric::from_definition(&def).unwrap();
        assert_eq!(rubric.criteria()[1].max_points(), 4_000_000_000);
    }
}
