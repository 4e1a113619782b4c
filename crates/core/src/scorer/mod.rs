//! Pluggable essay scorers trained on labelled example answers.
//!
//! A trained classifier is a plain JSON value so it can be stored by any
//! backend and handed back unchanged. Decoding it is done at most once per
//! [`ClassifierCache`], which the caller scopes to a single scoring batch.
//!
//! ```
//! # use grading_core::scorer::{ClassifierCache, ExampleEssay, LengthBucketAlgorithm, ScoringAlgorithm};
//! let algorithm = LengthBucketAlgorithm;
//! let classifier = algorithm.train(&[
//!     ExampleEssay::new("short", 0),
//!     ExampleEssay::new("a much longer answer", 2),
//! ])?;
//!
//! let mut cache = ClassifierCache::new();
//! let score = algorithm.score("abc", &classifier, &mut cache).unwrap();
//! assert_eq!(score, 2);
//! # Ok::<(), grading_core::scorer::TrainingError>(())
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod bag_of_words;
mod cache;
mod length_bucket;

pub use bag_of_words::BagOfWordsAlgorithm;
pub use cache::ClassifierCache;
pub use length_bucket::LengthBucketAlgorithm;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TrainingError {
    #[error("at least one example essay is required to train a classifier")]
    NoExamples,
    #[error("trained classifier could not be serialized: {0}")]
    Serialization(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidClassifier {
    #[error("classifier must be a JSON object")]
    NotAnObject,
    #[error("classifier is missing \"{0}\"")]
    MissingField(&'static str),
    #[error("classifier was trained by \"{found}\", not \"{expected}\"")]
    WrongAlgorithm { expected: &'static str, found: String },
    #[error("classifier has no scores to choose from")]
    Empty,
    #[error("classifier could not be decoded: {0}")]
    Malformed(String),
}

//
// ─── TYPES ─────────────────────────────────────────────────────────────────────
//

/// A labelled answer used for training.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleEssay {
    pub text: String,
    pub score: u32,
}

impl ExampleEssay {
    #[must_use]
    pub fn new(text: impl Into<String>, score: u32) -> Self {
        Self {
            text: text.into(),
            score,
        }
    }
}

/// Opaque, serializable output of [`ScoringAlgorithm::train`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Classifier(serde_json::Value);

impl Classifier {
    #[must_use]
    pub fn from_value(value: serde_json::Value) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> serde_json::Value {
        self.0
    }

    /// Id of the algorithm that produced this classifier, when recorded.
    #[must_use]
    pub fn algorithm(&self) -> Option<&str> {
        self.0.get("algorithm").and_then(serde_json::Value::as_str)
    }

    pub(crate) fn cache_key(&self) -> String {
        self.0.to_string()
    }
}

/// A trainable essay scorer.
///
/// Implementations must be deterministic: scoring the same text with the same
/// classifier always yields the same value, including after the classifier
/// has been serialized and decoded again.
pub trait ScoringAlgorithm: Send + Sync {
    /// Stable identifier written into every classifier this algorithm trains.
    fn id(&self) -> &'static str;

    /// # Errors
    ///
    /// Returns `TrainingError` for an empty example set or if the trained
    /// model cannot be serialized.
    fn train(&self, examples: &[ExampleEssay]) -> Result<Classifier, TrainingError>;

    /// # Errors
    ///
    /// Returns `InvalidClassifier` if `classifier` is not a well-formed
    /// classifier of this algorithm.
    fn score(
        &self,
        text: &str,
        classifier: &Classifier,
        cache: &mut ClassifierCache,
    ) -> Result<u32, InvalidClassifier>;
}

/// Resolve one of the bundled algorithms by id.
#[must_use]
pub fn algorithm_by_id(id: &str) -> Option<Box<dyn ScoringAlgorithm>> {
    match id {
        LengthBucketAlgorithm::ID => Some(Box::new(LengthBucketAlgorithm)),
        BagOfWordsAlgorithm::ID => Some(Box::new(BagOfWordsAlgorithm)),
        _ => None,
    }
}

pub(crate) fn encode_model<T: Serialize>(model: &T) -> Result<Classifier, TrainingError> {
    serde_json::to_value(model)
        .map(Classifier)
        .map_err(|e| TrainingError::Serialization(e.to_string()))
}

/// Structural checks shared by the bundled algorithms, then a typed decode.
pub(crate) fn decode_model<T: DeserializeOwned>(
    value: &serde_json::Value,
    algorithm: &'static str,
    required: &[&'static str],
) -> Result<T, InvalidClassifier> {
    let object = value.as_object().ok_or(InvalidClassifier::NotAnObject)?;
    if let Some(missing) = required.iter().find(|field| !object.contains_key(**field)) {
        return Err(InvalidClassifier::MissingField(*missing));
    }
    if let Some(found) = object.get("algorithm") {
        let found = found.as_str().unwrap_or_default();
        if found != algorithm {
            return Err(InvalidClassifier::WrongAlgorithm {
                expected: algorithm,
                found: found.to_owned(),
            });
        }
    }
    serde_json::from_value(value.clone()).map_err(|e| InvalidClassifier::Malformed(e.to_string()))
}
