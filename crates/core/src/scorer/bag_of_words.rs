use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{
    Classifier, ClassifierCache, ExampleEssay, InvalidClassifier, ScoringAlgorithm, TrainingError,
    decode_model, encode_model,
};

/// Nearest-centroid scorer over lowercase word counts.
///
/// Each score seen in training gets a centroid holding the summed word counts
/// of its examples. An answer takes the score of the centroid with the highest
/// cosine similarity; ties go to the lower score, and answers sharing no words
/// with any centroid take the most common training score.
///
/// Counts are stored as integers so a classifier decodes to exactly the model
/// that was trained.
#[derive(Debug, Clone, Copy, Default)]
pub struct BagOfWordsAlgorithm;

impl BagOfWordsAlgorithm {
    pub const ID: &'static str = "bag-of-words";
}

#[derive(Debug, Serialize, Deserialize)]
struct WordCentroids {
    #[serde(default)]
    algorithm: String,
    default_score: u32,
    labels: Vec<Centroid>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Centroid {
    score: u32,
    terms: BTreeMap<String, u64>,
}

impl Centroid {
    fn norm(&self) -> f64 {
        norm(self.terms.values().copied())
    }
}

fn tokens(text: &str) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        *counts.entry(word.to_lowercase()).or_insert(0) += 1;
    }
    counts
}

// Counts come from caller-supplied classifiers; multiply as f64 so any u64 is safe.
#[allow(clippy::cast_precision_loss)]
fn norm(counts: impl Iterator<Item = u64>) -> f64 {
    counts.map(|c| (c as f64).powi(2)).sum::<f64>().sqrt()
}

impl ScoringAlgorithm for BagOfWordsAlgorithm {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn train(&self, examples: &[ExampleEssay]) -> Result<Classifier, TrainingError> {
        if examples.is_empty() {
            return Err(TrainingError::NoExamples);
        }

        let mut centroids: BTreeMap<u32, BTreeMap<String, u64>> = BTreeMap::new();
        let mut frequency: BTreeMap<u32, usize> = BTreeMap::new();
        for example in examples {
            let terms = centroids.entry(example.score).or_default();
            for (word, count) in tokens(&example.text) {
                *terms.entry(word).or_insert(0) += count;
            }
            *frequency.entry(example.score).or_insert(0) += 1;
        }

        let mut default_score = examples[0].score;
        let mut best = 0;
        for (&score, &count) in &frequency {
            if count > best {
                best = count;
                default_score = score;
            }
        }

        encode_model(&WordCentroids {
            algorithm: Self::ID.to_owned(),
            default_score,
            labels: centroids
                .into_iter()
                .map(|(score, terms)| Centroid { score, terms })
                .collect(),
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn score(
        &self,
        text: &str,
        classifier: &Classifier,
        cache: &mut ClassifierCache,
    ) -> Result<u32, InvalidClassifier> {
        let model: &WordCentroids = cache.get_or_decode(classifier, |value| {
            let mut model: WordCentroids =
                decode_model(value, Self::ID, &["default_score", "labels"])?;
            if model.labels.is_empty() {
                return Err(InvalidClassifier::Empty);
            }
            model.labels.sort_by_key(|c| c.score);
            Ok(model)
        })?;

        let query = tokens(text);
        let query_norm = norm(query.values().copied());
        if query_norm == 0.0 {
            return Ok(model.default_score);
        }

        let mut chosen = model.default_score;
        let mut best = 0.0_f64;
        for centroid in &model.labels {
            let dot: f64 = query
                .iter()
                .filter_map(|(word, &count)| {
                    centroid.terms.get(word).map(|&c| c as f64 * count as f64)
                })
                .sum();
            if dot == 0.0 {
                continue;
            }
            let similarity = dot / (query_norm * centroid.norm());
            if similarity > best {
                best = similarity;
                chosen = centroid.score;
            }
        }
        Ok(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn examples() -> Vec<ExampleEssay> {
        vec![
            ExampleEssay::new("The whale is a large mammal that lives in the ocean.", 2),
            ExampleEssay::new("Whales breathe air and nurse their young like other mammals.", 2),
            ExampleEssay::new("I like fish.", 0),
            ExampleEssay::new("Fish are nice and I like them a lot.", 0),
            ExampleEssay::new("Whales are big fish.", 1),
        ]
    }

    #[test]
    fn scores_by_nearest_centroid() {
        let algorithm = BagOfWordsAlgorithm;
        let classifier = algorithm.train(&examples()).unwrap();
        let mut cache = ClassifierCache::new();

        assert_eq!(
            algorithm
                .score("Mammals such as the whale live in the ocean", &classifier, &mut cache)
                .unwrap(),
            2
        );
        assert_eq!(
            algorithm.score("i like fish a lot", &classifier, &mut cache).unwrap(),
            0
        );
    }

    #[test]
    fn unknown_vocabulary_falls_back_to_most_common_score() {
        let algorithm = BagOfWordsAlgorithm;
        let classifier = algorithm
            .train(&[
                ExampleEssay::new("alpha", 3),
                ExampleEssay::new("beta", 1),
                ExampleEssay::new("gamma", 1),
            ])
            .unwrap();
        let mut cache = ClassifierCache::new();
        assert_eq!(algorithm.score("zeta", &classifier, &mut cache).unwrap(), 1);
        assert_eq!(algorithm.score("", &classifier, &mut cache).unwrap(), 1);
    }

    #[test]
    fn all_examples_with_the_same_score() {
        let algorithm = BagOfWordsAlgorithm;
        let classifier = algorithm
            .train(&[
                ExampleEssay::new("Test essay", 1),
                ExampleEssay::new("Another test essay", 1),
            ])
            .unwrap();
        let mut cache = ClassifierCache::new();
        for text in ["essay", "nothing in common", ".!?"] {
            assert_eq!(algorithm.score(text, &classifier, &mut cache).unwrap(), 1);
        }
    }

    #[test]
    fn round_trip_preserves_scores() {
        let algorithm = BagOfWordsAlgorithm;
        let classifier = algorithm.train(&examples()).unwrap();
        let restored: Classifier =
            serde_json::from_str(&serde_json::to_string(&classifier).unwrap()).unwrap();

        let inputs = ["whales", "fish fish fish", "a mammal in the ocean", "nothing"];
        let mut first = ClassifierCache::new();
        let mut second = ClassifierCache::new();
        for text in inputs {
            let a = algorithm.score(text, &classifier, &mut first).unwrap();
            let b = algorithm.score(text, &restored, &mut second).unwrap();
            assert_eq!(a, b, "score changed after round trip for {text:?}");
            assert_eq!(a, algorithm.score(text, &classifier, &mut first).unwrap());
        }
    }

    #[test]
    fn no_examples() {
        assert_eq!(
            BagOfWordsAlgorithm.train(&[]).unwrap_err(),
            TrainingError::NoExamples
        );
    }

    #[test]
    fn empty_label_list_is_invalid() {
        let classifier = Classifier::from_value(serde_json::json!({
            "algorithm": "bag-of-words",
            "default_score": 0,
            "labels": []
        }));
        let err = BagOfWordsAlgorithm
            .score("text", &classifier, &mut ClassifierCache::new())
            .unwrap_err();
        assert_eq!(err, InvalidClassifier::Empty);
    }

    #[test]
    fn huge_term_counts_do_not_overflow() {
        let classifier = Classifier::from_value(serde_json::json!({
            "algorithm": "bag-of-words",
            "default_score": 0,
            "labels": [
                { "score": 1, "terms": { "word": u64::MAX } },
                { "score": 2, "terms": { "other": u64::MAX } }
            ]
        }));
        let mut cache = ClassifierCache::new();
        assert_eq!(
            BagOfWordsAlgorithm.score("word word", &classifier, &mut cache).unwrap(),
            1
        );
        assert_eq!(
            BagOfWordsAlgorithm.score("other", &classifier, &mut cache).unwrap(),
            2
        );
    }
}
