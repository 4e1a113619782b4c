use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{
    Classifier, ClassifierCache, ExampleEssay, InvalidClassifier, ScoringAlgorithm, TrainingError,
    decode_model, encode_model,
};

/// Reference scorer that buckets answers by length.
///
/// Training keeps the distinct example scores in ascending order; scoring
/// picks `scores[char_count % scores.len()]`. It learns nothing about the
/// content, which makes it useful wherever a cheap, fully predictable
/// classifier is wanted.
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthBucketAlgorithm;

impl LengthBucketAlgorithm {
    pub const ID: &'static str = "length-bucket";
}

#[derive(Debug, Serialize, Deserialize)]
struct LengthBuckets {
    #[serde(default)]
    algorithm: String,
    scores: Vec<u32>,
}

impl ScoringAlgorithm for LengthBucketAlgorithm {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn train(&self, examples: &[ExampleEssay]) -> Result<Classifier, TrainingError> {
        if examples.is_empty() {
            return Err(TrainingError::NoExamples);
        }
        let scores: BTreeSet<u32> = examples.iter().map(|e| e.score).collect();
        encode_model(&LengthBuckets {
            algorithm: Self::ID.to_owned(),
            scores: scores.into_iter().collect(),
        })
    }

    fn score(
        &self,
        text: &str,
        classifier: &Classifier,
        cache: &mut ClassifierCache,
    ) -> Result<u32, InvalidClassifier> {
        let model: &LengthBuckets = cache.get_or_decode(classifier, |value| {
            let model: LengthBuckets = decode_model(value, Self::ID, &["scores"])?;
            if model.scores.is_empty() {
                return Err(InvalidClassifier::Empty);
            }
            Ok(model)
        })?;
        Ok(model.scores[text.chars().count() % model.scores.len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn examples() -> Vec<ExampleEssay> {
        vec![
            ExampleEssay::new("Mine's a tale that can't be told, my ƒяєє∂σм I hold dear.", 2),
            ExampleEssay::new("How years ago in days of old, when 𝒎𝒂𝒈𝒊𝒄 filled th air.", 1),
            ExampleEssay::new("Ṫ'ẅäṡ in the darkest depths of Ṁöṛḋöṛ, I met a girl so fair.", 1),
            ExampleEssay::new("But goﾚﾚuﾶ, and the evil one crept up and slipped away with her", 0),
            ExampleEssay::new("", 4),
            ExampleEssay::new(".!?", 4),
            ExampleEssay::new("no punctuation", 4),
            ExampleEssay::new("one", 4),
        ]
    }

    const INPUT_ESSAYS: [&str; 7] = [
        "Good times, 𝑩𝒂𝒅 𝑻𝒊𝒎𝒆𝒔, you know I had my share",
        "When my woman left home for a 𝒃𝒓𝒐𝒘𝒏 𝒆𝒚𝒆𝒅 𝒎𝒂𝒏",
        "Well, I still don't seem to 𝒄𝒂𝒓𝒆",
        "",
        ".!?",
        "no punctuation",
        "one",
    ];

    fn scores(classifier: &Classifier) -> Vec<u32> {
        let mut cache = ClassifierCache::new();
        INPUT_ESSAYS
            .iter()
            .map(|text| LengthBucketAlgorithm.score(text, classifier, &mut cache).unwrap())
            .collect()
    }

    #[test]
    fn train_and_score() {
        let classifier = LengthBucketAlgorithm.train(&examples()).unwrap();
        assert_eq!(scores(&classifier), [2, 0, 0, 0, 4, 2, 4]);
    }

    #[test]
    fn scoring_is_repeatable_after_a_round_trip() {
        let classifier = LengthBucketAlgorithm.train(&examples()).unwrap();
        let serialized = serde_json::to_string(&classifier).unwrap();
        let restored: Classifier = serde_json::from_str(&serialized).unwrap();
        assert_eq!(scores(&classifier), scores(&restored));
        assert_eq!(scores(&restored), scores(&restored));
    }

    #[test]
    fn decodes_each_classifier_once_per_cache() {
        let classifier = LengthBucketAlgorithm.train(&examples()).unwrap();
        let mut cache = ClassifierCache::new();
        for text in INPUT_ESSAYS {
            LengthBucketAlgorithm.score(text, &classifier, &mut cache).unwrap();
        }
        assert_eq!(cache.decodes(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn no_examples() {
        assert_eq!(
            LengthBucketAlgorithm.train(&[]).unwrap_err(),
            TrainingError::NoExamples
        );
    }

    #[test]
    fn classifier_missing_key() {
        let classifier = Classifier::from_value(json!({}));
        let err = LengthBucketAlgorithm
            .score("Test input", &classifier, &mut ClassifierCache::new())
            .unwrap_err();
        assert_eq!(err, InvalidClassifier::MissingField("scores"));
    }

    #[test]
    fn classifier_no_scores() {
        let classifier = Classifier::from_value(json!({ "scores": [] }));
        let mut cache = ClassifierCache::new();
        let err = LengthBucketAlgorithm
            .score("Test input", &classifier, &mut cache)
            .unwrap_err();
        assert_eq!(err, InvalidClassifier::Empty);
        assert!(cache.is_empty());
    }

    #[test]
    fn classifier_not_an_object() {
        let classifier = Classifier::from_value(json!("not a dict"));
        let err = LengthBucketAlgorithm
            .score("Test input", &classifier, &mut ClassifierCache::new())
            .unwrap_err();
        assert_eq!(err, InvalidClassifier::NotAnObject);
    }

    #[test]
    fn classifier_with_wrong_shape() {
        let classifier = Classifier::from_value(json!({ "scores": "three" }));
        let err = LengthBucketAlgorithm
            .score("Test input", &classifier, &mut ClassifierCache::new())
            .unwrap_err();
        assert!(matches!(err, InvalidClassifier::Malformed(_)));
    }
}
