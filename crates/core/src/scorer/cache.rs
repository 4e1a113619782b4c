use std::any::Any;
use std::collections::HashMap;

use super::{Classifier, InvalidClassifier};

/// Decoded classifier models for one scoring batch.
///
/// Create one per batch and drop it afterwards; nothing here is persisted or
/// shared between batches.
#[derive(Default)]
pub struct ClassifierCache {
    models: HashMap<String, Box<dyn Any + Send + Sync>>,
    decodes: usize,
}

impl ClassifierCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of classifiers decoded so far (cache misses).
    #[must_use]
    pub fn decodes(&self) -> usize {
        self.decodes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn clear(&mut self) {
        self.models.clear();
    }

    /// Return the decoded model for `classifier`, decoding it on first use.
    ///
    /// # Errors
    ///
    /// Propagates the decode failure; failed decodes are not cached.
    pub fn get_or_decode<T, F>(
        &mut self,
        classifier: &Classifier,
        decode: F,
    ) -> Result<&T, InvalidClassifier>
    where
        T: Any + Send + Sync,
        F: FnOnce(&serde_json::Value) -> Result<T, InvalidClassifier>,
    {
        let key = classifier.cache_key();
        let cached = self.models.get(&key).is_some_and(|model| model.is::<T>());
        if !cached {
            let model = decode(classifier.as_value())?;
            self.decodes += 1;
            self.models.insert(key.clone(), Box::new(model));
        }

        self.models
            .get(&key)
            .and_then(|model| model.downcast_ref::<T>())
            .ok_or_else(|| InvalidClassifier::Malformed("cached model has an unexpected type".into()))
    }
}

impl std::fmt::Debug for ClassifierCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierCache")
            .field("entries", &self.models.len())
            .field("decodes", &self.decodes)
            .finish()
    }
}
