//! Loaded annotations for one image.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::AnnotationParseError;
use crate::pyramid::PyramidSource;

use super::color::{keyword_color, FALLBACK_COLOR, LEVEL_DEFAULT_COLOR};
use super::model::{parse_collection, AnnotationFeature, AnnotationLevelStyle};

/// Root attribute that may embed a FeatureCollection
const ANNOTATIONS_ATTRIBUTE: &str = "annotations";

/// All features and level styles of the loaded image.
///
/// Features from every document are unioned; level styles are keyed by id
/// and a later declaration replaces an earlier one. The store is built once
/// per image and replaced wholesale on the next load.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    features: Vec<AnnotationFeature>,
    levels: HashMap<String, AnnotationLevelStyle>,
    skipped_documents: usize,
    skipped_features: usize,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect annotations from the sidecar documents and root attributes of `source`.
    ///
    /// Unreadable or malformed documents are logged and skipped.
    pub fn from_source(source: &PyramidSource) -> Self {
        let mut store = Self::new();

        for (name, data) in source.annotation_documents() {
            match data {
                Ok(bytes) => store.load_or_skip(&name, &bytes),
                Err(e) => {
                    warn!(document = %name, error = %e, "failed to read annotation document");
                    store.skipped_documents += 1;
                }
            }
        }

        if let Some(embedded) = source.attributes().get(ANNOTATIONS_ATTRIBUTE) {
            let result = match embedded {
                Value::String(text) => store.load_bytes(ANNOTATIONS_ATTRIBUTE, text.as_bytes()),
                value => store.load_value(ANNOTATIONS_ATTRIBUTE, value),
            };
            if let Err(e) = result {
                warn!(error = %e, "skipping embedded annotations");
                store.skipped_documents += 1;
            }
        }

        if !store.is_empty() {
            info!(
                features = store.len(),
                levels = store.levels.len(),
                skipped_documents = store.skipped_documents,
                skipped_features = store.skipped_features,
                "loaded annotations"
            );
        }
        store
    }

    fn load_or_skip(&mut self, document: &str, bytes: &[u8]) {
        if let Err(e) = self.load_bytes(document, bytes) {
            warn!(error = %e, "skipping annotation document");
            self.skipped_documents += 1;
        }
    }

    /// Parse and merge one JSON document. Returns the number of features added.
    pub fn load_bytes(&mut self, document: &str, bytes: &[u8]) -> Result<usize, AnnotationParseError> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| AnnotationParseError::Json {
            document: document.to_string(),
            message: e.to_string(),
        })?;
        self.load_value(document, &value)
    }

    /// Merge one parsed document. A document that is not a FeatureCollection adds nothing.
    ///
    /// A malformed document leaves the store unchanged.
    pub fn load_value(&mut self, document: &str, value: &Value) -> Result<usize, AnnotationParseError> {
        let Some(parsed) = parse_collection(document, value)? else {
            debug!(document, "not a FeatureCollection, ignored");
            return Ok(0);
        };

        let added = parsed.features.len();
        self.features.extend(parsed.features);
        for level in parsed.levels {
            self.levels.insert(level.id.clone(), level);
        }
        self.skipped_features += parsed.skipped_features;

        debug!(document, features = added, "merged annotation document");
        Ok(added)
    }

    pub fn features(&self) -> &[AnnotationFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn level_style(&self, id: &str) -> Option<&AnnotationLevelStyle> {
        self.levels.get(id)
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Documents that failed to read or parse.
    pub fn skipped_documents(&self) -> usize {
        self.skipped_documents
    }

    /// Features dropped for unsupported or malformed geometry.
    pub fn skipped_features(&self) -> usize {
        self.skipped_features
    }

    /// Advisory count string, empty when nothing is loaded.
    pub fn count_label(&self) -> String {
        match self.len() {
            0 => String::new(),
            n => format!("{} annotation(s)", n),
        }
    }

    /// Resolve the display color of a feature.
    ///
    /// Priority: explicit color, level class color, level color, class-name
    /// keyword, then the global fallback.
    pub fn resolve_color<'a>(&'a self, feature: &'a AnnotationFeature) -> &'a str {
        if let Some(color) = &feature.color {
            return color;
        }

        if let Some(level) = feature.level_id.as_deref().and_then(|id| self.levels.get(id)) {
            let class_name = feature.class_name.as_deref().unwrap_or("");
            if let Some(class) = level.classes.iter().find(|c| c.name == class_name) {
                return class
                    .color
                    .as_deref()
                    .or(level.color.as_deref())
                    .unwrap_or(LEVEL_DEFAULT_COLOR);
            }
            return level.color.as_deref().unwrap_or(LEVEL_DEFAULT_COLOR);
        }

        feature
            .class_name
            .as_deref()
            .and_then(keyword_color)
            .unwrap_or(FALLBACK_COLOR)
    }
}
