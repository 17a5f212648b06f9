//! Effect-chain save/restore (spec §4.11 "JSON effect-chain save/restore"),
//! grounded on `ImageEffect::Save`/`ImageEffect::Restore` in
//! `image_effect_inner.cpp`.
//!
//! Each filter's own parameters are opaque `serde_json::Value`s here: the
//! concrete per-filter parameter schema belongs to the filter crate that
//! defines it (spec §1 external collaborator boundary), not to the engine.

use serde::{Deserialize, Serialize};

use crate::error::{EffectError, Result};

/// One filter's saved name and parameters, in chain order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilterEntry {
    pub name: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// The full saved chain: its name plus ordered filter entries, nested under
/// an `"imageEffect"` key exactly as the original format does, so documents
/// are interchangeable with tooling built against it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineDocument {
    pub name: String,
    pub filters: Vec<FilterEntry>,
}

impl PipelineDocument {
    pub fn new(name: impl Into<String>, filters: Vec<FilterEntry>) -> Self {
        PipelineDocument { name: name.into(), filters }
    }

    /// `Save`: wraps the document under the same `imageEffect` envelope
    /// the original emits, so callers merging into a larger JSON blob (e.g.
    /// alongside EXIF) see the same shape.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "imageEffect": {
                "filters": self.filters,
                "name": self.name,
            }
        })
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(&self.to_json()).map_err(|e| EffectError::ParamInvalid(e.to_string()))
    }

    /// `Restore`: rejects a document with no `imageEffect.name` or an empty
    /// `filters` array, mirroring the original's `CHECK_AND_RETURN_RET_LOG`
    /// guards.
    pub fn from_json(root: &serde_json::Value) -> Result<Self> {
        let image_effect = root
            .get("imageEffect")
            .ok_or_else(|| EffectError::ParamInvalid("missing imageEffect".into()))?;

        let name = image_effect
            .get("name")
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| EffectError::ParamInvalid("missing or empty imageEffect.name".into()))?
            .to_string();

        let filters: Vec<FilterEntry> = image_effect
            .get("filters")
            .ok_or_else(|| EffectError::ParamInvalid("missing imageEffect.filters".into()))
            .and_then(|v| serde_json::from_value(v.clone()).map_err(|e| EffectError::ParamInvalid(e.to_string())))?;

        if filters.is_empty() {
            return Err(EffectError::ParamInvalid("imageEffect.filters is empty".into()));
        }
        if filters.iter().any(|f| f.name.is_empty()) {
            return Err(EffectError::ParamInvalid("filter entry missing name".into()));
        }

        Ok(PipelineDocument { name, filters })
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let root: serde_json::Value =
            serde_json::from_str(text).map_err(|e| EffectError::ParamInvalid(e.to_string()))?;
        Self::from_json(&root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PipelineDocument {
        PipelineDocument::new(
            "my-chain",
            vec![
                FilterEntry { name: "Crop".into(), params: serde_json::json!({"x": 0, "y": 0, "w": 100, "h": 100}) },
                FilterEntry { name: "Brightness".into(), params: serde_json::json!({"value": 0.2}) },
            ],
        )
    }

    #[test]
    fn round_trips_through_json_string() {
        let doc = sample();
        let text = doc.to_json_string().unwrap();
        let restored = PipelineDocument::from_json_str(&text).unwrap();
        assert_eq!(restored.name, "my-chain");
        assert_eq!(restored.filters.len(), 2);
        assert_eq!(restored.filters[0].name, "Crop");
    }

    #[test]
    fn missing_name_is_rejected() {
        let bad = serde_json::json!({"imageEffect": {"filters": [{"name": "Crop"}]}});
        assert!(PipelineDocument::from_json(&bad).is_err());
    }

    #[test]
    fn empty_filters_array_is_rejected() {
        let bad = serde_json::json!({"imageEffect": {"name": "x", "filters": []}});
        assert!(PipelineDocument::from_json(&bad).is_err());
    }

    #[test]
    fn filter_entry_without_name_is_rejected() {
        let bad = serde_json::json!({"imageEffect": {"name": "x", "filters": [{"params": {}}]}});
        assert!(PipelineDocument::from_json(&bad).is_err());
    }
}
