use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StateError;
use crate::payload::ImagePayload;
use crate::styles::ResolutionTier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockupResult {
    pub id: Uuid,
    pub image: ImagePayload,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub resolution: ResolutionTier,
    /// Set while a high-resolution sibling is being rendered from this result.
    #[serde(default)]
    pub upscaling: bool,
}

impl MockupResult {
    pub fn new(image: ImagePayload, prompt: impl Into<String>, resolution: ResolutionTier) -> Self {
        Self {
            id: Uuid::new_v4(),
            image,
            prompt: prompt.into(),
            created_at: Utc::now(),
            resolution,
            upscaling: false,
        }
    }

    pub fn is_upscaled(&self) -> bool {
        self.resolution == ResolutionTier::UpscaledHigh
    }
}

/// Produced mockups in insertion order. Items are never edited in place; an
/// upscale appends a sibling.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    items: Vec<MockupResult>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: MockupResult) {
        self.items.push(result);
    }

    pub fn append(&mut self, results: impl IntoIterator<Item = MockupResult>) {
        self.items.extend(results);
    }

    pub fn get(&self, id: Uuid) -> Option<&MockupResult> {
        self.items.iter().find(|item| item.id == id)
    }

    fn get_mut(&mut self, id: Uuid) -> Option<&mut MockupResult> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<MockupResult> {
        let idx = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(idx))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Marks the result as upscaling and returns it as it was before the mark.
    pub fn begin_upscale(&mut self, id: Uuid) -> Result<MockupResult, StateError> {
        let item = self.get_mut(id).ok_or(StateError::UnknownResult(id))?;
        if item.upscaling {
            return Err(StateError::UpscaleInProgress(id));
        }
        let snapshot = item.clone();
        item.upscaling = true;
        Ok(snapshot)
    }

    pub fn finish_upscale(&mut self, id: Uuid) {
        if let Some(item) = self.get_mut(id) {
            item.upscaling = false;
        }
    }

    pub fn is_upscaling(&self, id: Uuid) -> bool {
        self.get(id).is_some_and(|item| item.upscaling)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MockupResult> {
        self.items.iter()
    }

    pub fn items(&self) -> &[MockupResult] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(prompt: &str) -> MockupResult {
        MockupResult::new(ImagePayload::png(vec![7]), prompt, ResolutionTier::Draft)
    }

    #[test]
    fn append_keeps_insertion_order() {
        let mut store = ResultStore::new();
        store.append([draft("a"), draft("b")]);
        store.push(draft("c"));
        let prompts: Vec<&str> = store.iter().map(|item| item.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["a", "b", "c"]);
    }

    #[test]
    fn upscale_marker_is_exclusive_per_item() -> anyhow::Result<()> {
        let mut store = ResultStore::new();
        let item = draft("loft");
        let id = item.id;
        store.push(item);

        let snapshot = store.begin_upscale(id)?;
        assert_eq!(snapshot.id, id);
        assert!(!snapshot.upscaling);
        assert!(store.is_upscaling(id));
        assert!(store.items()[0].upscaling);
        assert_eq!(store.begin_upscale(id), Err(StateError::UpscaleInProgress(id)));
        store.finish_upscale(id);
        assert!(!store.is_upscaling(id));

        let missing = Uuid::new_v4();
        assert_eq!(store.begin_upscale(missing), Err(StateError::UnknownResult(missing)));
        Ok(())
    }

    #[test]
    fn remove_and_clear() {
        let mut store = ResultStore::new();
        let keep = draft("keep");
        let drop = draft("drop");
        let drop_id = drop.id;
        store.append([keep, drop]);
        assert_eq!(store.remove(drop_id).map(|item| item.prompt), Some("drop".to_string()));
        assert_eq!(store.len(), 1);
        assert!(store.remove(drop_id).is_none());
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn upscale_status_rides_on_the_item() -> anyhow::Result<()> {
        let mut store = ResultStore::new();
        let item = draft("loft");
        let id = item.id;
        store.push(item);
        store.begin_upscale(id)?;

        let encoded = serde_json::to_value(&store.items()[0])?;
        assert_eq!(encoded["upscaling"], serde_json::Value::Bool(true));

        let mut legacy = encoded;
        if let Some(map) = legacy.as_object_mut() {
            map.remove("upscaling");
        }
        let decoded: MockupResult = serde_json::from_value(legacy)?;
        assert!(!decoded.upscaling);

        store.remove(id);
        assert!(!store.is_upscaling(id));
        Ok(())
    }
}
