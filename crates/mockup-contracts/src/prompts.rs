use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StateError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptEntry {
    pub id: Uuid,
    pub text: String,
    #[serde(default)]
    pub regenerating: bool,
}

impl PromptEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            regenerating: false,
        }
    }
}

/// Editable scene prompts. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSet {
    entries: Vec<PromptEntry>,
}

impl PromptSet {
    pub fn seeded<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries: Vec<PromptEntry> = texts.into_iter().map(PromptEntry::new).collect();
        if entries.is_empty() {
            entries.push(PromptEntry::new(String::new()));
        }
        Self { entries }
    }

    pub fn add(&mut self, text: impl Into<String>) -> Uuid {
        let entry = PromptEntry::new(text);
        let id = entry.id;
        self.entries.push(entry);
        id
    }

    pub fn remove(&mut self, id: Uuid) -> Result<PromptEntry, StateError> {
        let idx = self.position(id)?;
        if self.entries.len() == 1 {
            return Err(StateError::LastPrompt);
        }
        Ok(self.entries.remove(idx))
    }

    pub fn update(&mut self, id: Uuid, text: impl Into<String>) -> Result<(), StateError> {
        let idx = self.position(id)?;
        self.entries[idx].text = text.into();
        Ok(())
    }

    /// Swaps the whole set, e.g. when fresh suggestions arrive for a new upload.
    pub fn replace_all<I, S>(&mut self, texts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self = Self::seeded(texts);
    }

    pub fn begin_regenerate(&mut self, id: Uuid) -> Result<(), StateError> {
        let idx = self.position(id)?;
        self.entries[idx].regenerating = true;
        Ok(())
    }

    pub fn finish_regenerate(&mut self, id: Uuid, text: Option<String>) -> Result<(), StateError> {
        let idx = self.position(id)?;
        let entry = &mut self.entries[idx];
        entry.regenerating = false;
        if let Some(text) = text {
            entry.text = text;
        }
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Option<&PromptEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Non-blank prompt texts in display order.
    pub fn active_texts(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.text.trim())
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn entries(&self) -> &[PromptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: Uuid) -> Result<usize, StateError> {
        self.entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(StateError::UnknownPrompt(id))
    }
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::seeded(Vec::<String>::new())
    }
}
