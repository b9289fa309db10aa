use uuid::Uuid;

use crate::error::StateError;
use crate::payload::SourceImage;
use crate::prompts::PromptSet;
use crate::request::BaseSettings;
use crate::results::ResultStore;
use crate::selection::ConstraintSets;
use crate::styles::{AspectRatio, FrameStyle, LightingStyle, PrintSize, Vibe, WallTexture};

/// Every user-driven transition the studio accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudioAction {
    AddPrompt(String),
    RemovePrompt(Uuid),
    UpdatePrompt(Uuid, String),
    ToggleFrame(FrameStyle),
    ToggleLighting(LightingStyle),
    ToggleTexture(WallTexture),
    SetPrintSize(PrintSize),
    SetAspectRatio(AspectRatio),
    SetNegativePrompt(String),
    SetVibe(Vibe),
    RemoveResult(Uuid),
    ClearResults,
}

/// Application state passed by reference into the orchestration layer.
#[derive(Debug, Clone, Default)]
pub struct Studio {
    pub source: Option<SourceImage>,
    pub prompts: PromptSet,
    pub constraints: ConstraintSets,
    pub base: BaseSettings,
    pub results: ResultStore,
}

impl Studio {
    pub fn new(base: BaseSettings, constraints: ConstraintSets) -> Self {
        Self {
            base,
            constraints,
            ..Self::default()
        }
    }

    pub fn load_source(&mut self, source: SourceImage) {
        self.base.aspect_ratio = source.default_aspect_ratio();
        self.source = Some(source);
    }

    pub fn source(&self) -> Result<&SourceImage, StateError> {
        self.source.as_ref().ok_or(StateError::NoSourceImage)
    }

    pub fn apply(&mut self, action: StudioAction) -> Result<(), StateError> {
        match action {
            StudioAction::AddPrompt(text) => {
                self.prompts.add(text);
            }
            StudioAction::RemovePrompt(id) => {
                self.prompts.remove(id)?;
            }
            StudioAction::UpdatePrompt(id, text) => self.prompts.update(id, text)?,
            StudioAction::ToggleFrame(value) => self.constraints.frames.toggle(value)?,
            StudioAction::ToggleLighting(value) => self.constraints.lighting.toggle(value)?,
            StudioAction::ToggleTexture(value) => self.constraints.textures.toggle(value)?,
            StudioAction::SetPrintSize(value) => self.base.print_size = value,
            StudioAction::SetAspectRatio(value) => self.base.aspect_ratio = value,
            StudioAction::SetNegativePrompt(text) => self.base.negative_prompt = text,
            StudioAction::SetVibe(value) => self.base.vibe = value,
            StudioAction::RemoveResult(id) => {
                self.results
                    .remove(id)
                    .ok_or(StateError::UnknownResult(id))?;
            }
            StudioAction::ClearResults => self.results.clear(),
        }
        Ok(())
    }
}
