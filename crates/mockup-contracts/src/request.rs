use serde::{Deserialize, Serialize};

use crate::styles::{
    AspectRatio, FrameStyle, LightingStyle, PrintSize, ResolutionTier, Vibe, WallTexture,
};

/// Session-level defaults every job starts from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BaseSettings {
    #[serde(default)]
    pub negative_prompt: String,
    #[serde(default)]
    pub print_size: PrintSize,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub resolution: ResolutionTier,
    #[serde(default)]
    pub vibe: Vibe,
}

/// One generation job, built fresh per dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub scene_prompt: String,
    pub negative_prompt: String,
    pub frame: FrameStyle,
    pub lighting: LightingStyle,
    pub texture: WallTexture,
    pub print_size: PrintSize,
    pub aspect_ratio: AspectRatio,
    pub resolution: ResolutionTier,
    pub count: usize,
}

impl GenerationRequest {
    /// A single-image request with every constraint left to inference.
    pub fn from_base(base: &BaseSettings, scene_prompt: impl Into<String>) -> Self {
        Self {
            scene_prompt: scene_prompt.into(),
            negative_prompt: base.negative_prompt.clone(),
            frame: FrameStyle::Auto,
            lighting: LightingStyle::Auto,
            texture: WallTexture::Auto,
            print_size: base.print_size,
            aspect_ratio: base.aspect_ratio,
            resolution: base.resolution,
            count: 1,
        }
    }

    pub fn with_constraints(
        mut self,
        frame: FrameStyle,
        lighting: LightingStyle,
        texture: WallTexture,
    ) -> Self {
        self.frame = frame;
        self.lighting = lighting;
        self.texture = texture;
        self
    }

    pub fn with_resolution(mut self, resolution: ResolutionTier) -> Self {
        self.resolution = resolution;
        self
    }
}
