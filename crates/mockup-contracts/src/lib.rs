pub mod error;
pub mod events;
pub mod payload;
pub mod prompts;
pub mod providers;
pub mod request;
pub mod results;
pub mod selection;
pub mod settings;
pub mod studio;
pub mod styles;
pub mod summary;

pub use error::StateError;
pub use payload::{ImagePayload, SourceImage};
pub use prompts::{PromptEntry, PromptSet};
pub use request::{BaseSettings, GenerationRequest};
pub use results::{MockupResult, ResultStore};
pub use selection::{ConstraintSets, Selectable, SelectionSet};
pub use studio::{Studio, StudioAction};
pub use styles::{
    AspectRatio, FrameStyle, LightingStyle, ParseStyleError, PrintSize, ResolutionTier, Vibe,
    WallTexture,
};
