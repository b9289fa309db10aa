mod dryrun;
mod gemini;

use std::sync::Arc;

use async_trait::async_trait;
use mockup_contracts::providers::{NamedProvider, ProviderRegistry};
use mockup_contracts::{AspectRatio, ImagePayload, ResolutionTier, SourceImage};

use crate::config::EngineConfig;
use crate::error::Result;

pub use dryrun::DryrunProvider;
pub use gemini::GeminiProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderParams {
    pub aspect_ratio: AspectRatio,
    pub resolution: ResolutionTier,
    pub credential: Option<String>,
}

/// The remote multimodal capability, one image slot or one analysis per call.
#[async_trait]
pub trait MockupProvider: NamedProvider + Send + Sync {
    /// Whether calls need an API credential.
    fn requires_credential(&self) -> bool {
        true
    }

    /// `Ok(None)` when the response carried no usable image bytes.
    async fn render(
        &self,
        source: &SourceImage,
        prompt: &str,
        params: &RenderParams,
    ) -> Result<Option<ImagePayload>>;

    /// Raw model text; parsing is left to the caller.
    async fn analyze(
        &self,
        source: &SourceImage,
        prompt: &str,
        credential: Option<&str>,
    ) -> Result<String>;
}

pub type SharedProvider = Arc<dyn MockupProvider>;

pub fn default_provider_registry(config: &EngineConfig) -> ProviderRegistry<SharedProvider> {
    ProviderRegistry::new(vec![
        Arc::new(GeminiProvider::new(config)) as SharedProvider,
        Arc::new(DryrunProvider) as SharedProvider,
    ])
}
