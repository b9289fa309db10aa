use std::io::Cursor;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use mockup_contracts::providers::NamedProvider;
use mockup_contracts::{ImagePayload, ResolutionTier, SourceImage};
use sha2::{Digest, Sha256};

use super::{MockupProvider, RenderParams};
use crate::error::{EngineError, Result};

const DRAFT_EDGE: u32 = 256;
const UPSCALED_EDGE: u32 = 1024;

const SCENES: [&str; 8] = [
    "A sunlit Scandinavian living room with a low oak sideboard and linen sofa",
    "A converted warehouse loft with exposed brick and steel-framed windows",
    "A quiet reading nook beside a window seat piled with knitted throws",
    "A boutique hotel corridor with marble floors and brass sconces",
    "A bright greenhouse studio filled with ferns and rattan chairs",
    "A minimalist gallery wall above a concrete bench in a museum lobby",
    "A cozy cafe corner with walnut tables and warm pendant lights",
    "A calm bedroom with plaster walls, a low platform bed and morning light",
];

/// Offline provider: renders a solid colour derived from the prompt and
/// answers analysis calls with canned scenes. Never needs a credential.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryrunProvider;

impl NamedProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }
}

#[async_trait]
impl MockupProvider for DryrunProvider {
    fn requires_credential(&self) -> bool {
        false
    }

    async fn render(
        &self,
        _source: &SourceImage,
        prompt: &str,
        params: &RenderParams,
    ) -> Result<Option<ImagePayload>> {
        let edge = match params.resolution {
            ResolutionTier::Draft => DRAFT_EDGE,
            ResolutionTier::UpscaledHigh => UPSCALED_EDGE,
        };
        let (width, height) = params.aspect_ratio.dims(edge);
        let seed = format!("{}|{}", params.aspect_ratio, params.resolution);
        let bytes = solid_png(width, height, color_from_prompt(prompt, &seed))?;
        Ok(Some(ImagePayload::png(bytes)))
    }

    async fn analyze(
        &self,
        _source: &SourceImage,
        prompt: &str,
        _credential: Option<&str>,
    ) -> Result<String> {
        let (offset, _, _) = color_from_prompt(prompt, "analyze");
        let scenes: Vec<&str> = (0..4)
            .map(|idx| SCENES[(usize::from(offset) + idx) % SCENES.len()])
            .collect();
        serde_json::to_string(&scenes)
            .map_err(|err| EngineError::MalformedResponse(err.to_string()))
    }
}

fn solid_png(width: u32, height: u32, (r, g, b): (u8, u8, u8)) -> Result<Vec<u8>> {
    let mut image = RgbImage::new(width, height);
    for pixel in image.pixels_mut() {
        *pixel = Rgb([r, g, b]);
    }
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|err| EngineError::MalformedResponse(format!("dryrun encode failed: {err}")))?;
    Ok(bytes)
}

fn color_from_prompt(prompt: &str, seed: &str) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(seed.as_bytes());
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}
