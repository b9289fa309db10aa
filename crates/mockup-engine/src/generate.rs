use futures::future::join_all;
use mockup_contracts::{GenerationRequest, ImagePayload, SourceImage};

use crate::composer::compose_generation_prompt;
use crate::error::{EngineError, Result};
use crate::provider::{MockupProvider, RenderParams};
use crate::retry::RetryPolicy;

/// Requests `request.count` images, one independent retried call per slot.
///
/// Slots that come back empty or fail are dropped; the call only fails when
/// no slot produced an image.
pub async fn generate_images(
    provider: &dyn MockupProvider,
    retry: &RetryPolicy,
    source: &SourceImage,
    request: &GenerationRequest,
    credential: Option<&str>,
) -> Result<Vec<ImagePayload>> {
    let prompt = compose_generation_prompt(request);
    let params = RenderParams {
        aspect_ratio: request.aspect_ratio,
        resolution: request.resolution,
        credential: credential.map(str::to_string),
    };
    let requested = request.count.max(1);

    let slots = (0..requested).map(|slot| {
        let label = format!("render slot {slot}");
        let prompt = prompt.as_str();
        let params = &params;
        async move {
            retry
                .run(&label, || provider.render(source, prompt, params))
                .await
        }
    });
    let outcomes = join_all(slots).await;

    let mut images = Vec::with_capacity(requested);
    let mut last_error = None;
    for (slot, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(Some(image)) => images.push(image),
            Ok(None) => {
                tracing::warn!(slot, "response carried no image data");
            }
            Err(err) => {
                tracing::warn!(slot, error = %err, "image slot failed");
                last_error = Some(Box::new(err));
            }
        }
    }

    if images.is_empty() {
        return Err(EngineError::NoImages {
            requested,
            last_error,
        });
    }
    Ok(images)
}
