use futures::future::join_all;
use mockup_contracts::events::EventKind;
use mockup_contracts::{
    BaseSettings, ConstraintSets, GenerationRequest, MockupResult, ResolutionTier, SourceImage,
};
use serde_json::json;
use tokio::time::Instant;

use crate::error::{EngineError, Result};
use crate::generate::generate_images;
use crate::retry::RetryPolicy;
use crate::MockupEngine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub index: usize,
    pub prompt: String,
    pub error: String,
}

/// Successful results in job order, plus the jobs that produced nothing.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub results: Vec<MockupResult>,
    pub failures: Vec<JobFailure>,
}

impl BatchOutcome {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// One single-image request per prompt; job `i` takes the `i`-th value of
/// each constraint set, wrapping around shorter sets.
pub fn plan_jobs(
    prompts: &[String],
    constraints: &ConstraintSets,
    base: &BaseSettings,
) -> Vec<GenerationRequest> {
    prompts
        .iter()
        .enumerate()
        .map(|(index, prompt)| {
            let (frame, lighting, texture) = constraints.assign(index);
            GenerationRequest::from_base(base, prompt.clone())
                .with_constraints(frame, lighting, texture)
        })
        .collect()
}

impl MockupEngine {
    pub async fn run_batch(
        &self,
        source: &SourceImage,
        prompts: &[String],
        constraints: &ConstraintSets,
        base: &BaseSettings,
    ) -> Result<BatchOutcome> {
        let credential = self.credential()?;
        let jobs = plan_jobs(prompts, constraints, base);
        if jobs.is_empty() {
            return Err(EngineError::BatchEmpty { jobs: 0 });
        }

        let retry = self.retry_policy();
        let credential = credential.as_deref();
        tracing::info!(
            jobs = jobs.len(),
            stagger_ms = self.schedule().interval().as_millis() as u64,
            "batch started"
        );
        self.record(
            EventKind::BatchStarted,
            json!({
                "jobs": jobs.len(),
                "stagger_ms": self.schedule().interval().as_millis() as u64,
                "resolution": base.resolution.label(),
            }),
        );

        let start = Instant::now();
        let runs = jobs
            .iter()
            .enumerate()
            .map(|(index, request)| self.run_job(index, request, source, &retry, credential, start));
        let outcomes = join_all(runs).await;

        let mut outcome = BatchOutcome::default();
        for ((index, request), job) in jobs.iter().enumerate().zip(outcomes) {
            match job {
                Ok(results) => outcome.results.extend(results),
                Err(err) => outcome.failures.push(JobFailure {
                    index,
                    prompt: request.scene_prompt.clone(),
                    error: err.to_string(),
                }),
            }
        }

        tracing::info!(
            succeeded = outcome.results.len(),
            failed = outcome.failures.len(),
            "batch finished"
        );
        self.record(
            EventKind::BatchFinished,
            json!({
                "jobs": jobs.len(),
                "results": outcome.results.len(),
                "failed_jobs": outcome.failures.len(),
            }),
        );

        if outcome.results.is_empty() {
            return Err(EngineError::BatchEmpty { jobs: jobs.len() });
        }
        Ok(outcome)
    }

    async fn run_job(
        &self,
        index: usize,
        request: &GenerationRequest,
        source: &SourceImage,
        retry: &RetryPolicy,
        credential: Option<&str>,
        start: Instant,
    ) -> Result<Vec<MockupResult>> {
        self.schedule().wait_turn(start, index).await;
        tracing::info!(
            job = index,
            frame = %request.frame,
            lighting = %request.lighting,
            texture = %request.texture,
            "dispatching job"
        );
        self.record(
            EventKind::JobDispatched,
            json!({
                "job": index,
                "prompt": request.scene_prompt,
                "frame": request.frame.label(),
                "lighting": request.lighting.label(),
                "texture": request.texture.label(),
            }),
        );

        match generate_images(self.provider().as_ref(), retry, source, request, credential).await {
            Ok(images) => {
                let results: Vec<MockupResult> = images
                    .into_iter()
                    .map(|image| {
                        MockupResult::new(image, request.scene_prompt.clone(), request.resolution)
                    })
                    .collect();
                tracing::info!(job = index, images = results.len(), "job succeeded");
                self.record(
                    EventKind::JobSucceeded,
                    json!({
                        "job": index,
                        "result_ids": results.iter().map(|r| r.id.to_string()).collect::<Vec<_>>(),
                    }),
                );
                Ok(results)
            }
            Err(err) => {
                tracing::warn!(job = index, error = %err, "job failed");
                self.record(
                    EventKind::JobFailed,
                    json!({ "job": index, "error": err.to_string() }),
                );
                Err(err)
            }
        }
    }

    /// Renders a high-resolution sibling of `result` with the same scene.
    /// Frame, lighting and texture are left to inference so the scene is
    /// not re-randomized. `result` itself is never modified.
    pub async fn upscale(
        &self,
        source: &SourceImage,
        result: &MockupResult,
        base: &BaseSettings,
    ) -> Result<MockupResult> {
        let credential = self.credential()?;
        let request = GenerationRequest::from_base(base, result.prompt.clone())
            .with_resolution(ResolutionTier::UpscaledHigh);

        tracing::info!(result_id = %result.id, "upscale started");
        self.record(
            EventKind::UpscaleStarted,
            json!({ "result_id": result.id.to_string(), "prompt": result.prompt }),
        );

        let retry = self.retry_policy();
        let outcome = generate_images(
            self.provider().as_ref(),
            &retry,
            source,
            &request,
            credential.as_deref(),
        )
        .await;

        // generate_images never succeeds with an empty list.
        let first = outcome.and_then(|images| {
            images.into_iter().next().ok_or(EngineError::NoImages {
                requested: 1,
                last_error: None,
            })
        });
        match first {
            Ok(image) => {
                let upscaled = MockupResult::new(image, result.prompt.clone(), request.resolution);
                tracing::info!(result_id = %result.id, upscaled_id = %upscaled.id, "upscale finished");
                self.record(
                    EventKind::UpscaleFinished,
                    json!({
                        "result_id": result.id.to_string(),
                        "upscaled_id": upscaled.id.to_string(),
                    }),
                );
                Ok(upscaled)
            }
            Err(err) => Err(self.upscale_failed(result, err)),
        }
    }

    fn upscale_failed(&self, result: &MockupResult, err: EngineError) -> EngineError {
        tracing::warn!(result_id = %result.id, error = %err, "upscale failed");
        self.record(
            EventKind::UpscaleFailed,
            json!({ "result_id": result.id.to_string(), "error": err.to_string() }),
        );
        EngineError::Upscale {
            result_id: result.id,
            source: Box::new(err),
        }
    }
}
