use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use mockup_contracts::events::{now_utc_iso, EventKind, EventLog};
use mockup_contracts::payload::mime_for_extension;
use mockup_contracts::providers::NamedProvider;
use mockup_contracts::settings::{SettingsStore, StudioDefaults};
use mockup_contracts::summary::{write_summary, SessionSummary};
use mockup_contracts::{
    AspectRatio, FrameStyle, LightingStyle, MockupResult, PrintSize, ResolutionTier,
    SelectionSet, SourceImage, Studio, Vibe, WallTexture,
};
use mockup_engine::{
    artifact_file_stem, default_provider_registry, CredentialChain, EngineConfig, MockupEngine,
};
use serde_json::{json, Map, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "mockup", version, about = "Photographic artwork mockups from one upload")]
struct Cli {
    /// Generation backend: `gemini` or the offline `dryrun`.
    #[arg(long, global = true, default_value = "gemini")]
    provider: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print up to four scene suggestions for the artwork.
    Suggest(SuggestArgs),
    /// Print one fresh scene suggestion.
    Regenerate(SuggestArgs),
    Batch(BatchArgs),
    Upscale(UpscaleArgs),
}

#[derive(Debug, Args)]
struct SessionArgs {
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct SuggestArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    vibe: Option<Vibe>,
    #[command(flatten)]
    session: SessionArgs,
}

#[derive(Debug, Args)]
struct BatchArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    out: PathBuf,
    #[arg(long = "prompt")]
    prompts: Vec<String>,
    #[arg(long = "frame")]
    frames: Vec<FrameStyle>,
    #[arg(long)]
    lighting: Vec<LightingStyle>,
    #[arg(long = "texture")]
    textures: Vec<WallTexture>,
    #[arg(long)]
    negative: Option<String>,
    #[arg(long)]
    print_size: Option<PrintSize>,
    #[arg(long)]
    aspect: Option<AspectRatio>,
    #[arg(long)]
    vibe: Option<Vibe>,
    /// Upscale every draft once the batch finishes.
    #[arg(long)]
    upscale: bool,
    #[command(flatten)]
    session: SessionArgs,
}

#[derive(Debug, Args)]
struct UpscaleArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    prompt: String,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    aspect: Option<AspectRatio>,
    #[command(flatten)]
    session: SessionArgs,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("mockup error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mockup=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(dispatch(cli))
}

async fn dispatch(cli: Cli) -> Result<i32> {
    let provider = cli.provider;
    match cli.command {
        Command::Suggest(args) => run_suggest(&provider, args, false).await,
        Command::Regenerate(args) => run_suggest(&provider, args, true).await,
        Command::Batch(args) => run_batch(&provider, args).await,
        Command::Upscale(args) => run_upscale(&provider, args).await,
    }
}

/// Everything one command invocation shares: engine, settings, event log.
struct Session {
    engine: MockupEngine,
    settings: Option<SettingsStore>,
    defaults: StudioDefaults,
    events: Option<EventLog>,
    session_id: String,
    started_at: String,
}

impl Session {
    fn open(provider_name: &str, events: Option<PathBuf>, settings: Option<PathBuf>) -> Result<Self> {
        let config = EngineConfig::from_env()?;
        let registry = default_provider_registry(&config);
        let Some(provider) = registry.get(provider_name) else {
            bail!(
                "unknown provider '{provider_name}' (available: {})",
                registry.list().join(", ")
            );
        };

        let mut settings = settings.map(SettingsStore::new);
        let defaults = settings
            .as_mut()
            .map(SettingsStore::load_defaults)
            .unwrap_or_default();

        let session_id = uuid::Uuid::new_v4().to_string();
        let events = events.map(|path| EventLog::new(path, session_id.clone()));
        let credentials = CredentialChain::new().with_persisted(defaults.api_key.clone());
        let mut engine =
            MockupEngine::from_config(Arc::clone(provider), &config).with_credentials(credentials);
        if let Some(events) = &events {
            events.emit(
                EventKind::SessionStarted,
                &json!({ "provider": provider.name() }),
            )?;
            engine = engine.with_events(events.clone());
        }

        Ok(Self {
            engine,
            settings,
            defaults,
            events,
            session_id,
            started_at: now_utc_iso(),
        })
    }

    fn save_defaults(&mut self) -> Result<()> {
        if let Some(store) = self.settings.as_mut() {
            store
                .save_defaults(&self.defaults)
                .with_context(|| format!("failed to save {}", store.path().display()))?;
        }
        Ok(())
    }

    fn write_summary(&self, out: &Path, studio: &Studio, failed_jobs: u64, files: &[PathBuf]) -> Result<()> {
        let summary = SessionSummary::from_store(
            self.session_id.clone(),
            self.started_at.clone(),
            &studio.results,
            failed_jobs,
        );
        let mut extra = Map::new();
        extra.insert(
            "provider".to_string(),
            Value::String(self.engine.provider().name().to_string()),
        );
        extra.insert(
            "files".to_string(),
            Value::Array(
                files
                    .iter()
                    .map(|path| Value::String(path.display().to_string()))
                    .collect(),
            ),
        );
        if let Some(events) = &self.events {
            extra.insert(
                "events".to_string(),
                Value::String(events.path().display().to_string()),
            );
        }
        write_summary(&out.join("summary.json"), &summary, Some(&extra))
    }
}

async fn run_suggest(provider: &str, args: SuggestArgs, single: bool) -> Result<i32> {
    let session = Session::open(provider, args.session.events, args.session.settings)?;
    let source = load_source(&args.image)?;
    let vibe = args.vibe.unwrap_or(session.defaults.base.vibe);

    if single {
        println!("{}", session.engine.regenerate_prompt(&source, vibe).await);
    } else {
        for (idx, suggestion) in session
            .engine
            .suggest_prompts(&source, vibe)
            .await
            .iter()
            .enumerate()
        {
            println!("{}. {suggestion}", idx + 1);
        }
    }
    Ok(0)
}

async fn run_batch(provider: &str, args: BatchArgs) -> Result<i32> {
    let settings_path = args
        .session
        .settings
        .clone()
        .unwrap_or_else(|| args.out.join("settings.json"));
    let events_path = args
        .session
        .events
        .clone()
        .unwrap_or_else(|| args.out.join("events.jsonl"));
    let mut session = Session::open(provider, Some(events_path), Some(settings_path))?;
    apply_overrides(&mut session.defaults, &args);
    session.save_defaults()?;

    let mut studio = open_studio(&session.defaults, load_source(&args.image)?, args.aspect);

    if args.prompts.is_empty() {
        let seeded = session.engine.suggest_into_studio(&mut studio).await?;
        tracing::info!(prompts = seeded.len(), "seeded prompts from suggestions");
    } else {
        studio.prompts.replace_all(args.prompts.iter().cloned());
    }

    let outcome = session.engine.run_studio_batch(&mut studio).await?;
    for failure in &outcome.failures {
        eprintln!("job {} failed: {}", failure.index, failure.error);
    }
    let mut failed_jobs = outcome.failures.len() as u64;

    if args.upscale {
        let drafts: Vec<uuid::Uuid> = outcome.results.iter().map(|result| result.id).collect();
        for id in drafts {
            if let Err(err) = session.engine.upscale_in_studio(&mut studio, id).await {
                eprintln!("{err:#}");
                failed_jobs += 1;
            }
        }
    }

    let files = write_results(&args.out, studio.results.items())?;
    for path in &files {
        println!("{}", path.display());
    }
    session.write_summary(&args.out, &studio, failed_jobs, &files)?;
    Ok(0)
}

async fn run_upscale(provider: &str, args: UpscaleArgs) -> Result<i32> {
    let settings_path = args
        .session
        .settings
        .clone()
        .unwrap_or_else(|| args.out.join("settings.json"));
    let events_path = args
        .session
        .events
        .clone()
        .unwrap_or_else(|| args.out.join("events.jsonl"));
    let session = Session::open(provider, Some(events_path), Some(settings_path))?;

    let source = load_source(&args.image)?;
    // The draft record only carries the scene; upscaling re-renders from the artwork.
    let draft = MockupResult::new(source.payload.clone(), args.prompt.clone(), ResolutionTier::Draft);
    let draft_id = draft.id;
    let mut studio = open_studio(&session.defaults, source, args.aspect);
    studio.results.push(draft);

    let upscaled = session.engine.upscale_in_studio(&mut studio, draft_id).await?;
    studio.results.remove(draft_id);

    let files = write_results(&args.out, std::slice::from_ref(&upscaled))?;
    for path in &files {
        println!("{}", path.display());
    }
    session.write_summary(&args.out, &studio, 0, &files)?;
    Ok(0)
}

/// Studio seeded from saved defaults. The aspect ratio is per run: the
/// artwork's natural ratio unless `--aspect` was given.
fn open_studio(defaults: &StudioDefaults, source: SourceImage, aspect: Option<AspectRatio>) -> Studio {
    let mut studio = Studio::new(defaults.base.clone(), defaults.constraints.clone());
    studio.load_source(source);
    if let Some(aspect) = aspect {
        studio.base.aspect_ratio = aspect;
    }
    studio
}

/// Explicit flags win; anything omitted keeps the saved default. The aspect
/// ratio is not persisted since every artwork brings its own.
fn apply_overrides(defaults: &mut StudioDefaults, args: &BatchArgs) {
    let base = &mut defaults.base;
    if let Some(negative) = &args.negative {
        base.negative_prompt = negative.clone();
    }
    if let Some(print_size) = args.print_size {
        base.print_size = print_size;
    }
    if let Some(vibe) = args.vibe {
        base.vibe = vibe;
    }

    let constraints = &mut defaults.constraints;
    if !args.frames.is_empty() {
        constraints.frames = SelectionSet::from_values(args.frames.iter().copied());
    }
    if !args.lighting.is_empty() {
        constraints.lighting = SelectionSet::from_values(args.lighting.iter().copied());
    }
    if !args.textures.is_empty() {
        constraints.textures = SelectionSet::from_values(args.textures.iter().copied());
    }
}

fn load_source(path: &Path) -> Result<SourceImage> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    let source = SourceImage::from_bytes(bytes, mime_for_extension(ext));
    tracing::info!(
        path = %path.display(),
        width = source.width,
        height = source.height,
        "loaded artwork"
    );
    Ok(source)
}

fn write_results(out: &Path, results: &[MockupResult]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out).with_context(|| format!("failed to create {}", out.display()))?;
    results
        .iter()
        .enumerate()
        .map(|(idx, result)| {
            let suffix = if result.is_upscaled() { "-hd" } else { "" };
            let path = out.join(format!(
                "{}{suffix}.{}",
                artifact_file_stem(idx, &result.prompt),
                result.image.extension()
            ));
            fs::write(&path, &result.image.bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli> {
        Ok(Cli::try_parse_from(args.iter().copied())?)
    }

    #[test]
    fn batch_accepts_repeated_styles_by_label_or_slug() -> Result<()> {
        let cli = parse(&[
            "mockup",
            "--provider",
            "dryrun",
            "batch",
            "--image",
            "art.png",
            "--out",
            "out",
            "--frame",
            "natural-oak",
            "--frame",
            "None",
            "--lighting",
            "Golden Hour",
            "--aspect",
            "16:9",
            "--vibe",
            "industrial-raw",
        ])?;
        assert_eq!(cli.provider, "dryrun");
        let Command::Batch(args) = cli.command else {
            bail!("expected batch command");
        };
        assert_eq!(args.frames, vec![FrameStyle::NaturalOak, FrameStyle::None]);
        assert_eq!(args.lighting, vec![LightingStyle::GoldenHour]);
        assert_eq!(args.aspect, Some(AspectRatio::Wide));
        assert_eq!(args.vibe, Some(Vibe::IndustrialRaw));
        assert!(args.prompts.is_empty());
        assert!(!args.upscale);
        Ok(())
    }

    #[test]
    fn unknown_style_is_rejected_by_the_parser() {
        let result = parse(&[
            "mockup", "batch", "--image", "a.png", "--out", "o", "--frame", "chrome",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn overrides_replace_only_what_was_given() -> Result<()> {
        let mut defaults = StudioDefaults::default();
        defaults.base.negative_prompt = "people".to_string();
        defaults.base.print_size = PrintSize::Large;

        let cli = parse(&[
            "mockup", "batch", "--image", "a.png", "--out", "o", "--texture", "exposed-brick",
            "--vibe", "cozy-warm",
        ])?;
        let Command::Batch(args) = cli.command else {
            bail!("expected batch command");
        };
        apply_overrides(&mut defaults, &args);

        assert_eq!(defaults.base.negative_prompt, "people");
        assert_eq!(defaults.base.print_size, PrintSize::Large);
        assert_eq!(defaults.base.vibe, Vibe::CozyWarm);
        assert_eq!(defaults.constraints.textures.values(), &[WallTexture::ExposedBrick]);
        assert!(defaults.constraints.frames.is_auto());
        Ok(())
    }

    #[test]
    fn aspect_follows_the_artwork_unless_given_explicitly() -> Result<()> {
        let mut defaults = StudioDefaults::default();
        defaults.base.aspect_ratio = AspectRatio::Tall;
        let source = || {
            SourceImage::new(mockup_contracts::ImagePayload::png(vec![1]), 1920, 1080)
        };

        let cli = parse(&[
            "mockup", "batch", "--image", "a.png", "--out", "o", "--aspect", "1:1",
        ])?;
        let Command::Batch(args) = cli.command else {
            bail!("expected batch command");
        };
        apply_overrides(&mut defaults, &args);
        assert_eq!(defaults.base.aspect_ratio, AspectRatio::Tall);

        let natural = open_studio(&defaults, source(), None);
        assert_eq!(natural.base.aspect_ratio, AspectRatio::Wide);
        let explicit = open_studio(&defaults, source(), args.aspect);
        assert_eq!(explicit.base.aspect_ratio, AspectRatio::Square);
        Ok(())
    }

    #[test]
    fn result_files_are_named_by_position_and_tier() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let draft = MockupResult::new(
            mockup_contracts::ImagePayload::png(vec![1, 2]),
            "loft",
            ResolutionTier::Draft,
        );
        let upscaled = MockupResult::new(
            mockup_contracts::ImagePayload::new("image/jpeg", vec![3]),
            "loft",
            ResolutionTier::UpscaledHigh,
        );

        let files = write_results(temp.path(), &[draft, upscaled])?;

        assert_eq!(files.len(), 2);
        assert!(files[0].to_string_lossy().ends_with(".png"));
        assert!(files[1].to_string_lossy().ends_with("-hd.jpg"));
        assert_eq!(fs::read(&files[0])?, vec![1, 2]);
        Ok(())
    }
}
