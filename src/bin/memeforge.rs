use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;

use memeforge::{
    Compositor, FitBounds, FontResolver, MemePipeline, ModelRunner, RunnerConfig,
    store::db::GenerationStore,
    web::{routes, routes::AppState, templates},
};

#[derive(Debug, Parser)]
#[command(name = "memeforge", version, about = "Self-hosted meme generation server")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// SQLite database path.
    #[arg(long, default_value = "meme_generator.db")]
    db: PathBuf,

    /// Managed directory generated images are relocated into and served from.
    #[arg(long, default_value = "generated")]
    output_dir: PathBuf,

    /// Root for per-invocation staging directories.
    #[arg(long, default_value = "staging")]
    staging_dir: PathBuf,

    /// On-disk font asset; the embedded face is used when it is unavailable.
    #[arg(long, default_value = "assets/fonts/Impact.ttf")]
    font: PathBuf,

    /// External model binary, invoked as `<binary> run <model> <prompt>`.
    #[arg(long, default_value = "ollama")]
    model_binary: PathBuf,

    /// Model identifier for image generation.
    #[arg(long, default_value = "x/flux2-klein")]
    image_model: String,

    /// Model identifier for caption generation.
    #[arg(long, default_value = "gemma3:270m")]
    text_model: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "failed to create output directory '{}'",
            args.output_dir.display()
        )
    })?;
    std::fs::create_dir_all(&args.staging_dir).with_context(|| {
        format!(
            "failed to create staging directory '{}'",
            args.staging_dir.display()
        )
    })?;

    let store = GenerationStore::open(&args.db)?;
    let runner = ModelRunner::new(RunnerConfig {
        binary: args.model_binary,
        image_model: args.image_model,
        text_model: args.text_model,
        output_dir: args.output_dir.clone(),
        staging_root: args.staging_dir,
    });
    let compositor = Compositor::new(FontResolver::new(Some(args.font)), FitBounds::default());
    let pipeline = MemePipeline::new(runner, compositor, args.output_dir.clone());

    let state = Arc::new(AppState {
        store,
        pipeline,
        templates: templates::environment()?,
        image_dir: args.output_dir,
    });

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    tracing::info!(addr = %args.bind, "server listening");
    axum::serve(listener, routes::router(state)).await?;
    Ok(())
}
