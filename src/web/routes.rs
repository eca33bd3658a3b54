use std::{path::PathBuf, sync::Arc};

use axum::{
    Router,
    extract::{Form, Path as UrlPath, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use minijinja::{Environment, context};

use crate::{
    model::parse::CaptionPair,
    model::runner::sanitize_filename,
    pipeline::MemePipeline,
    store::db::{GenerationStatus, GenerationStore, SYSTEM_PROMPT_KEY},
};

/// Shared state behind every handler.
pub struct AppState {
    /// Generation records and settings.
    pub store: GenerationStore,
    /// The blocking generation pipeline.
    pub pipeline: MemePipeline,
    /// Parsed view templates.
    pub templates: Environment<'static>,
    /// Managed output directory images are served from.
    pub image_dir: PathBuf,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/generate", post(generate))
        .route("/generation", get(generation))
        .route("/history", get(history))
        .route("/settings", get(settings))
        .route("/settings/update", post(update_settings))
        .route("/images/{filename}", get(serve_image))
        .with_state(state)
}

async fn home(State(state): State<Arc<AppState>>) -> Response {
    let generations = state.store.list_generations(10).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to list generations");
        Vec::new()
    });
    render(
        &state,
        "index.html",
        context! { generations => generations },
    )
}

#[derive(serde::Deserialize)]
struct GenerateForm {
    prompt: String,
}

async fn generate(State(state): State<Arc<AppState>>, Form(form): Form<GenerateForm>) -> Response {
    let prompt = form.prompt.trim().to_string();
    if prompt.is_empty() {
        return (StatusCode::BAD_REQUEST, "prompt is required").into_response();
    }

    let id = match state.store.insert_generation(&prompt) {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "failed to insert generation");
            return internal_error();
        }
    };

    let system_prompt = state
        .store
        .get_setting(SYSTEM_PROMPT_KEY)
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to fetch system prompt");
            None
        });

    // The pipeline blocks on the external process; keep it off the async
    // workers.
    let outcome = {
        let state = Arc::clone(&state);
        let prompt = prompt.clone();
        tokio::task::spawn_blocking(move || {
            state.pipeline.generate(&prompt, system_prompt.as_deref())
        })
        .await
    };

    match outcome {
        Ok(Ok(output)) => {
            if let Err(e) = state.store.update_status(
                id,
                GenerationStatus::Success,
                &output.filename,
                &output.captions,
                None,
            ) {
                tracing::error!(error = %e, id, "failed to record success");
            }
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, id, "generation failed");
            record_failure(&state, id, &e.to_string());
        }
        Err(e) => {
            tracing::error!(error = %e, id, "generation task panicked");
            record_failure(&state, id, "internal generation failure");
        }
    }

    render_generation(&state, id)
}

fn record_failure(state: &AppState, id: i64, message: &str) {
    if let Err(e) = state.store.update_status(
        id,
        GenerationStatus::Failed,
        "",
        &CaptionPair::default(),
        Some(message),
    ) {
        tracing::error!(error = %e, id, "failed to record failure");
    }
}

#[derive(serde::Deserialize)]
struct GenerationQuery {
    id: i64,
}

async fn generation(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GenerationQuery>,
) -> Response {
    render_generation(&state, query.id)
}

fn render_generation(state: &AppState, id: i64) -> Response {
    match state.store.get_generation(id) {
        Ok(Some(generation)) => render(
            state,
            "generation.html",
            context! { generation => generation },
        ),
        Ok(None) => (StatusCode::NOT_FOUND, "generation not found").into_response(),
        Err(e) => {
            tracing::error!(error = %e, id, "failed to fetch generation");
            internal_error()
        }
    }
}

async fn history(State(state): State<Arc<AppState>>) -> Response {
    match state.store.list_generations(10) {
        Ok(generations) => render(
            &state,
            "history.html",
            context! { generations => generations },
        ),
        Err(e) => {
            tracing::error!(error = %e, "failed to list generations");
            internal_error()
        }
    }
}

async fn settings(State(state): State<Arc<AppState>>) -> Response {
    let system_prompt = state
        .store
        .get_setting(SYSTEM_PROMPT_KEY)
        .unwrap_or_default()
        .unwrap_or_default();
    render(
        &state,
        "settings.html",
        context! { system_prompt => system_prompt, saved => false },
    )
}

#[derive(serde::Deserialize)]
struct SettingsForm {
    system_prompt: String,
}

async fn update_settings(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SettingsForm>,
) -> Response {
    if let Err(e) = state.store.set_setting(SYSTEM_PROMPT_KEY, &form.system_prompt) {
        tracing::error!(error = %e, "failed to update system prompt");
        return internal_error();
    }
    render(
        &state,
        "settings.html",
        context! { system_prompt => form.system_prompt, saved => true },
    )
}

// Served filenames are restricted to base names under the managed directory;
// anything else is a plain miss.
async fn serve_image(
    State(state): State<Arc<AppState>>,
    UrlPath(filename): UrlPath<String>,
) -> Response {
    let Ok(name) = sanitize_filename(&filename) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match tokio::fs::read(state.image_dir.join(name)).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

fn render(state: &AppState, name: &str, ctx: minijinja::Value) -> Response {
    let rendered = state
        .templates
        .get_template(name)
        .and_then(|t| t.render(ctx));
    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(error = %e, template = name, "template render failed");
            internal_error()
        }
    }
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
}
