// Copyright 2026 PromptHub Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! The API Surface: axum routes, the response envelope,
//! bearer-token auth, and the process entrypoint, wired over the engine and
//! storage crates.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;

use anyhow::Result;
use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::Router;
use auth::{auth_middleware, CallerDirectory};
use config::ServerConfig;
use prompthub_engine::{CallLogSink, PromptHubEngine, SceneService};
use prompthub_storage::{
    InMemoryCallLogStore, InMemoryProjectStore, InMemoryPromptStore, InMemoryReferenceIndex,
    InMemorySceneStore, ProjectStore, PromptStore, ReferenceIndex, SceneStore,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Shared application state handed to every handler via axum's `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PromptHubEngine>,
    pub scene_service: Arc<SceneService>,
    pub prompt_store: Arc<dyn PromptStore>,
    pub scene_store: Arc<dyn SceneStore>,
    pub project_store: Arc<dyn ProjectStore>,
    pub reference_index: Arc<dyn ReferenceIndex>,
    pub caller_directory: Arc<CallerDirectory>,
    pub max_page_size: u32,
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prompthub_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting PromptHub server");
    tracing::info!(?config, "loaded configuration");

    let prompt_store: Arc<dyn PromptStore> = Arc::new(InMemoryPromptStore::new());
    let scene_store: Arc<dyn SceneStore> = Arc::new(InMemorySceneStore::new());
    let project_store: Arc<dyn ProjectStore> = Arc::new(InMemoryProjectStore::new());
    let reference_index: Arc<dyn ReferenceIndex> = Arc::new(InMemoryReferenceIndex::new());
    let call_log_store = Arc::new(InMemoryCallLogStore::default());

    let call_log_sink = CallLogSink::spawn(call_log_store, config.cache.call_log_channel_capacity);
    let engine = Arc::new(PromptHubEngine::new(
        prompt_store.clone(),
        reference_index.clone(),
        call_log_sink,
        config.cache.capacity,
        std::time::Duration::from_secs(config.cache.ttl_secs),
    ));
    let scene_service = Arc::new(SceneService::new(scene_store.clone(), reference_index.clone()));
    let caller_directory = Arc::new(CallerDirectory::from_config_entries(&config.auth.api_keys));

    if caller_directory.is_disabled() {
        tracing::warn!("no api_keys configured; all requests authenticate as the dev caller");
    }

    let state = AppState {
        engine,
        scene_service,
        prompt_store,
        scene_store,
        project_store,
        reference_index,
        caller_directory,
        max_page_size: config.server.max_page_size,
    };

    let authed_routes = Router::new()
        .route("/api/v1/prompts", get(api::prompts::list).post(api::prompts::create))
        .route(
            "/api/v1/prompts/:id",
            get(api::prompts::get).put(api::prompts::update).delete(api::prompts::delete),
        )
        .route("/api/v1/prompts/:id/versions", get(api::prompts::list_versions))
        .route("/api/v1/prompts/:id/versions/:version", get(api::prompts::get_version))
        .route("/api/v1/prompts/:id/publish", post(api::prompts::publish))
        .route("/api/v1/prompts/:id/render", post(api::prompts::render))
        .route("/api/v1/prompts/:id/share", post(api::prompts::share))
        .route("/api/v1/scenes", get(api::scenes::list).post(api::scenes::create))
        .route(
            "/api/v1/scenes/:id",
            get(api::scenes::get).put(api::scenes::update).delete(api::scenes::delete),
        )
        .route("/api/v1/scenes/:id/resolve", post(api::scenes::resolve))
        .route("/api/v1/scenes/:id/dependencies", get(api::scenes::dependencies))
        .route("/api/v1/projects", get(api::projects::list).post(api::projects::create))
        .route("/api/v1/projects/:id", get(api::projects::get))
        .route("/api/v1/projects/:id/prompts", get(api::projects::prompts))
        .route("/api/v1/shared/prompts", get(api::shared::list_shared))
        .route("/api/v1/shared/prompts/:id/fork", post(api::shared::fork))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    let cors = if config.server.enable_cors {
        CorsLayer::new().allow_methods(Any).allow_headers(Any).allow_origin(Any)
    } else {
        CorsLayer::new()
    };

    let app = Router::new()
        .route("/healthz", get(api::health::healthz))
        .merge(authed_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = config.socket_addr()?;
    tracing::info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
