pub mod background;
pub mod backend;
pub mod components;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod schema;
pub mod session;
pub mod state;
pub mod stores;
pub mod templates;

use std::path::Path;

use axum::http::header;
use axum::Router;
use notify::RecommendedWatcher;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, warn};

use crate::background::session_listener::SessionListener;
use crate::backend::Backend;
use crate::config::{AppCfg, SeedCfg};
use crate::middleware::cors::CorsExt;
use crate::middleware::logging::HttpLoggingExt;
use crate::state::AppState;
use crate::stores::Stores;

/// A ready-to-serve application and the background work that keeps it current.
pub struct App {
    pub router: Router,
    pub state: AppState,
    pub listener: SessionListener,
    /// Present while templates are reloaded on change.
    pub watcher: Option<RecommendedWatcher>,
}

impl App {
    /// Stops background work. The router keeps serving stale sessions afterwards.
    pub async fn shutdown(self) {
        drop(self.watcher);
        self.listener.shutdown().await;
    }
}

/// Wires the in-memory backend, seed data, templates and routes together.
pub async fn build_app(cfg: AppCfg) -> anyhow::Result<App> {
    let backend = Backend::in_memory(&cfg.storage.public_base_url);
    let templates = templates::load(&cfg.templates)?;
    let watcher = if cfg.templates.watch {
        Some(templates::watch(templates.clone(), Path::new(&cfg.templates.dir))?)
    } else {
        None
    };

    let state = AppState::new(cfg, backend, templates);
    seed(&state.stores, &state.cfg.seed).await?;
    let listener = SessionListener::spawn(state.backend.identity.clone(), state.sessions.clone());

    let router = Router::new()
        .merge(routes::router())
        .nest_service(
            "/static",
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    header::HeaderValue::from_static("max-age=13420"),
                ))
                .layer(CompressionLayer::new())
                .service(ServeDir::new(&state.cfg.server.static_dir)),
        )
        .with_cors(&state.cfg.server.cors_origins)
        .with_http_logging()
        .with_state(state.clone());

    Ok(App {
        router,
        state,
        listener,
        watcher,
    })
}

/// Creates the configured administrator and any subjects not stored yet.
async fn seed(stores: &Stores, seed: &SeedCfg) -> anyhow::Result<()> {
    let Some(account) = &seed.admin else {
        if !seed.subjects.is_empty() {
            warn!("seed subjects need a seed admin, skipping them");
        }
        return Ok(());
    };
    let admin = stores.users.bootstrap_admin(account).await?;

    let existing = stores.subjects.list_subjects().await?;
    for name in &seed.subjects {
        if existing.iter().any(|s| s.name == name.trim()) {
            continue;
        }
        stores.subjects.create_subject(Some(&admin), name).await?;
    }
    info!(subjects = seed.subjects.len(), "seed data ready");
    Ok(())
}
