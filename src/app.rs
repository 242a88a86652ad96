#![cfg(feature = "web")]

use axum::{
    Router,
    extract::{FromRef, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use handlebars::Handlebars;
use log::info;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::client::LeaderboardClient;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::files::{self, CleanupPolicy};
use crate::handlers;

/// Everything a request handler needs, cloned into each request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: LeaderboardClient,
    pub templates: Arc<Handlebars<'static>>,
    key: Key,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let client = LeaderboardClient::new(
            config.api_base_url.clone(),
            config.page_size,
            config.request_timeout(),
        )?;
        let key = config.signing_key()?;

        Ok(AppState {
            config: Arc::new(config),
            client,
            templates: Arc::new(templates()?),
            key,
        })
    }
}

/// Register the page templates
fn templates() -> Result<Handlebars<'static>> {
    let mut hb = Handlebars::new();
    hb.set_strict_mode(false);

    let register = |hb: &mut Handlebars<'static>, name: &str, source: &str| {
        hb.register_template_string(name, source)
            .map_err(|e| AppError::Config(format!("template {}: {}", name, e)))
    };

    hb.register_partial("head", include_str!("./templates/head.hbs"))
        .map_err(|e| AppError::Config(format!("partial head: {}", e)))?;
    register(&mut hb, "login", include_str!("./templates/login.hbs"))?;
    register(&mut hb, "contests", include_str!("./templates/contests.hbs"))?;
    register(&mut hb, "top3", include_str!("./templates/top3.hbs"))?;

    Ok(hb)
}

/// Build the router for the given state
pub fn router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .route(
            "/",
            get(handlers::serve_login_page).post(handlers::handle_login),
        )
        .route("/top3", post(handlers::handle_export))
        .route("/download", post(handlers::handle_export))
        .route("/download_file/:file_name", get(handlers::handle_download))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Log method, path, status and latency of every request
async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} -> {} in {:?}",
        method,
        path,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}

/// Start the web server and, under the sweep policy, the background sweeper
pub async fn run(config: Config) -> std::result::Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&config.downloads_dir)?;

    if let CleanupPolicy::Sweep {
        age_limit_secs,
        poll_interval_secs,
    } = config.cleanup
    {
        files::spawn_sweeper(
            config.downloads_dir.clone(),
            Duration::from_secs(age_limit_secs),
            Duration::from_secs(poll_interval_secs),
        );
    }

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config)?;
    let app = router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
