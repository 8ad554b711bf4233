pub mod error;
pub mod handlers;
pub mod rate_limit;

use crate::ai::Providers;
use crate::config::{Config, DebateConfig, Environment};
use crate::debate::CancelHandle;
use crate::error::{ArenaError, ArenaResult};
use crate::server::error::ApiError;
use crate::server::rate_limit::RateLimiter;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

const HEALTH_PATH: &str = "/api/health";

#[derive(Clone)]
pub struct AppState {
    pub providers: Providers,
    pub debate: DebateConfig,
    pub environment: Environment,
    current_run: Arc<Mutex<Option<CancelHandle>>>,
}

impl AppState {
    pub fn new(providers: Providers, config: &Config) -> Self {
        Self {
            providers,
            debate: config.debate.clone(),
            environment: config.server.environment,
            current_run: Arc::new(Mutex::new(None)),
        }
    }

    /// Wrap an error for the response; the source chain is shown in development only.
    pub fn reject(&self, error: ArenaError) -> ApiError {
        ApiError::new(error, self.environment.is_development())
    }

    /// Make `handle` the in-flight debate, cancelling the one it replaces.
    pub fn replace_current_run(&self, handle: CancelHandle) {
        let previous = match self.current_run.lock() {
            Ok(mut current) => current.replace(handle),
            Err(poisoned) => poisoned.into_inner().replace(handle),
        };
        if let Some(previous) = previous {
            if !previous.is_cancelled() {
                tracing::info!("Cancelling previous debate run");
            }
            previous.cancel();
        }
    }
}

pub fn router(state: AppState, rate_limiter: Option<Arc<RateLimiter>>) -> Router {
    let quiet_health = state.environment.is_production();

    let api = Router::new()
        .route("/gpt", post(handlers::debater_a))
        .route("/gpt/models", get(handlers::openai_models))
        .route("/claude", post(handlers::debater_b))
        .route("/claude/models", get(handlers::anthropic_models))
        .route("/gemini", post(handlers::verdict))
        .route("/gemini/models", get(handlers::gemini_models))
        .route("/debate", post(handlers::debate))
        .route("/health", get(handlers::health));

    let mut app = Router::new()
        .nest("/api", api)
        .fallback(handlers::not_found)
        .with_state(state);

    if let Some(limiter) = rate_limiter {
        app = app.layer(middleware::from_fn_with_state(limiter, rate_limit::limit_requests));
    }

    let trace = TraceLayer::new_for_http()
        .make_span_with(move |request: &Request<Body>| {
            if quiet_health && request.uri().path() == HEALTH_PATH {
                return Span::none();
            }
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            tracing::info_span!(
                "request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id,
            )
        })
        .on_request(())
        .on_response(|response: &Response<Body>, latency: Duration, span: &Span| {
            if span.is_disabled() {
                return;
            }
            tracing::info!(
                status = response.status().as_u16(),
                latency_ms = latency.as_millis() as u64,
                "Request completed"
            );
        });

    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(trace)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(CorsLayer::permissive()),
    )
}

pub async fn serve(config: &Config, providers: Providers) -> ArenaResult<()> {
    let state = AppState::new(providers, config);
    let rate_limiter = config
        .server
        .rate_limit_per_minute
        .map(|limit| Arc::new(RateLimiter::new(limit)));
    let app = router(state, rate_limiter);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        %addr,
        environment = ?config.server.environment,
        rate_limit = ?config.server.rate_limit_per_minute,
        "Server running"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
