//! HTTP server with graceful shutdown

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    config::Config,
    error::Result,
    handlers::api_routes,
    health::{health, readiness},
    middleware::{
        request_id_layer, request_id_propagation_layer, sensitive_headers_layer, JwtAuth,
    },
    state::AppState,
};

/// Server instance
pub struct Server {
    state: AppState,
    auth: JwtAuth,
}

impl Server {
    /// Create a server, loading the JWT key named in the config
    pub fn new(state: AppState) -> Result<Self> {
        let auth = JwtAuth::new(&state.config().jwt)?;
        Ok(Self::with_auth(state, auth))
    }

    /// Create a server with an already-built authenticator
    pub fn with_auth(state: AppState, auth: JwtAuth) -> Self {
        Self { state, auth }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        self.state.config()
    }

    /// Health probes, API routes and the middleware stack
    pub fn router(&self) -> Router {
        let config = self.config();

        let app = Router::new()
            .route("/health", get(health))
            .route("/ready", get(readiness))
            .merge(api_routes(self.auth.clone()))
            .with_state(self.state.clone());

        // Each layer wraps everything added before it
        let app = app.layer(self.build_cors_layer());
        let app = if config.middleware.compression {
            app.layer(CompressionLayer::new())
        } else {
            app
        };

        let app = app
            .layer(TimeoutLayer::with_status_code(
                http::StatusCode::REQUEST_TIMEOUT,
                config.request_timeout(),
            ))
            .layer(RequestBodyLimitLayer::new(
                config.middleware.body_limit_mb * 1024 * 1024,
            ))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_response(DefaultOnResponse::new().include_headers(true)),
            )
            .layer(sensitive_headers_layer())
            .layer(request_id_propagation_layer())
            .layer(request_id_layer());

        if config.middleware.catch_panic {
            app.layer(CatchPanicLayer::new())
        } else {
            app
        }
    }

    /// Bind the configured port and serve until SIGINT or SIGTERM
    pub async fn serve(self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config().service.port));

        tracing::info!("Starting {} on {}", self.config().service.name, addr);
        self.log_middleware_config();

        let app = self.router();
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        self.state.db().close().await;
        tracing::info!("Server shutdown complete");

        Ok(())
    }

    fn log_middleware_config(&self) {
        let middleware = &self.config().middleware;
        tracing::info!(
            catch_panic = middleware.catch_panic,
            compression = middleware.compression,
            cors_mode = %middleware.cors_mode,
            body_limit_mb = middleware.body_limit_mb,
            timeout_secs = self.config().service.timeout_secs,
            required_role = %self.config().jwt.required_role,
            "Middleware configuration"
        );
    }

    /// Build CORS layer based on configuration
    fn build_cors_layer(&self) -> CorsLayer {
        match self.config().middleware.cors_mode.as_str() {
            "permissive" => CorsLayer::permissive(),
            "restrictive" | "disabled" => CorsLayer::new(),
            other => {
                tracing::warn!("Unknown CORS mode: {}, defaulting to permissive", other);
                CorsLayer::permissive()
            }
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
