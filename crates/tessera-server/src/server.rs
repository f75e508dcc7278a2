use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method, header};
use axum::{Json, Router, response::IntoResponse, routing::get};
use serde_json::json;
use tessera_auth::{
    AuthState, CredentialStore, GoogleIdentityProvider, InMemoryCredentialStore, TokenService,
    UserDirectory,
};
use tessera_auth_postgres::PostgresCredentialStore;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;

pub struct TesseraServer {
    addr: SocketAddr,
    app: Router,
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

fn cors(cfg: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cfg
        .server
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn build_app(cfg: &AppConfig, state: AuthState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(tessera_auth::http::router(state))
        .layer(cors(cfg))
        .layer(TraceLayer::new_for_http())
}

pub struct ServerBuilder {
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<TesseraServer> {
        let (store, users): (Arc<dyn CredentialStore>, Arc<dyn UserDirectory>) =
            match &self.config.database.url {
                Some(url) => {
                    let pg =
                        PostgresCredentialStore::connect(url, self.config.database.pool_size)
                            .await?;
                    pg.migrate().await?;
                    tracing::info!("Using PostgreSQL credential store");
                    let pg = Arc::new(pg);
                    let store: Arc<dyn CredentialStore> = pg.clone();
                    let users: Arc<dyn UserDirectory> = pg;
                    (store, users)
                }
                None => {
                    tracing::warn!("database.url not set; credentials are kept in memory");
                    let mem = Arc::new(InMemoryCredentialStore::new());
                    let store: Arc<dyn CredentialStore> = mem.clone();
                    let users: Arc<dyn UserDirectory> = mem;
                    (store, users)
                }
            };

        let tokens = Arc::new(TokenService::new(&self.config.auth, store, users)?);
        let identity = Arc::new(GoogleIdentityProvider::new(self.config.google.clone())?);
        let state = AuthState::new(tokens, identity, self.config.auth.cookies.clone());

        Ok(TesseraServer {
            addr: self.config.addr(),
            app: build_app(&self.config, state),
        })
    }
}

impl TesseraServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
