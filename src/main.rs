mod config;
mod error;
mod middleware;
mod models;
mod routes;
mod services;

use axum::extract::FromRef;
use axum::routing::get;
use axum::Router;

use figment::{providers::Format, Figment};

use mongodb::Client;

use tracing::*;
use tracing_forest::ForestLayer;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::middleware::logging::HttpLoggingExt;
use crate::services::github::GithubClient;
use crate::services::posts::PostsDb;
use crate::services::profiles::ProfilesDb;
use crate::services::tokens::TokenService;
use crate::services::users::UsersDb;

/// Everything a handler can ask for. Each member is a cheap clone around a
/// shared connection or key, constructed once at startup and injected through
/// `Router::with_state` — no module-level singletons.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub users: UsersDb,
    pub profiles: ProfilesDb,
    pub posts: PostsDb,
    pub tokens: TokenService,
    pub github: GithubClient,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg: config::AppCfg = Figment::new()
        .merge(figment::providers::Json::file("appsettings.json"))
        .merge(figment::providers::Env::prefixed("APP_"))
        .extract()?;

    // initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(ForestLayer::default())
        .init();

    info!("connecting to MongoDB");
    let client = Client::with_uri_str(&cfg.mongo_uri).await?;
    let db = client.database(&cfg.db_name);

    let users = UsersDb::new(&db);
    let profiles = ProfilesDb::new(&db);
    users.ensure_indexes().await?;
    profiles.ensure_indexes().await?;

    let state = AppState {
        posts: PostsDb::new(&db),
        tokens: TokenService::new(&cfg.jwt_secret),
        github: GithubClient::new(cfg.github_token.clone())?,
        users,
        profiles,
    };

    let app = Router::new()
        .route("/", get(|| async { "API running" }))
        .nest("/api/users", routes::users::router())
        .nest("/api/auth", routes::auth::router())
        .nest("/api/profile", routes::profile::router())
        .nest("/api/posts", routes::posts::router())
        .with_state(state)
        .with_http_logging();

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    info!("starting listening at {}", cfg.listen_addr);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("shutting down");
    client.shutdown().await;

    Ok(())
}
