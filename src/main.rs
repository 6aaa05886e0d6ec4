use std::{net::SocketAddr, time::Duration, time::Instant};

use axum::{
    body::Body,
    http::{Request, Response},
    middleware, Router,
};
use surrealdb::{engine::any::Any, Surreal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Span;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    helpers::db_helpers,
    middlewares::mw_auth::mw_ctx_resolver,
    routes::{
        admin_routes::AdminRoutes, auth_routes::AuthRoutes, comment_routes::CommentRoutes,
        file_routes::FileRoutes, follow_playlist_routes::FollowPlaylistRoutes,
        follower_routes::FollowerRoutes, genre_routes::GenreRoutes, health_routes::HealthRoutes,
        like_routes::LikeRoutes, payment_routes::PaymentRoutes, playback_routes::PlaybackRoutes,
        playlist_routes::PlaylistRoutes, proxy_routes::ProxyRoutes, song_routes::SongRoutes,
        subscription_routes::SubscriptionRoutes, user_routes::UserRoutes,
    },
    services::{storage_service::StorageService, vector_service::VectorService},
};

pub use self::error::{Error, Result};

mod auth;
mod config;
mod controllers;
mod error;
mod helpers;
mod middlewares;
mod models;
mod routes;
mod services;
mod validators;

#[derive(Clone)]
struct AppState {
    db: Surreal<Any>,
    config: AppConfig,
    storage: StorageService,
    vectors: VectorService,
    http: reqwest::Client,
    started_at: Instant,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    tracing::info!("Starting Music Social API...");

    let config = AppConfig::from_env()?;

    tracing::info!("Connecting to database at: {}", config.db.url);
    let db = db_helpers::connect(&config.db).await?;
    db_helpers::init_schema(&db).await?;
    tracing::info!("Database connected successfully!");

    let http = reqwest::Client::new();
    let vectors = VectorService::new(http.clone(), config.cohere_api_key.clone());
    if !vectors.is_available() {
        tracing::warn!("COHERE_API_KEY not set, semantic search falls back to text matching");
    }
    let storage = StorageService::new(&config.storage);

    let addr: SocketAddr = format!("{}:{}", config.bind_host, config.port)
        .parse()
        .map_err(|_| Error::InvalidInput {
            reason: format!("Invalid bind address {}:{}", config.bind_host, config.port),
        })?;

    let app_state = AppState {
        db,
        config,
        storage,
        vectors,
        http,
        started_at: Instant::now(),
    };

    let routes_all = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(
        listener,
        routes_all.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn build_router(app_state: AppState) -> Router {
    let routes_api = Router::new()
        .nest("/auth", AuthRoutes::routes())
        .nest("/users", UserRoutes::routes())
        .nest("/songs", SongRoutes::routes())
        .nest("/playlists", PlaylistRoutes::routes())
        .nest("/genres", GenreRoutes::routes())
        .nest("/likes", LikeRoutes::routes())
        .nest("/comments", CommentRoutes::routes())
        .nest("/followers", FollowerRoutes::routes())
        .nest("/follow-playlist", FollowPlaylistRoutes::routes())
        .nest("/admin", AdminRoutes::routes())
        .nest("/payments", PaymentRoutes::routes())
        .nest("/subscriptions", SubscriptionRoutes::routes())
        .nest("/playback", PlaybackRoutes::routes())
        .nest("/health-check", HealthRoutes::routes())
        .nest("/proxy", ProxyRoutes::routes())
        .nest("/files", FileRoutes::routes());

    routes_api
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            mw_ctx_resolver,
        ))
        .with_state(app_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4();
                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    tracing::info!("{} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &Response<Body>, latency: Duration, _span: &Span| {
                    let status = response.status();
                    let latency_ms = latency.as_millis();

                    match status.as_u16() {
                        200..=299 => tracing::info!("{} ({}ms)", status, latency_ms),
                        400..=499 => tracing::warn!("⚠️ {} ({}ms)", status, latency_ms),
                        500..=599 => tracing::error!("❌ {} ({}ms)", status, latency_ms),
                        _ => tracing::info!("{} ({}ms)", status, latency_ms),
                    }
                }),
        )
        .layer(CorsLayer::very_permissive())
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "music_social_api_rust=debug,tower_http=info,info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::token_service::{test_auth_config, TokenService, TokenSubject},
        config::{DbConfig, PayosConfig, StorageConfig},
        models::user::{CreateUserRequest, Role},
        services::{storage_service::test_storage, user_service::UserService},
    };
    use axum::http::{header, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn test_state() -> AppState {
        let db = db_helpers::setup_test_db().await;
        let root = std::env::temp_dir().join(format!("music-social-router-{}", Uuid::new_v4()));
        let storage = test_storage(&root);
        let http = reqwest::Client::new();
        let auth = test_auth_config();
        let config = AppConfig {
            db: DbConfig {
                url: "mem://".to_string(),
                namespace: "test".to_string(),
                database: "test".to_string(),
                user: String::new(),
                password: String::new(),
            },
            auth,
            storage: StorageConfig {
                root_dir: root.to_string_lossy().into_owned(),
                public_url: "http://localhost:8080".to_string(),
                signing_key: "storage-test-key".to_string(),
            },
            payos: PayosConfig {
                client_id: "client".to_string(),
                api_key: "key".to_string(),
                checksum_key: "checksum".to_string(),
            },
            cohere_api_key: None,
            frontend_url: "http://localhost:3000".to_string(),
            bind_host: "127.0.0.1".to_string(),
            port: 8080,
        };

        AppState {
            db,
            config,
            storage,
            vectors: VectorService::new(http.clone(), None),
            http,
            started_at: Instant::now(),
        }
    }

    async fn user_token(state: &AppState) -> anyhow::Result<String> {
        let user = UserService::create_user(
            &state.db,
            CreateUserRequest {
                email: "listener@example.com".to_string(),
                username: "listener".to_string(),
                password: "password123".to_string(),
                name: None,
                phone: None,
                address: None,
                role: Some(Role::User),
            },
        )
        .await?;

        let token = TokenService::create_token(
            TokenSubject {
                user_id: user.id,
                email: user.email,
                role: "USER".to_string(),
                username: user.username,
            },
            &state.config.auth,
        )?;
        Ok(token)
    }

    #[tokio::test]
    async fn test_health_check_is_public() -> anyhow::Result<()> {
        let app = build_router(test_state().await);

        let res = app
            .oneshot(Request::get("/health-check").body(Body::empty())?)
            .await?;
        assert_eq!(res.status(), StatusCode::OK);

        let body = res.into_body().collect().await?.to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(json["status"], "ok");
        Ok(())
    }

    #[tokio::test]
    async fn test_profile_requires_token() -> anyhow::Result<()> {
        let app = build_router(test_state().await);

        let res = app
            .oneshot(Request::get("/auth/profile").body(Body::empty())?)
            .await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let body = res.into_body().collect().await?.to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(json["success"], false);
        assert_eq!(json["statusCode"], 401);
        Ok(())
    }

    #[tokio::test]
    async fn test_admin_routes_reject_regular_user() -> anyhow::Result<()> {
        let state = test_state().await;
        let token = user_token(&state).await?;
        let app = build_router(state);

        let res = app
            .clone()
            .oneshot(
                Request::get("/admin/dashboard/stats")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = app
            .oneshot(
                Request::get("/auth/profile")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(res.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn test_unsigned_file_links_are_forbidden() -> anyhow::Result<()> {
        let app = build_router(test_state().await);

        let res = app
            .oneshot(Request::get("/files/music/track.mp3").body(Body::empty())?)
            .await?;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        Ok(())
    }
}
