use axum::{extract::State, http::HeaderMap, Json};
use chrono::{SecondsFormat, Utc};

use crate::{
    models::system::{ClientHeaders, HealthStatus, Pong},
    AppState,
};

pub struct HealthController;

impl HealthController {
    pub async fn check(State(state): State<AppState>, headers: HeaderMap) -> Json<HealthStatus> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let client = ClientHeaders {
            app_version: header("x-app-version"),
            platform: header("x-platform"),
        };
        tracing::debug!(
            "Health check from app version {:?} on {:?}",
            client.app_version,
            client.platform
        );

        Json(HealthStatus {
            status: "ok",
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            uptime: state.started_at.elapsed().as_secs_f64(),
            message: "API server is running correctly",
            headers: client,
        })
    }

    pub async fn ping() -> Json<Pong> {
        Json(Pong {
            pong: true,
            timestamp: Utc::now().timestamp_millis(),
        })
    }
}
