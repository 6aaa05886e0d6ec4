use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use futures::TryStreamExt;

use crate::{error::Error, models::system::ProxyQuery, AppState, Result};

pub struct ProxyController;

impl ProxyController {
    /// Streams a stored audio object, honouring `Range` for seeking.
    pub async fn audio(
        State(state): State<AppState>,
        Path(song_id): Path<String>,
        Query(query): Query<ProxyQuery>,
        headers: HeaderMap,
    ) -> Result<Response> {
        let url = query
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| Error::InvalidInput {
                reason: "URL parameter is required".to_string(),
            })?;
        if !state.storage.is_managed(&url) {
            return Err(Error::Forbidden {
                reason: "Only stored media can be proxied".to_string(),
            });
        }
        tracing::debug!("Proxying audio for song {}", song_id);

        let mut upstream_req = state.http.get(state.storage.signed_url(&url)?);
        let range = headers.get(header::RANGE).cloned();
        if let Some(range) = &range {
            upstream_req = upstream_req.header(header::RANGE, range.clone());
        }
        let user_agent = headers
            .get(header::USER_AGENT)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("Proxy Service"));
        let upstream = upstream_req
            .header(header::USER_AGENT, user_agent)
            .send()
            .await?
            .error_for_status()?;

        let upstream_headers = upstream.headers().clone();
        let partial = range.is_some() && upstream_headers.contains_key(header::CONTENT_RANGE);
        let stream = upstream
            .bytes_stream()
            .inspect_err(|e| tracing::warn!("Audio proxy stream error: {:?}", e));

        let mut response = Response::new(Body::from_stream(stream));
        *response.status_mut() = if partial {
            StatusCode::PARTIAL_CONTENT
        } else {
            StatusCode::OK
        };

        let out = response.headers_mut();
        out.insert(
            header::CONTENT_TYPE,
            upstream_headers
                .get(header::CONTENT_TYPE)
                .cloned()
                .unwrap_or_else(|| HeaderValue::from_static("audio/mpeg")),
        );
        if let Some(len) = upstream_headers.get(header::CONTENT_LENGTH) {
            out.insert(header::CONTENT_LENGTH, len.clone());
        }
        if partial {
            if let Some(content_range) = upstream_headers.get(header::CONTENT_RANGE) {
                out.insert(header::CONTENT_RANGE, content_range.clone());
            }
        }
        out.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        out.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=3600"),
        );

        Ok(response)
    }
}
