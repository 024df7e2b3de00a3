//! Asset-serving branch of the gateway
//!
//! Cache-first with upstream fallback: a hit is served straight from
//! the app-shell bucket; a miss is fetched from the configured upstream
//! origin and, when it answers 200, opportunistically cached. Requests
//! to the transcription API never pass through here, so the cache can't
//! shadow it.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use super::GatewayState;
use crate::intake::QueryFlags;

/// Fallback GET handler for same-origin static assets.
pub async fn serve_asset(State(state): State<Arc<GatewayState>>, request: Request) -> Response {
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or("");

    // Page loads carrying share flags are phase two of the share
    // protocol: forward them to the session loop as a message.
    let flags = QueryFlags::parse(query);
    if !flags.is_empty() {
        if let Some(tx) = &state.intake_tx {
            if tx.send(flags.clone()).is_err() {
                log::warn!("Shell: session loop gone, intake flags dropped");
            }
        }
    }

    if let Some(asset) = state.assets.get(&path) {
        log::debug!("Shell: cache hit for {}", path);
        return asset_response(&asset.content_type, asset.body);
    }

    let Some(upstream) = &state.upstream else {
        return (StatusCode::NOT_FOUND, "not cached and no upstream").into_response();
    };

    match fetch_upstream(&state.http, upstream, &path).await {
        Ok(Some((content_type, body))) => {
            // Opportunistic population, same as the install seed.
            if let Err(e) = state.assets.put(&path, &content_type, &body) {
                log::warn!("Shell: failed to cache {}: {}", path, e);
            }
            asset_response(&content_type, body)
        }
        Ok(None) => (StatusCode::NOT_FOUND, "upstream miss").into_response(),
        Err(e) => {
            log::error!("Shell: upstream fetch for {} failed: {}", path, e);
            (StatusCode::BAD_GATEWAY, "upstream fetch failed").into_response()
        }
    }
}

fn asset_response(content_type: &str, body: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type.to_string())],
        body,
    )
        .into_response()
}

/// GET `upstream`/`path`. `Ok(None)` means the upstream answered but
/// not with a cacheable 200.
pub async fn fetch_upstream(
    http: &reqwest::Client,
    upstream: &str,
    path: &str,
) -> Result<Option<(String, Vec<u8>)>, reqwest::Error> {
    let url = format!("{}{}", upstream.trim_end_matches('/'), path);
    let response = http.get(&url).send().await?;

    if response.status() != reqwest::StatusCode::OK {
        log::debug!("Shell: upstream {} answered {}", url, response.status());
        return Ok(None);
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let body = response.bytes().await?.to_vec();
    Ok(Some((content_type, body)))
}
