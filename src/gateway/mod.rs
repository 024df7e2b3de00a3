//! Share gateway
//!
//! The HTTP interception surface of the app: receives share-target
//! submissions, serves static assets cache-first, and runs the
//! install/activate lifecycle (asset-cache seeding, stale-bucket
//! sweep). Every share submission resolves to a concrete redirect, no
//! matter what went wrong inside.

pub mod share;
pub mod shell;

use axum::routing::{get, post};
use axum::{serve, Router};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;

use crate::cache::{
    sweep_stale_buckets, AssetCache, SharedFileBridge, APP_SHELL_BUCKET, SHARED_FILES_BUCKET,
};
use crate::intake::QueryFlags;
use crate::paths;

/// Share submission endpoint, with the trailing-slash variant some
/// share sheets produce.
pub const SHARE_ACTION_PATH: &str = "/receive-audio";
pub const SHARE_ACTION_PATH_SLASH: &str = "/receive-audio/";

/// Multipart field the shared file arrives under.
pub const SHARE_FIELD_NAME: &str = "shared_audio_file";

/// Where the share branch always redirects back to.
pub const REDIRECT_AFTER_SHARE: &str = "/index.html?shared=true";

/// Error tokens appended to the redirect on failure.
pub const ERROR_NO_FILE: &str = "share_failed_no_file";
pub const ERROR_PROCESSING: &str = "share_processing_failed";

/// Assets pre-seeded into the app-shell cache on install. Best-effort;
/// a miss on one must not abort install.
pub const APP_SHELL_SEED: &[&str] = &[
    "/",
    "/index.html",
    "/style.css",
    "/app.js",
    "/manifest.json",
    "/icon-192x192.png",
    "/icon-512x512.png",
];

/// Shared state behind the gateway handlers.
pub struct GatewayState {
    pub bridge: SharedFileBridge,
    pub assets: AssetCache,
    /// Origin the asset branch falls back to on cache miss. Without
    /// one, misses are plain 404s.
    pub upstream: Option<String>,
    pub http: reqwest::Client,
    /// Phase-two trigger: query flags seen on page loads are forwarded
    /// to the session loop as intake messages.
    pub intake_tx: Option<mpsc::UnboundedSender<QueryFlags>>,
}

pub struct Gateway {
    state: Arc<GatewayState>,
    cache_root: PathBuf,
    addr: SocketAddr,
}

impl Gateway {
    pub fn new(
        cache_root: PathBuf,
        upstream: Option<String>,
        addr: SocketAddr,
        intake_tx: Option<mpsc::UnboundedSender<QueryFlags>>,
    ) -> Self {
        let state = GatewayState {
            bridge: SharedFileBridge::new(paths::bucket_dir(&cache_root, SHARED_FILES_BUCKET)),
            assets: AssetCache::new(paths::bucket_dir(&cache_root, APP_SHELL_BUCKET)),
            upstream,
            http: reqwest::Client::new(),
            intake_tx,
        };
        Self {
            state: Arc::new(state),
            cache_root,
            addr,
        }
    }

    /// Install: best-effort pre-seeding of the app-shell cache from the
    /// upstream origin. Individual failures are logged and skipped.
    pub async fn install(&self) {
        let Some(upstream) = self.state.upstream.clone() else {
            log::info!("Gateway: no upstream configured, skipping app-shell seed");
            return;
        };

        for path in APP_SHELL_SEED {
            if self.state.assets.contains(path) {
                continue;
            }
            match shell::fetch_upstream(&self.state.http, &upstream, path).await {
                Ok(Some((content_type, body))) => {
                    if let Err(e) = self.state.assets.put(path, &content_type, &body) {
                        log::warn!("Gateway: failed to cache seed asset {}: {}", path, e);
                    }
                }
                Ok(None) => {
                    log::warn!("Gateway: seed asset {} not available upstream", path);
                }
                Err(e) => {
                    log::warn!("Gateway: seed fetch for {} failed: {}", path, e);
                }
            }
        }
        log::info!("Gateway: install complete");
    }

    /// Activate: sweep cache buckets from older versions, keeping the
    /// current app-shell bucket and the shared-files bridge.
    pub fn activate(&self) {
        match sweep_stale_buckets(&self.cache_root, &[APP_SHELL_BUCKET, SHARED_FILES_BUCKET]) {
            Ok(0) => {}
            Ok(n) => log::info!("Gateway: swept {} stale cache bucket(s)", n),
            Err(e) => log::warn!("Gateway: bucket sweep failed: {}", e),
        }
        log::info!("Gateway: ready");
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(SHARE_ACTION_PATH, post(share::receive_share))
            .route(SHARE_ACTION_PATH_SLASH, post(share::receive_share))
            .fallback(get(shell::serve_asset))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Run install + activate, then serve until the listener dies.
    pub async fn start(self) -> Result<(), std::io::Error> {
        self.install().await;
        self.activate();

        let app = self.router();
        log::info!("Gateway: listening on {}", self.addr);
        serve(TcpListener::bind(self.addr).await?, app.into_make_service()).await
    }
}
