//! Share-submission branch of the gateway
//!
//! Parses the multipart body of a share-target POST, stores the file in
//! the bridge, and answers with a 303 redirect back to the main page.
//! Failure never escapes: a missing file or a parse/storage error turns
//! into the same redirect with an `error=` token.

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::response::Redirect;
use std::sync::Arc;

use super::{GatewayState, ERROR_NO_FILE, ERROR_PROCESSING, REDIRECT_AFTER_SHARE, SHARE_FIELD_NAME};

fn redirect_ok() -> Redirect {
    Redirect::to(REDIRECT_AFTER_SHARE)
}

fn redirect_error(token: &str) -> Redirect {
    Redirect::to(&format!("{}&error={}", REDIRECT_AFTER_SHARE, token))
}

/// POST /receive-audio, the share-target handler.
///
/// The multipart extractor is taken as a `Result` so even a malformed
/// request body resolves to our redirect instead of an axum rejection.
pub async fn receive_share(
    State(state): State<Arc<GatewayState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Redirect {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(e) => {
            log::warn!("Share: not a multipart submission: {}", e);
            return redirect_error(ERROR_PROCESSING);
        }
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => {
                log::warn!("Share: no \"{}\" field in submission", SHARE_FIELD_NAME);
                return redirect_error(ERROR_NO_FILE);
            }
            Err(e) => {
                log::warn!("Share: multipart parse failed: {}", e);
                return redirect_error(ERROR_PROCESSING);
            }
        };

        if field.name() != Some(SHARE_FIELD_NAME) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = match field.bytes().await {
            Ok(b) => b,
            Err(e) => {
                log::warn!("Share: failed to read file part: {}", e);
                return redirect_error(ERROR_PROCESSING);
            }
        };

        // The redirect goes out only after the bridge write is durable,
        // so a page load that sees shared=true will find the record.
        return match state.bridge.put(&filename, &content_type, &bytes) {
            Ok(()) => redirect_ok(),
            Err(e) => {
                log::error!("Share: bridge write failed: {}", e);
                redirect_error(ERROR_PROCESSING)
            }
        };
    }
}
