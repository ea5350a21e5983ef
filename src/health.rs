//! Liveness endpoint for hosting platforms that probe an HTTP port.

use std::net::{Ipv4Addr, SocketAddr};

use axum::Router;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::info;

/// Port used when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 10000;

const ALIVE_BODY: &str = "Bot is running";

/// Router answering `GET /` and `GET /health`.
pub fn router() -> Router {
    Router::new()
        .route("/", get(alive))
        .route("/health", get(alive))
}

async fn alive() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], ALIVE_BODY)
}

/// Serves [`router`] on all interfaces until the process exits.
///
/// # Errors
///
/// Returns the I/O error if the port cannot be bound or the server fails.
pub async fn serve(port: u16) -> std::io::Result<()> {
    let address = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = TcpListener::bind(address).await?;
    info!(%address, "liveness endpoint listening");
    axum::serve(listener, router()).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn get_path(path: &str) -> (StatusCode, String, String) {
        let response = router()
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_root_and_health_report_alive() {
        for path in ["/", "/health"] {
            let (status, content_type, body) = get_path(path).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(content_type, "text/plain");
            assert_eq!(body, "Bot is running");
        }
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let (status, _, _) = get_path("/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
