//! Request timing middleware.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::{Duration, Instant};

/// Requests slower than this are logged at warn. Automated moves wait on
/// engines and models, so the bound is generous.
pub const SLOW_REQUEST: Duration = Duration::from_secs(2);

/// Session id addressed by a `/api/sessions/:id/...` path.
fn session_of(path: &str) -> Option<&str> {
    path.strip_prefix("/api/sessions/")?
        .split('/')
        .next()
        .filter(|id| !id.is_empty())
}

/// Logs method, path, status and duration of every request.
///
/// ```ignore
/// let app = Router::new()
///     .route("/api/sessions", get(list_sessions))
///     .layer(axum::middleware::from_fn(timing_layer));
/// ```
pub async fn timing_layer(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    let session_id = session_of(&path).unwrap_or("-");

    if elapsed > SLOW_REQUEST {
        tracing::warn!(
            %method,
            %path,
            session_id,
            status,
            duration_ms = elapsed.as_millis(),
            "slow request"
        );
    } else {
        tracing::debug!(
            %method,
            %path,
            session_id,
            status,
            duration_ms = elapsed.as_millis(),
            "request completed"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    #[test]
    fn test_session_of_path() {
        assert_eq!(session_of("/api/sessions/abc/moves"), Some("abc"));
        assert_eq!(session_of("/api/sessions/abc"), Some("abc"));
        assert_eq!(session_of("/api/sessions/"), None);
        assert_eq!(session_of("/health"), None);
    }

    #[tokio::test]
    async fn test_timing_layer_passes_response_through() {
        let app: Router = Router::new()
            .route("/api/sessions/:id", get(|| async { "snapshot" }))
            .layer(middleware::from_fn(timing_layer));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/sessions/abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"snapshot");
    }

    #[tokio::test]
    async fn test_timing_layer_keeps_error_status() {
        let app: Router = Router::new()
            .route("/health", get(|| async { "ok" }))
            .layer(middleware::from_fn(timing_layer));

        let response = app
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
