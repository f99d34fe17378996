//! HTTP route definitions.

mod health;
mod sync;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new().merge(health::routes()).merge(sync::routes())
}

#[cfg(test)]
mod tests {
    use crate::config::{Config, DEFAULT_PULL_LIMIT};
    use crate::{app, db, AppState};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(auth_secret: Option<&str>) -> AppState {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: "postgres://127.0.0.1:1/fieldsync_test".to_string(),
            auth_secret: auth_secret.map(str::to_string),
            pull_default_limit: DEFAULT_PULL_LIMIT,
            max_connections: 1,
        };
        AppState {
            pool: db::lazy_pool(&config.database_url).unwrap(),
            config: Arc::new(config),
        }
    }

    fn push_request(authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/sync/push")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder
            .body(Body::from(r#"{"deviceId":"d-1","records":[]}"#))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_unreachable_database() {
        let response = app(state(None))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["database"], "unavailable");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn root_names_the_service() {
        let response = app(state(None))
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"fieldsync Sync Server");
    }

    #[tokio::test]
    async fn push_without_token_is_unauthorized() {
        let response = app(state(Some("s3cret")))
            .oneshot(push_request(None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["details"], "Missing authorization header");
    }

    #[tokio::test]
    async fn push_with_wrong_scheme_is_unauthorized() {
        let response = app(state(Some("s3cret")))
            .oneshot(push_request(Some("Basic s3cret")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["details"], "Invalid authorization header format");
    }

    #[tokio::test]
    async fn push_with_wrong_token_is_unauthorized() {
        let response = app(state(Some("s3cret")))
            .oneshot(push_request(Some("Bearer guess")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn pull_rejects_malformed_checkpoint() {
        let response = app(state(None))
            .oneshot(
                Request::get("/sync/pull?since=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid checkpoint: abc");
    }
}
