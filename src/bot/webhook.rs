use std::collections::HashMap;

use axum::{extract::Query, http::StatusCode, routing::get, Router};
use log::{info, warn};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Unsupported hub mode: {0:?}")]
    InvalidMode(Option<String>),

    #[error("Verify token mismatch")]
    TokenMismatch,

    #[error("Missing challenge")]
    MissingChallenge,
}

/// 订阅握手：mode 必须是 "subscribe" 且 token 与配置一致，返回 challenge 原文
pub fn verify_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    expected_token: &str,
) -> Result<String, VerificationError> {
    if mode != Some("subscribe") {
        return Err(VerificationError::InvalidMode(mode.map(str::to_string)));
    }
    if expected_token.is_empty() || token != Some(expected_token) {
        return Err(VerificationError::TokenMismatch);
    }
    challenge
        .map(str::to_string)
        .ok_or(VerificationError::MissingChallenge)
}

fn query_param<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params
        .get(&format!("hub.{name}"))
        .or_else(|| params.get(name))
        .map(String::as_str)
}

/// GET 握手的响应：成功时原样返回 challenge，否则 403
pub fn handshake_response(
    params: &HashMap<String, String>,
    expected_token: &str,
) -> (StatusCode, String) {
    match verify_subscription(
        query_param(params, "mode"),
        query_param(params, "verify_token"),
        query_param(params, "challenge"),
        expected_token,
    ) {
        Ok(challenge) => {
            info!("✅ Webhook subscription verified");
            (StatusCode::OK, challenge)
        }
        Err(e) => {
            warn!("Webhook verification rejected: {e}");
            (StatusCode::FORBIDDEN, e.to_string())
        }
    }
}

/// Adds the GET handshake next to the update route on `path`.
pub fn with_handshake_route(router: Router, path: &str, expected_token: String) -> Router {
    router.route(
        path,
        get(move |Query(params): Query<HashMap<String, String>>| {
            let expected = expected_token.clone();
            async move { handshake_response(&params, &expected) }
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, HttpBody};
    use axum::http::Request;
    use axum::routing::post;
    use tower::ServiceExt;

    fn router() -> Router {
        let updates = Router::new().route("/telegram", post(|| async { StatusCode::OK }));
        with_handshake_route(updates, "/telegram", "s3cret".to_string())
    }

    async fn get_status_and_body(uri: &str) -> (StatusCode, String) {
        let response = router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let mut body = response.into_body();
        let mut text = String::new();
        while let Some(chunk) = body.data().await {
            text.push_str(&String::from_utf8_lossy(&chunk.unwrap()));
        }
        (status, text)
    }

    #[tokio::test]
    async fn test_handshake_route_echoes_challenge() {
        let (status, body) = get_status_and_body(
            "/telegram?hub.mode=subscribe&hub.verify_token=s3cret&hub.challenge=1158201444",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "1158201444");

        let (status, body) =
            get_status_and_body("/telegram?mode=subscribe&verify_token=s3cret&challenge=42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "42");
    }

    #[tokio::test]
    async fn test_handshake_route_rejects_bad_token() {
        let (status, _) = get_status_and_body(
            "/telegram?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=1",
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = get_status_and_body("/telegram").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_update_route_still_accepts_posts() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/telegram")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_successful_handshake_echoes_challenge() {
        let result = verify_subscription(Some("subscribe"), Some("s3cret"), Some("1158201444"), "s3cret");
        assert_eq!(result, Ok("1158201444".to_string()));
    }

    #[test]
    fn test_rejected_handshakes() {
        assert_eq!(
            verify_subscription(Some("unsubscribe"), Some("s3cret"), Some("1"), "s3cret"),
            Err(VerificationError::InvalidMode(Some("unsubscribe".to_string())))
        );
        assert_eq!(
            verify_subscription(None, Some("s3cret"), Some("1"), "s3cret"),
            Err(VerificationError::InvalidMode(None))
        );
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("wrong"), Some("1"), "s3cret"),
            Err(VerificationError::TokenMismatch)
        );
        assert_eq!(
            verify_subscription(Some("subscribe"), Some(""), Some("1"), ""),
            Err(VerificationError::TokenMismatch)
        );
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("s3cret"), None, "s3cret"),
            Err(VerificationError::MissingChallenge)
        );
    }
}
