use axum::{
    extract::Request,
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::SessionKey;

/// Session cookie settings
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub cookie_name: String,
    pub idle_timeout: Duration,
}

impl SessionSettings {
    pub fn new(cookie_name: impl Into<String>, idle_timeout: Duration) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            idle_timeout,
        }
    }

    /// `Set-Cookie` value issuing `key`
    pub fn set_cookie_value(&self, key: &SessionKey) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.cookie_name,
            key,
            self.idle_timeout.as_secs()
        )
    }
}

/// Resolve the session key for a request, issuing a new cookie when the client has
/// none or sent an invalid one. The key is placed in request extensions.
pub async fn session_middleware(
    settings: Arc<SessionSettings>,
    mut request: Request,
    next: Next,
) -> Response {
    let (key, issued) = match session_key_from_cookies(request.headers(), &settings.cookie_name) {
        Some(key) => (key, false),
        None => (SessionKey::generate(), true),
    };

    request.extensions_mut().insert(key.clone());
    let mut response = next.run(request).await;

    if issued {
        debug!(session_key = %key, "Issued new session");
        match HeaderValue::from_str(&settings.set_cookie_value(&key)) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "Failed to build session cookie"),
        }
    }

    response
}

/// Find a valid session key among the request's cookies
pub fn session_key_from_cookies(headers: &HeaderMap, cookie_name: &str) -> Option<SessionKey> {
    let raw = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim())?;

    match SessionKey::parse(raw) {
        Ok(key) => Some(key),
        Err(e) => {
            debug!(error = %e, "Ignoring invalid session cookie");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        middleware,
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    async fn echo_key(Extension(key): Extension<SessionKey>) -> String {
        key.to_string()
    }

    fn app() -> Router {
        let settings = Arc::new(SessionSettings::new("sessioncart_id", Duration::from_secs(600)));
        Router::new()
            .route("/whoami", get(echo_key))
            .layer(middleware::from_fn(move |req, next| {
                session_middleware(settings.clone(), req, next)
            }))
    }

    async fn body_string(response: Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[test]
    fn test_set_cookie_value() {
        let settings = SessionSettings::new("sid", Duration::from_secs(600));
        let key = SessionKey::parse("abc123").unwrap();

        assert_eq!(
            settings.set_cookie_value(&key),
            "sid=abc123; Path=/; HttpOnly; SameSite=Lax; Max-Age=600"
        );
    }

    #[test]
    fn test_session_key_from_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; sessioncart_id=S1; other=x"),
        );

        let key = session_key_from_cookies(&headers, "sessioncart_id").unwrap();
        assert_eq!(key.as_str(), "S1");
        assert!(session_key_from_cookies(&headers, "missing").is_none());
    }

    #[test]
    fn test_invalid_cookie_value_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("sessioncart_id=bad%20key"));

        assert!(session_key_from_cookies(&headers, "sessioncart_id").is_none());
    }

    #[tokio::test]
    async fn test_new_session_is_issued_cookie() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/whoami")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let key = body_string(response).await;

        assert!(cookie.starts_with(&format!("sessioncart_id={};", key)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.ends_with("Max-Age=600"));
    }

    #[tokio::test]
    async fn test_existing_session_is_reused() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/whoami")
            .header(COOKIE, "sessioncart_id=S1")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert!(response.headers().get(SET_COOKIE).is_none());
        assert_eq!(body_string(response).await, "S1");
    }
}
