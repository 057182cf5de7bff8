use axum::{
    body::Body,
    extract::State,
    http::{
        header::{self, HeaderValue},
        Method, Request, Response, StatusCode,
    },
    middleware::Next,
};
use tracing::debug;

use crate::{app::AppState, app_config::SecurityConfig};

const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "authorization, content-type, x-requested-with, accept, origin";
const MAX_AGE_SECS: &str = "86400";

/// Reflect the request origin when it is allow-listed, otherwise answer with
/// the primary origin
pub fn select_allowed_origin(config: &SecurityConfig, origin: Option<&str>) -> String {
    match origin {
        Some(origin) if config.cors_allowed_origins.iter().any(|o| o == origin) => {
            debug!("CORS: Origin allowed from whitelist: {}", origin);
            origin.to_string()
        },
        Some(origin) => {
            debug!("CORS: Origin not in whitelist: {}", origin);
            config.cors_primary_origin.clone()
        },
        None => config.cors_primary_origin.clone(),
    }
}

fn apply_cors_headers(response: &mut Response<Body>, allowed_origin: &str) {
    let headers = response.headers_mut();
    match HeaderValue::from_str(allowed_origin) {
        Ok(value) => {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        },
        Err(e) => {
            tracing::warn!(origin = allowed_origin, error = %e, "CORS origin is not a valid header value");
            return;
        },
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.append(header::VARY, HeaderValue::from_static("Origin"));
}

/// CORS for every response; OPTIONS preflights are answered here with 204
pub async fn dynamic_cors_middleware(
    State(app_state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let allowed_origin = select_allowed_origin(&app_state.config.security, origin.as_deref());

    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(&mut response, &allowed_origin);

        let headers = response.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(MAX_AGE_SECS),
        );
        return response;
    }

    let mut response = next.run(req).await;
    apply_cors_headers(&mut response, &allowed_origin);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SecurityConfig {
        SecurityConfig {
            jwt_secret: "x".repeat(32),
            jwt_audience: None,
            jwt_issuer: None,
            session_cookie_name: "session-token".to_string(),
            cors_allowed_origins: vec![
                "https://app.example.com".to_string(),
                "http://localhost:3000".to_string(),
            ],
            cors_primary_origin: "https://app.example.com".to_string(),
        }
    }

    #[test]
    fn test_allow_listed_origin_is_reflected() {
        assert_eq!(
            select_allowed_origin(&config(), Some("http://localhost:3000")),
            "http://localhost:3000"
        );
    }

    #[test]
    fn test_unknown_or_missing_origin_gets_primary() {
        assert_eq!(
            select_allowed_origin(&config(), Some("https://evil.example")),
            "https://app.example.com"
        );
        assert_eq!(select_allowed_origin(&config(), None), "https://app.example.com");
    }
}
