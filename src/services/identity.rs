// Caller identity resolution
// Tokens are issued by the external auth provider; this side only verifies them

use axum::http::{header, HeaderMap};
use axum_extra::extract::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use thiserror::Error;

use crate::{app_config::SecurityConfig, middleware::AuthenticatedUser, models::IdentityClaims};

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("No credentials presented")]
    Missing,

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Maps an inbound request to a stable user identifier
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, IdentityError>;
}

/// HS256 verifier for bearer tokens and the session cookie
pub struct JwtIdentityResolver {
    decoding_key: DecodingKey,
    validation: Validation,
    session_cookie_name: String,
}

impl JwtIdentityResolver {
    pub fn new(config: &SecurityConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0;
        match &config.jwt_audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &config.jwt_issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            session_cookie_name: config.session_cookie_name.clone(),
        }
    }

    /// Bearer header first, then the session cookie
    fn extract_token(&self, headers: &HeaderMap) -> Option<String> {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);

        bearer.or_else(|| {
            CookieJar::from_headers(headers)
                .get(&self.session_cookie_name)
                .map(|cookie| cookie.value().to_string())
                .filter(|v| !v.is_empty())
        })
    }

    pub fn verify(&self, token: &str) -> Result<IdentityClaims, IdentityError> {
        decode::<IdentityClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => IdentityError::Expired,
                _ => IdentityError::Invalid(e.to_string()),
            })
    }
}

impl IdentityResolver for JwtIdentityResolver {
    fn resolve(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, IdentityError> {
        let token = self.extract_token(headers).ok_or(IdentityError::Missing)?;
        let claims = self.verify(&token)?;
        if claims.sub.trim().is_empty() {
            return Err(IdentityError::Invalid("empty subject".to_string()));
        }
        Ok(AuthenticatedUser {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    const SECRET: &str = "test-secret-key-that-is-at-least-32-characters-long";

    fn security_config() -> SecurityConfig {
        SecurityConfig {
            jwt_secret: SECRET.to_string(),
            jwt_audience: None,
            jwt_issuer: None,
            session_cookie_name: "session-token".to_string(),
            cors_allowed_origins: vec![],
            cors_primary_origin: "http://localhost:3000".to_string(),
        }
    }

    fn token(sub: &str, exp_offset: i64) -> String {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64;
        let claims = IdentityClaims {
            sub: sub.to_string(),
            exp: (now + exp_offset) as u64,
            iat: Some(now as u64),
            email: Some("analyst@example.com".to_string()),
            aud: None,
            iss: None,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }

    #[test]
    fn test_bearer_token_resolves_user() {
        let resolver = JwtIdentityResolver::new(&security_config());
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token("user-42", 3600))).unwrap(),
        );

        let user = resolver.resolve(&headers).unwrap();
        assert_eq!(user.user_id, "user-42");
        assert_eq!(user.email.as_deref(), Some("analyst@example.com"));
    }

    #[test]
    fn test_session_cookie_is_fallback() {
        let resolver = JwtIdentityResolver::new(&security_config());
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; session-token={}", token("user-7", 3600)))
                .unwrap(),
        );
        assert_eq!(resolver.resolve(&headers).unwrap().user_id, "user-7");
    }

    #[test]
    fn test_missing_expired_and_forged_tokens() {
        let resolver = JwtIdentityResolver::new(&security_config());
        assert!(matches!(
            resolver.resolve(&HeaderMap::new()),
            Err(IdentityError::Missing)
        ));

        let mut expired = HeaderMap::new();
        expired.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token("user-1", -60))).unwrap(),
        );
        assert!(matches!(resolver.resolve(&expired), Err(IdentityError::Expired)));

        let mut forged = HeaderMap::new();
        forged.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer not.a.jwt"));
        assert!(matches!(resolver.resolve(&forged), Err(IdentityError::Invalid(_))));
    }

    #[test]
    fn test_audience_is_enforced_when_configured() {
        let mut config = security_config();
        config.jwt_audience = Some("threat-monitor".to_string());
        let resolver = JwtIdentityResolver::new(&config);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token("user-1", 3600))).unwrap(),
        );
        assert!(resolver.resolve(&headers).is_err());
    }
}
