use crate::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by access tokens from the hosted auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// The caller, as resolved by [`auth_middleware`].
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub fn verify_token(token: &str, secret: &str, audience: &str) -> Result<AuthUser, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[audience]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("Rejected access token: {}", e);
        ApiError::Unauthorized
    })?;

    let id = Uuid::parse_str(&token_data.claims.sub).map_err(|_| ApiError::Unauthorized)?;
    Ok(AuthUser {
        id,
        email: token_data.claims.email,
    })
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(req.headers()).ok_or(ApiError::Unauthorized)?;
    let user = verify_token(token, &state.config.jwt_secret, &state.config.jwt_audience)?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[cfg(test)]
pub fn issue_test_token(user_id: Uuid, secret: &str, exp_offset_secs: i64) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now().timestamp() + exp_offset_secs) as usize,
        aud: Some("authenticated".to_string()),
        email: Some("trader@example.com".to_string()),
        role: Some("authenticated".to_string()),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn valid_token_resolves_user() {
        let id = Uuid::new_v4();
        let token = issue_test_token(id, "secret123", 3600);
        let user = verify_token(&token, "secret123", "authenticated").unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email.as_deref(), Some("trader@example.com"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_test_token(Uuid::new_v4(), "secret123", 3600);
        assert!(matches!(
            verify_token(&token, "another-secret", "authenticated"),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_test_token(Uuid::new_v4(), "secret123", -3600);
        assert!(verify_token(&token, "secret123", "authenticated").is_err());
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let token = issue_test_token(Uuid::new_v4(), "secret123", 3600);
        assert!(verify_token(&token, "secret123", "service_role").is_err());
    }

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer_token(&headers), Some("abc.def"));
    }
}
