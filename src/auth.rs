use std::collections::HashMap;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::server::AppState;

/// Maps a bearer token to the id of the user it belongs to
pub trait Authenticator: Send + Sync {
    fn resolve(&self, token: &str) -> Option<String>;
}

/// Fixed token table loaded from configuration
pub struct StaticTokens {
    tokens: HashMap<String, String>,
}

impl StaticTokens {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }
}

impl Authenticator for StaticTokens {
    fn resolve(&self, token: &str) -> Option<String> {
        self.tokens.get(token).cloned()
    }
}

/// The authenticated caller; rejects the request with 401 when absent
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;

        match state.auth.resolve(token) {
            Some(user_id) => Ok(AuthUser { user_id }),
            None => {
                log::warn!("Rejected request to {} with unknown token", parts.uri.path());
                Err(AppError::Unauthorized)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/trades");
        if let Some(h) = header {
            builder = builder.header(AUTHORIZATION, h);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer   "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }

    #[test]
    fn test_static_tokens() {
        let auth = StaticTokens::new(HashMap::from([("abc".to_string(), "alice".to_string())]));
        assert_eq!(auth.resolve("abc").as_deref(), Some("alice"));
        assert_eq!(auth.resolve("nope"), None);
    }
}
