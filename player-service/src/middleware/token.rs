//! Bearer token claims and extraction

use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID or client ID)
    pub sub: String,

    /// Roles
    #[serde(default)]
    pub roles: Vec<String>,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Issuer (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audience (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

impl Claims {
    /// Check if the token has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Turns a raw token into verified claims
pub trait TokenValidator: Send + Sync + Clone {
    /// Validate a token and extract claims
    fn validate_token(&self, token: &str) -> Result<Claims, Error>;
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn extract_token(headers: &HeaderMap) -> Result<String, Error> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Unauthorized("Missing Authorization header".to_string()))?;

    match auth_header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim().to_string())
        }
        _ => Err(Error::Unauthorized(
            "Invalid Authorization header format".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_claims_role_check() {
        let claims = Claims {
            sub: "user:123".to_string(),
            roles: vec!["admin".to_string(), "user".to_string()],
            exp: 0,
            iat: None,
            iss: None,
            aud: None,
        };

        assert!(claims.has_role("admin"));
        assert!(claims.has_role("user"));
        assert!(!claims.has_role("super_admin"));
    }

    #[test]
    fn test_roles_default_to_empty() {
        let claims: Claims = serde_json::from_str(r#"{"sub": "user:1", "exp": 10}"#).unwrap();
        assert!(claims.roles.is_empty());
        assert!(!claims.has_role("user"));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(extract_token(&headers("bearer abc")).unwrap(), "abc");
    }

    #[test]
    fn test_extract_rejects_other_schemes() {
        assert!(matches!(
            extract_token(&headers("Basic dXNlcjpwYXNz")),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            extract_token(&headers("Bearer ")),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            extract_token(&HeaderMap::new()),
            Err(Error::Unauthorized(_))
        ));
    }
}
