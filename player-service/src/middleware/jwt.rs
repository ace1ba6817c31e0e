//! JWT authentication middleware

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::{fs, sync::Arc};

use super::token::{extract_token, Claims, TokenValidator};
use crate::{config::JwtConfig, error::Error};

/// JWT authentication middleware state
///
/// Verifies the bearer token and requires the configured role. The verified
/// [`Claims`] are inserted into the request extensions.
#[derive(Clone)]
pub struct JwtAuth {
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
    required_role: Arc<str>,
}

impl JwtAuth {
    /// Create the middleware, reading the key from `config.key_path`
    pub fn new(config: &JwtConfig) -> Result<Self, Error> {
        let key = fs::read(&config.key_path).map_err(|e| {
            let path_display = config.key_path.display().to_string();
            Error::Config(Box::new(figment::Error::from(format!(
                "Failed to read JWT key from path '{}'\n\n\
                Troubleshooting:\n\
                1. Verify the file exists: ls -la {}\n\
                2. Check file permissions (must be readable)\n\
                3. For RS*/ES*: use a PEM format public key\n\
                4. For HS*: use the raw shared secret\n\n\
                Error: {}",
                path_display, path_display, e
            ))))
        })?;
        Self::from_key(config, &key)
    }

    /// Create the middleware from key material already in memory
    pub fn from_key(config: &JwtConfig, key: &[u8]) -> Result<Self, Error> {
        let algorithm = parse_algorithm(&config.algorithm)?;

        let decoding_key = match algorithm {
            Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512 => DecodingKey::from_rsa_pem(key)?,
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(key)?,
            _ => DecodingKey::from_secret(key),
        };

        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Ok(Self {
            decoding_key: Arc::new(decoding_key),
            validation,
            required_role: Arc::from(config.required_role.as_str()),
        })
    }

    /// Middleware function to validate the JWT and inject claims
    pub async fn middleware(
        State(auth): State<Self>,
        mut request: Request<Body>,
        next: Next,
    ) -> Result<Response, Error> {
        let token = extract_token(request.headers())?;
        let claims = auth.validate_token(&token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            e
        })?;

        if !claims.has_role(&auth.required_role) {
            tracing::debug!(sub = %claims.sub, role = %auth.required_role, "Missing required role");
            return Err(Error::Forbidden(format!(
                "Role '{}' required",
                auth.required_role
            )));
        }

        request.extensions_mut().insert(claims);
        Ok(next.run(request).await)
    }
}

impl TokenValidator for JwtAuth {
    fn validate_token(&self, token: &str) -> Result<Claims, Error> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}

fn parse_algorithm(name: &str) -> Result<Algorithm, Error> {
    Ok(match name.to_uppercase().as_str() {
        "RS256" => Algorithm::RS256,
        "RS384" => Algorithm::RS384,
        "RS512" => Algorithm::RS512,
        "ES256" => Algorithm::ES256,
        "ES384" => Algorithm::ES384,
        "HS256" => Algorithm::HS256,
        "HS384" => Algorithm::HS384,
        "HS512" => Algorithm::HS512,
        alg => {
            return Err(Error::Config(Box::new(figment::Error::from(format!(
                "Unsupported JWT algorithm: {}",
                alg
            )))))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &[u8] = b"test-secret";

    fn token(roles: &[&str], exp_offset: i64) -> String {
        let claims = Claims {
            sub: "user:1".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: chrono::Utc::now().timestamp() + exp_offset,
            iat: None,
            iss: None,
            aud: None,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    #[test]
    fn test_valid_token() {
        let auth = JwtAuth::from_key(&JwtConfig::default(), SECRET).unwrap();
        let claims = auth.validate_token(&token(&["user"], 600)).unwrap();
        assert_eq!(claims.sub, "user:1");
        assert!(claims.has_role("user"));
    }

    #[test]
    fn test_expired_and_foreign_tokens_are_rejected() {
        let auth = JwtAuth::from_key(&JwtConfig::default(), SECRET).unwrap();
        assert!(matches!(
            auth.validate_token(&token(&["user"], -3600)),
            Err(Error::Jwt(_))
        ));

        let other = JwtAuth::from_key(&JwtConfig::default(), b"other-secret").unwrap();
        assert!(other.validate_token(&token(&["user"], 600)).is_err());
    }

    #[test]
    fn test_issuer_is_enforced_when_configured() {
        let config = JwtConfig {
            issuer: Some("player-service".into()),
            ..JwtConfig::default()
        };
        let auth = JwtAuth::from_key(&config, SECRET).unwrap();
        assert!(auth.validate_token(&token(&["user"], 600)).is_err());
    }

    #[test]
    fn test_unknown_algorithm() {
        let config = JwtConfig {
            algorithm: "none".into(),
            ..JwtConfig::default()
        };
        assert!(matches!(
            JwtAuth::from_key(&config, SECRET),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_missing_key_file() {
        let config = JwtConfig {
            key_path: "/nonexistent/jwt-secret".into(),
            ..JwtConfig::default()
        };
        assert!(matches!(JwtAuth::new(&config), Err(Error::Config(_))));
    }
}
