use crate::auth::{AuthError, AuthResult};

/// Token lifetime when `LMS_TOKEN_TTL_SECS` is not set: one day, with no
/// refresh mechanism.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Authentication configuration loaded from environment variables once at
/// startup and passed explicitly to the services that need it.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
}

impl AuthConfig {
    pub fn from_env() -> AuthResult<Self> {
        let jwt_secret = std::env::var("LMS_JWT_SECRET")
            .map_err(|_| AuthError::Config("LMS_JWT_SECRET is required".into()))?;
        if jwt_secret.is_empty() {
            return Err(AuthError::Config("LMS_JWT_SECRET must not be empty".into()));
        }

        let token_ttl_secs = std::env::var("LMS_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS);

        Ok(Self {
            jwt_secret,
            token_ttl_secs,
        })
    }
}
