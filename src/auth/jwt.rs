use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use jsonwebtoken::errors::ErrorKind;

use crate::auth::{AuthConfig, AuthError, AuthResult};

/// Claim set carried by every bearer token: subject id, username, role,
/// and the issue/expiry instants. Nothing else is trusted from the client.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub username: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct SignedAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Stateless token issue/verify against a process-held HS256 secret. There
/// is no refresh mechanism and no server-side revocation: a token is valid
/// until its absolute expiry.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
}

impl JwtService {
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        let secret_bytes = config.jwt_secret.as_bytes();
        let encoding_key = EncodingKey::from_secret(secret_bytes);
        let decoding_key = DecodingKey::from_secret(secret_bytes);

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is an absolute bound; a token aged exactly one day is out.
        validation.leeway = 0;

        Ok(Self {
            encoding_key,
            decoding_key,
            validation,
            token_ttl: Duration::seconds(config.token_ttl_secs),
        })
    }

    pub fn issue_access_token(
        &self,
        user_id: i32,
        username: &str,
        role: &str,
    ) -> AuthResult<SignedAccessToken> {
        let now = Utc::now();
        let expires_at = now + self.token_ttl;

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            username: username.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(SignedAccessToken { token, expires_at })
    }

    /// Check signature and expiry, returning the decoded claims. Any
    /// failure means the token is not trusted at all.
    pub fn decode_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthConfig;

    const TEST_JWT_SECRET: &str = "super-secret-test-key";

    fn make_service(token_ttl_secs: i64) -> JwtService {
        let config = AuthConfig {
            jwt_secret: TEST_JWT_SECRET.into(),
            token_ttl_secs,
        };
        JwtService::from_config(&config).expect("jwt service")
    }

    #[test]
    fn issues_and_decodes_access_tokens() {
        let service = make_service(24 * 60 * 60);

        let token = service
            .issue_access_token(42, "al", "student")
            .expect("issue token");

        let claims = service
            .decode_access_token(&token.token)
            .expect("decode token");

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.username, "al");
        assert_eq!(claims.role, "student");
        assert!(claims.exp > claims.iat);
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn rejects_expired_tokens() {
        let service = make_service(-60);
        let token = service
            .issue_access_token(7, "al", "student")
            .expect("issue token");

        match service.decode_access_token(&token.token) {
            Err(AuthError::TokenExpired) => {}
            other => panic!("expected TokenExpired, got {other:?}"),
        }
    }

    #[test]
    fn rejects_tokens_signed_with_another_secret() {
        let issuing = make_service(3600);
        let verifying = JwtService::from_config(&AuthConfig {
            jwt_secret: "a-different-secret".into(),
            token_ttl_secs: 3600,
        })
        .expect("jwt service");

        let token = issuing
            .issue_access_token(7, "al", "student")
            .expect("issue token");

        match verifying.decode_access_token(&token.token) {
            Err(AuthError::TokenInvalid) => {}
            other => panic!("expected TokenInvalid, got {other:?}"),
        }
    }

    #[test]
    fn rejects_tampered_tokens() {
        let service = make_service(3600);
        let token = service
            .issue_access_token(7, "al", "student")
            .expect("issue token");

        let mut tampered = token.token.clone();
        let flipped = if tampered.ends_with('A') { 'B' } else { 'A' };
        tampered.pop();
        tampered.push(flipped);

        match service.decode_access_token(&tampered) {
            Err(AuthError::TokenInvalid) => {}
            other => panic!("expected TokenInvalid, got {other:?}"),
        }

        assert!(matches!(
            service.decode_access_token("not-a-token"),
            Err(AuthError::TokenInvalid)
        ));
    }
}
