use rocket::Request;
use rocket::State;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket_okapi::request::OpenApiFromRequest;

use crate::auth::responses::Role;
use crate::auth::{AuthError, AuthResult, AuthState};

/// The authenticated identity attached to a request, rebuilt from the
/// bearer token's signed claims on every request. Verification is
/// stateless: the token alone is the source of truth for its lifetime.
#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match extract_user(request).await {
            Ok(user) => Outcome::Success(user),
            Err(err) => Outcome::Error((err.status(), err)),
        }
    }
}

/// Role gate layered on [`AuthUser`]: passes only identities whose role is
/// admin, otherwise short-circuits with 403. Runs strictly after the auth
/// gate, so a missing/invalid token is still a 401.
#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct RequireAdmin(pub AuthUser);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequireAdmin {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match AuthUser::from_request(request).await {
            Outcome::Success(user) => {
                if user.is_admin() {
                    Outcome::Success(RequireAdmin(user))
                } else {
                    Outcome::Error((Status::Forbidden, AuthError::Forbidden))
                }
            }
            Outcome::Error(err) => Outcome::Error(err),
            Outcome::Forward(_) => Outcome::Error((Status::Unauthorized, AuthError::Unauthorized)),
        }
    }
}

async fn extract_user(request: &Request<'_>) -> AuthResult<AuthUser> {
    let token = bearer_token_from_request(request)?;

    let auth_state = request
        .guard::<&State<AuthState>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("AuthState missing from state".into()))?;

    let claims = auth_state.jwt_service.decode_access_token(token)?;

    let id: i32 = claims.sub.parse().map_err(|_| AuthError::TokenInvalid)?;
    let role = Role::parse(&claims.role).ok_or(AuthError::TokenInvalid)?;

    Ok(AuthUser {
        id,
        username: claims.username,
        role,
    })
}

fn bearer_token_from_request<'r>(request: &'r Request<'_>) -> AuthResult<&'r str> {
    let header = request
        .headers()
        .get_one("Authorization")
        .ok_or(AuthError::Unauthorized)?;
    parse_bearer(header).ok_or(AuthError::Unauthorized)
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
fn parse_bearer(header: &str) -> Option<&str> {
    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default();
    if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_bearer_headers() {
        assert_eq!(parse_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(parse_bearer("bearer abc"), Some("abc"));
    }

    #[test]
    fn rejects_other_schemes_and_empty_tokens() {
        assert_eq!(parse_bearer("Basic abc"), None);
        assert_eq!(parse_bearer("Bearer"), None);
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer(""), None);
    }

    #[test]
    fn admin_check_follows_role() {
        let admin = AuthUser {
            id: 1,
            username: "root".into(),
            role: Role::Admin,
        };
        let student = AuthUser {
            id: 2,
            username: "al".into(),
            role: Role::Student,
        };
        assert!(admin.is_admin());
        assert!(!student.is_admin());
    }
}
