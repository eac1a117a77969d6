use rocket::http::Status;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("username already registered")]
    DuplicateUsername,
    #[error("invalid role: {0}")]
    InvalidRole(String),
    #[error("token expired")]
    TokenExpired,
    #[error("token invalid")]
    TokenInvalid,
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Sqlx(#[from] rocket_db_pools::sqlx::Error),
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("argon2 parameter error: {0}")]
    Argon2(String),
    #[error("password hashing error: {0}")]
    PasswordHash(String),
}

impl AuthError {
    pub fn status(&self) -> Status {
        match self {
            AuthError::InvalidCredentials
            | AuthError::DuplicateEmail
            | AuthError::DuplicateUsername
            | AuthError::InvalidRole(_) => Status::BadRequest,
            AuthError::TokenExpired | AuthError::TokenInvalid | AuthError::Unauthorized => {
                Status::Unauthorized
            }
            AuthError::Forbidden => Status::Forbidden,
            AuthError::Config(_)
            | AuthError::Sqlx(_)
            | AuthError::Jwt(_)
            | AuthError::Argon2(_)
            | AuthError::PasswordHash(_) => Status::InternalServerError,
        }
    }

    /// Client-facing message. Internal failures collapse to a generic
    /// string; the full error is only ever logged.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "Invalid email or password".into(),
            AuthError::DuplicateEmail => "Email already registered".into(),
            AuthError::DuplicateUsername => "Username already registered".into(),
            AuthError::InvalidRole(role) => {
                format!("Role '{role}' is not one of admin, instructor, student")
            }
            AuthError::TokenExpired | AuthError::TokenInvalid | AuthError::Unauthorized => {
                "Invalid or expired token".into()
            }
            AuthError::Forbidden => "Forbidden: insufficient privileges".into(),
            AuthError::Config(_)
            | AuthError::Sqlx(_)
            | AuthError::Jwt(_)
            | AuthError::Argon2(_)
            | AuthError::PasswordHash(_) => "Server error".into(),
        }
    }
}

impl From<argon2::Error> for AuthError {
    fn from(err: argon2::Error) -> Self {
        AuthError::Argon2(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::PasswordHash(err.to_string())
    }
}
