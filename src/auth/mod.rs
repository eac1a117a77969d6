//! Authentication module: configuration, credential handling, token
//! minting, Rocket request guards, and the account HTTP routes.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod guards;
pub mod jwt;
pub mod passwords;
pub mod responses;
pub mod routes;

pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use guards::{AuthUser, RequireAdmin};
pub use jwt::JwtService;
pub use passwords::PasswordService;
pub use responses::Role;

/// Process-wide authentication state, built once at ignition and managed
/// by Rocket. The signing secret never gets read from the environment
/// after this point.
#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub password_service: Arc<PasswordService>,
    pub jwt_service: Arc<JwtService>,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        password_service: PasswordService,
        jwt_service: JwtService,
    ) -> Self {
        Self {
            config,
            password_service: Arc::new(password_service),
            jwt_service: Arc::new(jwt_service),
        }
    }
}
