use rocket::State;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket_db_pools::sqlx::{self, FromRow};
use rocket_okapi::okapi::schemars::{self, JsonSchema};
use rocket_okapi::openapi;

use crate::auth::guards::RequireAdmin;
use crate::auth::responses::{LoginRequest, LoginResponse, RegisterRequest, Role, UserSummary};
use crate::auth::{AuthError, AuthState};
use crate::models::MessageResponse;

type AuthRouteResult<T> = Result<Json<T>, status::Custom<Json<AuthErrorResponse>>>;

#[derive(Debug, serde::Serialize, serde::Deserialize, JsonSchema)]
pub struct AuthErrorResponse {
    pub status: u16,
    pub message: String,
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    password_hash: String,
    role: String,
}

#[openapi(tag = "Auth")]
#[post("/auth/register", data = "<payload>")]
pub async fn register(
    state: &State<AuthState>,
    pool: &State<sqlx::PgPool>,
    payload: Json<RegisterRequest>,
) -> Result<status::Custom<Json<MessageResponse>>, status::Custom<Json<AuthErrorResponse>>> {
    let username = payload.username.trim();
    let email = payload.email.trim();
    let password = payload.password.trim();

    if username.is_empty() || email.is_empty() || password.is_empty() {
        return Err(respond_message(
            Status::BadRequest,
            "Username, email, and password are required",
        ));
    }

    let role = match payload.role.as_deref().map(str::trim) {
        None | Some("") => Role::default(),
        Some(raw) => match Role::parse(raw) {
            Some(role) => role,
            None => return Err(respond_error(AuthError::InvalidRole(raw.to_string()))),
        },
    };

    let email_taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(pool.inner())
        .await
        .map_err(|err| respond_error(AuthError::from(err)))?;

    if email_taken {
        return Err(respond_error(AuthError::DuplicateEmail));
    }

    let password_hash = state
        .password_service
        .hash_password(password)
        .map_err(respond_error)?;

    sqlx::query("INSERT INTO users (username, email, password_hash, role) VALUES ($1, $2, $3, $4)")
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .bind(role.as_str())
        .execute(pool.inner())
        .await
        .map_err(|err| respond_error(map_unique_violation(err)))?;

    Ok(status::Custom(
        Status::Created,
        Json(MessageResponse::new("User registered successfully")),
    ))
}

#[openapi(tag = "Auth")]
#[post("/auth/login", data = "<payload>")]
pub async fn login(
    state: &State<AuthState>,
    pool: &State<sqlx::PgPool>,
    payload: Json<LoginRequest>,
) -> AuthRouteResult<LoginResponse> {
    let email = payload.email.trim();
    let password = payload.password.trim();

    if email.is_empty() || password.is_empty() {
        return Err(respond_message(
            Status::BadRequest,
            "Email and password are required",
        ));
    }

    let row: Option<UserRow> = sqlx::query_as(
        "SELECT id, username, email, password_hash, role FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool.inner())
    .await
    .map_err(|err| respond_error(AuthError::from(err)))?;

    let row = match row {
        Some(row) => row,
        None => return Err(invalid_credentials()),
    };

    let verified = state
        .password_service
        .verify_password(password, &row.password_hash)
        .map_err(respond_error)?;

    if !verified {
        return Err(invalid_credentials());
    }

    let role = Role::parse(&row.role).unwrap_or_default();
    let access_token = state
        .jwt_service
        .issue_access_token(row.id, &row.username, role.as_str())
        .map_err(respond_error)?;

    Ok(Json(LoginResponse {
        token: access_token.token,
        user: UserSummary {
            id: row.id,
            username: row.username,
            email: row.email,
            role,
        },
    }))
}

#[openapi(tag = "Auth")]
#[get("/auth/users")]
pub async fn list_users(
    _admin: RequireAdmin,
    pool: &State<sqlx::PgPool>,
) -> AuthRouteResult<Vec<UserSummary>> {
    let rows: Vec<(i32, String, String, String)> =
        sqlx::query_as("SELECT id, username, email, role FROM users ORDER BY id")
            .fetch_all(pool.inner())
            .await
            .map_err(|err| respond_error(AuthError::from(err)))?;

    let users = rows
        .into_iter()
        .map(|(id, username, email, role)| UserSummary {
            id,
            username,
            email,
            role: Role::parse(&role).unwrap_or_default(),
        })
        .collect();

    Ok(Json(users))
}

#[openapi(tag = "Auth")]
#[delete("/auth/users/<id>")]
pub async fn delete_user(
    id: i32,
    _admin: RequireAdmin,
    pool: &State<sqlx::PgPool>,
) -> AuthRouteResult<MessageResponse> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool.inner())
        .await
        .map_err(|err| respond_error(AuthError::from(err)))?;

    if result.rows_affected() == 0 {
        return Err(respond_message(Status::NotFound, "User not found"));
    }

    Ok(Json(MessageResponse::new("User deleted successfully")))
}

fn respond_error(err: AuthError) -> status::Custom<Json<AuthErrorResponse>> {
    let status = err.status();
    if status.code >= 500 {
        log::error!("auth failure: {err}");
    }
    status::Custom(
        status,
        Json(AuthErrorResponse {
            status: status.code,
            message: err.client_message(),
        }),
    )
}

fn respond_message(status: Status, message: &str) -> status::Custom<Json<AuthErrorResponse>> {
    status::Custom(
        status,
        Json(AuthErrorResponse {
            status: status.code,
            message: message.to_string(),
        }),
    )
}

fn invalid_credentials() -> status::Custom<Json<AuthErrorResponse>> {
    respond_error(AuthError::InvalidCredentials)
}

fn map_unique_violation(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some(constraint) if constraint.contains("username") => AuthError::DuplicateUsername,
                _ => AuthError::DuplicateEmail,
            };
        }
    }
    AuthError::Sqlx(err)
}
