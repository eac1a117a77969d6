use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use rocket_db_pools::sqlx;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::response::OpenApiResponderInner;
use serde::Serialize;
use std::io::Cursor;

/// Failure taxonomy for resource route handlers.
///
/// `NotFound` is used for both "no such row" and "row exists but is not
/// yours" so the two cases are indistinguishable to the client. `Conflict`
/// covers duplicate unique fields and answers with 400, matching the
/// registration contract.
#[derive(Debug)]
pub enum ApiError {
    DatabaseError(sqlx::Error),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    InternalError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let (status, error_type, message) = match self {
            ApiError::DatabaseError(e) => {
                log::error!("database error: {}", e);
                (
                    Status::InternalServerError,
                    "DatabaseError",
                    "Server error".to_string(),
                )
            }
            ApiError::NotFound(msg) => {
                log::debug!("not found: {}", msg);
                (Status::NotFound, "NotFound", msg)
            }
            ApiError::BadRequest(msg) => {
                log::debug!("bad request: {}", msg);
                (Status::BadRequest, "BadRequest", msg)
            }
            ApiError::Conflict(msg) => {
                log::debug!("conflict: {}", msg);
                (Status::BadRequest, "Conflict", msg)
            }
            ApiError::InternalError(msg) => {
                log::error!("internal error: {}", msg);
                (
                    Status::InternalServerError,
                    "InternalError",
                    "Server error".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        let json = serde_json::to_string(&error_response).unwrap_or_else(|_| {
            r#"{"error":"SerializationError","message":"Failed to serialize error"}"#.to_string()
        });

        Response::build()
            .status(status)
            .header(rocket::http::ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}

impl OpenApiResponderInner for ApiError {
    fn responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        Ok(Responses::default())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ApiError::Conflict("Duplicate value for a unique field".to_string())
            }
            _ => ApiError::DatabaseError(err),
        }
    }
}
