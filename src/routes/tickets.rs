//! Ownership-scoped support-ticket CRUD.
//!
//! Every handler runs behind the auth gate. Non-admin identities only ever
//! see and touch tickets they created; an admin operates on the full set.
//! A filtered lookup that matches nothing answers 404 whether the id is
//! unknown or the ticket belongs to someone else, so existence of another
//! user's ticket is never leaked.

use rocket::State;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket_db_pools::sqlx;
use rocket_okapi::okapi::schemars::{self, JsonSchema};
use rocket_okapi::openapi;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{MessageResponse, Ticket, TicketStatus};

const TICKET_NOT_FOUND: &str = "Ticket not found";

/// Creation payload. There are intentionally no creator fields here: the
/// creator snapshot always comes from the authenticated identity, so a
/// spoofed `creator_id` in the body is dropped at deserialization.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateTicketRequest {
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateTicketRequest {
    pub subject: Option<String>,
    pub message: Option<String>,
    /// Must be `open` or `closed` when present.
    pub status: Option<String>,
}

/// List tickets, newest first. Admins see every ticket; everyone else
/// sees only their own.
#[openapi(tag = "Tickets")]
#[get("/tickets")]
pub async fn list_tickets(
    user: AuthUser,
    pool: &State<sqlx::PgPool>,
) -> Result<Json<Vec<Ticket>>, ApiError> {
    let tickets: Vec<Ticket> = if user.is_admin() {
        sqlx::query_as("SELECT * FROM tickets ORDER BY created_at DESC, id DESC")
            .fetch_all(pool.inner())
            .await?
    } else {
        sqlx::query_as(
            "SELECT * FROM tickets WHERE creator_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user.id)
        .fetch_all(pool.inner())
        .await?
    };

    Ok(Json(tickets))
}

#[openapi(tag = "Tickets")]
#[post("/tickets", data = "<payload>")]
pub async fn create_ticket(
    user: AuthUser,
    payload: Json<CreateTicketRequest>,
    pool: &State<sqlx::PgPool>,
) -> Result<status::Custom<Json<Ticket>>, ApiError> {
    let subject = payload.subject.trim();
    let message = payload.message.trim();

    if subject.is_empty() || message.is_empty() {
        return Err(ApiError::BadRequest(
            "Subject and message are required".to_string(),
        ));
    }

    let ticket: Ticket = sqlx::query_as(
        r#"INSERT INTO tickets (subject, message, status, creator_id, creator_name, creator_role)
           VALUES ($1, $2, 'open', $3, $4, $5)
           RETURNING *"#,
    )
    .bind(subject)
    .bind(message)
    .bind(user.id)
    .bind(&user.username)
    .bind(user.role.as_str())
    .fetch_one(pool.inner())
    .await?;

    Ok(status::Custom(Status::Created, Json(ticket)))
}

/// Update subject, message, and/or status. The target filter includes the
/// creator id unless the caller is an admin.
#[openapi(tag = "Tickets")]
#[put("/tickets/<id>", data = "<payload>")]
pub async fn update_ticket(
    id: i32,
    user: AuthUser,
    payload: Json<UpdateTicketRequest>,
    pool: &State<sqlx::PgPool>,
) -> Result<Json<Ticket>, ApiError> {
    if let Some(raw_status) = payload.status.as_deref() {
        if TicketStatus::parse(raw_status).is_none() {
            return Err(ApiError::BadRequest(
                "Status must be 'open' or 'closed'".to_string(),
            ));
        }
    }

    let updated: Option<Ticket> = if user.is_admin() {
        sqlx::query_as(
            r#"UPDATE tickets
               SET subject = COALESCE($1, subject),
                   message = COALESCE($2, message),
                   status = COALESCE($3, status),
                   updated_at = now()
               WHERE id = $4
               RETURNING *"#,
        )
        .bind(&payload.subject)
        .bind(&payload.message)
        .bind(&payload.status)
        .bind(id)
        .fetch_optional(pool.inner())
        .await?
    } else {
        sqlx::query_as(
            r#"UPDATE tickets
               SET subject = COALESCE($1, subject),
                   message = COALESCE($2, message),
                   status = COALESCE($3, status),
                   updated_at = now()
               WHERE id = $4 AND creator_id = $5
               RETURNING *"#,
        )
        .bind(&payload.subject)
        .bind(&payload.message)
        .bind(&payload.status)
        .bind(id)
        .bind(user.id)
        .fetch_optional(pool.inner())
        .await?
    };

    updated
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(TICKET_NOT_FOUND.to_string()))
}

#[openapi(tag = "Tickets")]
#[delete("/tickets/<id>")]
pub async fn delete_ticket(
    id: i32,
    user: AuthUser,
    pool: &State<sqlx::PgPool>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = if user.is_admin() {
        sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(pool.inner())
            .await?
    } else {
        sqlx::query("DELETE FROM tickets WHERE id = $1 AND creator_id = $2")
            .bind(id)
            .bind(user.id)
            .execute(pool.inner())
            .await?
    };

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(TICKET_NOT_FOUND.to_string()));
    }

    Ok(Json(MessageResponse::new("Ticket deleted")))
}
