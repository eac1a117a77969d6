//! JSON bodies for error statuses raised outside handlers: guard
//! rejections, unmatched routes, and malformed request bodies.

use rocket::Catcher;
use rocket::serde::json::Json;

use crate::models::MessageResponse;

#[catch(400)]
fn bad_request() -> Json<MessageResponse> {
    Json(MessageResponse::new("Bad request"))
}

#[catch(401)]
fn unauthorized() -> Json<MessageResponse> {
    Json(MessageResponse::new("Invalid or expired token"))
}

#[catch(403)]
fn forbidden() -> Json<MessageResponse> {
    Json(MessageResponse::new("Forbidden: insufficient privileges"))
}

#[catch(404)]
fn not_found() -> Json<MessageResponse> {
    Json(MessageResponse::new("Route not found"))
}

#[catch(422)]
fn unprocessable() -> Json<MessageResponse> {
    Json(MessageResponse::new("Malformed request body"))
}

#[catch(500)]
fn internal_error() -> Json<MessageResponse> {
    Json(MessageResponse::new("Server error"))
}

pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        unprocessable,
        internal_error
    ]
}
