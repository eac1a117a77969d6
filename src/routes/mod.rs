//! HTTP route handlers grouped by resource domain.
//!
//! Each submodule corresponds to a logical area of the API (tickets,
//! courses, students, instructors) and exposes typed Rocket handlers
//! annotated with `#[openapi]` so `rocket_okapi` can derive an OpenAPI
//! document automatically. The account routes live in `crate::auth`.

pub mod courses;
pub mod health;
pub mod instructors;
pub mod students;
pub mod tickets;
