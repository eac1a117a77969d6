use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::FromRow;
use rocket_okapi::okapi::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

/// Generic `{ "message": ... }` payload used for confirmations and the
/// JSON error catchers.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Closed set of ticket lifecycle states. Anything else is rejected at the
/// request boundary before it reaches the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Closed,
}

impl TicketStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(TicketStatus::Open),
            "closed" => Some(TicketStatus::Closed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Closed => "closed",
        }
    }
}

/// A support ticket. The `creator_*` columns are a snapshot of the
/// authenticated identity at creation time and never change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct Ticket {
    pub id: i32,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub creator_id: i32,
    pub creator_name: String,
    pub creator_role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct Course {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub duration: Option<i32>,
    pub instructor: Option<String>,
    pub thumbnail_url: Option<String>,
    pub content_url: Option<String>,
    pub video_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct Student {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub registration_date: DateTime<Utc>,
}

/// Student plus the full course records they are enrolled in.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StudentWithCourses {
    #[serde(flatten)]
    pub student: Student,
    pub enrolled_courses: Vec<Course>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct Instructor {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstructorWithCourses {
    #[serde(flatten)]
    pub instructor: Instructor,
    pub courses_taught: Vec<Course>,
}
