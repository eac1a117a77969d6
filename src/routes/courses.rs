//! Course catalog CRUD. The catalog is world-readable and, like the rest
//! of the catalog surfaces, carries no auth gate.

use rocket::State;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket_db_pools::sqlx;
use rocket_okapi::okapi::schemars::{self, JsonSchema};
use rocket_okapi::openapi;
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::{Course, MessageResponse};

const COURSE_NOT_FOUND: &str = "Course not found";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateCourseRequest {
    pub title: String,
    pub description: Option<String>,
    pub duration: Option<i32>,
    pub instructor: Option<String>,
    pub thumbnail_url: Option<String>,
    pub content_url: Option<String>,
    pub video_url: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration: Option<i32>,
    pub instructor: Option<String>,
    pub thumbnail_url: Option<String>,
    pub content_url: Option<String>,
    pub video_url: Option<String>,
}

#[openapi(tag = "Courses")]
#[post("/courses", data = "<payload>")]
pub async fn create_course(
    payload: Json<CreateCourseRequest>,
    pool: &State<sqlx::PgPool>,
) -> Result<status::Custom<Json<Course>>, ApiError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }

    let course: Course = sqlx::query_as(
        r#"INSERT INTO courses
               (title, description, duration, instructor, thumbnail_url, content_url, video_url)
           VALUES ($1, $2, $3, $4, $5, $6, $7)
           RETURNING *"#,
    )
    .bind(title)
    .bind(&payload.description)
    .bind(payload.duration)
    .bind(&payload.instructor)
    .bind(&payload.thumbnail_url)
    .bind(&payload.content_url)
    .bind(&payload.video_url)
    .fetch_one(pool.inner())
    .await?;

    Ok(status::Custom(Status::Created, Json(course)))
}

#[openapi(tag = "Courses")]
#[get("/courses")]
pub async fn list_courses(pool: &State<sqlx::PgPool>) -> Result<Json<Vec<Course>>, ApiError> {
    let courses: Vec<Course> = sqlx::query_as("SELECT * FROM courses ORDER BY id")
        .fetch_all(pool.inner())
        .await?;

    Ok(Json(courses))
}

#[openapi(tag = "Courses")]
#[get("/courses/<id>")]
pub async fn get_course(id: i32, pool: &State<sqlx::PgPool>) -> Result<Json<Course>, ApiError> {
    let course: Option<Course> = sqlx::query_as("SELECT * FROM courses WHERE id = $1")
        .bind(id)
        .fetch_optional(pool.inner())
        .await?;

    course
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(COURSE_NOT_FOUND.to_string()))
}

#[openapi(tag = "Courses")]
#[put("/courses/<id>", data = "<payload>")]
pub async fn update_course(
    id: i32,
    payload: Json<UpdateCourseRequest>,
    pool: &State<sqlx::PgPool>,
) -> Result<Json<Course>, ApiError> {
    let updated: Option<Course> = sqlx::query_as(
        r#"UPDATE courses
           SET title = COALESCE($1, title),
               description = COALESCE($2, description),
               duration = COALESCE($3, duration),
               instructor = COALESCE($4, instructor),
               thumbnail_url = COALESCE($5, thumbnail_url),
               content_url = COALESCE($6, content_url),
               video_url = COALESCE($7, video_url),
               updated_at = now()
           WHERE id = $8
           RETURNING *"#,
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.duration)
    .bind(&payload.instructor)
    .bind(&payload.thumbnail_url)
    .bind(&payload.content_url)
    .bind(&payload.video_url)
    .bind(id)
    .fetch_optional(pool.inner())
    .await?;

    updated
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(COURSE_NOT_FOUND.to_string()))
}

#[openapi(tag = "Courses")]
#[delete("/courses/<id>")]
pub async fn delete_course(
    id: i32,
    pool: &State<sqlx::PgPool>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(id)
        .execute(pool.inner())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(COURSE_NOT_FOUND.to_string()));
    }

    Ok(Json(MessageResponse::new("Course deleted")))
}
