//! Instructor records plus the courses they teach. Shaped like the
//! student surface: reads return the full course documents.

use std::collections::HashMap;

use rocket::State;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket_db_pools::sqlx::{self, FromRow, PgPool};
use rocket_okapi::okapi::schemars::{self, JsonSchema};
use rocket_okapi::openapi;
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::{Course, Instructor, InstructorWithCourses, MessageResponse};

const INSTRUCTOR_NOT_FOUND: &str = "Instructor not found";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateInstructorRequest {
    pub name: String,
    pub email: String,
    /// Course ids taught; unknown ids are ignored.
    pub courses_taught: Option<Vec<i32>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateInstructorRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    /// When present, replaces the taught-course set.
    pub courses_taught: Option<Vec<i32>>,
}

#[derive(Debug, FromRow)]
struct TaughtRow {
    instructor_id: i32,
    #[sqlx(flatten)]
    course: Course,
}

#[openapi(tag = "Instructors")]
#[post("/instructors", data = "<payload>")]
pub async fn create_instructor(
    payload: Json<CreateInstructorRequest>,
    pool: &State<PgPool>,
) -> Result<status::Custom<Json<InstructorWithCourses>>, ApiError> {
    let name = payload.name.trim();
    let email = payload.email.trim();

    if name.is_empty() || email.is_empty() {
        return Err(ApiError::BadRequest(
            "Name and email are required".to_string(),
        ));
    }

    let instructor: Instructor =
        sqlx::query_as("INSERT INTO instructors (name, email) VALUES ($1, $2) RETURNING *")
            .bind(name)
            .bind(email)
            .fetch_one(pool.inner())
            .await
            .map_err(duplicate_email)?;

    if let Some(course_ids) = &payload.courses_taught {
        replace_taught_courses(pool.inner(), instructor.id, course_ids).await?;
    }

    let courses_taught = courses_for_instructor(pool.inner(), instructor.id).await?;

    Ok(status::Custom(
        Status::Created,
        Json(InstructorWithCourses {
            instructor,
            courses_taught,
        }),
    ))
}

#[openapi(tag = "Instructors")]
#[get("/instructors")]
pub async fn list_instructors(
    pool: &State<PgPool>,
) -> Result<Json<Vec<InstructorWithCourses>>, ApiError> {
    let instructors: Vec<Instructor> = sqlx::query_as("SELECT * FROM instructors ORDER BY id")
        .fetch_all(pool.inner())
        .await?;

    let taught: Vec<TaughtRow> = sqlx::query_as(
        r#"SELECT ic.instructor_id, c.*
           FROM instructor_courses ic
           JOIN courses c ON c.id = ic.course_id
           ORDER BY ic.instructor_id, c.id"#,
    )
    .fetch_all(pool.inner())
    .await?;

    let mut by_instructor: HashMap<i32, Vec<Course>> = HashMap::new();
    for row in taught {
        by_instructor
            .entry(row.instructor_id)
            .or_default()
            .push(row.course);
    }

    let result = instructors
        .into_iter()
        .map(|instructor| {
            let courses_taught = by_instructor.remove(&instructor.id).unwrap_or_default();
            InstructorWithCourses {
                instructor,
                courses_taught,
            }
        })
        .collect();

    Ok(Json(result))
}

#[openapi(tag = "Instructors")]
#[get("/instructors/<id>")]
pub async fn get_instructor(
    id: i32,
    pool: &State<PgPool>,
) -> Result<Json<InstructorWithCourses>, ApiError> {
    let instructor: Option<Instructor> = sqlx::query_as("SELECT * FROM instructors WHERE id = $1")
        .bind(id)
        .fetch_optional(pool.inner())
        .await?;

    let instructor =
        instructor.ok_or_else(|| ApiError::NotFound(INSTRUCTOR_NOT_FOUND.to_string()))?;
    let courses_taught = courses_for_instructor(pool.inner(), instructor.id).await?;

    Ok(Json(InstructorWithCourses {
        instructor,
        courses_taught,
    }))
}

#[openapi(tag = "Instructors")]
#[put("/instructors/<id>", data = "<payload>")]
pub async fn update_instructor(
    id: i32,
    payload: Json<UpdateInstructorRequest>,
    pool: &State<PgPool>,
) -> Result<Json<InstructorWithCourses>, ApiError> {
    let instructor: Option<Instructor> = sqlx::query_as(
        r#"UPDATE instructors
           SET name = COALESCE($1, name),
               email = COALESCE($2, email)
           WHERE id = $3
           RETURNING *"#,
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(id)
    .fetch_optional(pool.inner())
    .await
    .map_err(duplicate_email)?;

    let instructor =
        instructor.ok_or_else(|| ApiError::NotFound(INSTRUCTOR_NOT_FOUND.to_string()))?;

    if let Some(course_ids) = &payload.courses_taught {
        replace_taught_courses(pool.inner(), instructor.id, course_ids).await?;
    }

    let courses_taught = courses_for_instructor(pool.inner(), instructor.id).await?;

    Ok(Json(InstructorWithCourses {
        instructor,
        courses_taught,
    }))
}

#[openapi(tag = "Instructors")]
#[delete("/instructors/<id>")]
pub async fn delete_instructor(
    id: i32,
    pool: &State<PgPool>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM instructors WHERE id = $1")
        .bind(id)
        .execute(pool.inner())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(INSTRUCTOR_NOT_FOUND.to_string()));
    }

    Ok(Json(MessageResponse::new("Instructor deleted")))
}

async fn replace_taught_courses(
    pool: &PgPool,
    instructor_id: i32,
    course_ids: &[i32],
) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM instructor_courses WHERE instructor_id = $1")
        .bind(instructor_id)
        .execute(pool)
        .await?;

    sqlx::query(
        r#"INSERT INTO instructor_courses (instructor_id, course_id)
           SELECT $1, id FROM courses WHERE id = ANY($2)"#,
    )
    .bind(instructor_id)
    .bind(course_ids.to_vec())
    .execute(pool)
    .await?;

    Ok(())
}

async fn courses_for_instructor(pool: &PgPool, instructor_id: i32) -> Result<Vec<Course>, ApiError> {
    let courses: Vec<Course> = sqlx::query_as(
        r#"SELECT c.*
           FROM courses c
           JOIN instructor_courses ic ON ic.course_id = c.id
           WHERE ic.instructor_id = $1
           ORDER BY c.id"#,
    )
    .bind(instructor_id)
    .fetch_all(pool)
    .await?;

    Ok(courses)
}

fn duplicate_email(err: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return ApiError::Conflict("Email already registered".to_string());
        }
    }
    err.into()
}
