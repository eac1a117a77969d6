//! Student records plus their course enrollments. Reads return the full
//! course documents for each enrollment, mirroring what the catalog UI
//! expects.

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
use crate::models::{Course, MessageResponse, Student, StudentWithCourses};

const STUDENT_NOT_FOUND: &str = "Student not found";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateStudentRequest {
    pub name: String,
    pub email: String,
    /// Course ids to enroll in; unknown ids are ignored.
    pub enrolled_courses: Option<Vec<i32>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateStudentRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    /// When present, replaces the enrollment set.
    pub enrolled_courses: Option<Vec<i32>>,
}

#[derive(Debug, FromRow)]
struct EnrollmentRow {
    student_id: i32,
    #[sqlx(flatten)]
    course: Course,
}

#[openapi(tag = "Students")]
#[post("/students", data = "<payload>")]
pub async fn create_student(
    payload: Json<CreateStudentRequest>,
    pool: &State<PgPool>,
) -> Result<status::Custom<Json<StudentWithCourses>>, ApiError> {
    let name = payload.name.trim();
    let email = payload.email.trim();

    if name.is_empty() || email.is_empty() {
        return Err(ApiError::BadRequest(
            "Name and email are required".to_string(),
        ));
    }

    let student: Student =
        sqlx::query_as("INSERT INTO students (name, email) VALUES ($1, $2) RETURNING *")
            .bind(name)
            .bind(email)
            .fetch_one(pool.inner())
            .await
            .map_err(duplicate_email)?;

    if let Some(course_ids) = &payload.enrolled_courses {
        replace_enrollments(pool.inner(), student.id, course_ids).await?;
    }

    let enrolled_courses = courses_for_student(pool.inner(), student.id).await?;

    Ok(status::Custom(
        Status::Created,
        Json(StudentWithCourses {
            student,
            enrolled_courses,
        }),
    ))
}

#[openapi(tag = "Students")]
#[get("/students")]
pub async fn list_students(
    pool: &State<PgPool>,
) -> Result<Json<Vec<StudentWithCourses>>, ApiError> {
    let students: Vec<Student> = sqlx::query_as("SELECT * FROM students ORDER BY id")
        .fetch_all(pool.inner())
        .await?;

    let enrollments: Vec<EnrollmentRow> = sqlx::query_as(
        r#"SELECT sc.student_id, c.*
           FROM student_courses sc
           JOIN courses c ON c.id = sc.course_id
           ORDER BY sc.student_id, c.id"#,
    )
    .fetch_all(pool.inner())
    .await?;

    let mut by_student: HashMap<i32, Vec<Course>> = HashMap::new();
    for row in enrollments {
        by_student.entry(row.student_id).or_default().push(row.course);
    }

    let result = students
        .into_iter()
        .map(|student| {
            let enrolled_courses = by_student.remove(&student.id).unwrap_or_default();
            StudentWithCourses {
                student,
                enrolled_courses,
            }
        })
        .collect();

    Ok(Json(result))
}

#[openapi(tag = "Students")]
#[get("/students/<id>")]
pub async fn get_student(
    id: i32,
    pool: &State<PgPool>,
) -> Result<Json<StudentWithCourses>, ApiError> {
    let student: Option<Student> = sqlx::query_as("SELECT * FROM students WHERE id = $1")
        .bind(id)
        .fetch_optional(pool.inner())
        .await?;

    let student = student.ok_or_else(|| ApiError::NotFound(STUDENT_NOT_FOUND.to_string()))?;
    let enrolled_courses = courses_for_student(pool.inner(), student.id).await?;

    Ok(Json(StudentWithCourses {
        student,
        enrolled_courses,
    }))
}

#[openapi(tag = "Students")]
#[put("/students/<id>", data = "<payload>")]
pub async fn update_student(
    id: i32,
    payload: Json<UpdateStudentRequest>,
    pool: &State<PgPool>,
) -> Result<Json<StudentWithCourses>, ApiError> {
    let student: Option<Student> = sqlx::query_as(
        r#"UPDATE students
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

    let student = student.ok_or_else(|| ApiError::NotFound(STUDENT_NOT_FOUND.to_string()))?;

    if let Some(course_ids) = &payload.enrolled_courses {
        replace_enrollments(pool.inner(), student.id, course_ids).await?;
    }

    let enrolled_courses = courses_for_student(pool.inner(), student.id).await?;

    Ok(Json(StudentWithCourses {
        student,
        enrolled_courses,
    }))
}

#[openapi(tag = "Students")]
#[delete("/students/<id>")]
pub async fn delete_student(
    id: i32,
    pool: &State<PgPool>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM students WHERE id = $1")
        .bind(id)
        .execute(pool.inner())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(STUDENT_NOT_FOUND.to_string()));
    }

    Ok(Json(MessageResponse::new("Student deleted")))
}

async fn replace_enrollments(
    pool: &PgPool,
    student_id: i32,
    course_ids: &[i32],
) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM student_courses WHERE student_id = $1")
        .bind(student_id)
        .execute(pool)
        .await?;

    // Only ids that exist in the catalog are linked; dangling ids are
    // silently skipped.
    sqlx::query(
        r#"INSERT INTO student_courses (student_id, course_id)
           SELECT $1, id FROM courses WHERE id = ANY($2)"#,
    )
    .bind(student_id)
    .bind(course_ids.to_vec())
    .execute(pool)
    .await?;

    Ok(())
}

async fn courses_for_student(pool: &PgPool, student_id: i32) -> Result<Vec<Course>, ApiError> {
    let courses: Vec<Course> = sqlx::query_as(
        r#"SELECT c.*
           FROM courses c
           JOIN student_courses sc ON sc.course_id = c.id
           WHERE sc.student_id = $1
           ORDER BY c.id"#,
    )
    .bind(student_id)
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
