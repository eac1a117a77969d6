use lms_api_server::models::{Course, InstructorWithCourses, StudentWithCourses};
use lms_api_server::routes::courses::{
    create_course, delete_course, get_course, list_courses, update_course,
};
use lms_api_server::routes::instructors::{create_instructor, get_instructor, list_instructors};
use lms_api_server::routes::students::{
    create_student, delete_student, get_student, list_students, update_student,
};
use lms_api_server::test_support::{TestDatabase, TestFixtures, TestRocketBuilder};
use rocket::http::{ContentType, Status};
use rocket::routes;
use rocket::serde::json::json;

#[tokio::test]
async fn course_crud_round_trip() {
    let test_db = match TestDatabase::new_from_env().await {
        Ok(db) => db,
        Err(err) if err.is_unavailable() => {
            eprintln!("skipping course test: container runtime unavailable ({err})");
            return;
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    };

    let pool = test_db.pool_clone();
    let client = TestRocketBuilder::new()
        .manage_pg_pool(pool.clone())
        .mount_api_routes(routes![
            create_course,
            list_courses,
            get_course,
            update_course,
            delete_course
        ])
        .async_client()
        .await;

    let response = client
        .post("/api/courses")
        .header(ContentType::JSON)
        .body(
            json!({
                "title": "React Fundamentals",
                "description": "Hooks and state management",
                "duration": 12,
                "instructor": "Admin Instructor",
                "video_url": "https://example.com/react"
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    let course: Course = response.into_json().await.expect("course payload");
    assert_eq!(course.title, "React Fundamentals");
    assert_eq!(course.duration, Some(12));

    // Empty titles are rejected.
    let response = client
        .post("/api/courses")
        .header(ContentType::JSON)
        .body(json!({ "title": "  " }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    let response = client
        .get(format!("/api/courses/{}", course.id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let response = client.get("/api/courses").dispatch().await;
    let all: Vec<Course> = response.into_json().await.expect("course list");
    assert_eq!(all.len(), 1);

    // Partial update leaves unnamed fields alone.
    let response = client
        .put(format!("/api/courses/{}", course.id))
        .header(ContentType::JSON)
        .body(json!({ "duration": 14 }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let updated: Course = response.into_json().await.expect("course payload");
    assert_eq!(updated.duration, Some(14));
    assert_eq!(updated.title, "React Fundamentals");
    assert_eq!(updated.description.as_deref(), Some("Hooks and state management"));

    let response = client
        .delete(format!("/api/courses/{}", course.id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let response = client
        .get(format!("/api/courses/{}", course.id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    let response = client
        .put("/api/courses/999999")
        .header(ContentType::JSON)
        .body(json!({ "duration": 1 }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn students_carry_their_enrollments() {
    let test_db = match TestDatabase::new_from_env().await {
        Ok(db) => db,
        Err(err) if err.is_unavailable() => {
            eprintln!("skipping student test: container runtime unavailable ({err})");
            return;
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    };

    let pool = test_db.pool_clone();
    let fixtures = TestFixtures::new(&pool);
    let web_course = fixtures
        .insert_course("Intro to Web Development", Some("Admin Instructor"))
        .await
        .expect("insert course");
    let dsa_course = fixtures
        .insert_course("Data Structures", Some("CS Instructor"))
        .await
        .expect("insert course");

    let client = TestRocketBuilder::new()
        .manage_pg_pool(pool.clone())
        .mount_api_routes(routes![
            create_student,
            list_students,
            get_student,
            update_student,
            delete_student
        ])
        .async_client()
        .await;

    // Unknown course ids in the enrollment list are ignored.
    let response = client
        .post("/api/students")
        .header(ContentType::JSON)
        .body(
            json!({
                "name": "Ada",
                "email": "ada@x.com",
                "enrolled_courses": [web_course, 999999]
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    let created: StudentWithCourses = response.into_json().await.expect("student payload");
    assert_eq!(created.student.name, "Ada");
    assert_eq!(created.enrolled_courses.len(), 1);
    assert_eq!(created.enrolled_courses[0].id, web_course);

    // The email column is unique; a duplicate is a 400.
    let response = client
        .post("/api/students")
        .header(ContentType::JSON)
        .body(json!({ "name": "Ada Again", "email": "ada@x.com" }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    // Replacing the enrollment set swaps the embedded courses.
    let response = client
        .put(format!("/api/students/{}", created.student.id))
        .header(ContentType::JSON)
        .body(json!({ "enrolled_courses": [dsa_course] }).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let updated: StudentWithCourses = response.into_json().await.expect("student payload");
    assert_eq!(updated.enrolled_courses.len(), 1);
    assert_eq!(updated.enrolled_courses[0].id, dsa_course);
    assert_eq!(updated.student.email, "ada@x.com");

    let response = client.get("/api/students").dispatch().await;
    let all: Vec<StudentWithCourses> = response.into_json().await.expect("student list");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].enrolled_courses.len(), 1);

    let response = client
        .delete(format!("/api/students/{}", created.student.id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    // Enrollment rows go with the student.
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM student_courses")
        .fetch_one(&pool)
        .await
        .expect("count enrollments");
    assert_eq!(remaining, 0);

    let response = client
        .get(format!("/api/students/{}", created.student.id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    test_db.close().await.expect("failed to drop test database");
}

#[tokio::test]
async fn instructors_carry_their_courses() {
    let test_db = match TestDatabase::new_from_env().await {
        Ok(db) => db,
        Err(err) if err.is_unavailable() => {
            eprintln!("skipping instructor test: container runtime unavailable ({err})");
            return;
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    };

    let pool = test_db.pool_clone();
    let fixtures = TestFixtures::new(&pool);
    let course_id = fixtures
        .insert_course("React Fundamentals", Some("Grace"))
        .await
        .expect("insert course");

    let client = TestRocketBuilder::new()
        .manage_pg_pool(pool.clone())
        .mount_api_routes(routes![create_instructor, list_instructors, get_instructor])
        .async_client()
        .await;

    let response = client
        .post("/api/instructors")
        .header(ContentType::JSON)
        .body(
            json!({
                "name": "Grace",
                "email": "grace@x.com",
                "courses_taught": [course_id]
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    let created: InstructorWithCourses = response.into_json().await.expect("instructor payload");
    assert_eq!(created.instructor.name, "Grace");
    assert_eq!(created.courses_taught.len(), 1);

    let response = client
        .get(format!("/api/instructors/{}", created.instructor.id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let fetched: InstructorWithCourses = response.into_json().await.expect("instructor payload");
    assert_eq!(fetched.courses_taught[0].id, course_id);

    let response = client.get("/api/instructors").dispatch().await;
    let all: Vec<InstructorWithCourses> = response.into_json().await.expect("instructor list");
    assert_eq!(all.len(), 1);

    test_db.close().await.expect("failed to drop test database");
}
