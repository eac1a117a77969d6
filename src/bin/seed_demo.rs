//! Wipe and repopulate demo data: sample courses, one account per role
//! (plus a second student), and a handful of support tickets. Points at
//! the database named by `DATABASE_URL`.

use std::io::{self, Write};

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use lms_api_server::auth::passwords::PasswordService;

const DEMO_PASSWORD: &str = "Password123!";

#[derive(Parser, Debug)]
#[command(name = "seed_demo", about = "Seed demo courses, users, and tickets")]
struct Args {
    /// Seed only the course catalog.
    #[arg(long)]
    courses_only: bool,

    /// Seed only users and tickets.
    #[arg(long)]
    users_only: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    if args.courses_only && args.users_only {
        writeln!(
            io::stderr(),
            "error: --courses-only and --users-only are mutually exclusive"
        )?;
        std::process::exit(1);
    }

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    if !args.users_only {
        seed_courses(&pool).await?;
    }
    if !args.courses_only {
        seed_users_and_tickets(&pool).await?;
    }

    println!("Seeding complete.");
    Ok(())
}

async fn seed_courses(pool: &PgPool) -> Result<(), sqlx::Error> {
    log::info!("clearing existing courses");
    sqlx::query("DELETE FROM courses").execute(pool).await?;

    let samples = [
        (
            "Introduction to Web Development",
            "Learn the basics of HTML, CSS, and JavaScript to build modern web pages.",
            10,
            "Admin Instructor",
            "https://developer.mozilla.org/en-US/docs/Learn",
        ),
        (
            "React Fundamentals",
            "Component-based development, hooks, state management, and routing in React.",
            12,
            "Admin Instructor",
            "https://react.dev/learn",
        ),
        (
            "Data Structures & Algorithms Basics",
            "Big-O notation, arrays, linked lists, stacks, queues, and common algorithms.",
            15,
            "CS Instructor",
            "https://www.geeksforgeeks.org/data-structures/",
        ),
    ];

    for (title, description, duration, instructor, content_url) in samples {
        sqlx::query(
            r#"INSERT INTO courses (title, description, duration, instructor, content_url)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(title)
        .bind(description)
        .bind(duration)
        .bind(instructor)
        .bind(content_url)
        .execute(pool)
        .await?;
    }

    log::info!("sample courses inserted");
    Ok(())
}

async fn seed_users_and_tickets(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    log::info!("clearing existing users and tickets");
    sqlx::query("DELETE FROM tickets").execute(pool).await?;
    sqlx::query("DELETE FROM users").execute(pool).await?;

    let password_service = PasswordService::new()
        .map_err(|err| io::Error::other(format!("argon2 init failed: {err}")))?;
    let password_hash = password_service
        .hash_password(DEMO_PASSWORD)
        .map_err(|err| io::Error::other(format!("password hash failed: {err}")))?;

    let users = [
        ("admin", "admin@example.com", "admin"),
        ("instructor1", "instructor1@example.com", "instructor"),
        ("student1", "student1@example.com", "student"),
        ("student2", "student2@example.com", "student"),
    ];

    let mut admin_id = None;
    let mut student_id = None;

    for (username, email, role) in users {
        let row = sqlx::query(
            r#"INSERT INTO users (username, email, password_hash, role)
               VALUES ($1, $2, $3, $4)
               RETURNING id"#,
        )
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .bind(role)
        .fetch_one(pool)
        .await?;
        let id: i32 = row.try_get("id")?;

        if username == "admin" {
            admin_id = Some(id);
        }
        if username == "student1" {
            student_id = Some(id);
        }
    }

    let admin_id = admin_id.expect("admin user seeded");
    let student_id = student_id.expect("student1 user seeded");

    let tickets = [
        (
            "Issue accessing course content",
            "I cannot open the PDF for the React Fundamentals course.",
            "open",
            student_id,
            "student1",
            "student",
        ),
        (
            "Request new course: Advanced Node.js",
            "Please add an advanced Node.js and microservices course.",
            "open",
            student_id,
            "student1",
            "student",
        ),
        (
            "Bulk user import completed",
            "Imported 120 new students from CSV.",
            "closed",
            admin_id,
            "admin",
            "admin",
        ),
    ];

    for (subject, message, status, creator_id, creator_name, creator_role) in tickets {
        sqlx::query(
            r#"INSERT INTO tickets
                   (subject, message, status, creator_id, creator_name, creator_role)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(subject)
        .bind(message)
        .bind(status)
        .bind(creator_id)
        .bind(creator_name)
        .bind(creator_role)
        .execute(pool)
        .await?;
    }

    log::info!("sample users and tickets inserted (password: {DEMO_PASSWORD})");
    Ok(())
}
