use rocket_db_pools::{Database, sqlx};

/// Primary application pool, configured under `databases.lms_db`.
#[derive(Database)]
#[database("lms_db")]
pub struct LmsDb(sqlx::PgPool);

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Apply any pending schema migrations. Called once at ignition; a failure
/// here aborts launch rather than serving against a broken schema.
pub async fn run_migrations(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
