#[macro_use]
extern crate rocket;

pub mod auth;
pub mod catchers;
pub mod db;
pub mod error;
pub mod models;
pub mod request_logger;
pub mod routes;

use crate::auth::{AuthConfig, AuthState, JwtService, PasswordService};
use crate::db::LmsDb;
use crate::request_logger::RequestLogger;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::Once;

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    // Configure CORS
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![
                Method::Get,
                Method::Post,
                Method::Put,
                Method::Delete,
                Method::Patch,
            ]
            .into_iter()
            .map(From::from)
            .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("Error creating CORS");

    rocket::build()
        .attach(RequestLogger)
        .attach(LmsDb::init())
        .attach(cors)
        // Run database migrations on startup; serving against a broken
        // schema is worse than refusing to launch.
        .attach(AdHoc::try_on_ignite(
            "Run Migrations",
            |rocket| async move {
                match LmsDb::fetch(&rocket) {
                    Some(db) => {
                        let pool = (**db).clone();
                        match db::run_migrations(&pool).await {
                            Ok(_) => {
                                log::info!("database migrations successful");
                                Ok(rocket)
                            }
                            Err(e) => {
                                log::error!("database migrations failed: {}", e);
                                Err(rocket)
                            }
                        }
                    }
                    None => {
                        log::error!("database pool not available for migrations");
                        Err(rocket)
                    }
                }
            },
        ))
        // Clone the raw pool out of the rocket_db_pools wrapper so
        // handlers and background tasks can take it as plain state.
        .attach(AdHoc::try_on_ignite("Manage DB Pool", |rocket| async move {
            match LmsDb::fetch(&rocket) {
                Some(db) => {
                    let pool = (**db).clone();
                    Ok(rocket.manage(pool))
                }
                None => Err(rocket),
            }
        }))
        // Signing secret and hashing parameters are loaded exactly once
        // here; nothing reads the environment after ignition.
        .attach(AdHoc::try_on_ignite("Auth State", |rocket| async move {
            let config = match AuthConfig::from_env() {
                Ok(config) => config,
                Err(e) => {
                    log::error!("auth configuration failed: {}", e);
                    return Err(rocket);
                }
            };
            let password_service = match PasswordService::new() {
                Ok(service) => service,
                Err(e) => {
                    log::error!("argon2 initialization failed: {}", e);
                    return Err(rocket);
                }
            };
            let jwt_service = match JwtService::from_config(&config) {
                Ok(service) => service,
                Err(e) => {
                    log::error!("jwt initialization failed: {}", e);
                    return Err(rocket);
                }
            };

            Ok(rocket.manage(AuthState::new(config, password_service, jwt_service)))
        }))
        .register("/", catchers::catchers())
        .mount(
            "/api",
            openapi_get_routes![
                // Health routes
                routes::health::health_check,
                // Account routes
                auth::routes::register,
                auth::routes::login,
                auth::routes::list_users,
                auth::routes::delete_user,
                // Ticket routes
                routes::tickets::list_tickets,
                routes::tickets::create_ticket,
                routes::tickets::update_ticket,
                routes::tickets::delete_ticket,
                // Course catalog routes
                routes::courses::create_course,
                routes::courses::list_courses,
                routes::courses::get_course,
                routes::courses::update_course,
                routes::courses::delete_course,
                // Student routes
                routes::students::create_student,
                routes::students::list_students,
                routes::students::get_student,
                routes::students::update_student,
                routes::students::delete_student,
                // Instructor routes
                routes::instructors::create_instructor,
                routes::instructors::list_instructors,
                routes::instructors::get_instructor,
                routes::instructors::update_instructor,
                routes::instructors::delete_instructor,
            ],
        )
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/api/docs/rapidoc/",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("LMS API", "../../openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use chrono::{DateTime, Utc};
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};
    use rocket_db_pools::sqlx::{self, PgPool};

    use crate::auth::{AuthConfig, AuthState, JwtService, PasswordService};

    pub use database::{TestDatabase, TestDatabaseError};

    /// Build a fully wired [`AuthState`] around a fixed secret, for tests
    /// that mint and verify tokens without the environment.
    pub fn auth_state_with_secret(secret: &str, token_ttl_secs: i64) -> AuthState {
        let config = AuthConfig {
            jwt_secret: secret.into(),
            token_ttl_secs,
        };
        let password_service = PasswordService::new().expect("password service");
        let jwt_service = JwtService::from_config(&config).expect("jwt service");
        AuthState::new(config, password_service, jwt_service)
    }

    /// Convenience helpers for seeding rows in integration tests.
    pub struct TestFixtures<'a> {
        pool: &'a PgPool,
    }

    impl<'a> TestFixtures<'a> {
        pub fn new(pool: &'a PgPool) -> Self {
            Self { pool }
        }

        /// Insert a user row with a pre-computed password hash, returning
        /// the new user id.
        pub async fn insert_user(
            &self,
            username: &str,
            email: &str,
            role: &str,
            password_hash: &str,
        ) -> Result<i32, sqlx::Error> {
            sqlx::query_scalar(
                "INSERT INTO users (username, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING id",
            )
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .bind(role)
            .fetch_one(self.pool)
            .await
        }

        /// Insert a ticket row, optionally pinning `created_at` so list
        /// ordering is deterministic.
        #[allow(clippy::too_many_arguments)]
        pub async fn insert_ticket(
            &self,
            subject: &str,
            message: &str,
            status: &str,
            creator_id: i32,
            creator_name: &str,
            creator_role: &str,
            created_at: Option<DateTime<Utc>>,
        ) -> Result<i32, sqlx::Error> {
            sqlx::query_scalar(
                r#"INSERT INTO tickets
                       (subject, message, status, creator_id, creator_name, creator_role, created_at)
                   VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, now()))
                   RETURNING id"#,
            )
            .bind(subject)
            .bind(message)
            .bind(status)
            .bind(creator_id)
            .bind(creator_name)
            .bind(creator_role)
            .bind(created_at)
            .fetch_one(self.pool)
            .await
        }

        pub async fn insert_course(
            &self,
            title: &str,
            instructor: Option<&str>,
        ) -> Result<i32, sqlx::Error> {
            sqlx::query_scalar(
                "INSERT INTO courses (title, instructor) VALUES ($1, $2) RETURNING id",
            )
            .bind(title)
            .bind(instructor)
            .fetch_one(self.pool)
            .await
        }
    }

    pub mod database {
        use log::LevelFilter;
        use rocket_db_pools::sqlx::postgres::{PgConnectOptions, PgPoolOptions};
        use rocket_db_pools::sqlx::{self, ConnectOptions, PgPool};
        use testcontainers_modules::postgres::Postgres as PostgresImage;
        use testcontainers_modules::testcontainers::{
            ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;
        use uuid::Uuid;

        use crate::db::MIGRATOR;

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        impl TestDatabaseError {
            /// True when no database could be provisioned at all (no
            /// container runtime on this machine). Tests treat this as a
            /// skip rather than a failure.
            pub fn is_unavailable(&self) -> bool {
                matches!(self, TestDatabaseError::Container(_))
            }
        }

        /// Ephemeral database factory for integration tests. Each instance
        /// gets a freshly created, fully migrated database that is dropped
        /// again on [`TestDatabase::close`].
        pub struct TestDatabase {
            pool: Option<PgPool>,
            admin_options: PgConnectOptions,
            database_name: String,
            container: Option<ContainerAsync<PostgresImage>>,
        }

        impl TestDatabase {
            /// Provision a fresh database: against the server named by
            /// `TEST_DATABASE_URL` when set, otherwise by launching a
            /// disposable Postgres container.
            pub async fn new_from_env() -> Result<Self, TestDatabaseError> {
                match std::env::var("TEST_DATABASE_URL") {
                    Ok(url) => Self::from_admin_url(&url, None).await,
                    Err(_) => Self::from_container().await,
                }
            }

            async fn from_container() -> Result<Self, TestDatabaseError> {
                let container = PostgresImage::default().start().await?;
                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;
                let admin_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
                Self::from_admin_url(&admin_url, Some(container)).await
            }

            async fn from_admin_url(
                admin_url: &str,
                container: Option<ContainerAsync<PostgresImage>>,
            ) -> Result<Self, TestDatabaseError> {
                let base_options: PgConnectOptions =
                    admin_url.parse().map_err(TestDatabaseError::Sqlx)?;
                let base_options = base_options.log_statements(LevelFilter::Off);

                let admin_pool = PgPoolOptions::new()
                    .max_connections(1)
                    .connect_with(base_options.clone())
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                let database_name = format!("lms_test_{}", Uuid::new_v4().simple());
                let create_sql =
                    format!("CREATE DATABASE \"{}\" TEMPLATE template0", database_name);
                sqlx::query(&create_sql)
                    .execute(&admin_pool)
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;
                admin_pool.close().await;

                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect_with(base_options.clone().database(&database_name))
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                MIGRATOR.run(&pool).await?;

                Ok(Self {
                    pool: Some(pool),
                    admin_options: base_options,
                    database_name,
                    container,
                })
            }

            /// Cloneable connection pool for use in tests and Rocket state.
            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            pub fn pool_clone(&self) -> PgPool {
                self.pool().clone()
            }

            /// Close pool connections and drop the ephemeral database.
            pub async fn close(mut self) -> Result<(), TestDatabaseError> {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }

                drop_database_with_fallback(self.admin_options.clone(), &self.database_name)
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                if let Some(container) = self.container.take() {
                    drop(container);
                }

                Ok(())
            }
        }

        async fn drop_database_with_fallback(
            admin_options: PgConnectOptions,
            database_name: &str,
        ) -> Result<(), sqlx::Error> {
            let admin_pool = PgPoolOptions::new()
                .max_connections(1)
                .connect_with(admin_options)
                .await?;

            let drop_force = format!("DROP DATABASE \"{}\" WITH (FORCE)", database_name);
            match sqlx::query(&drop_force).execute(&admin_pool).await {
                Ok(_) => Ok(()),
                Err(err) if force_drop_unsupported(&err) => {
                    let drop_sql = format!("DROP DATABASE \"{}\"", database_name);
                    sqlx::query(&drop_sql).execute(&admin_pool).await?;
                    Ok(())
                }
                Err(err) => Err(err),
            }
        }

        fn force_drop_unsupported(err: &sqlx::Error) -> bool {
            matches!(
                err,
                sqlx::Error::Database(db_err)
                    if db_err
                        .code()
                        .map(|code| code == "42601" || code == "0A000")
                        .unwrap_or(false)
            )
        }
    }

    /// Builder for constructing Rocket instances tailored for integration
    /// tests: random port, logging off, JSON catchers registered.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        pg_pool: Option<PgPool>,
        auth_state: Option<AuthState>,
    }

    impl TestRocketBuilder {
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                pg_pool: None,
                auth_state: None,
            }
        }

        /// Mount routes under `/api`, where the application serves them.
        pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/api".to_string(), routes));
            self
        }

        /// Manage a `PgPool` for tests that exercise database-backed
        /// routes.
        pub fn manage_pg_pool(mut self, pool: PgPool) -> Self {
            self.pg_pool = Some(pool);
            self
        }

        /// Manage an [`AuthState`] for tests that exercise guarded routes.
        pub fn manage_auth_state(mut self, auth_state: AuthState) -> Self {
            self.auth_state = Some(auth_state);
            self
        }

        pub fn build(self) -> Rocket<Build> {
            let mut rocket =
                rocket::custom(self.figment).register("/", crate::catchers::catchers());

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(pool) = self.pg_pool {
                rocket = rocket.manage(pool);
            }

            if let Some(auth_state) = self.auth_state {
                rocket = rocket.manage(auth_state);
            }

            rocket
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
