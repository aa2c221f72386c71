use diesel::connection::SimpleConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use rocket::fairing::AdHoc;
use rocket::request::{self, FromRequest, Request};
use rocket::{Orbit, Rocket};
use rocket_sync_db_pools::{database, diesel};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[database("sqlite_db")]
pub struct DbConn(diesel::SqliteConnection);

/// Request guard for handlers that fan work out over several pooled
/// connections. Each call to [`DbPool::get`] checks out its own connection.
pub struct DbPool<'r>(&'r Rocket<Orbit>);

impl DbPool<'_> {
    pub async fn get(&self) -> Option<DbConn> {
        DbConn::get_one(self.0).await
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for DbPool<'r> {
    type Error = std::convert::Infallible;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        request::Outcome::Success(DbPool(request.rocket()))
    }
}

/// Enables foreign key enforcement, which SQLite leaves off by default.
/// Schedule and entry cascades depend on it.
pub fn set_foreign_keys(conn: &mut diesel::SqliteConnection) -> diesel::QueryResult<()> {
    conn.batch_execute("PRAGMA foreign_keys = ON")
}

/// Enables foreign keys on a pooled connection at ignition.
pub fn set_foreign_keys_fairing() -> AdHoc {
    AdHoc::on_ignite("Set Foreign Keys", |rocket| async {
        let conn = DbConn::get_one(&rocket).await.expect("database connection for pragmas");
        if let Err(e) = conn.run(set_foreign_keys).await {
            error!("Failed to enable foreign keys: {}", e);
        }
        rocket
    })
}

/// Runs all pending migrations.
///
/// # Panics
/// Panics if any migration fails; the service cannot run on a stale schema.
pub fn run_pending_migrations(conn: &mut diesel::SqliteConnection) {
    let applied = conn.run_pending_migrations(MIGRATIONS).expect("Failed to run pending migrations");
    for version in applied {
        info!("Applied migration {}", version);
    }
}

pub fn run_migrations_fairing() -> AdHoc {
    AdHoc::on_ignite("Diesel Migrations", |rocket| async {
        let conn = DbConn::get_one(&rocket).await.expect("database connection for migration");
        conn.run(|c| {
            run_pending_migrations(c);
        })
        .await;
        rocket
    })
}
