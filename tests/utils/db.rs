/// Database test utilities with singleton pattern
///
/// Postgres-backed tests read TEST_DATABASE_URL and are `#[ignore]`d by default.
/// Run them with `cargo test -- --ignored` against a scratch database.
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, Pool};
use merchant_cascade::shared::Database;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

type PgPool = Pool<ConnectionManager<PgConnection>>;

static DB_POOL: OnceLock<PgPool> = OnceLock::new();

/// Tables in child-first order
const TABLES: [&str; 8] = [
    "background_jobs",
    "secondary_mid_location_links",
    "primary_mids",
    "secondary_mids",
    "psimis",
    "locations",
    "merchants",
    "plans",
];

/// Get or create the singleton pool, migrating the schema on first use
pub fn get_test_db_pool() -> PgPool {
    DB_POOL
        .get_or_init(|| {
            dotenvy::dotenv().ok();
            let test_db_url = std::env::var("TEST_DATABASE_URL")
                .expect("TEST_DATABASE_URL must be set in .env for tests");

            let manager = ConnectionManager::<PgConnection>::new(test_db_url);
            let pool = r2d2::Pool::builder()
                .max_size(10)
                .build(manager)
                .expect("Failed to create test database pool");

            Database::from_pool(pool.clone())
                .run_migrations()
                .expect("Failed to migrate test database");
            pool
        })
        .clone()
}

/// A `Database` sharing the singleton pool
pub fn test_database() -> Arc<Database> {
    Arc::new(Database::from_pool(get_test_db_pool()))
}

/// Clean all test tables - use at the start of each test
pub fn clean_test_db() {
    let pool = get_test_db_pool();
    let mut conn = pool.get().expect("Failed to get DB connection");

    diesel::sql_query(format!("TRUNCATE TABLE {} CASCADE", TABLES.join(", ")))
        .execute(&mut conn)
        .expect("Failed to clean test tables");
}

/// Global test mutex for serialization
static TEST_LOCK: Mutex<()> = Mutex::new(());

/// Acquire test lock to ensure tests run serially
/// Returns a guard that releases the lock when dropped
pub fn acquire_test_lock() -> MutexGuard<'static, ()> {
    // Handle poisoned mutex by recovering from panic
    match TEST_LOCK.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
