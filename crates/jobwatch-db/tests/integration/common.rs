use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

/// SQL migration statements, executed one at a time.
const MIGRATIONS: &[&str] = &[
    // 001_jobs.sql
    r#"CREATE TABLE IF NOT EXISTS jobs (
        fingerprint VARCHAR(64) PRIMARY KEY,
        title TEXT NOT NULL,
        company TEXT NOT NULL,
        url TEXT NOT NULL,
        location TEXT,
        department TEXT,
        employment_type TEXT,
        first_seen TIMESTAMPTZ NOT NULL,
        last_updated TIMESTAMPTZ NOT NULL,
        status VARCHAR(20) NOT NULL DEFAULT 'new',
        notes TEXT,
        CONSTRAINT chk_jobs_status CHECK (
            status IN ('new', 'applied', 'interviewed', 'offered', 'rejected', 'withdrawn')
        )
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_jobs_first_seen ON jobs(first_seen DESC)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status, first_seen DESC)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_jobs_company ON jobs(company)"#,
    r#"CREATE TABLE IF NOT EXISTS job_status_history (
        id BIGSERIAL PRIMARY KEY,
        fingerprint VARCHAR(64) NOT NULL REFERENCES jobs(fingerprint),
        status VARCHAR(20) NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL,
        notes TEXT,
        CONSTRAINT chk_history_status CHECK (
            status IN ('new', 'applied', 'interviewed', 'offered', 'rejected', 'withdrawn')
        )
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_history_fingerprint
        ON job_status_history(fingerprint, timestamp, id)"#,
];

/// Spins up a PostgreSQL container and returns a connected pool.
///
/// The `ContainerAsync` must be kept in scope for the test duration —
/// dropping it will stop the container.
pub async fn setup_test_db() -> (PgPool, ContainerAsync<GenericImage>) {
    let container = GenericImage::new("postgres", "16")
        .with_exposed_port(ContainerPort::Tcp(5432))
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_env_var("POSTGRES_PASSWORD", "postgres")
        .with_env_var("POSTGRES_DB", "jobwatch_test")
        .start()
        .await
        .expect("Failed to start PostgreSQL container");

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get port");

    let connection_string = format!("postgresql://postgres:postgres@{host}:{port}/jobwatch_test");

    // Retry connection until container is fully ready
    const MAX_RETRIES: u32 = 30;
    let mut retries = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .connect(&connection_string)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retries += 1;
                if retries >= MAX_RETRIES {
                    panic!("Failed to connect to database after {MAX_RETRIES} retries: {e}");
                }
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }
    };

    // Run migrations one statement at a time
    for migration in MIGRATIONS {
        sqlx::query(migration)
            .execute(&pool)
            .await
            .expect("Failed to run migration");
    }

    (pool, container)
}
