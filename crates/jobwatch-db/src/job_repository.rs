use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres};

use jobwatch_core::error::AppError;
use jobwatch_core::models::{
    DISCOVERED_NOTE, Fingerprint, JobEntity, JobRecord, SeenOutcome, StatusHistoryEntry,
};
use jobwatch_core::status::JobStatus;
use jobwatch_core::traits::JobStore;

/// PostgreSQL-backed job store.
///
/// `upsert_seen` relies on `INSERT ... ON CONFLICT (fingerprint)` so that
/// concurrent observations of one posting create exactly one row.
#[derive(Clone)]
pub struct JobRepository {
    pool: Pool<Postgres>,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// -- Internal row types for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct JobRow {
    fingerprint: String,
    title: String,
    company: String,
    url: String,
    location: Option<String>,
    department: Option<String>,
    employment_type: Option<String>,
    first_seen: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    status: String,
    notes: Option<String>,
}

#[derive(sqlx::FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    job: JobRow,
    inserted: bool,
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    fingerprint: String,
    status: String,
    timestamp: DateTime<Utc>,
    notes: Option<String>,
}

#[derive(sqlx::FromRow)]
struct StatusCountRow {
    status: String,
    count: i64,
}

fn parse_fingerprint(raw: &str) -> Result<Fingerprint, AppError> {
    Fingerprint::parse(raw)
        .map_err(|_| AppError::DatabaseError(format!("corrupt fingerprint in storage: '{raw}'")))
}

fn parse_status(raw: &str) -> Result<JobStatus, AppError> {
    raw.parse()
        .map_err(|_| AppError::DatabaseError(format!("corrupt status in storage: '{raw}'")))
}

impl TryFrom<JobRow> for JobEntity {
    type Error = AppError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(JobEntity {
            fingerprint: parse_fingerprint(&row.fingerprint)?,
            title: row.title,
            company: row.company,
            url: row.url,
            location: row.location,
            department: row.department,
            employment_type: row.employment_type,
            first_seen: row.first_seen,
            last_updated: row.last_updated,
            status: parse_status(&row.status)?,
            notes: row.notes,
        })
    }
}

impl TryFrom<HistoryRow> for StatusHistoryEntry {
    type Error = AppError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(StatusHistoryEntry {
            fingerprint: parse_fingerprint(&row.fingerprint)?,
            status: parse_status(&row.status)?,
            timestamp: row.timestamp,
            notes: row.notes,
        })
    }
}

fn db_err(e: sqlx::Error) -> AppError {
    AppError::DatabaseError(e.to_string())
}

const JOB_COLUMNS: &str = "fingerprint, title, company, url, location, department, \
     employment_type, first_seen, last_updated, status, notes";

impl JobStore for JobRepository {
    async fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<JobEntity>, AppError> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE fingerprint = $1"
        ))
        .bind(fingerprint.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(JobEntity::try_from).transpose()
    }

    async fn upsert_seen(
        &self,
        record: &JobRecord,
        fingerprint: &Fingerprint,
        observed_at: DateTime<Utc>,
    ) -> Result<SeenOutcome, AppError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // xmax is zero only on rows this statement inserted.
        let row = sqlx::query_as::<_, UpsertRow>(&format!(
            r#"
            INSERT INTO jobs (fingerprint, title, company, url, location, department,
                              employment_type, first_seen, last_updated, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, 'new')
            ON CONFLICT (fingerprint) DO UPDATE SET
                title = EXCLUDED.title,
                url = EXCLUDED.url,
                location = EXCLUDED.location,
                department = EXCLUDED.department,
                employment_type = EXCLUDED.employment_type,
                last_updated = EXCLUDED.last_updated
            RETURNING {JOB_COLUMNS}, (xmax = 0) AS inserted
            "#
        ))
        .bind(fingerprint.as_str())
        .bind(&record.title)
        .bind(&record.company)
        .bind(&record.url)
        .bind(&record.location)
        .bind(&record.department)
        .bind(&record.employment_type)
        .bind(observed_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        if row.inserted {
            sqlx::query(
                r#"
                INSERT INTO job_status_history (fingerprint, status, timestamp, notes)
                VALUES ($1, 'new', $2, $3)
                "#,
            )
            .bind(fingerprint.as_str())
            .bind(observed_at)
            .bind(DISCOVERED_NOTE)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;

        Ok(SeenOutcome {
            entity: row.job.try_into()?,
            created: row.inserted,
        })
    }

    async fn set_status(
        &self,
        fingerprint: &Fingerprint,
        status: JobStatus,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<JobEntity, AppError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            UPDATE jobs
            SET status = $2, notes = $3, last_updated = $4
            WHERE fingerprint = $1
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(fingerprint.as_str())
        .bind(status.as_str())
        .bind(notes)
        .bind(at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?
        .ok_or_else(|| AppError::NotFound(fingerprint.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO job_status_history (fingerprint, status, timestamp, notes)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(fingerprint.as_str())
        .bind(status.as_str())
        .bind(at)
        .bind(notes)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        row.try_into()
    }

    async fn list(
        &self,
        status: Option<JobStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<JobEntity>, AppError> {
        // LIMIT NULL means no limit.
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            SELECT {JOB_COLUMNS} FROM jobs
            WHERE ($1::varchar IS NULL OR status = $1)
            ORDER BY first_seen DESC, fingerprint ASC
            LIMIT $2
            "#
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(limit.map(|l| l as i64))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(JobEntity::try_from).collect()
    }

    async fn history(&self, fingerprint: &Fingerprint) -> Result<Vec<StatusHistoryEntry>, AppError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT fingerprint, status, timestamp, notes
            FROM job_status_history
            WHERE fingerprint = $1
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(fingerprint.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(StatusHistoryEntry::try_from).collect()
    }

    async fn count_by_status(&self) -> Result<Vec<(JobStatus, i64)>, AppError> {
        let rows = sqlx::query_as::<_, StatusCountRow>(
            r#"
            SELECT status, COUNT(*) AS count
            FROM jobs
            GROUP BY status
            ORDER BY COUNT(*) DESC,
                     array_position(
                         ARRAY['new', 'applied', 'interviewed', 'offered', 'rejected', 'withdrawn']::varchar[],
                         status
                     )
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(|r| Ok((parse_status(&r.status)?, r.count)))
            .collect()
    }
}
