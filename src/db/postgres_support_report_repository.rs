use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use crate::{
    db::support_report_repository::SupportReportRepository,
    models::support_report::{NewSupportReport, SupportReport, SupportStats},
};

pub const CREATE_SUPPORT_REPORTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS support_reports (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        message TEXT NOT NULL,
        resolved BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

/// Brings a table created by the earlier deployment (`TIMESTAMP` without time
/// zone, nullable `resolved`) in line with `CREATE_SUPPORT_REPORTS_TABLE`.
/// Every statement is a no-op on an up-to-date table. Legacy timestamps are
/// read as UTC.
pub const UPGRADE_SUPPORT_REPORTS_TABLE: &[&str] = &[
    r#"
    DO $$
    BEGIN
        IF EXISTS (
            SELECT 1
            FROM information_schema.columns
            WHERE table_schema = current_schema()
              AND table_name = 'support_reports'
              AND column_name = 'created_at'
              AND data_type = 'timestamp without time zone'
        ) THEN
            ALTER TABLE support_reports
                ALTER COLUMN created_at TYPE TIMESTAMPTZ USING created_at AT TIME ZONE 'UTC';
        END IF;
    END
    $$
    "#,
    "UPDATE support_reports SET created_at = now() WHERE created_at IS NULL",
    r#"
    ALTER TABLE support_reports
        ALTER COLUMN created_at SET DEFAULT now(),
        ALTER COLUMN created_at SET NOT NULL
    "#,
    "UPDATE support_reports SET resolved = FALSE WHERE resolved IS NULL",
    r#"
    ALTER TABLE support_reports
        ALTER COLUMN resolved SET DEFAULT FALSE,
        ALTER COLUMN resolved SET NOT NULL
    "#,
];

pub struct PostgresSupportReportRepository {
    pub pool: PgPool,
}

impl PostgresSupportReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates `support_reports` if it does not exist yet and upgrades a
    /// legacy table in place. Safe to run on every startup.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(CREATE_SUPPORT_REPORTS_TABLE)
            .execute(&self.pool)
            .await?;

        for statement in UPGRADE_SUPPORT_REPORTS_TABLE {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        info!("support_reports table is ready");
        Ok(())
    }
}

#[async_trait]
impl SupportReportRepository for PostgresSupportReportRepository {
    async fn create_report(&self, report: NewSupportReport) -> Result<SupportReport, sqlx::Error> {
        sqlx::query_as::<_, SupportReport>(
            r#"
            INSERT INTO support_reports (name, email, message, resolved)
            VALUES ($1, $2, $3, FALSE)
            RETURNING id, name, email, message, resolved, created_at
            "#,
        )
        .bind(&report.name)
        .bind(&report.email)
        .bind(&report.message)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_reports(&self) -> Result<Vec<SupportReport>, sqlx::Error> {
        sqlx::query_as::<_, SupportReport>(
            r#"
            SELECT id, name, email, message, resolved, created_at
            FROM support_reports
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn latest_reports(&self, limit: i64) -> Result<Vec<SupportReport>, sqlx::Error> {
        sqlx::query_as::<_, SupportReport>(
            r#"
            SELECT id, name, email, message, resolved, created_at
            FROM support_reports
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
    }

    async fn report_stats(&self) -> Result<SupportStats, sqlx::Error> {
        sqlx::query_as::<_, SupportStats>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE resolved = FALSE) AS unresolved,
                   COUNT(*) FILTER (WHERE resolved = TRUE) AS resolved
            FROM support_reports
            "#,
        )
        .fetch_one(&self.pool)
        .await
    }

    async fn resolve_report(&self, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE support_reports SET resolved = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
    use std::str::FromStr;
    use time::OffsetDateTime;

    #[test]
    fn legacy_upgrade_backfills_before_tightening_columns() {
        let position = |needle: &str| {
            UPGRADE_SUPPORT_REPORTS_TABLE
                .iter()
                .position(|stmt| stmt.contains(needle))
                .unwrap()
        };

        let convert = UPGRADE_SUPPORT_REPORTS_TABLE[position("TYPE TIMESTAMPTZ")];
        assert!(convert.contains("'timestamp without time zone'"));
        assert!(convert.contains("AT TIME ZONE 'UTC'"));

        assert!(position("created_at IS NULL") < position("created_at SET NOT NULL"));
        assert!(position("resolved IS NULL") < position("resolved SET NOT NULL"));
    }

    /// Needs a scratch database: `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn upgrades_table_created_without_time_zone() {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        let schema = format!("legacy_{}", uuid::Uuid::new_v4().simple());

        let admin = PgPool::connect(&url).await.unwrap();
        sqlx::query(&format!("CREATE SCHEMA {schema}"))
            .execute(&admin)
            .await
            .unwrap();

        let options = PgConnectOptions::from_str(&url)
            .unwrap()
            .options([("search_path", schema.as_str())]);
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE support_reports (
                id SERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                message TEXT NOT NULL,
                resolved BOOLEAN DEFAULT FALSE,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            r#"
            INSERT INTO support_reports (name, email, message, resolved, created_at)
            VALUES ('Old', 'old@x.com', 'Hi', NULL, '2024-01-01 10:00:00')
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let repo = PostgresSupportReportRepository::new(pool.clone());
        repo.ensure_schema().await.unwrap();
        repo.ensure_schema().await.unwrap();

        let created = repo
            .create_report(NewSupportReport {
                name: "Ada".into(),
                email: "ada@x.com".into(),
                message: "Help".into(),
            })
            .await
            .unwrap();
        assert!(!created.resolved);

        let reports = repo.list_reports().await.unwrap();
        assert_eq!(reports.len(), 2);
        let legacy = reports.iter().find(|r| r.name == "Old").unwrap();
        assert!(!legacy.resolved);
        assert_eq!(
            legacy.created_at,
            OffsetDateTime::from_unix_timestamp(1_704_103_200).unwrap()
        );

        let stats = repo.report_stats().await.unwrap();
        assert_eq!(stats, SupportStats { total: 2, unresolved: 2, resolved: 0 });

        pool.close().await;
        sqlx::query(&format!("DROP SCHEMA {schema} CASCADE"))
            .execute(&admin)
            .await
            .unwrap();
    }
}
