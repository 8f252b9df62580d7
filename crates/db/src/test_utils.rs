//! Test database helpers.
//!
//! Integration tests run against the PostgreSQL container from
//! `docker-compose.test.yml`; connection details come from `TEST_DB_*`
//! environment variables.

use std::sync::Arc;

use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use tracing::info;

/// Tables created by the migrations, in FK-safe truncation order.
const CATALOG_TABLES: [&str; 5] = ["product", "category", "user", "upload_job", "report_job"];

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Connection settings for the test database.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Host the container listens on.
    pub host: String,
    /// Mapped port, 5433 by default.
    pub port: u16,
    /// Role used by the tests.
    pub username: String,
    /// Role password.
    pub password: String,
    /// Database to connect to.
    pub database: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: env_or("TEST_DB_HOST", "localhost"),
            port: env_or("TEST_DB_PORT", "5433").parse().unwrap_or(5433),
            username: env_or("TEST_DB_USER", "catalog_test"),
            password: env_or("TEST_DB_PASSWORD", "catalog_test"),
            database: env_or("TEST_DB_NAME", "catalog_test"),
        }
    }
}

impl TestDbConfig {
    /// URL of the test database itself.
    #[must_use]
    pub fn database_url(&self) -> String {
        let Self { host, port, username, password, database } = self;
        format!("postgres://{username}:{password}@{host}:{port}/{database}")
    }

    /// URL of the maintenance database, for CREATE/DROP DATABASE.
    #[must_use]
    pub fn postgres_url(&self) -> String {
        let Self { host, port, username, password, .. } = self;
        format!("postgres://{username}:{password}@{host}:{port}/postgres")
    }
}

/// Handle on a connected test database.
pub struct TestDatabase {
    /// Live connection, shared so repositories can hold it too.
    pub conn: Arc<DatabaseConnection>,
    /// Settings the connection was opened with.
    pub config: TestDbConfig,
}

impl TestDatabase {
    /// Connect to the shared test database using the environment defaults.
    pub async fn new() -> Result<Self, DbErr> {
        Self::with_config(TestDbConfig::default()).await
    }

    /// Connect with explicit settings.
    pub async fn with_config(config: TestDbConfig) -> Result<Self, DbErr> {
        let conn = Database::connect(&config.database_url()).await?;
        info!(database = %config.database, "Connected to test database");
        Ok(Self {
            conn: Arc::new(conn),
            config,
        })
    }

    /// Create and connect to a throwaway database with a random name.
    ///
    /// Lets tests that mutate schema or data run in parallel. Callers should
    /// finish with [`TestDatabase::drop_database`].
    pub async fn create_unique() -> Result<Self, DbErr> {
        let mut config = TestDbConfig::default();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        config.database = format!("catalog_test_{}", &suffix[..8]);

        let admin = Database::connect(&config.postgres_url()).await?;
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("CREATE DATABASE \"{}\"", config.database),
            ))
            .await?;
        admin.close().await?;

        info!(database = %config.database, "Created test database");
        Self::with_config(config).await
    }

    /// Borrow the live connection.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Empty every catalog table, keeping the schema and migration history.
    ///
    /// Tables the migrations have not created yet are skipped, so this is
    /// safe to call against a fresh database.
    pub async fn cleanup(&self) -> Result<(), DbErr> {
        let rows = self
            .conn
            .query_all(Statement::from_string(
                DatabaseBackend::Postgres,
                "SELECT tablename FROM pg_tables WHERE schemaname = 'public'".to_string(),
            ))
            .await?;

        let mut present = Vec::new();
        for row in rows {
            let name: String = row.try_get("", "tablename")?;
            if CATALOG_TABLES.contains(&name.as_str()) {
                present.push(format!("\"{name}\""));
            }
        }
        if present.is_empty() {
            return Ok(());
        }

        let truncate = format!("TRUNCATE TABLE {} CASCADE", present.join(", "));
        self.conn
            .execute(Statement::from_string(DatabaseBackend::Postgres, truncate))
            .await?;

        info!(tables = present.len(), "Truncated catalog tables");
        Ok(())
    }

    /// Drop the database this handle points at.
    ///
    /// Consumes self: the connection has to close before PostgreSQL accepts
    /// the DROP. Other sessions on the database are terminated first.
    pub async fn drop_database(self) -> Result<(), DbErr> {
        self.conn.close_by_ref().await?;

        let admin = Database::connect(&self.config.postgres_url()).await?;
        let terminate = format!(
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}'",
            self.config.database
        );
        admin
            .execute(Statement::from_string(DatabaseBackend::Postgres, terminate))
            .await
            .ok();
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("DROP DATABASE IF EXISTS \"{}\"", self.config.database),
            ))
            .await?;
        admin.close().await?;

        info!(database = %self.config.database, "Dropped test database");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_compose_container() {
        let config = TestDbConfig::default();
        assert_eq!(config.port, 5433);
        assert_eq!(config.database, "catalog_test");
    }

    #[test]
    fn database_url_includes_all_parts() {
        let config = TestDbConfig {
            host: "db.internal".to_string(),
            port: 6543,
            username: "u".to_string(),
            password: "p".to_string(),
            database: "catalog_test_abc".to_string(),
        };
        assert_eq!(
            config.database_url(),
            "postgres://u:p@db.internal:6543/catalog_test_abc"
        );
        assert!(config.postgres_url().ends_with("/postgres"));
    }
}
