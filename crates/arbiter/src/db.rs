//! Database connection utilities.

use sea_orm::{Database, DatabaseConnection, DbErr};

fn is_sqlite(database_url: &str) -> bool {
    database_url.starts_with("sqlite:")
}

/// Configure SQLite pragmas for concurrent sync passes.
///
/// - `journal_mode=WAL` so the reconciler can read while a pass writes
/// - `busy_timeout=5000` so writers queue on the lock instead of failing
/// - `synchronous=NORMAL`, safe under WAL
async fn configure_sqlite(db: &DatabaseConnection) -> Result<(), DbErr> {
    use sea_orm::{ConnectionTrait, Statement};

    for pragma in [
        "PRAGMA journal_mode=WAL",
        "PRAGMA busy_timeout=5000",
        "PRAGMA synchronous=NORMAL",
    ] {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            pragma.to_string(),
        ))
        .await?;
    }

    Ok(())
}

/// Establish a connection to the database.
///
/// SQLite connections get the pragmas from `configure_sqlite`.
///
/// # Arguments
/// * `database_url` - e.g. `sqlite://arbiter.db?mode=rwc` or `postgres:///arbiter`
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    if is_sqlite(database_url) {
        configure_sqlite(&db).await?;
    }

    Ok(db)
}

/// Connect and run all pending migrations.
///
/// # Example
/// ```ignore
/// let db = arbiter::connect_and_migrate("sqlite::memory:").await?;
/// ```
#[cfg(feature = "migrate")]
pub async fn connect_and_migrate(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    use sea_orm_migration::MigratorTrait;

    let db = connect(database_url).await?;
    crate::migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn configure_sqlite_runs_all_pragmas() {
        let exec = || MockExecResult {
            rows_affected: 0,
            last_insert_id: 0,
        };
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_results([exec(), exec(), exec()])
            .into_connection();

        configure_sqlite(&db)
            .await
            .expect("mock sqlite pragma execs should succeed");

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn sqlite_detection_covers_memory_urls() {
        assert!(is_sqlite("sqlite::memory:"));
        assert!(is_sqlite("sqlite://arbiter.db?mode=rwc"));
        assert!(!is_sqlite("postgres:///arbiter"));
    }

    #[tokio::test]
    async fn connect_returns_error_for_invalid_database_url() {
        let err = connect("this-is-not-a-db-url")
            .await
            .expect_err("invalid URL should error");
        let msg = err.to_string().to_ascii_lowercase();
        assert!(
            msg.contains("error") || msg.contains("invalid"),
            "unexpected error message: {err}"
        );
    }
}
