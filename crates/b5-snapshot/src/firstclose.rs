use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Read-only handle onto the external first-close database (spec §6.2).
///
/// Only `first_closes` (for per-day row counts) and `history_state` (for the
/// pending-symbol count) are consumed; both are produced by the upstream
/// ingester and treated as someone else's schema — this reader degrades to
/// zero on any failure rather than erroring out (spec §7).
#[derive(Clone)]
pub struct FirstCloseReader {
    pool: SqlitePool,
}

impl FirstCloseReader {
    pub async fn connect_readonly(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::from_str(&format!(
            "sqlite://{}",
            path.as_ref().display()
        ))?
        .read_only(true)
        .busy_timeout(Duration::from_millis(2000));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await?;

        Ok(Self { pool })
    }

    /// Number of `first_closes` rows recorded for `day`. Returns `0` if the
    /// table is absent or the query otherwise fails.
    pub async fn row_count_for_day(&self, day: &str) -> i64 {
        let result = sqlx::query("SELECT COUNT(*) AS n FROM first_closes WHERE day = ?1")
            .bind(day)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => row.try_get::<i64, _>("n").unwrap_or(0),
            Err(e) => {
                tracing::warn!(error = %e, "first_closes row-count query failed; degrading to 0");
                0
            }
        }
    }

    /// Number of symbols in `history_state` whose first-close fetch has not
    /// yet completed (`done = 0`). Returns `0` on failure.
    pub async fn pending_symbol_count(&self) -> i64 {
        let result = sqlx::query("SELECT COUNT(*) AS n FROM history_state WHERE done = 0")
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => row.try_get::<i64, _>("n").unwrap_or(0),
            Err(e) => {
                tracing::warn!(error = %e, "history_state pending-count query failed; degrading to 0");
                0
            }
        }
    }
}
