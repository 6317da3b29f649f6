//! Shared connect-and-ping helper (§5 EXPANSION), used by both the
//! Introspector and the Executor so a dead or misconfigured connection
//! fails fast instead of hanging on the first real query.

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::ConnectOptions;
use thiserror::Error;
use tracing::warn;

const PING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("failed to connect: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("connected but SELECT 1 did not return within {0:?}")]
    PingTimeout(Duration),
    #[error("ping query failed: {0}")]
    Ping(#[source] sqlx::Error),
}

/// Connects with `sslmode=disable` as the default (§6), then issues
/// `SELECT 1` under a five-second timeout. Never logs the connection string.
pub async fn connect_and_ping(options: PgConnectOptions) -> Result<PgConnection, ConnectError> {
    let mut conn = options.connect().await.map_err(ConnectError::Connect)?;

    match tokio::time::timeout(PING_TIMEOUT, sqlx::query("SELECT 1").execute(&mut conn)).await {
        Ok(Ok(_)) => Ok(conn),
        Ok(Err(err)) => {
            warn!(error = %err, "ping query failed");
            Err(ConnectError::Ping(err))
        }
        Err(_) => {
            warn!("ping timed out after {:?}", PING_TIMEOUT);
            Err(ConnectError::PingTimeout(PING_TIMEOUT))
        }
    }
}
