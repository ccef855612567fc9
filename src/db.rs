use crate::config::{AppConfig, PoolConfig};
use crate::errors::ServiceError;
use futures::future::BoxFuture;
use metrics::{counter, gauge, histogram};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DatabaseTransaction, TransactionError, TransactionTrait};
use sea_orm_migration::MigratorTrait;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub type DbPool = DatabaseConnection;

fn connect_options(url: &str, pool: &PoolConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(url.to_owned());
    opt.max_connections(pool.max_connections)
        .min_connections(pool.min_connections)
        .connect_timeout(pool.connect_timeout())
        .acquire_timeout(pool.acquire_timeout())
        .idle_timeout(pool.idle_timeout())
        .sqlx_logging(false);
    opt
}

/// Opens a pool against `url` sized by `pool`.
pub async fn connect_with(url: &str, pool: &PoolConfig) -> Result<DbPool, ServiceError> {
    debug!(?pool, "Opening worksheet database pool");
    gauge!("worksheets.db.max_connections", pool.max_connections as f64);

    let db = Database::connect(connect_options(url, pool)).await.map_err(|e| {
        error!(error = %e, "Could not open worksheet database");
        ServiceError::DatabaseError(e)
    })?;

    info!(max_connections = pool.max_connections, "Worksheet database ready");
    Ok(db)
}

/// Opens the configured pool and, when `run_migrations` is set, brings the
/// schema up to date before handing it out.
pub async fn connect(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db = connect_with(&cfg.database_url, &cfg.pool).await?;
    if cfg.run_migrations {
        run_migrations(&db).await?;
    }
    Ok(db)
}

pub async fn run_migrations(db: &DbPool) -> Result<(), ServiceError> {
    let start = Instant::now();
    match crate::migrator::Migrator::up(db, None).await {
        Ok(()) => {
            info!(elapsed = ?start.elapsed(), "Worksheet schema is up to date");
            Ok(())
        }
        Err(e) => {
            error!(elapsed = ?start.elapsed(), error = %e, "Schema migration failed");
            Err(ServiceError::DatabaseError(e))
        }
    }
}

/// Round trip to the database; records latency or a failure counter.
pub async fn check_connection(db: &DbPool) -> Result<(), ServiceError> {
    let start = Instant::now();
    if let Err(e) = db.ping().await {
        counter!("worksheets.db.connection_failures", 1);
        error!(error = %e, "Database ping failed");
        return Err(ServiceError::DatabaseError(e));
    }
    gauge!("worksheets.db.connection_latency", start.elapsed().as_millis() as f64);
    Ok(())
}

/// Runs `f` as one unit of work: commits when it returns `Ok`, rolls back
/// everything it wrote otherwise.
///
/// This is the only place a transaction is begun or finished; everything
/// inside `f` borrows the same `DatabaseTransaction`.
pub async fn unit_of_work<F, T>(db: &DbPool, operation: &'static str, f: F) -> Result<T, ServiceError>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    T: Send,
{
    let unit_id = Uuid::new_v4();
    let start = Instant::now();
    debug!(unit_id = %unit_id, operation, "Starting unit of work");

    let result = db.transaction::<_, T, ServiceError>(f).await;

    let elapsed = start.elapsed();
    histogram!("worksheets.unit_of_work.duration", elapsed, "operation" => operation);

    match result {
        Ok(value) => {
            counter!("worksheets.unit_of_work.committed", 1, "operation" => operation);
            debug!(unit_id = %unit_id, operation, "Unit of work committed in {:?}", elapsed);
            Ok(value)
        }
        Err(TransactionError::Connection(e)) => {
            counter!("worksheets.unit_of_work.rolled_back", 1, "operation" => operation);
            error!(unit_id = %unit_id, operation, "Unit of work failed to commit: {}", e);
            Err(ServiceError::db_error(e))
        }
        Err(TransactionError::Transaction(e)) => {
            counter!("worksheets.unit_of_work.rolled_back", 1, "operation" => operation);
            warn!(unit_id = %unit_id, operation, "Unit of work rolled back after {:?}: {}", elapsed, e);
            Err(e)
        }
    }
}
