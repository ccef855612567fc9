use stateset_worksheets::config::{init_tracing, load_config};
use stateset_worksheets::db::{check_connection, connect_with, run_migrations};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = load_config()?;
    init_tracing(cfg.log_level(), cfg.log_json);

    info!(environment = %cfg.environment, "Migrating worksheet schema");

    let db = connect_with(&cfg.database_url, &cfg.pool).await?;
    check_connection(&db).await?;
    run_migrations(&db).await?;

    info!("Migration finished");
    Ok(())
}
