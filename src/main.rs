#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::Arc;

    use schemasync::core::config::Config;
    use schemasync::core::db::{
        DatabaseConfig, DbConfig, DbError, PoolError, PoolRegistry, TableDesignRepository,
        TableRelationRepository, create_pool_with_migrations,
    };
    use schemasync::core::{
        DbType, DdlExecutor, DryRunExecutor, PooledDdlExecutor, SchemaEngine,
    };
    use tracing_subscriber::EnvFilter;
    use uuid::Uuid;

    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load application config from environment variables
    let config = Config::from_env();

    // Log config status (without revealing URLs)
    tracing::info!(
        "Config loaded: database={}, target={}, target_type={}, dry_run={}",
        config.has_database(),
        config.has_target_database(),
        config
            .target_db_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "unspecified".to_string()),
        config.dry_run
    );

    let database_url = config.database_url.clone().ok_or(DbError::MissingDatabaseUrl)?;
    let pool = create_pool_with_migrations(&DbConfig::new(database_url)).await?;

    let executor: Arc<dyn DdlExecutor> = if config.executes_ddl() {
        if let Some(db_type @ (DbType::Oracle | DbType::SqlServer)) = config.target_db_type {
            return Err(PoolError::UnsupportedDriver(db_type).into());
        }
        let registry = Arc::new(PoolRegistry::new());
        let target_id = match (&config.target_database_url, config.target_db_type) {
            (Some(url), _) => {
                let target_id = Uuid::new_v4();
                registry.register_url(target_id, url, 5).await?;
                target_id
            }
            (None, Some(db_type)) => {
                let mut target = DatabaseConfig::new(
                    db_type,
                    config.target_host.clone().unwrap_or_else(|| "localhost".to_string()),
                    config.target_name.clone().unwrap_or_default(),
                )
                .credentials(
                    config.target_user.clone().unwrap_or_default(),
                    config.target_password.clone().unwrap_or_default(),
                );
                if let Some(port) = config.target_port {
                    target = target.port(port);
                }
                registry.register(&target).await?;
                target.id
            }
            (None, None) => unreachable!("executes_ddl requires a target"),
        };
        Arc::new(PooledDdlExecutor::new(registry, target_id))
    } else {
        tracing::warn!("No target database or dry run requested, DDL will only be logged");
        Arc::new(DryRunExecutor::new())
    };

    let engine = SchemaEngine::new(
        Arc::new(TableDesignRepository::new(pool.clone())),
        Arc::new(TableRelationRepository::new(pool)),
        executor,
    );

    let report = engine.tables().sync_all().await?;
    for failure in &report.failed {
        tracing::error!(
            table_id = %failure.table_id,
            code = %failure.code,
            error = failure.error.as_deref().unwrap_or_default(),
            "Table not synced"
        );
    }
    tracing::info!(
        "Sync finished: {} synced, {} failed",
        report.synced.len(),
        report.failed.len()
    );

    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
