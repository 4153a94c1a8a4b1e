//! Application state

use std::sync::Arc;
use std::time::Duration;

use autoportal_core::{AuditLog, AwxClient, ConfigProvider, Result, SettingsResolver};
use autoportal_database::{Database, SqliteSettingsStore};
use autoportal_scheduler::Scheduler;
use sqlx::{Pool, Sqlite};
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Shared application state
///
/// Cloned into every Axum handler; all fields are cheap handles.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: Pool<Sqlite>,
    pub awx: Arc<AwxClient>,
    pub config_provider: Arc<dyn ConfigProvider>,
    pub audit: Arc<AuditLog>,
    /// Server-wide shutdown signal; pollers and the scheduler derive
    /// child tokens from it
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create new application state
    pub async fn new(config: Config) -> Result<Self> {
        let database = Database::new(&config.database_url).await?;
        database.migrate().await?;
        let pool = database.pool().clone();

        let audit = Arc::new(AuditLog::new(&config.audit_log_path)?);

        let mut resolver = SettingsResolver::new(SqliteSettingsStore::new(pool.clone()))
            .with_env_defaults(config.awx_base_url.clone(), config.awx_token.clone());
        if let Some(ttl) = config.config_cache_ttl_seconds {
            resolver = resolver.with_cache_ttl(Duration::from_secs(ttl));
        }
        let config_provider: Arc<dyn ConfigProvider> = Arc::new(resolver);

        let awx = Arc::new(AwxClient::new(config_provider.clone()).with_audit(audit.clone()));

        Ok(Self {
            config: Arc::new(config),
            pool,
            awx,
            config_provider,
            audit,
            shutdown: CancellationToken::new(),
        })
    }

    /// Load enabled schedules and start the scheduler loop.
    ///
    /// A schedule with an invalid cron expression is skipped with an
    /// error log instead of failing startup; the rest keep running.
    pub async fn start_scheduler(&self) -> Result<Scheduler> {
        use autoportal_database::queries::schedules;
        use tracing::{error, info};

        let scheduler = Scheduler::new(self.shutdown.child_token());
        let entries = schedules::list_enabled_schedules(&self.pool).await?;
        info!("Loading {} enabled schedules", entries.len());

        for schedule in entries {
            let schedule_id = schedule.id;
            let catalog_id = schedule.catalog_id.clone();
            let parameters = schedule.get_parameters();
            let state = self.clone();

            let handler: Arc<
                dyn Fn() -> std::pin::Pin<
                        Box<dyn std::future::Future<Output = Result<()>> + Send>,
                    > + Send
                    + Sync,
            > = Arc::new(move || {
                let state = state.clone();
                let catalog_id = catalog_id.clone();
                let parameters = parameters.clone();
                Box::pin(async move {
                    crate::executor::run_scheduled(&state, schedule_id, &catalog_id, &parameters)
                        .await
                })
            });

            match scheduler
                .add_task(format!("schedule_{}", schedule_id), &schedule.cron_expr, handler)
                .await
            {
                Ok(()) => {
                    info!(schedule_id, schedule = %schedule.cron_expr, "Schedule registered")
                }
                Err(e) => {
                    error!(schedule_id, error = %e, "Skipping schedule with invalid cron expression")
                }
            }
        }

        scheduler.start();
        Ok(scheduler)
    }
}
