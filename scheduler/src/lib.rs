//! Task scheduler
//!
//! Drives recurring catalog launches from cron expressions. Handlers
//! are async and the tick loop races against a cancellation token, so
//! shutdown never leaves a timer behind.

use chrono::Utc;
use cron::Schedule;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use autoportal_core::{Error, Result};

/// How often due tasks are checked
const TICK: std::time::Duration = std::time::Duration::from_secs(60);

/// Boxed async task handler
pub type TaskHandler =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

/// Scheduled task
struct Task {
    id: String,
    schedule: Schedule,
    handler: TaskHandler,
}

/// Cron-driven task scheduler
pub struct Scheduler {
    tasks: Arc<RwLock<Vec<Task>>>,
    cancel: CancellationToken,
}

impl Scheduler {
    /// Create a new scheduler; the token is the shutdown signal for the
    /// tick loop and is usually a child of the server-wide token.
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(Vec::new())),
            cancel,
        }
    }

    /// Add a task to the scheduler
    pub async fn add_task(
        &self,
        id: impl Into<String>,
        cron_expr: &str,
        handler: TaskHandler,
    ) -> Result<()> {
        let id = id.into();
        let schedule = Schedule::from_str(cron_expr)
            .map_err(|e| Error::Scheduler(format!("Invalid cron expression: {}", e)))?;

        let mut tasks = self.tasks.write().await;
        tasks.push(Task {
            id: id.clone(),
            schedule,
            handler,
        });

        info!(id = %id, schedule = %cron_expr, "Scheduled task added");
        Ok(())
    }

    /// Number of registered tasks
    pub async fn task_count(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Start the tick loop
    pub fn start(&self) {
        info!("Starting scheduler");

        let tasks = self.tasks.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Scheduler shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(TICK) => {}
                }

                let now = Utc::now();
                let tasks_read = tasks.read().await;
                for task in tasks_read.iter() {
                    // Fire tasks whose next occurrence lands inside this tick
                    if let Some(next) = task.schedule.upcoming(Utc).next() {
                        let until = (next - now).num_seconds();
                        if (0..=TICK.as_secs() as i64).contains(&until) {
                            debug!(task_id = %task.id, "Executing scheduled task");
                            let handler = task.handler.clone();
                            let task_id = task.id.clone();
                            tokio::spawn(async move {
                                match handler().await {
                                    Ok(()) => {
                                        info!(task_id = %task_id, "Task completed successfully")
                                    }
                                    Err(e) => {
                                        error!(task_id = %task_id, error = %e, "Task execution failed")
                                    }
                                }
                            });
                        }
                    }
                }
            }
        });
    }

    /// Signal the tick loop to stop
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
