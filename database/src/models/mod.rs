//! Database models

pub mod activity;
pub mod catalog_item;
pub mod execution;
pub mod run_counter;
pub mod schedule;
pub mod setting;

pub use activity::{Activity, CreateActivity};
pub use catalog_item::{CatalogItem, CreateCatalogItem, UpdateCatalogItem};
pub use execution::{CreateExecution, Execution, ExecutionStatus};
pub use run_counter::{format_run_id, pool_for_user, RunCounter, RUN_ID_POOLS};
pub use schedule::{CreateSchedule, ExecutionSchedule};
pub use setting::{Setting, UpdateSetting};
