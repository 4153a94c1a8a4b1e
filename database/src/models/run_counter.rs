//! Run identifier pools
//!
//! Run ids have the shape `RUN{pool}-{sequence}` where the pool is one
//! of five two-digit buckets chosen per team and the sequence counts up
//! independently per (year, pool). Users in the same group always land
//! in the same pool, so run ids sort usefully per team.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The available id pools
pub const RUN_ID_POOLS: [&str; 5] = ["00", "01", "02", "03", "04"];

/// RunCounter model - per-(year, pool) sequence state
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RunCounter {
    pub year: i64,
    pub pool: String,
    pub sequence: i64,
    pub last_used: DateTime<Utc>,
}

/// Pool bucket for a user: the first group wins, falling back to the
/// user key itself, falling back to pool 00. The character-sum hash is
/// stable across processes so a team keeps its pool.
pub fn pool_for_user(user_key: Option<&str>, groups: &[String]) -> &'static str {
    if let Some(group) = groups.first() {
        return RUN_ID_POOLS[char_sum(group) % RUN_ID_POOLS.len()];
    }
    if let Some(key) = user_key.filter(|k| !k.is_empty()) {
        return RUN_ID_POOLS[char_sum(key) % RUN_ID_POOLS.len()];
    }
    RUN_ID_POOLS[0]
}

fn char_sum(s: &str) -> usize {
    s.chars().map(|c| c as usize).sum()
}

/// Format a run id from its parts
pub fn format_run_id(pool: &str, sequence: i64) -> String {
    format!("RUN{}-{:05}", pool, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_is_stable_and_in_range() {
        let groups = vec!["network-ops".to_string(), "second".to_string()];
        let a = pool_for_user(Some("jdoe@corp.example"), &groups);
        let b = pool_for_user(Some("other@corp.example"), &groups);
        // First group decides, user key is irrelevant when groups exist
        assert_eq!(a, b);
        assert!(RUN_ID_POOLS.contains(&a));
    }

    #[test]
    fn groupless_users_hash_on_their_key() {
        let pool = pool_for_user(Some("jdoe@corp.example"), &[]);
        assert!(RUN_ID_POOLS.contains(&pool));
        assert_eq!(pool, pool_for_user(Some("jdoe@corp.example"), &[]));
    }

    #[test]
    fn anonymous_users_fall_back_to_pool_zero() {
        assert_eq!(pool_for_user(None, &[]), "00");
        assert_eq!(pool_for_user(Some(""), &[]), "00");
    }

    #[test]
    fn run_id_format() {
        assert_eq!(format_run_id("02", 17), "RUN02-00017");
        assert_eq!(format_run_id("00", 1), "RUN00-00001");
    }
}
