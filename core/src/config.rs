//! AWX connection configuration
//!
//! Connection settings live in the persistent settings store and fall
//! back to environment-supplied defaults. A base URL that is empty or a
//! well-known placeholder puts the system in demo mode: remote
//! operations return synthetic successful responses and no network I/O
//! happens. The demo/real decision is made in exactly one place,
//! [`Endpoint::resolve`], and consumed uniformly by every client
//! operation.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::warn;

use crate::error::{ClassifiedError, ErrorKind, Result};

/// Settings key holding the orchestration server base URL
pub const SETTING_API_ENDPOINT: &str = "default_api_endpoint";
/// Settings key holding the API token
pub const SETTING_AWX_TOKEN: &str = "awx_token";

/// Placeholder base URL shipped in seed data; never contacted
pub const PLACEHOLDER_BASE_URL: &str = "https://awx.example.com/api/v2";

/// Key/value lookup against the persistent settings store
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch a setting value, `None` when the key is absent
    async fn get(&self, key: &str) -> Result<Option<String>>;
}

/// Resolved connection settings; empty strings mean "unset"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwxConfig {
    pub base_url: String,
    pub token: String,
}

/// Source of the effective [`AwxConfig`], injected into the client
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    async fn get_config(&self) -> Result<AwxConfig>;
}

/// Fixed configuration, for tests and explicit-endpoint callers
pub struct StaticProvider(pub AwxConfig);

#[async_trait]
impl ConfigProvider for StaticProvider {
    async fn get_config(&self) -> Result<AwxConfig> {
        Ok(self.0.clone())
    }
}

/// Resolves connection settings from the store with environment
/// fallbacks and an optional short-TTL cache.
///
/// Store read failures are tolerated: the value is treated as unset and
/// the failure logged, so a broken settings table degrades to demo mode
/// instead of taking launches down.
pub struct SettingsResolver<S> {
    store: S,
    env_base_url: Option<String>,
    env_token: Option<String>,
    cache_ttl: Option<Duration>,
    cache: Mutex<Option<(Instant, AwxConfig)>>,
}

impl<S: SettingsStore> SettingsResolver<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            env_base_url: None,
            env_token: None,
            cache_ttl: None,
            cache: Mutex::new(None),
        }
    }

    /// Environment defaults used when the store has no value.
    ///
    /// An environment base URL containing `example.com` is ignored
    /// outright so a placeholder left in deployment env files cannot
    /// masquerade as a real endpoint.
    pub fn with_env_defaults(
        mut self,
        base_url: Option<String>,
        token: Option<String>,
    ) -> Self {
        self.env_base_url = base_url.filter(|url| !url.contains("example.com"));
        self.env_token = token;
        self
    }

    /// Cache resolved settings for `ttl`; staleness is bounded by the
    /// window. Without this every call reads the store fresh.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    async fn read_setting(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read setting, treating as unset");
                None
            }
        }
    }
}

#[async_trait]
impl<S: SettingsStore> ConfigProvider for SettingsResolver<S> {
    async fn get_config(&self) -> Result<AwxConfig> {
        if let Some(ttl) = self.cache_ttl {
            let cache = self.cache.lock().expect("config cache poisoned");
            if let Some((at, config)) = cache.as_ref() {
                if at.elapsed() < ttl {
                    return Ok(config.clone());
                }
            }
        }

        let base_url = match self.read_setting(SETTING_API_ENDPOINT).await {
            Some(url) => url,
            None => self.env_base_url.clone().unwrap_or_default(),
        };
        let token = match self.read_setting(SETTING_AWX_TOKEN).await {
            Some(token) => token,
            None => self.env_token.clone().unwrap_or_default(),
        };

        let config = AwxConfig { base_url, token };

        if self.cache_ttl.is_some() {
            let mut cache = self.cache.lock().expect("config cache poisoned");
            *cache = Some((Instant::now(), config.clone()));
        }

        Ok(config)
    }
}

/// Where a remote operation should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// No real endpoint configured; synthesize responses locally
    Demo,
    /// A configured server reachable with bearer auth
    Real { base_url: String, token: String },
}

impl Endpoint {
    /// Decide between demo and real operation.
    ///
    /// An unset or placeholder base URL short-circuits to [`Endpoint::Demo`]
    /// before any token handling. A real base URL without a token is a
    /// local configuration gap, reported as an `authentication` error
    /// distinct from a remote auth rejection.
    pub fn resolve(
        base_url: Option<&str>,
        token: Option<&str>,
    ) -> std::result::Result<Self, ClassifiedError> {
        let base_url = base_url.map(str::trim).filter(|s| !s.is_empty());
        let token = token.map(str::trim).filter(|s| !s.is_empty());

        match base_url {
            None => Ok(Endpoint::Demo),
            Some(url) if is_placeholder(url) => Ok(Endpoint::Demo),
            Some(url) => match token {
                Some(token) => Ok(Endpoint::Real {
                    base_url: url.trim_end_matches('/').to_string(),
                    token: token.to_string(),
                }),
                None => Err(ClassifiedError::new(
                    ErrorKind::Authentication,
                    "token is not configured for the automation server",
                )),
            },
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self, Endpoint::Demo)
    }
}

/// True when the URL is the seed placeholder or any `example.com` host
pub fn is_placeholder(url: &str) -> bool {
    url.is_empty() || url == PLACEHOLDER_BASE_URL || url.contains("example.com")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MapStore {
        values: HashMap<String, String>,
        reads: AtomicUsize,
    }

    impl MapStore {
        fn new(values: &[(&str, &str)]) -> Self {
            Self {
                values: values
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                reads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SettingsStore for MapStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.values.get(key).cloned())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl SettingsStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(crate::Error::Database("settings table missing".into()))
        }
    }

    #[tokio::test]
    async fn store_value_wins_over_env_default() {
        let resolver = SettingsResolver::new(MapStore::new(&[
            (SETTING_API_ENDPOINT, "https://awx.prod/api/v2"),
            (SETTING_AWX_TOKEN, "db-token"),
        ]))
        .with_env_defaults(
            Some("https://awx.env/api/v2".into()),
            Some("env-token".into()),
        );

        let config = resolver.get_config().await.unwrap();
        assert_eq!(config.base_url, "https://awx.prod/api/v2");
        assert_eq!(config.token, "db-token");
    }

    #[tokio::test]
    async fn env_fallback_applies_when_store_is_empty() {
        let resolver = SettingsResolver::new(MapStore::new(&[])).with_env_defaults(
            Some("https://awx.env/api/v2".into()),
            Some("env-token".into()),
        );

        let config = resolver.get_config().await.unwrap();
        assert_eq!(config.base_url, "https://awx.env/api/v2");
        assert_eq!(config.token, "env-token");
    }

    #[tokio::test]
    async fn placeholder_env_url_is_ignored() {
        let resolver = SettingsResolver::new(MapStore::new(&[])).with_env_defaults(
            Some("https://awx.example.com/api/v2".into()),
            Some("env-token".into()),
        );

        let config = resolver.get_config().await.unwrap();
        assert_eq!(config.base_url, "");
    }

    #[tokio::test]
    async fn store_failure_degrades_to_unset() {
        let resolver = SettingsResolver::new(FailingStore);
        let config = resolver.get_config().await.unwrap();
        assert_eq!(config, AwxConfig::default());
    }

    #[tokio::test]
    async fn ttl_cache_skips_repeat_store_reads() {
        let store = MapStore::new(&[(SETTING_API_ENDPOINT, "https://awx.prod/api/v2")]);
        let resolver = SettingsResolver::new(store).with_cache_ttl(Duration::from_secs(60));

        resolver.get_config().await.unwrap();
        resolver.get_config().await.unwrap();

        // Two keys on the first resolve, nothing afterwards
        assert_eq!(resolver.store.reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unset_and_placeholder_urls_resolve_to_demo() {
        assert!(Endpoint::resolve(None, None).unwrap().is_demo());
        assert!(Endpoint::resolve(Some(""), Some("tok")).unwrap().is_demo());
        assert!(Endpoint::resolve(Some(PLACEHOLDER_BASE_URL), Some("tok"))
            .unwrap()
            .is_demo());
        assert!(
            Endpoint::resolve(Some("https://demo.example.com/api/v2"), Some("tok"))
                .unwrap()
                .is_demo()
        );
    }

    #[test]
    fn real_url_without_token_is_a_local_authentication_error() {
        let err = Endpoint::resolve(Some("https://awx.internal/api/v2"), None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);

        let err = Endpoint::resolve(Some("https://awx.internal/api/v2"), Some("  ")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    #[test]
    fn real_url_with_token_resolves_and_trims() {
        let endpoint =
            Endpoint::resolve(Some("https://awx.internal/api/v2/"), Some("tok")).unwrap();
        assert_eq!(
            endpoint,
            Endpoint::Real {
                base_url: "https://awx.internal/api/v2".into(),
                token: "tok".into(),
            }
        );
    }
}
