use crate::error::{ErrorContext, ProxyError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::lwarn;
use crate::registry::ProxyConfig;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Caches `reqwest::Client` instances keyed on `(proxy_config_digest,
/// connect_timeout_seconds)` so groups sharing an outbound proxy and
/// timeout reuse one connection pool instead of building a client per call.
///
/// Every cached client has no overall request timeout: a call's deadline is
/// instead enforced by the caller racing the request against a
/// cancellation token, so a long-lived streaming response is never severed
/// by the transport's own clock.
pub struct ClientPool {
    clients: DashMap<(String, u32), Arc<reqwest::Client>>,
}

impl ClientPool {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
        }
    }

    /// Returns the cached client for this `(proxy, connect_timeout)` pair,
    /// building and inserting one if this is the first request to see it.
    pub fn get_or_build(
        &self,
        proxy_config: Option<&ProxyConfig>,
        connect_timeout_seconds: u32,
    ) -> Result<Arc<reqwest::Client>> {
        let config = proxy_config.cloned().unwrap_or(ProxyConfig::None);
        let key = (config.digest(), connect_timeout_seconds);

        if let Some(client) = self.clients.get(&key) {
            return Ok(Arc::clone(&client));
        }

        let client = Arc::new(Self::build_client(&config, connect_timeout_seconds)?);
        self.clients.insert(key, Arc::clone(&client));
        Ok(client)
    }

    fn build_client(config: &ProxyConfig, connect_timeout_seconds: u32) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(u64::from(connect_timeout_seconds)))
            .pool_idle_timeout(Duration::from_secs(90));

        if let Some(proxy) = Self::build_proxy(config)? {
            builder = builder.proxy(proxy);
        } else {
            builder = builder.no_proxy();
        }

        builder
            .build()
            .with_network_context(|| "building outbound http client".to_string())
    }

    /// Translates a `ProxyConfig` into a `reqwest::Proxy`. A `Socks5`
    /// variant falls back to an HTTP proxy against the same URL when the
    /// runtime has no native SOCKS5 support, since this client pool is not
    /// built with reqwest's `socks` feature.
    fn build_proxy(config: &ProxyConfig) -> Result<Option<reqwest::Proxy>> {
        match config {
            ProxyConfig::None => Ok(None),
            ProxyConfig::Http {
                url,
                bypass_local,
                bypass_domains,
            } => Ok(Some(Self::scoped_proxy(url, *bypass_local, bypass_domains)?)),
            ProxyConfig::Socks5 {
                url,
                bypass_local,
                bypass_domains,
            } => {
                lwarn!(
                    "system",
                    LogStage::Startup,
                    LogComponent::HttpPool,
                    "socks5_fallback",
                    "socks5 proxy requested without native support, falling back to http",
                    url = %url
                );
                let fallback_url = url
                    .replacen("socks5h://", "http://", 1)
                    .replacen("socks5://", "http://", 1);
                Ok(Some(Self::scoped_proxy(
                    &fallback_url,
                    *bypass_local,
                    bypass_domains,
                )?))
            }
        }
    }

    fn scoped_proxy(
        url: &str,
        bypass_local: bool,
        bypass_domains: &[String],
    ) -> Result<reqwest::Proxy> {
        let mut proxy = reqwest::Proxy::all(url)
            .map_err(|e| ProxyError::config_with_source(format!("invalid proxy url: {url}"), e))?;

        let mut entries = bypass_domains.to_vec();
        if bypass_local || !entries.is_empty() {
            if bypass_local {
                entries.push("localhost".to_string());
                entries.push("127.0.0.1".to_string());
                entries.push("::1".to_string());
            }
            proxy = proxy.no_proxy(reqwest::NoProxy::from_string(&entries.join(",")));
        }

        Ok(proxy)
    }
}

impl Default for ClientPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_proxy_config_shares_one_client() {
        let pool = ClientPool::new();
        let a = pool.get_or_build(None, 10).unwrap();
        let b = pool.get_or_build(None, 10).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_connect_timeout_builds_distinct_clients() {
        let pool = ClientPool::new();
        let a = pool.get_or_build(None, 10).unwrap();
        let b = pool.get_or_build(None, 20).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn socks5_without_native_support_falls_back_to_http() {
        let config = ProxyConfig::Socks5 {
            url: "socks5://127.0.0.1:1080".to_string(),
            bypass_local: false,
            bypass_domains: vec![],
        };
        assert!(ClientPool::build_proxy(&config).unwrap().is_some());
    }
}
