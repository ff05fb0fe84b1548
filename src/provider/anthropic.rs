//! Adapter for `anthropic-native`: `x-api-key` credentials, and the
//! `anthropic-version` header Anthropic requires on every call (attached
//! here rather than asked of group admins, since it is dialect-fixed, not
//! per-group configuration).

use super::{ModelInfo, ProviderAdapter, body_requests_streaming};
use crate::error::{ErrorContext, Result};
use crate::types::ProviderKind;
use serde::Deserialize;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicAdapter;

#[derive(Debug, Deserialize)]
struct ModelListResponse {
    data: Vec<ModelListEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelListEntry {
    id: String,
}

#[async_trait::async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::AnthropicNative
    }

    fn credential_header(&self, key: &str) -> (&'static str, String) {
        ("x-api-key", key.to_string())
    }

    fn is_streaming_request(&self, _path: &str, body: &[u8]) -> bool {
        body_requests_streaming(body)
    }

    async fn list_models(
        &self,
        client: &reqwest::Client,
        base_url: &str,
        key: &str,
    ) -> Result<Vec<ModelInfo>> {
        let url = self.build_url(base_url, "/models");
        let (header, value) = self.credential_header(key);

        let response = client
            .get(&url)
            .header(header, value)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send()
            .await
            .with_network_context(|| format!("listing models from {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.ok();
            return Err(crate::error::ProxyError::upstream_http_error(
                status.as_u16(),
                format!("list_models failed against {url}"),
                body,
            ));
        }

        let parsed: ModelListResponse = response
            .json()
            .await
            .with_network_context(|| format!("decoding model list from {url}"))?;

        Ok(parsed
            .data
            .into_iter()
            .map(|entry| ModelInfo { id: entry.id })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_header_is_x_api_key() {
        let adapter = AnthropicAdapter;
        let (name, value) = adapter.credential_header("sk-ant-abc");
        assert_eq!(name, "x-api-key");
        assert_eq!(value, "sk-ant-abc");
    }

    #[test]
    fn streaming_detected_from_body_flag() {
        let adapter = AnthropicAdapter;
        assert!(adapter.is_streaming_request("/messages", br#"{"stream":true}"#));
        assert!(!adapter.is_streaming_request("/messages", b"{}"));
    }
}
