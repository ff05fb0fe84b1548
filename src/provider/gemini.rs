//! Adapter for `gemini-native`: `x-goog-api-key` credentials, streaming
//! detected from the `:streamGenerateContent` path suffix rather than a
//! body flag, and model ids returned with a `models/` prefix this adapter
//! strips before surfacing them.

use super::{ModelInfo, ProviderAdapter};
use crate::error::{ErrorContext, Result};
use crate::types::ProviderKind;
use serde::Deserialize;

pub struct GeminiAdapter;

#[derive(Debug, Deserialize)]
struct ModelListResponse {
    models: Vec<ModelListEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelListEntry {
    name: String,
}

#[async_trait::async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GeminiNative
    }

    fn credential_header(&self, key: &str) -> (&'static str, String) {
        ("x-goog-api-key", key.to_string())
    }

    fn is_streaming_request(&self, path: &str, _body: &[u8]) -> bool {
        path.contains(":streamGenerateContent")
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
            .models
            .into_iter()
            .map(|entry| ModelInfo {
                id: strip_models_prefix(&entry.name),
            })
            .collect())
    }
}

fn strip_models_prefix(name: &str) -> String {
    name.strip_prefix("models/").unwrap_or(name).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_header_is_x_goog_api_key() {
        let adapter = GeminiAdapter;
        let (name, value) = adapter.credential_header("goog-key");
        assert_eq!(name, "x-goog-api-key");
        assert_eq!(value, "goog-key");
    }

    #[test]
    fn streaming_detected_from_path_suffix() {
        let adapter = GeminiAdapter;
        assert!(adapter.is_streaming_request(
            "/v1beta/models/gemini-pro:streamGenerateContent",
            b"{}"
        ));
        assert!(!adapter.is_streaming_request(
            "/v1beta/models/gemini-pro:generateContent",
            b"{}"
        ));
    }

    #[test]
    fn models_prefix_is_stripped() {
        assert_eq!(strip_models_prefix("models/gemini-1.5-pro"), "gemini-1.5-pro");
        assert_eq!(strip_models_prefix("gemini-1.5-pro"), "gemini-1.5-pro");
    }
}
