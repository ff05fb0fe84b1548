//! Adapter for `openai-compatible-chat` and `openai-compatible-responses`:
//! both dialects speak the OpenAI wire format and differ only in which
//! endpoint suffix the dispatcher routes a call to.

use super::{ModelInfo, ProviderAdapter, body_requests_streaming};
use crate::error::{ErrorContext, Result};
use crate::types::ProviderKind;
use serde::Deserialize;

pub struct OpenAiAdapter;

#[derive(Debug, Deserialize)]
struct ModelListResponse {
    data: Vec<ModelListEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelListEntry {
    id: String,
}

#[async_trait::async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAiCompatibleChat
    }

    fn credential_header(&self, key: &str) -> (&'static str, String) {
        ("authorization", format!("Bearer {key}"))
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
    fn credential_header_is_bearer() {
        let adapter = OpenAiAdapter;
        let (name, value) = adapter.credential_header("sk-abc");
        assert_eq!(name, "authorization");
        assert_eq!(value, "Bearer sk-abc");
    }

    #[test]
    fn streaming_detected_from_body_flag() {
        let adapter = OpenAiAdapter;
        assert!(adapter.is_streaming_request("/chat/completions", br#"{"stream":true}"#));
        assert!(!adapter.is_streaming_request("/chat/completions", br#"{"stream":false}"#));
        assert!(!adapter.is_streaming_request("/chat/completions", b"{}"));
    }

    #[test]
    fn build_url_joins_base_and_suffix() {
        let adapter = OpenAiAdapter;
        assert_eq!(
            adapter.build_url("https://api.example.com/v1/", "/chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
    }
}
