//! Per-dialect translation of "send this to that base URL with this key"
//! into a concrete outbound request, following the teacher's per-provider
//! adapter split (`src/providers/{openai,claude,gemini}.rs`,
//! `src/proxy/provider_strategy/*`).
//!
//! An adapter never parses or transforms the body of a forwarded user
//! call — the gateway is a transparent byte pipe past credential
//! injection. What an adapter *does* own is everything dialect-specific
//! that happens before the bytes are forwarded: the outbound URL, the
//! credential header, streaming detection, and the model listing call.

mod anthropic;
mod gemini;
mod openai;

pub use anthropic::AnthropicAdapter;
pub use gemini::GeminiAdapter;
pub use openai::OpenAiAdapter;

use crate::error::Result;
use crate::types::ProviderKind;
use std::sync::Arc;

/// A model id as surfaced by `list_models`, normalized to the dialect's
/// canonical form (e.g. Gemini's `models/` prefix stripped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: String,
}

/// Per-`provider_kind` translation of group config + model + key into a
/// concrete outbound call.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Builds the full outbound URL for a forwarded call.
    fn build_url(&self, base_url: &str, path: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), path)
    }

    /// The header name and value to attach for this dialect's credentials.
    fn credential_header(&self, key: &str) -> (&'static str, String);

    /// Whether this specific forwarded call is a streaming call, inspected
    /// from the request path and/or body per spec: OpenAI/Anthropic look at
    /// `"stream": true` in the JSON body, Gemini looks at the
    /// `:streamGenerateContent` path suffix.
    fn is_streaming_request(&self, path: &str, body: &[u8]) -> bool;

    /// Lists the models the upstream currently serves, used by the admin
    /// surface and the health prober. Never falls back to a cached/stub
    /// list — a failed call surfaces a well-typed upstream-unavailable
    /// error instead.
    async fn list_models(
        &self,
        client: &reqwest::Client,
        base_url: &str,
        key: &str,
    ) -> Result<Vec<ModelInfo>>;
}

/// Returns the adapter for a `provider_kind`. `openai-compatible-chat` and
/// `openai-compatible-responses` share the same adapter: both dialects
/// speak the OpenAI wire format, differing only in which endpoint suffix
/// the dispatcher routes to, not in credential/streaming handling.
#[must_use]
pub fn adapter_for(kind: ProviderKind) -> Arc<dyn ProviderAdapter> {
    match kind {
        ProviderKind::OpenAiCompatibleChat | ProviderKind::OpenAiCompatibleResponses => {
            Arc::new(OpenAiAdapter)
        }
        ProviderKind::AnthropicNative => Arc::new(AnthropicAdapter),
        ProviderKind::GeminiNative => Arc::new(GeminiAdapter),
    }
}

fn body_requests_streaming(body: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("stream").and_then(serde_json::Value::as_bool))
        .unwrap_or(false)
}
