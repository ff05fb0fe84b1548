//! Per-request state carried through the `ProxyHttp` lifecycle, grounded in
//! the teacher's `proxy::context::ProxyContext` but pared down to exactly
//! what this gateway's dispatch needs: no auth-service/oauth fields, since
//! a proxy key resolves straight to a `ProxyKey` with no refresh flow.

use crate::registry::{GroupSnapshot, ProxyKey};
use crate::selector::SelectedKey;
use crate::types::ProviderKind;
use bytes::BytesMut;
use std::sync::Arc;
use std::time::Instant;

/// Everything resolved about the route before the dispatcher can select a
/// group and key: which dialect it speaks and how the caller authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>` — OpenAI-compatible chat/responses.
    Bearer,
    /// `x-api-key: <key>` — Anthropic native.
    ApiKeyHeader,
    /// `x-goog-api-key: <key>` — Gemini native.
    GoogHeader,
}

#[derive(Debug, Clone, Copy)]
pub struct RouteMatch {
    pub provider_kind: ProviderKind,
    pub auth_style: AuthStyle,
}

/// The `CTX` type pingora thread through the whole request lifecycle:
/// `new_ctx` -> `request_filter` -> `upstream_peer` ->
/// `upstream_request_filter` -> `response_filter` -> `response_body_filter`
/// -> `logging`.
#[derive(Debug, Clone)]
pub struct GatewayContext {
    pub request_id: String,
    pub start_time: Instant,

    /// Path and method of the inbound request, kept for the Responses-chain
    /// affinity bookkeeping in `logging` (a create vs. a follow-up GET/
    /// DELETE/cancel are distinguished by whether the path carries an id).
    pub path: String,
    pub method: String,

    pub route: Option<RouteMatch>,
    pub proxy_key: Option<ProxyKey>,
    pub model_requested: Option<String>,

    pub selected_group: Option<Arc<GroupSnapshot>>,
    pub selected_key: Option<SelectedKey>,

    pub is_streaming: bool,
    pub request_body: BytesMut,
    pub response_body: BytesMut,

    /// Set once the upstream response headers arrive; drives the health
    /// observation and the log pipeline's terminal update.
    pub response_status: Option<u16>,
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
    pub total_tokens: Option<i64>,

    /// True once `logging` observes the client side closed mid-stream
    /// rather than the upstream call completing normally.
    pub client_disconnected: bool,
}

impl Default for GatewayContext {
    fn default() -> Self {
        Self {
            request_id: String::new(),
            start_time: Instant::now(),
            path: String::new(),
            method: String::new(),
            route: None,
            proxy_key: None,
            model_requested: None,
            selected_group: None,
            selected_key: None,
            is_streaming: false,
            request_body: BytesMut::new(),
            response_body: BytesMut::new(),
            response_status: None,
            prompt_tokens: None,
            completion_tokens: None,
            total_tokens: None,
            client_disconnected: false,
        }
    }
}

impl GatewayContext {
    #[must_use]
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        i64::try_from(self.start_time.elapsed().as_millis()).unwrap_or(i64::MAX)
    }

    #[must_use]
    pub fn group_id(&self) -> Option<i32> {
        self.selected_group.as_ref().map(|g| g.group.id)
    }

    #[must_use]
    pub fn key_hash(&self) -> Option<String> {
        self.selected_key.as_ref().map(|k| k.key.hash.clone())
    }
}
