//! The transparent-proxy `ProxyHttp` implementation: authenticate, select
//! a group and key, forward without rewriting the body, and observe the
//! result. Lifecycle grounded in the teacher's `proxy::service::ProxyService`
//! (`new_ctx` -> `request_filter` -> `upstream_peer` ->
//! `upstream_request_filter` -> `response_filter` -> `response_body_filter`
//! -> `logging`), generalized from the teacher's single-backend-per-user
//! model to this gateway's model-based group/key selection.

use crate::app::AppServices;
use crate::config::AppConfig;
use crate::dispatcher::context::GatewayContext;
use crate::dispatcher::{auth, route, usage};
use crate::error::{ErrorDialect, ProxyError, Result};
use crate::log_pipeline::{LogItem, LogPipeline, NewRequestLog, RequestLogUpdate};
use crate::logging::{LogComponent, LogStage};
use crate::registry::Registry;
use crate::selector::Selector;
use crate::types::{HealthObservation, ProviderKind};
use crate::utils::EventStreamData;
use crate::{lerror, linfo};
use async_trait::async_trait;
use bytes::{Buf, Bytes, BytesMut};
use dashmap::DashMap;
use health_state::HealthState as HealthStateAlias;
use pingora_core::{ErrorType, prelude::*, upstreams::peer::HttpPeer};
use pingora_http::{RequestHeader, ResponseHeader};
use pingora_proxy::{FailToProxy, ProxyHttp, Session};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::codec::Decoder;
use uuid::Uuid;

use crate::health::state as health_state;

/// Hard ceiling on the inbound request body this gateway will buffer for
/// model inspection; SPEC_FULL doesn't carry a dedicated config key for it,
/// so it is a fixed constant rather than a tunable (see DESIGN.md).
const MAX_REQUEST_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Remembers which group/key created a Responses-chain object so a later
/// `GET`/`DELETE`/`cancel` by id lands on the same upstream without needing
/// a model name to route by. Grounded in SPEC_FULL's requirement that
/// retrieval and cancel "are delegated to the appropriate provider adapter"
/// — there is no teacher precedent for this (the teacher has no Responses
/// chain), so the affinity table is this gateway's own addition, documented
/// in DESIGN.md. Entries are process-lifetime only: a restart loses
/// in-flight Responses-chain affinity, acceptable since background
/// responses are rare and bounded in duration.
#[derive(Clone)]
struct ResponseAffinity {
    proxy_key_id: i32,
    group: Arc<crate::registry::GroupSnapshot>,
    key: crate::selector::SelectedKey,
}

pub struct DispatcherService {
    registry: Arc<dyn Registry>,
    selector: Arc<Selector>,
    health: Arc<HealthStateAlias>,
    log_pipeline: Arc<LogPipeline>,
    max_body_peek_bytes: usize,
    response_affinity: DashMap<String, ResponseAffinity>,
}

impl DispatcherService {
    #[must_use]
    pub fn new(services: &Arc<AppServices>, config: &Arc<AppConfig>) -> Self {
        Self {
            registry: services.registry(),
            selector: services.selector(),
            health: services.health(),
            log_pipeline: services.log_pipeline(),
            max_body_peek_bytes: config.request_logging.truncate_body_to,
            response_affinity: DashMap::new(),
        }
    }

    async fn read_body(&self, session: &mut Session) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        while let Some(chunk) = session
            .read_request_body()
            .await
            .map_err(|e| ProxyError::network_with_source("reading request body", e))?
        {
            if buf.len() + chunk.len() > MAX_REQUEST_BODY_BYTES {
                return Err(ProxyError::auth_invalid(
                    "request body exceeds the configured maximum",
                ));
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(buf)
    }

    /// Returns `Ok(true)` when the request was answered directly (no
    /// upstream forwarding should happen), `Ok(false)` when pingora should
    /// proceed to `upstream_peer`.
    async fn prepare(&self, session: &mut Session, ctx: &mut GatewayContext) -> Result<bool> {
        let path = session.req_header().uri.path().to_string();
        let method = session.req_header().method.as_str().to_string();
        ctx.path = path.clone();
        ctx.method = method.clone();

        let matched = route::match_route(&path)
            .ok_or_else(|| ProxyError::no_viable_group(format!("unknown endpoint: {path}")))?;
        ctx.route = Some(matched);

        let secret = auth::extract_proxy_key(session, matched.auth_style)?;
        let proxy_key = self
            .registry
            .proxy_key_by_secret(&secret)
            .await?
            .ok_or_else(|| ProxyError::auth_invalid("proxy key not recognized"))?;
        if !proxy_key.enabled {
            return Err(ProxyError::auth_invalid("proxy key is disabled"));
        }

        if route::is_model_list_request(&path, &method) {
            self.serve_model_list(session, matched.provider_kind, &proxy_key)
                .await?;
            return Ok(true);
        }

        let body = self.read_body(session).await?;

        if matched.provider_kind == ProviderKind::OpenAiCompatibleResponses {
            if let Some(response_id) = route::responses_chain_id(&path) {
                self.prepare_responses_followup(session, ctx, &proxy_key, &response_id, &method, &path, body)
                    .await?;
                return Ok(false);
            }
        }

        let model_from_path = (matched.provider_kind == ProviderKind::GeminiNative)
            .then(|| route::gemini_model_from_path(&path))
            .flatten();
        let model_requested = auth::model_from_body(&body).or(model_from_path).ok_or_else(|| {
            ProxyError::no_viable_group("request does not name a model".to_string())
        })?;
        ctx.model_requested = Some(model_requested.clone());

        let adapter = crate::provider::adapter_for(matched.provider_kind);
        ctx.is_streaming = if matched.provider_kind == ProviderKind::GeminiNative {
            route::gemini_path_requests_streaming(&path)
        } else {
            adapter.is_streaming_request(&path, &body)
        };

        let candidates = self.registry.usable_groups_for_kind(matched.provider_kind).await?;
        let allowed: Vec<_> = candidates
            .into_iter()
            .filter(|g| proxy_key.allows_group(g.group.id))
            .collect();

        let (group, selected_key) = self.selector.select_cross_group(
            &allowed,
            &model_requested,
            matched.provider_kind,
            self.health.as_ref(),
        )?;

        self.selector.in_flight().increment(&selected_key.key.hash);
        ctx.selected_group = Some(group);
        ctx.selected_key = Some(selected_key);
        ctx.proxy_key = Some(proxy_key.clone());
        ctx.request_body = BytesMut::from(&body[..]);

        let (client_ip, user_agent) = client_info(session);
        let has_tools = body_has_tools(&body);

        self.log_pipeline
            .enqueue(LogItem::Insert(NewRequestLog {
                request_id: ctx.request_id.clone(),
                proxy_key_id: Some(proxy_key.id),
                arrival_time: chrono::Utc::now(),
                method,
                path,
                model_requested: Some(model_requested),
                client_ip: Some(client_ip),
                user_agent,
                is_streaming: ctx.is_streaming,
                has_tools,
            }))
            .await;

        Ok(false)
    }

    /// Serves `GET /v1/models`, `/claude/v1/models`, `/v1beta/models`
    /// directly from the registry's configured model sets, aggregated
    /// across every usable group of that provider kind the proxy key is
    /// allowed to see — no upstream call, since this is a static
    /// configuration view rather than a live per-call dispatch.
    async fn serve_model_list(
        &self,
        session: &mut Session,
        provider_kind: ProviderKind,
        proxy_key: &crate::registry::ProxyKey,
    ) -> Result<()> {
        let candidates = self.registry.usable_groups_for_kind(provider_kind).await?;
        let mut ids: Vec<String> = candidates
            .into_iter()
            .filter(|g| proxy_key.allows_group(g.group.id))
            .flat_map(|g| g.group.model_list.clone())
            .collect();
        ids.sort();
        ids.dedup();

        let body = serde_json::to_vec(&model_list_body(provider_kind, &ids))
            .map_err(|e| ProxyError::internal_with_source("encoding model list response", e))?;

        write_json_response(session, 200, &body).await
    }

    /// Routes a `GET`/`DELETE /v1/responses/{id}` or `POST
    /// /v1/responses/{id}/cancel` to whichever group/key created that
    /// response, rather than running model-based selection (these requests
    /// don't carry a model).
    #[allow(clippy::too_many_arguments)]
    async fn prepare_responses_followup(
        &self,
        session: &Session,
        ctx: &mut GatewayContext,
        proxy_key: &crate::registry::ProxyKey,
        response_id: &str,
        method: &str,
        path: &str,
        body: Vec<u8>,
    ) -> Result<()> {
        let affinity = self.response_affinity.get(response_id).ok_or_else(|| {
            ProxyError::no_viable_group(format!("unknown or expired response id '{response_id}'"))
        })?;
        if affinity.proxy_key_id != proxy_key.id {
            return Err(ProxyError::auth_invalid(
                "response id was not created by this proxy key",
            ));
        }

        let group = Arc::clone(&affinity.group);
        let selected_key = affinity.key.clone();
        drop(affinity);

        self.selector.in_flight().increment(&selected_key.key.hash);
        ctx.selected_group = Some(group);
        ctx.selected_key = Some(selected_key);
        ctx.proxy_key = Some(proxy_key.clone());
        ctx.request_body = BytesMut::from(&body[..]);
        ctx.is_streaming = false;

        let (client_ip, user_agent) = client_info(session);

        self.log_pipeline
            .enqueue(LogItem::Insert(NewRequestLog {
                request_id: ctx.request_id.clone(),
                proxy_key_id: Some(proxy_key.id),
                arrival_time: chrono::Utc::now(),
                method: method.to_string(),
                path: path.to_string(),
                model_requested: None,
                client_ip: Some(client_ip),
                user_agent,
                is_streaming: false,
                has_tools: false,
            }))
            .await;

        if method.eq_ignore_ascii_case("DELETE") {
            self.response_affinity.remove(response_id);
        }

        Ok(())
    }

    /// After a successful `POST /v1/responses` creation, remembers which
    /// group/key produced it so a later follow-up by id can reach the same
    /// upstream. No-op for every other route or outcome.
    fn record_responses_affinity(&self, ctx: &GatewayContext, status_code: Option<i32>) {
        let Some(route) = ctx.route else { return };
        if route.provider_kind != ProviderKind::OpenAiCompatibleResponses {
            return;
        }
        if route::responses_chain_id(&ctx.path).is_some() {
            return;
        }
        if !status_code.is_some_and(|s| (200..300).contains(&s)) {
            return;
        }
        let (Some(group), Some(key), Some(proxy_key)) =
            (&ctx.selected_group, &ctx.selected_key, &ctx.proxy_key)
        else {
            return;
        };
        let Some(response_id) = extract_response_id(ctx) else {
            return;
        };
        self.response_affinity.insert(
            response_id,
            ResponseAffinity {
                proxy_key_id: proxy_key.id,
                group: Arc::clone(group),
                key: key.clone(),
            },
        );
    }
}

#[async_trait]
impl ProxyHttp for DispatcherService {
    type CTX = GatewayContext;

    fn new_ctx(&self) -> Self::CTX {
        GatewayContext::new(Uuid::new_v4().to_string())
    }

    async fn request_filter(
        &self,
        session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> pingora_core::Result<bool> {
        if session.req_header().method.as_str() == "OPTIONS" {
            return Err(Error::explain(ErrorType::HTTPStatus(200), "CORS preflight"));
        }

        match self.prepare(session, ctx).await {
            Ok(handled) => Ok(handled),
            Err(err) => {
                lerror!(
                    ctx.request_id,
                    LogStage::Dispatch,
                    LogComponent::Dispatcher,
                    "request_rejected",
                    "request preparation failed",
                    error = %err
                );
                let dialect = dialect_for(ctx.route.map(|r| r.provider_kind));
                Err(to_pingora_error(&err, dialect))
            }
        }
    }

    async fn upstream_peer(
        &self,
        _session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> pingora_core::Result<Box<HttpPeer>> {
        let group = ctx
            .selected_group
            .as_ref()
            .ok_or_else(|| to_pingora_error(&ProxyError::internal("no group selected"), ErrorDialect::OpenAi))?;

        let (addr, use_tls, sni) = upstream_target(&group.group.base_url)
            .map_err(|e| to_pingora_error(&e, ErrorDialect::OpenAi))?;

        let mut peer = HttpPeer::new(addr, use_tls, sni);
        if let Some(options) = peer.get_mut_peer_options() {
            let connect = Duration::from_secs(u64::from(group.group.connect_timeout_seconds.max(1)));
            options.connection_timeout = Some(connect);
            options.total_connection_timeout = Some(connect + Duration::from_secs(5));
            // Deliberately oversized: the overall per-call deadline is enforced
            // by the caller racing against a cancellation signal, not by the
            // transport's own clock, so a long-lived stream is never cut off.
            options.read_timeout = Some(Duration::from_secs(3600));
            options.write_timeout = Some(Duration::from_secs(3600));
        }

        Ok(Box::new(peer))
    }

    async fn upstream_request_filter(
        &self,
        _session: &mut Session,
        upstream_request: &mut RequestHeader,
        ctx: &mut Self::CTX,
    ) -> pingora_core::Result<()> {
        let group = ctx.selected_group.clone();
        let selected_key = ctx.selected_key.clone();
        let route = ctx.route;
        let (Some(group), Some(selected_key), Some(route)) = (group, selected_key, route) else {
            return Err(to_pingora_error(
                &ProxyError::internal("missing selection state"),
                ErrorDialect::OpenAi,
            ));
        };

        upstream_request.remove_header("authorization");
        upstream_request.remove_header("x-api-key");
        upstream_request.remove_header("x-goog-api-key");

        let adapter = crate::provider::adapter_for(route.provider_kind);
        let (header, value) = adapter.credential_header(&selected_key.key.secret);
        upstream_request
            .insert_header(header, value)
            .map_err(|e| to_pingora_error(&ProxyError::internal_with_source("setting credential header", e), ErrorDialect::OpenAi))?;

        for (name, value) in &group.group.extra_headers {
            upstream_request
                .insert_header(name.as_str(), value.as_str())
                .map_err(|e| to_pingora_error(&ProxyError::internal_with_source("setting group extra header", e), ErrorDialect::OpenAi))?;
        }

        if let Ok(parsed) = url::Url::parse(&group.group.base_url) {
            if let Some(host) = parsed.host_str() {
                let _ = upstream_request.insert_header("host", host);
            }
        }

        Ok(())
    }

    async fn response_filter(
        &self,
        _session: &mut Session,
        upstream_response: &mut ResponseHeader,
        ctx: &mut Self::CTX,
    ) -> pingora_core::Result<()> {
        upstream_response.remove_header("transfer-encoding");
        if upstream_response.headers.get("cache-control").is_none() {
            let _ = upstream_response.insert_header("cache-control", "no-cache");
        }
        if upstream_response.headers.get("connection").is_none() {
            let _ = upstream_response.insert_header("connection", "keep-alive");
        }
        ctx.response_status = Some(upstream_response.status.as_u16());
        Ok(())
    }

    fn response_body_filter(
        &self,
        _session: &mut Session,
        body: &mut Option<Bytes>,
        _end_of_stream: bool,
        ctx: &mut Self::CTX,
    ) -> pingora_core::Result<Option<Duration>>
    where
        Self::CTX: Send + Sync,
    {
        // Peek only: the chunk returned to pingora (`body`) is left
        // untouched so the client sees every byte as it arrives. Our copy
        // is a bounded tail buffer so a 10 MB / 100-chunk stream never
        // balloons our own memory, while still retaining the terminating
        // usage frame that trails a streamed response.
        if let Some(data) = body {
            ctx.response_body.extend_from_slice(data);
            if ctx.response_body.len() > self.max_body_peek_bytes {
                let overflow = ctx.response_body.len() - self.max_body_peek_bytes;
                ctx.response_body.advance(overflow);
            }
        }
        Ok(None)
    }

    async fn fail_to_proxy(&self, _session: &mut Session, e: &Error, _ctx: &mut Self::CTX) -> FailToProxy {
        let is_timeout_or_network = matches!(
            e.etype,
            ErrorType::ConnectTimedout
                | ErrorType::ReadTimedout
                | ErrorType::WriteTimedout
                | ErrorType::ConnectError
                | ErrorType::ConnectRefused
        );
        FailToProxy {
            error_code: if is_timeout_or_network { 504 } else { 502 },
            can_reuse_downstream: false,
        }
    }

    async fn logging(&self, _session: &mut Session, e: Option<&Error>, ctx: &mut Self::CTX) {
        let Some(group_id) = ctx.group_id() else {
            return;
        };
        let Some(key_hash) = ctx.key_hash() else {
            return;
        };
        self.selector.in_flight().decrement(&key_hash);

        let elapsed_ms = ctx.elapsed_ms();
        let client_disconnected = is_client_disconnect(e);
        ctx.client_disconnected = client_disconnected;

        let (status_code, error_message, observation) = match (ctx.response_status, e, client_disconnected) {
            (Some(status), _, _) => (
                Some(i32::from(status)),
                None,
                Some(HealthObservation::from_status(
                    status,
                    u64::try_from(elapsed_ms.max(0)).unwrap_or(0),
                )),
            ),
            (None, _, true) => (
                None,
                Some("client_disconnect".to_string()),
                None,
            ),
            (None, Some(err), false) => (
                Some(502),
                Some(err.to_string()),
                Some(pingora_error_observation(err)),
            ),
            (None, None, false) => (None, None, None),
        };

        if let Some(observation) = observation {
            if let Err(err) = self.health.record(group_id, &key_hash, observation).await {
                lerror!(
                    ctx.request_id,
                    LogStage::HealthCheck,
                    LogComponent::Dispatcher,
                    "health_record_failed",
                    "failed to record health observation",
                    error = %err
                );
            }
        }

        if let Some(status) = ctx.response_status {
            if let Err(err) = self.registry.record_key_status(group_id, &key_hash, status).await {
                lerror!(
                    ctx.request_id,
                    LogStage::HealthCheck,
                    LogComponent::Dispatcher,
                    "key_status_record_failed",
                    "failed to record upstream key status",
                    error = %err
                );
            }
        }

        self.record_responses_affinity(ctx, status_code);

        let counts = extract_token_counts(ctx);

        self.log_pipeline
            .enqueue(LogItem::Update(RequestLogUpdate {
                request_id: ctx.request_id.clone(),
                model_resolved: ctx.selected_key.as_ref().map(|k| k.canonical_model.clone()),
                group_id: Some(group_id),
                provider_kind: ctx.route.map(|r| r.provider_kind.as_str().to_string()),
                key_hash: Some(key_hash),
                prompt_tokens: counts.prompt_tokens,
                completion_tokens: counts.completion_tokens,
                total_tokens: counts.total_tokens,
                status_code,
                duration_ms: Some(elapsed_ms),
                error_message,
                response_body: None,
                response_headers: None,
                content_truncated: false,
            }))
            .await;

        linfo!(
            ctx.request_id,
            LogStage::Dispatch,
            LogComponent::Dispatcher,
            "request_complete",
            "dispatched request completed",
            group_id = group_id,
            status = status_code.unwrap_or(0),
            duration_ms = elapsed_ms
        );
    }
}

fn client_info(session: &Session) -> (String, Option<String>) {
    let headers = &session.req_header().headers;
    let client_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| session.client_addr().map(|a| a.to_string()))
        .unwrap_or_else(|| "unknown".to_string());
    let user_agent = headers.get("user-agent").and_then(|v| v.to_str().ok()).map(str::to_string);
    (client_ip, user_agent)
}

fn body_has_tools(body: &[u8]) -> bool {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("tools").cloned())
        .is_some_and(|v| v.as_array().is_some_and(|a| !a.is_empty()))
}

/// Builds the dialect-appropriate JSON shape for a model-listing response,
/// mirroring each provider's own `/models` wire format rather than a single
/// gateway-invented one.
fn model_list_body(kind: ProviderKind, ids: &[String]) -> Value {
    match kind {
        ProviderKind::AnthropicNative => serde_json::json!({
            "data": ids.iter().map(|id| serde_json::json!({"id": id, "type": "model"})).collect::<Vec<_>>(),
            "has_more": false,
        }),
        ProviderKind::GeminiNative => serde_json::json!({
            "models": ids
                .iter()
                .map(|id| serde_json::json!({"name": format!("models/{id}")}))
                .collect::<Vec<_>>(),
        }),
        ProviderKind::OpenAiCompatibleChat | ProviderKind::OpenAiCompatibleResponses => serde_json::json!({
            "object": "list",
            "data": ids
                .iter()
                .map(|id| serde_json::json!({"id": id, "object": "model", "owned_by": "llm-gateway"}))
                .collect::<Vec<_>>(),
        }),
    }
}

/// Writes a direct JSON response and terminates the filter chain without
/// forwarding upstream, the same `write_response_header`/`write_response_body`
/// sequence the teacher uses for its own locally-answered responses.
async fn write_json_response(session: &mut Session, status: u16, body: &[u8]) -> Result<()> {
    let mut resp = ResponseHeader::build(status, Some(2))
        .map_err(|e| ProxyError::internal_with_source("building response header", e))?;
    resp.insert_header("content-type", "application/json; charset=utf-8")
        .map_err(|e| ProxyError::internal_with_source("setting content-type header", e))?;
    resp.insert_header("cache-control", "private, no-store")
        .map_err(|e| ProxyError::internal_with_source("setting cache-control header", e))?;
    resp.set_content_length(body.len())
        .map_err(|e| ProxyError::internal_with_source("setting content-length", e))?;

    session
        .write_response_header(Box::new(resp), false)
        .await
        .map_err(|e| ProxyError::network_with_source("writing response header", e))?;
    session
        .write_response_body(Some(Bytes::copy_from_slice(body)), true)
        .await
        .map_err(|e| ProxyError::network_with_source("writing response body", e))?;
    Ok(())
}

fn upstream_target(base_url: &str) -> Result<(String, bool, String)> {
    let parsed = url::Url::parse(base_url)
        .map_err(|e| ProxyError::config_with_source(format!("invalid group base_url: {base_url}"), e))?;
    let use_tls = parsed.scheme() == "https";
    let host = parsed
        .host_str()
        .ok_or_else(|| ProxyError::config(format!("group base_url has no host: {base_url}")))?
        .to_string();
    let port = parsed.port_or_known_default().unwrap_or(if use_tls { 443 } else { 80 });
    Ok((format!("{host}:{port}"), use_tls, host))
}

fn dialect_for(kind: Option<ProviderKind>) -> ErrorDialect {
    match kind {
        Some(ProviderKind::AnthropicNative) => ErrorDialect::Anthropic,
        _ => ErrorDialect::OpenAi,
    }
}

fn to_pingora_error(err: &ProxyError, dialect: ErrorDialect) -> Box<Error> {
    let (status, code) = err.to_http_status_and_body();
    let body = err.to_dialect_body(dialect, code);
    Error::explain(ErrorType::HTTPStatus(status.as_u16()), body.to_string())
}

fn is_client_disconnect(e: Option<&Error>) -> bool {
    e.is_some_and(|err| {
        matches!(
            err.etype,
            ErrorType::ConnectionClosed | ErrorType::WriteError | ErrorType::ReadError
        )
    })
}

fn pingora_error_observation(e: &Error) -> HealthObservation {
    match e.etype {
        ErrorType::ConnectTimedout | ErrorType::ReadTimedout | ErrorType::WriteTimedout => HealthObservation::Timeout,
        _ => HealthObservation::Network,
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ExtractedCounts {
    prompt_tokens: Option<i64>,
    completion_tokens: Option<i64>,
    total_tokens: Option<i64>,
}

fn extract_token_counts(ctx: &GatewayContext) -> ExtractedCounts {
    let value = if ctx.is_streaming {
        last_sse_value(&ctx.response_body)
    } else {
        serde_json::from_slice::<Value>(&ctx.response_body).ok()
    };

    let Some(value) = value else {
        return ExtractedCounts::default();
    };
    let counts = usage::extract_usage(&value);
    if !usage::has_usage(counts) {
        return ExtractedCounts::default();
    }
    ExtractedCounts {
        prompt_tokens: counts.prompt_tokens,
        completion_tokens: counts.completion_tokens,
        total_tokens: counts.total_tokens,
    }
}

/// Replays the buffered tail of an SSE stream through the decoder to
/// recover the last frame's JSON payload, tolerating a partial leading
/// frame since only the terminating usage frame matters here.
fn last_sse_value(tail: &[u8]) -> Option<Value> {
    let mut decoder = EventStreamData::new();
    let mut buf = BytesMut::from(tail);
    let mut last = None;

    while let Ok(Some(event)) = decoder.decode(&mut buf) {
        if !event.data.is_null() {
            last = Some(event.data);
        }
    }
    if let Ok(Some(event)) = decoder.decode_eof(&mut buf) {
        if !event.data.is_null() {
            last = Some(event.data);
        }
    }
    last
}

fn extract_response_id(ctx: &GatewayContext) -> Option<String> {
    let value = if ctx.is_streaming {
        last_sse_value(&ctx.response_body)
    } else {
        serde_json::from_slice::<Value>(&ctx.response_body).ok()
    }?;
    value.get("id")?.as_str().map(str::to_string)
}
