//! Proxy-key extraction and model-id scanning, grounded in the teacher's
//! `AIProxyHandler::extract_api_key` (`proxy/ai_handler.rs`) but generalized
//! over the three header styles this gateway's dialects use instead of a
//! single `Authorization: Bearer` convention.

use crate::dispatcher::context::AuthStyle;
use crate::error::{ProxyError, Result};
use pingora_proxy::Session;

/// Pulls the raw proxy key secret out of the header the route's dialect
/// expects. Never falls back to a query parameter — unlike the teacher,
/// this gateway doesn't treat `?api_key=` as a supported credential.
pub fn extract_proxy_key(session: &Session, auth_style: AuthStyle) -> Result<String> {
    let headers = &session.req_header().headers;
    let header_name = match auth_style {
        AuthStyle::Bearer => "authorization",
        AuthStyle::ApiKeyHeader => "x-api-key",
        AuthStyle::GoogHeader => "x-goog-api-key",
    };

    let raw = headers
        .get(header_name)
        .ok_or_else(|| ProxyError::auth_missing(format!("missing {header_name} header")))?;
    let value = std::str::from_utf8(raw.as_bytes())
        .map_err(|_| ProxyError::auth_invalid("credential header is not valid UTF-8"))?;

    match auth_style {
        AuthStyle::Bearer => value
            .strip_prefix("Bearer ")
            .map(str::to_string)
            .ok_or_else(|| ProxyError::auth_invalid("authorization header is not a Bearer token")),
        AuthStyle::ApiKeyHeader | AuthStyle::GoogHeader => Ok(value.to_string()),
    }
}

/// Scans a JSON request body for the `model` field. Malformed JSON is not
/// an auth error here — the dispatcher validates body shape separately —
/// so this returns `None` rather than propagating a parse failure.
#[must_use]
pub fn model_from_body(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()?
        .get("model")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_from_body_reads_the_model_field() {
        let body = br#"{"model":"gpt-4o-mini","stream":false}"#;
        assert_eq!(model_from_body(body), Some("gpt-4o-mini".to_string()));
    }

    #[test]
    fn model_from_body_tolerates_malformed_json() {
        assert_eq!(model_from_body(b"not json"), None);
    }

    #[test]
    fn model_from_body_tolerates_missing_field() {
        assert_eq!(model_from_body(br#"{"stream":true}"#), None);
    }
}
