//! Path-based route table for the public dispatch surface, the
//! per-dialect analogue of the teacher's `is_proxy_request` edge check in
//! `proxy/service.rs`.

use crate::dispatcher::context::{AuthStyle, RouteMatch};
use crate::types::ProviderKind;

/// Matches an inbound path (method is not discriminating here; each route
/// accepts the verbs the dialect defines) to its provider dialect and
/// credential header, or `None` if the path isn't one this gateway serves.
#[must_use]
pub fn match_route(path: &str) -> Option<RouteMatch> {
    if path.starts_with("/v1/chat/completions") || path.starts_with("/v1/models") {
        return Some(RouteMatch {
            provider_kind: ProviderKind::OpenAiCompatibleChat,
            auth_style: AuthStyle::Bearer,
        });
    }
    if path.starts_with("/v1/responses") {
        return Some(RouteMatch {
            provider_kind: ProviderKind::OpenAiCompatibleResponses,
            auth_style: AuthStyle::Bearer,
        });
    }
    if path.starts_with("/claude/v1/") {
        return Some(RouteMatch {
            provider_kind: ProviderKind::AnthropicNative,
            auth_style: AuthStyle::ApiKeyHeader,
        });
    }
    if path.starts_with("/v1beta/models") {
        return Some(RouteMatch {
            provider_kind: ProviderKind::GeminiNative,
            auth_style: AuthStyle::GoogHeader,
        });
    }
    None
}

/// Whether the path's final colon-suffixed segment asks for a streaming
/// call, the Gemini convention (`:generateContent` vs
/// `:streamGenerateContent`); OpenAI/Anthropic signal streaming in the body
/// instead (see `provider::body_requests_streaming`).
#[must_use]
pub fn gemini_path_requests_streaming(path: &str) -> bool {
    path.contains(":streamGenerateContent")
}

/// Extracts the `{model}` path segment Gemini embeds in the URL instead of
/// the JSON body, e.g. `/v1beta/models/gemini-1.5-pro:generateContent`.
#[must_use]
pub fn gemini_model_from_path(path: &str) -> Option<String> {
    let after_models = path.split("/models/").nth(1)?;
    let model = after_models.split(':').next()?;
    if model.is_empty() {
        None
    } else {
        Some(model.to_string())
    }
}

/// Whether this is one of the model-listing GETs (`/v1/models`,
/// `/claude/v1/models`, `/v1beta/models`) rather than a call that names a
/// model to dispatch against. These are matched by `match_route` like any
/// other path but need to be served from the registry's own model sets,
/// not routed through the model-required selection path.
#[must_use]
pub fn is_model_list_request(path: &str, method: &str) -> bool {
    if !method.eq_ignore_ascii_case("GET") {
        return false;
    }
    matches!(path, "/v1/models" | "/claude/v1/models" | "/v1beta/models")
}

/// Extracts the `{id}` segment from `/v1/responses/{id}` or
/// `/v1/responses/{id}/cancel`. `None` means the request is the creating
/// `POST /v1/responses` call, which carries no id yet.
#[must_use]
pub fn responses_chain_id(path: &str) -> Option<String> {
    let rest = path.strip_prefix("/v1/responses/")?;
    let id = rest.split('/').next()?;
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_openai_chat_route() {
        let route = match_route("/v1/chat/completions").unwrap();
        assert_eq!(route.provider_kind, ProviderKind::OpenAiCompatibleChat);
        assert_eq!(route.auth_style, AuthStyle::Bearer);
    }

    #[test]
    fn matches_claude_route() {
        let route = match_route("/claude/v1/messages").unwrap();
        assert_eq!(route.provider_kind, ProviderKind::AnthropicNative);
        assert_eq!(route.auth_style, AuthStyle::ApiKeyHeader);
    }

    #[test]
    fn matches_gemini_route_and_extracts_model() {
        let route = match_route("/v1beta/models/gemini-1.5-pro:generateContent").unwrap();
        assert_eq!(route.provider_kind, ProviderKind::GeminiNative);
        assert_eq!(
            gemini_model_from_path("/v1beta/models/gemini-1.5-pro:generateContent"),
            Some("gemini-1.5-pro".to_string())
        );
        assert!(!gemini_path_requests_streaming(
            "/v1beta/models/gemini-1.5-pro:generateContent"
        ));
        assert!(gemini_path_requests_streaming(
            "/v1beta/models/gemini-1.5-pro:streamGenerateContent"
        ));
    }

    #[test]
    fn unmatched_path_returns_none() {
        assert!(match_route("/admin/groups").is_none());
    }

    #[test]
    fn matches_responses_create_route_with_no_id() {
        let route = match_route("/v1/responses").unwrap();
        assert_eq!(route.provider_kind, ProviderKind::OpenAiCompatibleResponses);
        assert_eq!(responses_chain_id("/v1/responses"), None);
    }

    #[test]
    fn recognizes_model_list_requests_and_rejects_others() {
        assert!(is_model_list_request("/v1/models", "GET"));
        assert!(is_model_list_request("/claude/v1/models", "GET"));
        assert!(is_model_list_request("/v1beta/models", "GET"));
        assert!(!is_model_list_request("/v1/models", "POST"));
        assert!(!is_model_list_request("/v1/chat/completions", "GET"));
        assert!(!is_model_list_request(
            "/v1beta/models/gemini-1.5-pro:generateContent",
            "GET"
        ));
    }

    #[test]
    fn extracts_responses_chain_id_and_cancel_suffix() {
        assert_eq!(
            responses_chain_id("/v1/responses/resp_123"),
            Some("resp_123".to_string())
        );
        assert_eq!(
            responses_chain_id("/v1/responses/resp_123/cancel"),
            Some("resp_123".to_string())
        );
    }
}
