//! Best-effort token-usage extraction from a response body JSON value,
//! tried across the three dialects' differing field names. Per spec §4.6
//! step 7, a parse failure reports token counts as unknown rather than
//! failing the call — this is peeking, not validation.

use serde_json::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCounts {
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
    pub total_tokens: Option<i64>,
}

impl TokenCounts {
    fn is_empty(self) -> bool {
        self.prompt_tokens.is_none() && self.completion_tokens.is_none() && self.total_tokens.is_none()
    }

    fn merge(self, other: Self) -> Self {
        Self {
            prompt_tokens: self.prompt_tokens.or(other.prompt_tokens),
            completion_tokens: self.completion_tokens.or(other.completion_tokens),
            total_tokens: self.total_tokens.or(other.total_tokens),
        }
    }
}

/// Scans a decoded JSON value for a usage object under any of the three
/// dialects' conventions: OpenAI's `usage.{prompt,completion,total}_tokens`,
/// Anthropic's `usage.{input,output}_tokens`, or Gemini's
/// `usageMetadata.{prompt,candidates,total}TokenCount`.
#[must_use]
pub fn extract_usage(value: &Value) -> TokenCounts {
    let mut counts = TokenCounts::default();

    if let Some(usage) = value.get("usage") {
        counts = counts.merge(TokenCounts {
            prompt_tokens: as_i64(usage.get("prompt_tokens")),
            completion_tokens: as_i64(usage.get("completion_tokens")),
            total_tokens: as_i64(usage.get("total_tokens")),
        });
        counts = counts.merge(TokenCounts {
            prompt_tokens: as_i64(usage.get("input_tokens")),
            completion_tokens: as_i64(usage.get("output_tokens")),
            total_tokens: None,
        });
    }

    if let Some(meta) = value.get("usageMetadata") {
        counts = counts.merge(TokenCounts {
            prompt_tokens: as_i64(meta.get("promptTokenCount")),
            completion_tokens: as_i64(meta.get("candidatesTokenCount")),
            total_tokens: as_i64(meta.get("totalTokenCount")),
        });
    }

    if counts.total_tokens.is_none() {
        if let (Some(p), Some(c)) = (counts.prompt_tokens, counts.completion_tokens) {
            counts.total_tokens = Some(p + c);
        }
    }

    counts
}

#[must_use]
pub fn has_usage(counts: TokenCounts) -> bool {
    !counts.is_empty()
}

fn as_i64(value: Option<&Value>) -> Option<i64> {
    value.and_then(Value::as_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_openai_usage() {
        let body = json!({"usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}});
        let counts = extract_usage(&body);
        assert_eq!(counts.prompt_tokens, Some(10));
        assert_eq!(counts.completion_tokens, Some(5));
        assert_eq!(counts.total_tokens, Some(15));
    }

    #[test]
    fn extracts_anthropic_usage_and_derives_total() {
        let body = json!({"usage": {"input_tokens": 3, "output_tokens": 7}});
        let counts = extract_usage(&body);
        assert_eq!(counts.prompt_tokens, Some(3));
        assert_eq!(counts.completion_tokens, Some(7));
        assert_eq!(counts.total_tokens, Some(10));
    }

    #[test]
    fn extracts_gemini_usage_metadata() {
        let body = json!({"usageMetadata": {"promptTokenCount": 2, "candidatesTokenCount": 4, "totalTokenCount": 6}});
        let counts = extract_usage(&body);
        assert_eq!(counts.total_tokens, Some(6));
    }

    #[test]
    fn missing_usage_is_empty() {
        assert!(!has_usage(extract_usage(&json!({"choices": []}))));
    }
}
