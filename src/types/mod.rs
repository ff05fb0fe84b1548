//! Shared domain types used across the registry, selector, health, and
//! dispatcher modules.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The upstream dialect a group speaks, which in turn determines the
/// request/response envelope, the credential header, and the adapter used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    OpenAiCompatibleChat,
    OpenAiCompatibleResponses,
    AnthropicNative,
    GeminiNative,
}

impl ProviderKind {
    /// Header credentials are attached under for this dialect.
    #[must_use]
    pub const fn credential_header(self) -> &'static str {
        match self {
            Self::OpenAiCompatibleChat | Self::OpenAiCompatibleResponses => "authorization",
            Self::AnthropicNative => "x-api-key",
            Self::GeminiNative => "x-goog-api-key",
        }
    }

    /// The stable string stored in `groups.provider_kind`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAiCompatibleChat => "openai-compatible-chat",
            Self::OpenAiCompatibleResponses => "openai-compatible-responses",
            Self::AnthropicNative => "anthropic-native",
            Self::GeminiNative => "gemini-native",
        }
    }

    /// Parses the stored string form back into a `ProviderKind`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "openai-compatible-chat" => Some(Self::OpenAiCompatibleChat),
            "openai-compatible-responses" => Some(Self::OpenAiCompatibleResponses),
            "anthropic-native" => Some(Self::AnthropicNative),
            "gemini-native" => Some(Self::GeminiNative),
            _ => None,
        }
    }
}

/// Ordering policy a group uses to pick among its candidate keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    RoundRobin,
    Random,
    LeastLoad,
}

impl SelectionPolicy {
    /// The stable string stored in `groups.selection_policy`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::Random => "random",
            Self::LeastLoad => "least_load",
        }
    }

    /// Parses the stored string form, defaulting to `RoundRobin` for an
    /// unrecognized value rather than failing the whole group read.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "random" => Self::Random,
            "least_load" => Self::LeastLoad,
            _ => Self::RoundRobin,
        }
    }
}

/// Derived health status of a key or model, computed from its running
/// counters rather than stored directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Unknown,
    Healthy,
    Warning,
    Unhealthy,
}

impl HealthStatus {
    /// Derives status from the running failure counters, per the health
    /// state machine's rule: 0 failures with at least one success is
    /// healthy, 1-2 is a warning, 3+ is unhealthy.
    #[must_use]
    pub const fn from_counters(consecutive_failures: u32, successful_checks: u64) -> Self {
        if consecutive_failures == 0 && successful_checks > 0 {
            Self::Healthy
        } else if consecutive_failures >= 3 {
            Self::Unhealthy
        } else if consecutive_failures >= 1 {
            Self::Warning
        } else {
            Self::Unknown
        }
    }

    /// Whether the selector may pick a key/model in this state outside of
    /// the "all candidates unhealthy" fallback.
    #[must_use]
    pub const fn is_selectable(self) -> bool {
        !matches!(self, Self::Unhealthy)
    }
}

/// One observation fed into the health state machine after an upstream call
/// completes.
#[derive(Debug, Clone, Copy)]
pub enum HealthObservation {
    Success { status: u16, response_ms: u64 },
    ClientError { status: u16 },
    RateLimited { status: u16 },
    ServerError { status: u16 },
    Timeout,
    Network,
}

impl HealthObservation {
    /// Classifies a raw upstream status code, matching the ranges named in
    /// the health state machine design.
    #[must_use]
    pub fn from_status(status: u16, response_ms: u64) -> Self {
        match status {
            200..=399 => Self::Success {
                status,
                response_ms,
            },
            401 | 403 => Self::ClientError { status },
            429 => Self::RateLimited { status },
            500.. => Self::ServerError { status },
            _ => Self::ServerError { status },
        }
    }
}

/// The kind of probe a `HealthCheckEvent` row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    Provider,
    Key,
    Model,
}

impl CheckType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::Key => "key",
            Self::Model => "model",
        }
    }
}

/// Computes the lowercase SHA-256 hex digest of a raw API key string, the
/// form stored and compared instead of the plaintext key.
#[must_use]
pub fn hash_key(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Masks a raw key as first-4...last-4 with asterisks, or all asterisks if
/// the key is 8 characters or shorter.
#[must_use]
pub fn mask_key(raw: &str) -> String {
    let len = raw.chars().count();
    if len <= 8 {
        return "*".repeat(len);
    }
    let chars: Vec<char> = raw.chars().collect();
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[len - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_key_short_is_all_stars() {
        assert_eq!(mask_key("abcd1234"), "********");
        assert_eq!(mask_key("abc"), "***");
    }

    #[test]
    fn mask_key_long_keeps_prefix_and_suffix() {
        assert_eq!(mask_key("sk-1234567890abcdef"), "sk-1...cdef");
    }

    #[test]
    fn health_status_from_counters() {
        assert_eq!(HealthStatus::from_counters(0, 0), HealthStatus::Unknown);
        assert_eq!(HealthStatus::from_counters(0, 5), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from_counters(2, 5), HealthStatus::Warning);
        assert_eq!(HealthStatus::from_counters(3, 5), HealthStatus::Unhealthy);
    }

    #[test]
    fn observation_classification() {
        assert!(matches!(
            HealthObservation::from_status(200, 10),
            HealthObservation::Success { .. }
        ));
        assert!(matches!(
            HealthObservation::from_status(401, 10),
            HealthObservation::ClientError { status: 401 }
        ));
        assert!(matches!(
            HealthObservation::from_status(429, 10),
            HealthObservation::RateLimited { status: 429 }
        ));
        assert!(matches!(
            HealthObservation::from_status(503, 10),
            HealthObservation::ServerError { status: 503 }
        ));
    }
}
