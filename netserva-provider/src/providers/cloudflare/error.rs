//! Cloudflare error code mapping.
//!
//! Codes: <https://developers.cloudflare.com/fundamentals/api/troubleshooting/>

use crate::error::ProviderError;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};

use super::CloudflareProvider;

/// Malformed or rejected authentication.
const AUTH_CODES: &[&str] = &["6003", "6103", "6111", "9109", "10000"];
/// Already-existing record conflicts (81053..=81058).
const RECORD_EXISTS_CODES: &[&str] = &["81053", "81054", "81055", "81056", "81057", "81058"];
/// Validation failures and the request field they concern.
const PARAM_CODES: &[(&str, &str)] = &[
    ("1004", "general"),
    ("9000", "name"),
    ("9005", "content"),
    ("9006", "content"),
    ("9009", "content"),
    ("9021", "ttl"),
    ("9041", "proxied"),
];
/// Unroutable zone identifiers.
const ZONE_CODES: &[&str] = &["7000", "7003"];

fn or_unknown(value: Option<String>) -> String {
    value.unwrap_or_else(|| "<unknown>".to_string())
}

impl ProviderErrorMapper for CloudflareProvider {
    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError {
        let provider = self.provider_name().to_string();
        let Some(code) = raw.code.as_deref() else {
            return self.unknown_error(raw);
        };

        if AUTH_CODES.contains(&code) {
            return ProviderError::InvalidCredentials {
                provider,
                raw_message: Some(raw.message),
            };
        }
        if RECORD_EXISTS_CODES.contains(&code) {
            return ProviderError::RecordExists {
                provider,
                record_name: or_unknown(context.record_name),
                raw_message: Some(raw.message),
            };
        }
        if let Some((_, param)) = PARAM_CODES.iter().find(|(c, _)| *c == code) {
            return ProviderError::InvalidParameter {
                provider,
                param: (*param).to_string(),
                detail: raw.message,
            };
        }
        if ZONE_CODES.contains(&code) {
            return ProviderError::DomainNotFound {
                provider,
                domain: or_unknown(context.domain),
                raw_message: Some(raw.message),
            };
        }

        match code {
            "81044" => ProviderError::RecordNotFound {
                provider,
                record_id: or_unknown(context.record_id),
                raw_message: Some(raw.message),
            },
            "81045" => ProviderError::QuotaExceeded {
                provider,
                raw_message: Some(raw.message),
            },
            "1061" => ProviderError::RecordExists {
                provider,
                record_name: or_unknown(context.domain),
                raw_message: Some(raw.message),
            },
            "9103" | "9106" | "9107" => ProviderError::PermissionDenied {
                provider,
                raw_message: Some(raw.message),
            },
            _ => self.unknown_error(raw),
        }
    }
}
