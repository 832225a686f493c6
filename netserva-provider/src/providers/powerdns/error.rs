//! PowerDNS error mapping.
//!
//! PowerDNS reports failures through the HTTP status and an `{"error": "..."}`
//! body, so the raw code here is the status code.

use crate::error::ProviderError;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};

use super::PowerdnsProvider;

fn or_unknown(value: Option<String>) -> String {
    value.unwrap_or_else(|| "<unknown>".to_string())
}

impl ProviderErrorMapper for PowerdnsProvider {
    fn provider_name(&self) -> &'static str {
        "powerdns"
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError {
        let provider = self.provider_name().to_string();
        let message = raw.message.to_lowercase();

        match raw.code.as_deref() {
            Some("401") => ProviderError::InvalidCredentials {
                provider,
                raw_message: Some(raw.message),
            },
            Some("403") => ProviderError::PermissionDenied {
                provider,
                raw_message: Some(raw.message),
            },
            Some("404" | "422") if message.contains("could not find domain") => {
                ProviderError::DomainNotFound {
                    provider,
                    domain: or_unknown(context.domain),
                    raw_message: Some(raw.message),
                }
            }
            Some("404") => match context.record_id {
                Some(record_id) => ProviderError::RecordNotFound {
                    provider,
                    record_id,
                    raw_message: Some(raw.message),
                },
                None => ProviderError::DomainNotFound {
                    provider,
                    domain: or_unknown(context.domain),
                    raw_message: Some(raw.message),
                },
            },
            Some("409") => ProviderError::RecordExists {
                provider,
                record_name: or_unknown(context.record_name.or(context.domain)),
                raw_message: Some(raw.message),
            },
            Some("422")
                if message.contains("conflicts with pre-existing")
                    || message.contains("duplicate record") =>
            {
                ProviderError::RecordExists {
                    provider,
                    record_name: or_unknown(context.record_name),
                    raw_message: Some(raw.message),
                }
            }
            Some("400" | "422") => ProviderError::InvalidParameter {
                provider,
                param: if message.contains("ttl") { "ttl" } else { "rrset" }.to_string(),
                detail: raw.message,
            },
            _ => self.unknown_error(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> PowerdnsProvider {
        PowerdnsProvider::new("http://127.0.0.1:8081".into(), "key".into())
    }

    fn record_ctx() -> ErrorContext {
        ErrorContext {
            record_name: Some("www.example.com.".into()),
            record_id: Some("www.example.com.|A|192.0.2.1".into()),
            domain: Some("example.com.".into()),
        }
    }

    #[test]
    fn auth_statuses() {
        let unauthorized = provider().map_error(
            RawApiError::with_code("401", "Unauthorized"),
            ErrorContext::default(),
        );
        assert!(matches!(unauthorized, ProviderError::InvalidCredentials { .. }));
        let forbidden = provider().map_error(
            RawApiError::with_code("403", "Forbidden"),
            ErrorContext::default(),
        );
        assert!(matches!(forbidden, ProviderError::PermissionDenied { .. }));
    }

    #[test]
    fn missing_zone_vs_missing_record() {
        let zone = provider().map_error(
            RawApiError::with_code("422", "Could not find domain 'nope.com.'"),
            record_ctx(),
        );
        assert!(matches!(
            zone,
            ProviderError::DomainNotFound { domain, .. } if domain == "example.com."
        ));
        let record = provider().map_error(RawApiError::with_code("404", "Not Found"), record_ctx());
        assert!(matches!(record, ProviderError::RecordNotFound { .. }));
    }

    #[test]
    fn conflicts_are_record_exists() {
        let err = provider().map_error(
            RawApiError::with_code(
                "422",
                "RRset www.example.com. IN CNAME: Conflicts with pre-existing RRset",
            ),
            record_ctx(),
        );
        assert!(matches!(
            err,
            ProviderError::RecordExists { record_name, .. } if record_name == "www.example.com."
        ));
        let zone_conflict = provider().map_error(
            RawApiError::with_code("409", "Domain 'example.com.' already exists"),
            ErrorContext {
                domain: Some("example.com.".into()),
                ..Default::default()
            },
        );
        assert!(matches!(zone_conflict, ProviderError::RecordExists { .. }));
    }

    #[test]
    fn validation_and_fallback() {
        let invalid = provider().map_error(
            RawApiError::with_code("422", "Key 'ttl' is not an Integer"),
            record_ctx(),
        );
        assert!(matches!(
            invalid,
            ProviderError::InvalidParameter { param, .. } if param == "ttl"
        ));
        let other = provider().map_error(
            RawApiError::with_code("500", "Internal Server Error"),
            record_ctx(),
        );
        assert!(matches!(other, ProviderError::Unknown { .. }));
    }
}
