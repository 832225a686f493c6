use serde::{Deserialize, Serialize};

// ============ Pagination ============

/// Pagination parameters for list operations. Pages are 1-indexed.
///
/// Defaults to `page = 1, page_size = 20`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

impl PaginationParams {
    /// Clamp `page` to `>= 1` and `page_size` to `1..=max_page_size`.
    #[must_use]
    pub fn validated(&self, max_page_size: u32) -> Self {
        Self {
            page: self.page.max(1),
            page_size: self.page_size.clamp(1, max_page_size),
        }
    }

    /// Zero-based offset of the first item on this page.
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.page_size as usize
    }
}

/// Record listing parameters: pagination plus optional keyword and type filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordQueryParams {
    pub page: u32,
    pub page_size: u32,
    /// Matched against record names and values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_type: Option<DnsRecordType>,
}

impl Default for RecordQueryParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            keyword: None,
            record_type: None,
        }
    }
}

impl RecordQueryParams {
    pub fn to_pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            page_size: self.page_size,
        }
    }

    /// Same clamping as [`PaginationParams::validated`]; filters are kept.
    #[must_use]
    pub fn validated(&self, max_page_size: u32) -> Self {
        Self {
            page: self.page.max(1),
            page_size: self.page_size.clamp(1, max_page_size),
            keyword: self.keyword.clone(),
            record_type: self.record_type,
        }
    }

    /// Whether `record` passes the keyword and type filters.
    ///
    /// Used by providers whose API cannot filter server-side.
    pub fn matches(&self, record: &DnsRecord) -> bool {
        if let Some(rt) = self.record_type
            && record.data.record_type() != rt
        {
            return false;
        }
        match self.keyword.as_deref().map(str::trim) {
            Some(kw) if !kw.is_empty() => {
                let kw = kw.to_lowercase();
                record.name.to_lowercase().contains(&kw)
                    || record.data.display_value().to_lowercase().contains(&kw)
            }
            _ => true,
        }
    }
}

/// One page of results plus pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    /// Total number of items across all pages.
    pub total_count: u32,
    pub has_more: bool,
}

impl<T> PaginatedResponse<T> {
    /// Build a page, computing [`has_more`](Self::has_more).
    pub fn new(items: Vec<T>, page: u32, page_size: u32, total_count: u32) -> Self {
        let has_more = page.saturating_mul(page_size) < total_count;
        Self {
            items,
            page,
            page_size,
            total_count,
            has_more,
        }
    }

    /// Slice an already fully fetched list into the requested page.
    pub fn from_full_list(all: Vec<T>, params: &PaginationParams) -> Self {
        let total = u32::try_from(all.len()).unwrap_or(u32::MAX);
        let items = all
            .into_iter()
            .skip(params.offset())
            .take(params.page_size as usize)
            .collect();
        Self::new(items, params.page, params.page_size, total)
    }
}

// ============ Provider Types ============

/// Which provider implementation backs an account.
///
/// Each variant is gated behind its feature flag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Cloudflare DNS. Requires feature `cloudflare`.
    #[cfg(feature = "cloudflare")]
    Cloudflare,
    /// PowerDNS authoritative server HTTP API. Requires feature `powerdns`.
    #[cfg(feature = "powerdns")]
    Powerdns,
}

impl ProviderType {
    pub fn as_str(self) -> &'static str {
        match self {
            #[cfg(feature = "cloudflare")]
            Self::Cloudflare => "cloudflare",
            #[cfg(feature = "powerdns")]
            Self::Powerdns => "powerdns",
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            #[cfg(feature = "cloudflare")]
            "cloudflare" => Ok(Self::Cloudflare),
            #[cfg(feature = "powerdns")]
            "powerdns" | "pdns" => Ok(Self::Powerdns),
            other => Err(format!("unknown provider type '{other}'")),
        }
    }
}

// ============ Domain Types ============

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    Active,
    Paused,
    Pending,
    Error,
    Unknown,
}

/// A zone as the provider reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDomain {
    /// Provider-side zone identifier.
    pub id: String,
    /// Zone name without trailing dot.
    pub name: String,
    pub provider: ProviderType,
    pub status: DomainStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<u32>,
    /// SOA serial, when the provider exposes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<u32>,
    /// DNSSEC signing state, when the provider exposes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dnssec: Option<bool>,
}

// ============ DNS Record Types ============

/// DNS record type, serialized uppercase (`"A"`, `"AAAA"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Txt,
    Ns,
    Srv,
    Caa,
    Ptr,
}

impl DnsRecordType {
    pub const ALL: [Self; 9] = [
        Self::A,
        Self::Aaaa,
        Self::Cname,
        Self::Mx,
        Self::Txt,
        Self::Ns,
        Self::Srv,
        Self::Caa,
        Self::Ptr,
    ];

    /// Wire name of the type (`"AAAA"`, `"CNAME"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Cname => "CNAME",
            Self::Mx => "MX",
            Self::Txt => "TXT",
            Self::Ns => "NS",
            Self::Srv => "SRV",
            Self::Caa => "CAA",
            Self::Ptr => "PTR",
        }
    }
}

impl std::fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DnsRecordType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| format!("unsupported record type '{s}'"))
    }
}

/// Type-safe record payload, one variant per supported record type.
///
/// Serialized as `{"type": "MX", "content": {"priority": 10, "exchange": "..."}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum RecordData {
    A {
        address: String,
    },
    AAAA {
        address: String,
    },
    CNAME {
        target: String,
    },
    MX {
        priority: u16,
        exchange: String,
    },
    TXT {
        text: String,
    },
    NS {
        nameserver: String,
    },
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    /// `flags` is 0 or 128; `tag` is `issue`, `issuewild` or `iodef`.
    CAA {
        flags: u8,
        tag: String,
        value: String,
    },
    PTR {
        target: String,
    },
}

impl RecordData {
    pub fn record_type(&self) -> DnsRecordType {
        match self {
            Self::A { .. } => DnsRecordType::A,
            Self::AAAA { .. } => DnsRecordType::Aaaa,
            Self::CNAME { .. } => DnsRecordType::Cname,
            Self::MX { .. } => DnsRecordType::Mx,
            Self::TXT { .. } => DnsRecordType::Txt,
            Self::NS { .. } => DnsRecordType::Ns,
            Self::SRV { .. } => DnsRecordType::Srv,
            Self::CAA { .. } => DnsRecordType::Caa,
            Self::PTR { .. } => DnsRecordType::Ptr,
        }
    }

    /// The primary value: address, target host, exchange, text or CAA value.
    pub fn display_value(&self) -> &str {
        match self {
            Self::A { address } | Self::AAAA { address } => address,
            Self::CNAME { target } | Self::SRV { target, .. } | Self::PTR { target } => target,
            Self::MX { exchange, .. } => exchange,
            Self::TXT { text } => text,
            Self::NS { nameserver } => nameserver,
            Self::CAA { value, .. } => value,
        }
    }

    /// MX/SRV priority.
    pub fn priority(&self) -> Option<u16> {
        match self {
            Self::MX { priority, .. } | Self::SRV { priority, .. } => Some(*priority),
            _ => None,
        }
    }
}

/// A record as the provider reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsRecord {
    /// Provider-side record identifier.
    pub id: String,
    pub domain_id: String,
    /// Relative name (`"www"`, `"@"` for the apex).
    pub name: String,
    pub ttl: u32,
    pub data: RecordData,

    /// Cloudflare proxy flag; `None` elsewhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,

    #[serde(with = "crate::utils::datetime")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,

    #[serde(with = "crate::utils::datetime")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDnsRecordRequest {
    /// Provider-side zone identifier.
    pub domain_id: String,
    /// Relative record name (`"www"`, `"@"`).
    pub name: String,
    pub ttl: u32,
    pub data: RecordData,
    /// Ignored by providers without a proxy feature.
    pub proxied: Option<bool>,
}

/// Full replacement of an existing record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDnsRecordRequest {
    pub domain_id: String,
    pub name: String,
    pub ttl: u32,
    pub data: RecordData,
    pub proxied: Option<bool>,
}

// ============ Batch Operation Types ============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateResult {
    pub success_count: usize,
    pub failed_count: usize,
    pub created_records: Vec<DnsRecord>,
    pub failures: Vec<BatchCreateFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateFailure {
    /// Index into the original request slice.
    pub request_index: usize,
    pub record_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateResult {
    pub success_count: usize,
    pub failed_count: usize,
    pub updated_records: Vec<DnsRecord>,
    pub failures: Vec<BatchUpdateFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateFailure {
    pub record_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateItem {
    pub record_id: String,
    pub request: UpdateDnsRecordRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteResult {
    pub success_count: usize,
    pub failed_count: usize,
    pub failures: Vec<BatchDeleteFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteFailure {
    pub record_id: String,
    pub reason: String,
}

// ============ Provider Metadata Types ============

/// How a credential field is entered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Password,
}

/// One credential field a provider needs, used to build prompts and forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentialField {
    /// Key in the flat credential map (`"apiToken"`).
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Optional fields may be left out of the credential map.
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderFeatures {
    /// CDN proxy toggle on records.
    pub proxy: bool,
    /// The provider keeps an SOA serial that callers must bump.
    pub soa_serial: bool,
    /// Zones can be created through the API.
    pub create_zone: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderLimits {
    pub max_page_size_domains: u32,
    pub max_page_size_records: u32,
}

/// Static description of a provider: identity, credential fields, features, limits.
///
/// Obtain via [`DnsProvider::metadata()`](crate::DnsProvider::metadata) or
/// [`get_all_provider_metadata()`](crate::get_all_provider_metadata).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
    pub id: ProviderType,
    pub name: String,
    pub description: String,
    pub required_fields: Vec<ProviderCredentialField>,
    pub features: ProviderFeatures,
    pub limits: ProviderLimits,
}

// ============ Credential Types ============

/// A credential map failed validation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CredentialValidationError {
    MissingField {
        provider: ProviderType,
        field: String,
        label: String,
    },
    /// Present but blank.
    EmptyField {
        provider: ProviderType,
        field: String,
        label: String,
    },
    InvalidFormat {
        provider: ProviderType,
        field: String,
        label: String,
        reason: String,
    },
}

impl std::fmt::Display for CredentialValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { label, .. } => write!(f, "Missing required field: {label}"),
            Self::EmptyField { label, .. } => write!(f, "Field must not be empty: {label}"),
            Self::InvalidFormat { label, reason, .. } => write!(f, "{label}: {reason}"),
        }
    }
}

impl std::error::Error for CredentialValidationError {}

/// Credentials for every supported provider.
///
/// Serialized as `{ "provider": "powerdns", "credentials": { ... } }`. Pass to
/// [`create_provider()`](crate::create_provider) to build a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", content = "credentials")]
pub enum ProviderCredentials {
    #[cfg(feature = "cloudflare")]
    #[serde(rename = "cloudflare")]
    Cloudflare { api_token: String },

    /// PowerDNS HTTP API.
    ///
    /// When `ssh_host` is set the API is reached through a local port forward
    /// opened with `ssh -L` to that host, and `api_url` is interpreted from the
    /// remote host's point of view (usually `http://127.0.0.1:8081`).
    #[cfg(feature = "powerdns")]
    #[serde(rename = "powerdns")]
    Powerdns {
        api_url: String,
        api_key: String,
        #[serde(default = "default_server_id")]
        server_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ssh_host: Option<String>,
    },
}

#[cfg(feature = "powerdns")]
fn default_server_id() -> String {
    "localhost".to_string()
}

type CredentialMap = std::collections::HashMap<String, String>;

impl ProviderCredentials {
    /// Build credentials from a flat key/value map, validating required fields.
    pub fn from_map(
        provider: &ProviderType,
        map: &CredentialMap,
    ) -> Result<Self, CredentialValidationError> {
        match provider {
            #[cfg(feature = "cloudflare")]
            ProviderType::Cloudflare => Ok(Self::Cloudflare {
                api_token: Self::get_required_field(provider, map, "apiToken", "API Token")?,
            }),
            #[cfg(feature = "powerdns")]
            ProviderType::Powerdns => {
                let api_url = Self::get_required_field(provider, map, "apiUrl", "API URL")?;
                Self::check_http_url(provider, "apiUrl", "API URL", &api_url)?;
                Ok(Self::Powerdns {
                    api_url: api_url.trim_end_matches('/').to_string(),
                    api_key: Self::get_required_field(provider, map, "apiKey", "API Key")?,
                    server_id: Self::get_optional_field(map, "serverId")
                        .unwrap_or_else(default_server_id),
                    ssh_host: Self::get_optional_field(map, "sshHost"),
                })
            }
        }
    }

    fn get_required_field(
        provider: &ProviderType,
        map: &CredentialMap,
        key: &str,
        label: &str,
    ) -> Result<String, CredentialValidationError> {
        match map.get(key) {
            None => Err(CredentialValidationError::MissingField {
                provider: *provider,
                field: key.to_string(),
                label: label.to_string(),
            }),
            Some(v) if v.trim().is_empty() => Err(CredentialValidationError::EmptyField {
                provider: *provider,
                field: key.to_string(),
                label: label.to_string(),
            }),
            Some(v) => Ok(v.trim().to_string()),
        }
    }

    #[cfg(feature = "powerdns")]
    fn get_optional_field(map: &CredentialMap, key: &str) -> Option<String> {
        map.get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    #[cfg(feature = "powerdns")]
    fn check_http_url(
        provider: &ProviderType,
        key: &str,
        label: &str,
        value: &str,
    ) -> Result<(), CredentialValidationError> {
        let invalid = |reason: String| CredentialValidationError::InvalidFormat {
            provider: *provider,
            field: key.to_string(),
            label: label.to_string(),
            reason,
        };
        let parsed = url::Url::parse(value).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(invalid("expected an http(s) URL with a host".to_string()));
        }
        Ok(())
    }

    /// Flatten into the key/value form accepted by [`from_map`](Self::from_map).
    pub fn to_map(&self) -> CredentialMap {
        match self {
            #[cfg(feature = "cloudflare")]
            Self::Cloudflare { api_token } => [("apiToken".to_string(), api_token.clone())].into(),
            #[cfg(feature = "powerdns")]
            Self::Powerdns {
                api_url,
                api_key,
                server_id,
                ssh_host,
            } => {
                let mut map: CredentialMap = [
                    ("apiUrl".to_string(), api_url.clone()),
                    ("apiKey".to_string(), api_key.clone()),
                    ("serverId".to_string(), server_id.clone()),
                ]
                .into();
                if let Some(host) = ssh_host {
                    map.insert("sshHost".to_string(), host.clone());
                }
                map
            }
        }
    }

    pub fn provider_type(&self) -> ProviderType {
        match self {
            #[cfg(feature = "cloudflare")]
            Self::Cloudflare { .. } => ProviderType::Cloudflare,
            #[cfg(feature = "powerdns")]
            Self::Powerdns { .. } => ProviderType::Powerdns,
        }
    }
}
