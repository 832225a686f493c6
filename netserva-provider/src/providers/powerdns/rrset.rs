//! RRSet arithmetic for the PowerDNS PATCH API.
//!
//! PowerDNS manages records as RRSets: every change replaces the full set of
//! contents for a `(name, type)` pair (`changetype: REPLACE`) or removes it
//! (`changetype: DELETE`).

use std::net::IpAddr;

use serde::Serialize;

use crate::providers::common::to_absolute;
use crate::types::{DnsRecordType, RecordData};

use super::types::PdnsRecord;

/// Longest character-string inside a TXT record.
const TXT_CHUNK: usize = 255;
const KEY_SEPARATOR: char = '|';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Replace,
    Delete,
}

/// One entry of the PATCH body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RrsetChange {
    pub name: String,
    #[serde(rename = "type")]
    pub rtype: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    pub changetype: ChangeType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<PdnsRecord>,
}

/// `{"rrsets": [...]}`
#[derive(Debug, Clone, Default, Serialize)]
pub struct RrsetPatch {
    pub rrsets: Vec<RrsetChange>,
}

impl RrsetPatch {
    pub fn push(&mut self, change: RrsetChange) {
        self.rrsets.push(change);
    }
}

pub fn replace(name: &str, rtype: &str, ttl: u32, contents: &[PdnsRecord]) -> RrsetChange {
    RrsetChange {
        name: to_absolute(name),
        rtype: rtype.to_string(),
        ttl: Some(ttl),
        changetype: ChangeType::Replace,
        records: contents.to_vec(),
    }
}

pub fn delete(name: &str, rtype: &str) -> RrsetChange {
    RrsetChange {
        name: to_absolute(name),
        rtype: rtype.to_string(),
        ttl: None,
        changetype: ChangeType::Delete,
        records: Vec::new(),
    }
}

/// REPLACE with the remaining contents, or DELETE when nothing is left.
pub fn replace_or_delete(name: &str, rtype: &str, ttl: u32, remaining: &[PdnsRecord]) -> RrsetChange {
    if remaining.is_empty() {
        delete(name, rtype)
    } else {
        replace(name, rtype, ttl, remaining)
    }
}

// ============ Record identity ============

/// PowerDNS has no per-record ids; a record is identified by name, type and content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKey {
    /// Absolute owner name (`www.example.com.`).
    pub name: String,
    pub rtype: DnsRecordType,
    /// Content in PowerDNS presentation format.
    pub content: String,
}

impl RecordKey {
    /// The content is brought into canonical form, so ids built from user
    /// input and from server RRSets agree.
    pub fn new(name: &str, rtype: DnsRecordType, content: &str) -> Self {
        Self {
            name: to_absolute(&name.to_ascii_lowercase()),
            rtype,
            content: canonical_content(rtype, content),
        }
    }

    /// Whether a server-side record holds this key's content.
    pub fn matches(&self, record: &PdnsRecord) -> bool {
        canonical_content(self.rtype, &record.content) == self.content
    }

    /// `name|TYPE|content`
    pub fn encode(&self) -> String {
        format!(
            "{}{KEY_SEPARATOR}{}{KEY_SEPARATOR}{}",
            self.name, self.rtype, self.content
        )
    }

    pub fn decode(id: &str) -> Option<Self> {
        let mut parts = id.splitn(3, KEY_SEPARATOR);
        let name = parts.next().filter(|n| !n.is_empty())?;
        let rtype = parts.next()?.parse().ok()?;
        let content = parts.next()?;
        Some(Self::new(name, rtype, content))
    }
}

// ============ Content formatting ============

/// Split `text` into pieces of at most [`TXT_CHUNK`] bytes, cutting only on
/// UTF-8 character boundaries.
fn txt_chunks(text: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.len() > TXT_CHUNK {
        let mut cut = TXT_CHUNK;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }
    chunks.push(rest);
    chunks
}

fn quote_txt(text: &str) -> String {
    if text.starts_with('"') && text.ends_with('"') && text.len() >= 2 {
        return text.to_string();
    }
    txt_chunks(text)
        .iter()
        .map(|chunk| {
            let escaped = chunk.replace('\\', "\\\\").replace('"', "\\\"");
            format!("\"{escaped}\"")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Join the quoted character-strings of TXT content back into one string.
fn unquote_txt(content: &str) -> String {
    let mut out = String::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut saw_quote = false;

    for ch in content.chars() {
        if escaped {
            out.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => {
                in_quotes = !in_quotes;
                saw_quote = true;
            }
            c if in_quotes => out.push(c),
            _ => {}
        }
    }

    if saw_quote { out } else { content.to_string() }
}

fn strip_root(name: &str) -> String {
    name.trim_end_matches('.').to_string()
}

fn canonical_address(address: &str) -> String {
    let address = address.trim();
    address
        .parse::<IpAddr>()
        .map_or_else(|_| address.to_string(), |ip| ip.to_string())
}

/// Absolute, lowercase hostname.
fn canonical_host(host: &str) -> String {
    to_absolute(&host.trim().to_ascii_lowercase())
}

/// Record payload in PowerDNS presentation format.
///
/// Addresses are written the way PowerDNS stores them (`2001:db8::1`) and
/// hostnames are lowercase and absolute.
pub fn format_content(data: &RecordData) -> String {
    match data {
        RecordData::A { address } | RecordData::AAAA { address } => canonical_address(address),
        RecordData::CNAME { target } | RecordData::PTR { target } => canonical_host(target),
        RecordData::NS { nameserver } => canonical_host(nameserver),
        RecordData::MX { priority, exchange } => {
            format!("{priority} {}", canonical_host(exchange))
        }
        RecordData::SRV {
            priority,
            weight,
            port,
            target,
        } => format!("{priority} {weight} {port} {}", canonical_host(target)),
        RecordData::TXT { text } => quote_txt(text),
        RecordData::CAA { flags, tag, value } => {
            format!("{flags} {tag} \"{}\"", value.replace('"', "\\\""))
        }
    }
}

/// Server or user content re-rendered through [`format_content`]; content
/// that does not parse is compared as given.
pub fn canonical_content(rtype: DnsRecordType, content: &str) -> String {
    parse_content(rtype, content).map_or_else(
        |_| content.trim().to_string(),
        |data| format_content(&data),
    )
}

/// Inverse of [`format_content`].
pub fn parse_content(rtype: DnsRecordType, content: &str) -> Result<RecordData, String> {
    let fields: Vec<&str> = content.split_whitespace().collect();
    let number = |s: &str, what: &str| {
        s.parse::<u16>()
            .map_err(|_| format!("invalid {what} '{s}' in {rtype} content '{content}'"))
    };
    let expect = |n: usize| {
        if fields.len() == n {
            Ok(())
        } else {
            Err(format!(
                "{rtype} content '{content}' has {} fields, expected {n}",
                fields.len()
            ))
        }
    };

    let data = match rtype {
        DnsRecordType::A => RecordData::A {
            address: content.trim().to_string(),
        },
        DnsRecordType::Aaaa => RecordData::AAAA {
            address: content.trim().to_string(),
        },
        DnsRecordType::Cname => RecordData::CNAME {
            target: strip_root(content.trim()),
        },
        DnsRecordType::Ptr => RecordData::PTR {
            target: strip_root(content.trim()),
        },
        DnsRecordType::Ns => RecordData::NS {
            nameserver: strip_root(content.trim()),
        },
        DnsRecordType::Txt => RecordData::TXT {
            text: unquote_txt(content),
        },
        DnsRecordType::Mx => {
            expect(2)?;
            RecordData::MX {
                priority: number(fields[0], "priority")?,
                exchange: strip_root(fields[1]),
            }
        }
        DnsRecordType::Srv => {
            expect(4)?;
            RecordData::SRV {
                priority: number(fields[0], "priority")?,
                weight: number(fields[1], "weight")?,
                port: number(fields[2], "port")?,
                target: strip_root(fields[3]),
            }
        }
        DnsRecordType::Caa => {
            let mut parts = content.trim().splitn(3, char::is_whitespace);
            let flags = parts
                .next()
                .and_then(|f| f.parse::<u8>().ok())
                .ok_or_else(|| format!("invalid CAA flags in '{content}'"))?;
            let tag = parts
                .next()
                .ok_or_else(|| format!("missing CAA tag in '{content}'"))?;
            let value = parts
                .next()
                .ok_or_else(|| format!("missing CAA value in '{content}'"))?;
            RecordData::CAA {
                flags,
                tag: tag.to_string(),
                value: unquote_txt(value.trim()),
            }
        }
    };
    Ok(data)
}
