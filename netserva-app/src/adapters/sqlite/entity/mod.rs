//! `SeaORM` entities, one per table.
//!
//! Timestamps are RFC 3339 strings; enums are their lowercase names.

pub mod client;
pub mod credential;
pub mod dns_record;
pub mod dns_zone;
pub mod provider_account;
pub mod ssh_host;
pub mod sw_domain;
pub mod wireguard_peer;
pub mod wireguard_server;
