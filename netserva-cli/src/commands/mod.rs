//! Subcommand groups. Each module owns its clap enum and a `run` entry point.

pub mod check;
pub mod client;
pub mod domain;
pub mod provider;
pub mod record;
pub mod ssh;
pub mod wg;
pub mod zone;

/// clap value parser for `KEY=VALUE`.
pub fn parse_key_value(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{input}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{input}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
