//! Table or JSON output.

use anyhow::Result;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// One row per item, or the items as a JSON array.
    pub fn list<T: Serialize>(
        &self,
        items: &[T],
        headers: &[&str],
        row: impl Fn(&T) -> Vec<String>,
    ) -> Result<()> {
        if self.json {
            return print_json(&items);
        }
        if items.is_empty() {
            println!("(none)");
            return Ok(());
        }
        let rows: Vec<Vec<String>> = items.iter().map(row).collect();
        println!("{}", render_table(headers, &rows));
        Ok(())
    }

    /// A two-column field/value table, or the item as JSON.
    pub fn item<T: Serialize>(
        &self,
        item: &T,
        fields: impl FnOnce(&T) -> Vec<(&'static str, String)>,
    ) -> Result<()> {
        if self.json {
            return print_json(item);
        }
        let rows: Vec<Vec<String>> = fields(item)
            .into_iter()
            .map(|(k, v)| vec![k.to_string(), v])
            .collect();
        println!("{}", render_table(&["field", "value"], &rows));
        Ok(())
    }

    /// `value` as JSON, or `text` as is.
    pub fn message<T: Serialize>(&self, value: &T, text: &str) -> Result<()> {
        if self.json {
            return print_json(value);
        }
        println!("{text}");
        Ok(())
    }

    /// Raw text (configs, command output); JSON mode wraps it in `{"text": ...}`.
    pub fn text(&self, text: &str) -> Result<()> {
        if self.json {
            return print_json(&serde_json::json!({ "text": text }));
        }
        print!("{text}");
        if !text.ends_with('\n') {
            println!();
        }
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut builder = Builder::default();
    builder.push_record(headers.iter().map(|h| (*h).to_string()));
    for row in rows {
        builder.push_record(row.iter().cloned());
    }
    let mut table = builder.build();
    table.with(Style::sharp());
    table.to_string()
}

/// `-` for `None`.
pub fn opt<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub fn yes_no(value: bool) -> String {
    let text = if value { "yes" } else { "no" };
    text.to_string()
}

pub fn date(value: chrono::DateTime<chrono::Utc>) -> String {
    value.format("%Y-%m-%d").to_string()
}
