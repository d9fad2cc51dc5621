use anyhow::Result;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

mod table;

pub use table::{TableRow, render_table, render_table_dynamic};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Pretty,
    Table,
    Quiet,
}

#[derive(Clone, Debug)]
pub struct Output {
    format: OutputFormat,
    path: Option<PathBuf>,
}

impl Output {
    pub fn new(format: OutputFormat, path: Option<PathBuf>) -> Self {
        Self { format, path }
    }

    pub fn emit_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        if self.format == OutputFormat::Quiet {
            return Ok(());
        }

        let data = match self.format {
            OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
            _ => serde_json::to_string(value)?,
        };

        self.write(&data)
    }

    pub fn emit_table<T: TableRow + Serialize + Sized>(&self, items: &[T]) -> Result<()> {
        match self.format {
            OutputFormat::Table => {
                let data = render_table(items);
                self.write(&data)
            }
            OutputFormat::Quiet => Ok(()),
            _ => self.emit_json(items),
        }
    }

    /// Emits `value` as json, or as a two column key/value table.
    pub fn emit_fields<T: Serialize>(&self, value: &T) -> Result<()> {
        if self.format != OutputFormat::Table {
            return self.emit_json(value);
        }
        let rows = match serde_json::to_value(value)? {
            serde_json::Value::Object(map) => map
                .into_iter()
                .flat_map(|(key, value)| flatten_field(&key, value))
                .collect(),
            other => vec![vec!["value".to_string(), field_text(&other)]],
        };
        let headers = ["field".to_string(), "value".to_string()];
        self.write(&render_table_dynamic(&headers, &rows))
    }

    pub fn emit_text(&self, text: &str) -> Result<()> {
        if self.format == OutputFormat::Quiet {
            return Ok(());
        }
        self.write(text)
    }

    fn write(&self, data: &str) -> Result<()> {
        let mut output = data.to_string();
        if !output.ends_with('\n') {
            output.push('\n');
        }

        if let Some(path) = &self.path {
            fs::write(path, output)?;
        } else {
            print!("{output}");
        }
        Ok(())
    }
}

// nested objects become `parent.child` rows
fn flatten_field(key: &str, value: serde_json::Value) -> Vec<Vec<String>> {
    match value {
        serde_json::Value::Object(map) => map
            .into_iter()
            .flat_map(|(child, value)| flatten_field(&format!("{key}.{child}"), value))
            .collect(),
        other => vec![vec![key.to_string(), field_text(&other)]],
    }
}

fn field_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
