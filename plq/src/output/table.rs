use paperless_search::prelude::*;

use crate::config::SettingRow;

pub trait TableRow {
    fn headers() -> &'static [&'static str];
    fn row(&self) -> Vec<String>;
}

pub fn render_table<T: TableRow>(items: &[T]) -> String {
    let headers = T::headers();
    let rows: Vec<Vec<String>> = items.iter().map(TableRow::row).collect();
    let widths = column_widths(headers, &rows);

    let mut out = String::new();
    out.push_str(&format_row(
        &headers.iter().map(ToString::to_string).collect::<Vec<_>>(),
        &widths,
    ));
    out.push('\n');
    out.push_str(&format_separator(&widths));

    for row in rows {
        out.push('\n');
        out.push_str(&format_row(&row, &widths));
    }

    out
}

pub fn render_table_dynamic(headers: &[String], rows: &[Vec<String>]) -> String {
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
    let widths = column_widths(&header_refs, rows);

    let mut out = String::new();
    out.push_str(&format_row(headers, &widths));
    out.push('\n');
    out.push_str(&format_separator(&widths));

    for row in rows {
        out.push('\n');
        out.push_str(&format_row(row, &widths));
    }

    out
}

fn column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            if idx >= widths.len() {
                widths.push(len);
            } else {
                widths[idx] = widths[idx].max(len);
            }
        }
    }
    widths
}

fn format_row(row: &[String], widths: &[usize]) -> String {
    use std::fmt::Write as _;
    let mut out = String::new();
    for (idx, cell) in row.iter().enumerate() {
        if idx > 0 {
            out.push_str("  ");
        }
        let width = widths.get(idx).copied().unwrap_or(0);
        let _ = write!(out, "{cell:<width$}");
    }
    out.trim_end().to_string()
}

fn format_separator(widths: &[usize]) -> String {
    let mut out = String::new();
    for (idx, width) in widths.iter().enumerate() {
        if idx > 0 {
            out.push_str("  ");
        }
        out.push_str(&"-".repeat(*width));
    }
    out
}

fn action_ids(actions: &[Action]) -> String {
    actions
        .iter()
        .map(|a| <&str>::from(a.id))
        .collect::<Vec<_>>()
        .join(",")
}

impl TableRow for ResultItem {
    fn headers() -> &'static [&'static str] {
        &["id", "title", "subtitle", "actions"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.text.clone(),
            self.subtext.clone(),
            action_ids(&self.actions),
        ]
    }
}

impl TableRow for RankItem {
    fn headers() -> &'static [&'static str] {
        &["id", "title", "subtitle", "score"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.item.id.clone(),
            self.item.text.clone(),
            self.item.subtext.clone(),
            self.score.to_string(),
        ]
    }
}

impl TableRow for SettingRow {
    fn headers() -> &'static [&'static str] {
        &["key", "value", "source"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.key.clone(),
            self.value.to_string(),
            self.source.to_string(),
        ]
    }
}
