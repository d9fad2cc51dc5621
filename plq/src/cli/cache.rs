use anyhow::Result;
use paperless_search::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::cli::{AppContext, WatchArgs};

pub async fn handle_refresh(ctx: &AppContext) -> Result<()> {
    ctx.plugin.refresh().await?;
    ctx.output.emit_fields(&ctx.plugin.status().await)
}

pub async fn handle_status(ctx: &AppContext) -> Result<()> {
    ctx.output.emit_fields(&ctx.plugin.status().await)
}

/// Starts background refresh and answers one query per stdin line until
/// end of input or ctrl-c. Lines starting with the trigger are triggered
/// queries; other non-empty lines are global queries.
pub async fn handle_watch(ctx: &AppContext, args: &WatchArgs) -> Result<()> {
    ctx.plugin.start().await;
    info!(status = ?ctx.plugin.status().await, "watching");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                None
            }
        };
        let Some(line) = line else {
            break;
        };
        match classify(&line, &args.trigger) {
            Line::Trigger(text) => {
                let items = ctx.plugin.handle_trigger_query(&TextQuery::new(text)).await;
                ctx.output.emit_table(&items)?;
            }
            Line::Global(text) => {
                let items = ctx.plugin.handle_global_query(&TextQuery::new(text));
                ctx.output.emit_table(&items)?;
            }
            Line::Empty => {}
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Trigger(&'a str),
    Global(&'a str),
    Empty,
}

fn classify<'a>(line: &'a str, trigger: &str) -> Line<'a> {
    let trimmed_trigger = trigger.trim_end();
    if let Some(rest) = line.strip_prefix(trigger) {
        Line::Trigger(rest)
    } else if !trimmed_trigger.is_empty() && line.trim_end() == trimmed_trigger {
        // the bare trigger is an empty triggered query
        Line::Trigger("")
    } else if line.trim().is_empty() {
        Line::Empty
    } else {
        Line::Global(line.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("pl invoice", "pl "), Line::Trigger("invoice"));
        assert_eq!(classify("pl ", "pl "), Line::Trigger(""));
        assert_eq!(classify("pl", "pl "), Line::Trigger(""));
        assert_eq!(classify("  invoice ", "pl "), Line::Global("invoice"));
        assert_eq!(classify("plan", "pl "), Line::Global("plan"));
        assert_eq!(classify("   ", "pl "), Line::Empty);
    }
}
