use anyhow::{Result, anyhow};
use paperless_search::prelude::*;

use crate::cli::{AppContext, QueryArgs, RunArgs};
use crate::desktop::{PrintDesktop, SystemDesktop};

pub async fn handle_search(ctx: &AppContext, args: &QueryArgs) -> Result<()> {
    let query = TextQuery::new(args.text());
    let items = ctx.plugin.handle_trigger_query(&query).await;
    ctx.output.emit_table(&items)
}

pub fn handle_global(ctx: &AppContext, args: &QueryArgs) -> Result<()> {
    let query = TextQuery::new(args.text());
    let items = ctx.plugin.handle_global_query(&query);
    ctx.output.emit_table(&items)
}

/// Repeats the search, then runs one action of one result.
pub async fn handle_run(ctx: &AppContext, args: &RunArgs) -> Result<()> {
    let query = TextQuery::new(args.text.join(" "));
    let items = ctx.plugin.handle_trigger_query(&query).await;
    let item = items.get(args.index).ok_or_else(|| {
        anyhow!(
            "no result at index {} ({} results for '{}')",
            args.index,
            items.len(),
            query.text()
        )
    })?;
    let action = item.action(&args.action).ok_or_else(|| {
        let available: Vec<&str> = item.actions.iter().map(|a| a.id.into()).collect();
        anyhow!(
            "'{}' has no action '{}' (available: {})",
            item.text,
            args.action,
            available.join(", ")
        )
    })?;

    let outcome = if args.dry_run {
        ctx.plugin.run_action(action, &PrintDesktop).await?
    } else {
        ctx.plugin.run_action(action, &SystemDesktop).await?
    };
    ctx.output.emit_json(&outcome)
}
