//! Categories command handler.

use anyhow::Result;
use newscast_core::CategoryId;

use crate::bootstrap::CliContext;

/// Execute the categories command.
///
/// With `fetch`, every category is preloaded and its unplayed count shown.
pub async fn execute(ctx: &CliContext, fetch: bool) -> Result<()> {
    let report = if fetch {
        Some(ctx.controller.preload().await)
    } else {
        None
    };

    println!("{:<14} {:<6} {:<20} {:<8} Unplayed", "Key", "Label", "Channels", "Position");
    for category in CategoryId::ALL {
        let channels = ctx.settings.channels_for(category).join(",");
        let position = ctx
            .controller
            .positions()
            .recorded(category)
            .map_or_else(|| "--".to_string(), |i| (i + 1).to_string());
        let unplayed = match report.as_ref().and_then(|r| r.get(&category)) {
            Some(Ok(_)) => ctx.controller.store().current_list(category).len().to_string(),
            Some(Err(e)) => format!("error: {e}"),
            None => "--".to_string(),
        };

        println!(
            "{:<14} {:<6} {:<20} {:<8} {unplayed}",
            category.key(),
            category.label(),
            channels,
            position
        );
    }
    Ok(())
}
