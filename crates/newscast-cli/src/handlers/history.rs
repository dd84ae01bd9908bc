//! History command handler.

use anyhow::Result;
use newscast_core::CategoryId;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Execute the history command.
pub async fn execute(ctx: &CliContext, reset: bool) -> Result<()> {
    let controller = &ctx.controller;

    if reset {
        controller.played().clear().await.map_err(CliError::from)?;
        controller.positions().clear().await.map_err(CliError::from)?;
        println!("Listening history cleared.");
        return Ok(());
    }

    println!("Played items: {}", controller.played().len());
    let positions = controller.positions().snapshot();
    if positions.is_empty() {
        println!("No saved positions.");
        return Ok(());
    }

    println!("Saved positions:");
    for category in CategoryId::ALL {
        if let Some(index) = positions.get(&category) {
            println!("  {:<4} item {}", category.label(), index + 1);
        }
    }
    Ok(())
}
