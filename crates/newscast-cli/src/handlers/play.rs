//! Play command handler.
//!
//! Starts continuous playback of one category and prints each item as it
//! goes on air, until the chain ends, the item limit is reached or the
//! user presses Ctrl-C.

use anyhow::Result;
use newscast_core::{CategoryId, NewsItem, PlaybackEvent, PlaybackState};
use newscast_playback::{CategoryReport, PlayStart};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Arguments for the play command.
#[derive(Debug, Clone, Copy)]
pub struct PlayArgs {
    pub category: Option<CategoryId>,
    pub count: Option<usize>,
    pub manual: bool,
}

/// Execute the play command.
pub async fn execute(ctx: &CliContext, args: PlayArgs) -> Result<()> {
    let controller = &ctx.controller;
    let category = args.category.unwrap_or(ctx.settings.initial_category);
    if args.manual {
        controller.set_auto_advance(false);
    }

    println!("Loading news...");
    print_preload_report(&controller.preload().await);

    let mut events = controller.subscribe();
    match controller
        .play_category(category)
        .await
        .and_then(PlayStart::reject_conflict)
    {
        Ok(PlayStart::Empty(_)) => {
            println!("No unplayed news in {}.", category.label());
            controller.shutdown().await.map_err(CliError::from)?;
            return Ok(());
        }
        Ok(_) => {}
        Err(e) => {
            controller.shutdown().await.ok();
            return Err(CliError::from(e).into());
        }
    }

    let mut completed = 0usize;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                }
                println!("\nStopping...");
                break;
            }
            event = events.recv() => match event {
                Ok(PlaybackEvent::ItemStarted { item, index }) => print_item(index, &item),
                Ok(PlaybackEvent::ItemCompleted { .. }) => {
                    completed += 1;
                    if args.count.is_some_and(|limit| completed >= limit) {
                        break;
                    }
                }
                Ok(PlaybackEvent::CategoryRefilled { category, count }) => {
                    println!("Refreshed {} ({count} new items)", category.label());
                }
                Ok(PlaybackEvent::CategoryEmpty { category }) => {
                    println!("No unplayed news left in {}.", category.label());
                }
                Ok(PlaybackEvent::Error { message }) => eprintln!("Playback error: {message}"),
                Ok(PlaybackEvent::StateChanged { state: PlaybackState::Idle }) => break,
                Ok(PlaybackEvent::StateChanged { .. }) => {}
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed playback events"),
                Err(RecvError::Closed) => break,
            }
        }
    }

    controller.shutdown().await.map_err(CliError::from)?;
    println!("Read {completed} item(s).");
    Ok(())
}

fn print_preload_report(report: &CategoryReport) {
    for (category, result) in report {
        match result {
            Ok(count) => println!("  {:<4} {count} unplayed", category.label()),
            Err(e) => println!("  {:<4} unavailable: {e}", category.label()),
        }
    }
}

fn print_item(index: usize, item: &NewsItem) {
    println!();
    println!(
        "[{} #{}] {}  ({})",
        item.category.label(),
        index + 1,
        item.title,
        item.published_at.format("%Y-%m-%d %H:%M")
    );
}
