//! Show sync status.

use anyhow::Result;

use crate::engine::Engine;

/// Run the status command.
pub async fn run(engine: &Engine) -> Result<()> {
    let status = engine.dispatcher.status();
    let account = engine.dispatcher.service().account().await;

    println!("=== spendsync status ===");
    println!();

    match account {
        Some(account) => println!("Account:  {}", account),
        None => println!("Account:  NOT SIGNED IN"),
    }
    println!(
        "Network:  {}",
        if status.network.is_online() {
            "online"
        } else {
            "offline"
        }
    );
    println!(
        "Sync:     {}",
        if status.sync_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("Hydrated: {}", status.has_hydrated_from_cloud);
    println!();

    println!("Status:   {:?}", status.status);
    println!("Pending:  {}", status.pending);
    match status.last_sync {
        Some(at) => println!("Last sync: {}", at),
        None => println!("Last sync: never"),
    }
    if let Some(error) = &status.last_error {
        println!("Last error: {}", error);
    }
    if status.offline_escape_available {
        println!();
        println!("Initial download failed offline.");
        println!("Run 'spendsync continue-offline' to work without it.");
    }

    let queue = engine.context.queue_snapshot().await;
    if !queue.is_empty() {
        println!();
        println!("Queue:");
        for item in &queue {
            println!("  {} {} {}", item.id, item.action, item.entity_key());
        }
    }

    Ok(())
}
