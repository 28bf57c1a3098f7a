//! Sync toggle and queue management.

use anyhow::Result;

use crate::engine::{self, Engine};

/// Turn sync on or off. Enabling drains the queue right away.
pub async fn set_enabled(engine: &Engine, enabled: bool) -> Result<()> {
    engine.dispatcher.set_sync_enabled(enabled).await;
    let status = engine.dispatcher.status();
    println!(
        "Sync {} ({} pending)",
        if enabled { "enabled" } else { "disabled" },
        status.pending
    );
    Ok(())
}

/// Skip the initial download and push whatever is queued.
pub async fn continue_offline(engine: &Engine) -> Result<()> {
    let outcome = engine.dispatcher.continue_offline().await;
    println!("Continuing offline");
    println!("{}", engine::describe(&outcome));
    Ok(())
}

/// Drop every queued mutation.
pub async fn clear(engine: &Engine, yes: bool) -> Result<()> {
    if !yes {
        anyhow::bail!("Refusing to discard queued mutations without --yes");
    }
    let cleared = engine.dispatcher.service().clear_queue().await;
    println!("Discarded {} queued mutation(s)", cleared);
    Ok(())
}
