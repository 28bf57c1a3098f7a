//! Record a local mutation.

use anyhow::{Context, Result};
use spendsync_core::Trigger;
use spendsync_types::{EntityKind, MutationAction};

use crate::engine::{self, Engine};

/// Run the enqueue command.
///
/// The record is applied to the local store and queued. Unless `no_sync`
/// is set, the dispatcher then gets a chance to push it.
pub async fn run(
    engine: &Engine,
    kind: EntityKind,
    action: MutationAction,
    json: &str,
    no_sync: bool,
) -> Result<()> {
    let id = engine
        .dispatcher
        .service()
        .enqueue_json(kind, action, json)
        .await
        .context("Invalid record")?;
    println!("Queued {} {} ({})", action, kind, id);

    if !no_sync {
        let outcome = engine.dispatcher.trigger(Trigger::QueueChanged).await;
        println!("{}", engine::describe(&outcome));
    }

    Ok(())
}
